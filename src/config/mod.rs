//! Runtime configuration. Settings resolve in layers, later ones winning:
//! built-in defaults, config files, `SCATTO__` environment, CLI flags.

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::{Date, format_description::BorrowedFormatItem, macros::date, macros::format_description};
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scatto";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LIBRARY_ROOT: &str = "photos";
const DEFAULT_CYCLE_START: Date = date!(2024 - 01 - 01);
const DEFAULT_CYCLE_DAYS: u32 = 730;

fn default_categories() -> Vec<String> {
    vec!["category1".to_string(), "category2".to_string()]
}

/// Command-line arguments for the Scatto binary.
#[derive(Debug, Parser)]
#[command(name = "scatto", version, about = "Scatto photo-of-the-day server")]
pub struct CliArgs {
    /// Extra configuration file, layered over the defaults.
    #[arg(long = "config-file", env = "SCATTO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Scatto HTTP service.
    Serve(Box<ServeArgs>),
    /// Check the photo library for missing or ambiguous slot files.
    #[command(name = "audit")]
    Audit(AuditArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the photo library root directory.
    #[arg(long = "library-root", value_name = "PATH")]
    pub library_root: Option<PathBuf>,

    /// Override the log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Switch log output to JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct AuditArgs {
    #[command(flatten)]
    pub overrides: AuditOverrides,

    /// First cycle day to audit; defaults to day one.
    #[arg(long = "from-day", value_name = "DAY")]
    pub from_day: Option<u32>,

    /// Last cycle day to audit; defaults to the final day of the cycle.
    #[arg(long = "to-day", value_name = "DAY")]
    pub to_day: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct AuditOverrides {
    /// Override the photo library root directory.
    #[arg(long = "library-root", value_name = "PATH")]
    pub library_root: Option<PathBuf>,

    /// Override the log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Validated settings with every layer already applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub library: LibrarySettings,
    pub rotation: RotationSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LibrarySettings {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub start_date: Date,
    pub cycle_days: u32,
    pub categories: Vec<String>,
    pub timezone: Tz,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Resolve settings for the given CLI invocation.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SCATTO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Audit(args)) => raw.apply_audit_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    library: RawLibrarySettings,
    rotation: RawRotationSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(root) = overrides.library_root.as_ref() {
            self.library.root = Some(root.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_audit_overrides(&mut self, overrides: &AuditOverrides) {
        if let Some(root) = overrides.library_root.as_ref() {
            self.library.root = Some(root.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            library,
            rotation,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let library = build_library_settings(library)?;
        let rotation = build_rotation_settings(rotation)?;

        Ok(Self {
            server,
            logging,
            library,
            rotation,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid("server.port", "port 0 is not bindable"));
    }

    let bind_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.bind_addr", reason))?;

    Ok(ServerSettings { bind_addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = logging
        .level
        .map(|value| {
            LevelFilter::from_str(value.trim()).map_err(|err| {
                LoadError::invalid("logging.level", format!("unrecognized level: {err}"))
            })
        })
        .transpose()?
        .unwrap_or(LevelFilter::INFO);

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_library_settings(library: RawLibrarySettings) -> Result<LibrarySettings, LoadError> {
    let root = library
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("library.root", "path must not be empty"));
    }

    Ok(LibrarySettings { root })
}

fn build_rotation_settings(rotation: RawRotationSettings) -> Result<RotationSettings, LoadError> {
    const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    let start_date = match rotation.start_date {
        Some(value) => Date::parse(value.trim(), DATE_FORMAT).map_err(|err| {
            LoadError::invalid("rotation.start_date", format!("not a calendar date: {err}"))
        })?,
        None => DEFAULT_CYCLE_START,
    };

    let cycle_days = rotation.cycle_days.unwrap_or(DEFAULT_CYCLE_DAYS);
    if cycle_days == 0 {
        return Err(LoadError::invalid(
            "rotation.cycle_days",
            "cycle length of zero days leaves nothing to serve",
        ));
    }

    let names = rotation.categories.unwrap_or_else(default_categories);
    if names.is_empty() {
        return Err(LoadError::invalid(
            "rotation.categories",
            "at least one category is required",
        ));
    }
    if names.len() > usize::from(u8::MAX) {
        return Err(LoadError::invalid(
            "rotation.categories",
            "too many categories",
        ));
    }

    let mut categories = Vec::with_capacity(names.len());
    for raw_name in &names {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(LoadError::invalid(
                "rotation.categories",
                "category names must not be blank",
            ));
        }
        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(LoadError::invalid(
                "rotation.categories",
                format!("`{name}` is not a plain directory name"),
            ));
        }
        if categories.iter().any(|existing: &String| existing == name) {
            return Err(LoadError::invalid(
                "rotation.categories",
                format!("duplicate category `{name}`"),
            ));
        }
        categories.push(name.to_string());
    }

    let timezone = match rotation.timezone {
        Some(value) => value
            .trim()
            .parse::<Tz>()
            .map_err(|err| LoadError::invalid("rotation.timezone", err.to_string()))?,
        None => Tz::UTC,
    };

    Ok(RotationSettings {
        start_date,
        cycle_days,
        categories,
        timezone,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLibrarySettings {
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRotationSettings {
    start_date: Option<String>,
    cycle_days: Option<u32>,
    categories: Option<Vec<String>>,
    timezone: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Parse the command line and resolve settings against it.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
