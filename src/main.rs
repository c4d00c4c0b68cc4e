use std::{process, sync::Arc};

use scatto::{
    application::{catalog::PhotoCatalog, error::AppError, gallery::DailyGallery},
    config,
    domain::rotation::{RotationSchedule, SLOTS_PER_CATEGORY, SlotKey, matching_slot_files},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        library::PhotoLibrary,
        telemetry,
    },
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

// Startup can fail before the global subscriber exists; fall back to a
// throwaway one so the error still reaches stderr.
fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "fatal error");
        return;
    }

    let fallback = Dispatch::new(tracing_fmt().with_max_level(Level::ERROR).finish());
    dispatcher::with_default(&fallback, || {
        error!(error = %error, "fatal error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("configuration load failed: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Some(config::Command::Audit(args)) => run_audit(settings, args).await,
        Some(config::Command::Serve(_)) | None => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let library = Arc::new(
        PhotoLibrary::new(settings.library.root.clone())
            .map_err(|err| InfraError::configuration(err.to_string()))?,
    );

    let schedule =
        RotationSchedule::new(settings.rotation.start_date, settings.rotation.cycle_days)?;

    let catalog: Arc<dyn PhotoCatalog> = library.clone();
    let gallery = Arc::new(DailyGallery::new(
        schedule,
        settings.rotation.categories.clone(),
        settings.rotation.timezone,
        catalog,
    ));

    // Resolve today before accepting traffic; an empty day logs its reason
    // here instead of on the first request.
    let day = gallery.ensure_fresh(OffsetDateTime::now_utc()).await;
    info!(
        target = "scatto::startup",
        date = %day.date(),
        day_index = day.day_index(),
        slots = day.slot_count(),
        "daily rotation warmed"
    );

    serve_http(&settings, HttpState { gallery, library }).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind_addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "scatto::startup",
        addr = %settings.server.bind_addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("http server stopped: {err}")))?;

    Ok(())
}

/// Walk a range of cycle days against the on-disk library and report slots
/// with no matching file or with several.
async fn run_audit(settings: config::Settings, args: config::AuditArgs) -> Result<(), AppError> {
    let library = PhotoLibrary::new(settings.library.root.clone())
        .map_err(|err| InfraError::configuration(err.to_string()))?;

    let cycle_days = settings.rotation.cycle_days;
    let from_day = args.from_day.unwrap_or(1);
    let to_day = args.to_day.unwrap_or(cycle_days);

    if from_day == 0 || from_day > to_day || to_day > cycle_days {
        return Err(AppError::validation(format!(
            "audit range {from_day}..={to_day} must lie within 1..={cycle_days}"
        )));
    }

    let mut listings = Vec::with_capacity(settings.rotation.categories.len());
    for category in &settings.rotation.categories {
        let names = match library.list_category(category).await {
            Ok(names) => names,
            Err(err) => {
                warn!(
                    target = "scatto::audit",
                    category = %category,
                    error = %err,
                    "category listing failed, treating it as empty"
                );
                Vec::new()
            }
        };
        listings.push(names);
    }

    let mut complete = 0u32;
    let mut incomplete = 0u32;
    let mut ambiguous = 0u32;

    for day in from_day..=to_day {
        let mut missing = Vec::new();
        let mut duplicated = Vec::new();

        for (position, names) in listings.iter().enumerate() {
            let ordinal = (position + 1) as u8;
            for picture in 1..=SLOTS_PER_CATEGORY {
                let slot = SlotKey::new(ordinal, picture);
                let matches = matching_slot_files(names.iter().map(String::as_str), day, slot);
                match matches.len() {
                    0 => missing.push(slot.to_string()),
                    1 => {}
                    _ => duplicated.push(slot.to_string()),
                }
            }
        }

        if !duplicated.is_empty() {
            warn!(
                target = "scatto::audit",
                day,
                slots = ?duplicated,
                "slots with more than one matching file"
            );
        }
        if !missing.is_empty() {
            warn!(
                target = "scatto::audit",
                day,
                slots = ?missing,
                "slots with no matching file"
            );
        }

        if !missing.is_empty() {
            incomplete += 1;
        } else if !duplicated.is_empty() {
            ambiguous += 1;
        } else {
            complete += 1;
        }
    }

    info!(
        target = "scatto::audit",
        from_day,
        to_day,
        complete,
        incomplete,
        ambiguous,
        "library audit finished"
    );

    Ok(())
}
