use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
/// `RUST_LOG` still wins over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };
    installed.map_err(|err| InfraError::telemetry(err.to_string()))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "scatto_rotation_refresh_total",
            Unit::Count,
            "Total number of daily rotation refreshes that produced a populated day."
        );
        describe_counter!(
            "scatto_rotation_empty_day_total",
            Unit::Count,
            "Total number of refreshes that produced an empty day."
        );
        describe_histogram!(
            "scatto_rotation_refresh_ms",
            Unit::Milliseconds,
            "Daily rotation refresh latency in milliseconds."
        );
        describe_counter!(
            "scatto_page_token_miss_total",
            Unit::Count,
            "Total number of photo page requests carrying an unknown token."
        );
        describe_counter!(
            "scatto_photo_reject_total",
            Unit::Count,
            "Total number of raw photo requests refused as outside the current day."
        );
    });
}
