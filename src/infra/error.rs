use thiserror::Error;

/// Failures raised while standing up process infrastructure: the listener,
/// the logging stack, or the photo library location.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging setup failed: {0}")]
    Telemetry(String),
    #[error("bad runtime configuration: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
