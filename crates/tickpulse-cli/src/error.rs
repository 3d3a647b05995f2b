use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// Exit code 3 is reserved for envelopes that were printed but carry errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickpulse_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Config(#[from] tickpulse_core::ConfigError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Config(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
