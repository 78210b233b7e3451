//! Bootstrap error types.
//!
//! Fail-fast: any error during instrument bootstrap propagates unmodified
//! to the caller. There are no retries and no partial rollback. Instrument
//! readiness failures are not errors; an unready instrument just
//! contributes nothing.

use crate::config::ConfigError;
use crate::instruments::InstrumentKind;

/// Error produced while bootstrapping an application.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Settings loading or validation failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An instrument failed its global setup.
    #[error("failed to bootstrap {kind} instrument: {message}")]
    Instrument {
        kind: InstrumentKind,
        message: String,
    },
}

impl BootstrapError {
    pub(crate) fn instrument(kind: InstrumentKind, error: impl std::fmt::Display) -> Self {
        Self::Instrument {
            kind,
            message: error.to_string(),
        }
    }
}
