//! Error types.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::signal::SignalKind;

/// Raised in a guarded call whose deadline passed before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("execution expired ({kind})")]
pub struct DeadlineExceeded {
    pub kind: SignalKind,
}

/// Errors starting or installing an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The timer thread could not be spawned.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A global engine already exists.
    #[error("a global engine is already installed")]
    AlreadyInstalled,

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Any error this crate produces.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl Error {
    /// The signal kind if this error is an expired deadline.
    pub fn expired_kind(&self) -> Option<SignalKind> {
        match self {
            Error::DeadlineExceeded(e) => Some(e.kind),
            Error::Engine(_) => None,
        }
    }
}
