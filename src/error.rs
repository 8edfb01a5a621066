//! Unified error types for the RPC link.
//!
//! Application-level failures (registration, capacity, transmission) are
//! returned to the immediate caller as [`Error`]. Link-level noise such as a
//! corrupted frame never surfaces here; it is counted in
//! [`LinkStats`](crate::diagnostics::LinkStats) and discarded.
//! All variants are `Copy` so they cross worker boundaries without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A fixed-capacity table (functions or pending requests) is full.
    CapacityExceeded,
    /// A function with this name is already registered.
    DuplicateName,
    /// Function name is empty, longer than 31 bytes, not ASCII, or contains NUL.
    InvalidName,
    /// The encoded frame would not fit in `MAX_FRAME_SIZE`.
    FrameTooLarge,
    /// The transmission collaborator reported a failure.
    Transport,
    /// A worker thread could not be started.
    WorkerSpawn,
    /// Workers are already running for this engine.
    WorkersRunning,
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "capacity exceeded"),
            Self::DuplicateName => write!(f, "function already registered"),
            Self::InvalidName => write!(f, "invalid function name"),
            Self::FrameTooLarge => write!(f, "frame exceeds maximum size"),
            Self::Transport => write!(f, "transport write failed"),
            Self::WorkerSpawn => write!(f, "failed to spawn worker"),
            Self::WorkersRunning => write!(f, "workers already running"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Handler errors
// ---------------------------------------------------------------------------

/// Returned by a registered handler to signal failure.
///
/// The dispatcher answers the request with an `Error` message carrying an
/// empty argument body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandlerError;

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler failed")
    }
}

impl std::error::Error for HandlerError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Error::CapacityExceeded.to_string(), "capacity exceeded");
        assert_eq!(
            Error::Config("stack too small").to_string(),
            "config: stack too small"
        );
        assert_eq!(HandlerError.to_string(), "handler failed");
    }
}
