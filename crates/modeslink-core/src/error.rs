//! Error types for modeslink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer and session-layer
//! failures are all captured here; framing problems on the receive side are
//! not errors (the input engine records them as sync events and recovers on
//! its own).

/// The error type for all modeslink operations.
///
/// Variants cover the failure modes encountered when talking to a
/// Beast/Radarcape receiver over a local serial device: physical transport
/// failures, bad construction parameters, and plain I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (failed to open or configure the serial port).
    #[error("transport error: {0}")]
    Transport(String),

    /// An invalid parameter was passed when configuring a session.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the receiver has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the receiver was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// The session has been closed and cannot accept further operations.
    #[error("session closed")]
    Closed,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
