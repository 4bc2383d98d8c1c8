//! Error types for atmodem.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, framing problems,
//! timeouts and argument validation are all captured here.

/// The error type for all atmodem operations.
///
/// Nothing in the line pipeline is fatal: every variant is recovered
/// locally and surfaced to the caller as a value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open, write failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// A blocking operation exhausted its deadline.
    ///
    /// For line channels this simply means no line arrived in time; it is
    /// not an indication that the modem is gone.
    #[error("timeout waiting for modem")]
    Timeout,

    /// An argument was rejected before any I/O took place.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The IO task is gone or the transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the modem was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A line grew past the framer bound without a terminator.
    ///
    /// The partial line has been discarded and framing resumed.
    #[error("line exceeded {limit} bytes without a terminator")]
    FramingOverflow {
        /// The configured maximum line length in bytes.
        limit: usize,
    },

    /// A line channel was closed because its producer went away.
    #[error("line channel closed")]
    ChannelClosed,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for modem");
    }

    #[test]
    fn error_display_invalid_argument() {
        let e = Error::InvalidArgument("empty command".into());
        assert_eq!(e.to_string(), "invalid argument: empty command");
    }

    #[test]
    fn error_display_framing_overflow() {
        let e = Error::FramingOverflow { limit: 4096 };
        assert_eq!(
            e.to_string(),
            "line exceeded 4096 bytes without a terminator"
        );
    }

    #[test]
    fn error_display_channel_closed() {
        assert_eq!(Error::ChannelClosed.to_string(), "line channel closed");
    }

    #[test]
    fn error_display_not_connected() {
        assert_eq!(Error::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn error_display_connection_lost() {
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
