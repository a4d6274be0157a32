//! Error types for p2k.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Value validation, command resolution,
//! framing, and transport failures are all captured here.

/// The error type for all p2k operations.
///
/// Protocol-level variants ([`OutOfRange`](Error::OutOfRange),
/// [`UnsupportedCommand`](Error::UnsupportedCommand),
/// [`MalformedFrame`](Error::MalformedFrame), [`Protocol`](Error::Protocol))
/// are kept distinct from the transport-level ones so callers can tell a
/// bad value from a dead link.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A protocol field was outside the 7-bit value domain.
    #[error("value out of range: valid values are between {min} and {max}, inclusive. Received: {value}")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// Smallest accepted value.
        min: u8,
        /// Largest accepted value.
        max: u8,
    },

    /// An instruction was built from a command name the registry does not know.
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// A wire frame did not have the fixed Protocol 2000 length.
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Required frame length.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },

    /// A protocol-level error (wrong number of responses, unexpected exchange).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A transport-level error (TCP socket, serial line).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a response from the device.
    ///
    /// This typically indicates the device is powered off or the machine
    /// id does not match any device on the link.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed to a builder or engine.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the device has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for failures of the underlying link rather than of
    /// the protocol exchange itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_out_of_range() {
        let e = Error::OutOfRange {
            value: 128,
            min: 0,
            max: 127,
        };
        assert_eq!(
            e.to_string(),
            "value out of range: valid values are between 0 and 127, inclusive. Received: 128"
        );
    }

    #[test]
    fn error_display_unsupported_command() {
        let e = Error::UnsupportedCommand("SELF_DESTRUCT".into());
        assert_eq!(e.to_string(), "unsupported command: SELF_DESTRUCT");
    }

    #[test]
    fn error_display_malformed_frame() {
        let e = Error::MalformedFrame {
            expected: 4,
            actual: 3,
        };
        assert_eq!(e.to_string(), "malformed frame: expected 4 bytes, got 3");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn transport_errors_are_classified() {
        assert!(Error::Timeout.is_transport());
        assert!(Error::ConnectionLost.is_transport());
        assert!(Error::Transport("refused".into()).is_transport());
        assert!(!Error::Protocol("short batch".into()).is_transport());
        assert!(!Error::UnsupportedCommand("X".into()).is_transport());
        assert!(!Error::OutOfRange {
            value: -1,
            min: 0,
            max: 127
        }
        .is_transport());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
