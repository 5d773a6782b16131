//! u2a error types.
//!
//! One taxonomy shared by the producer, the consumer and the bridge.

use std::io;
use thiserror::Error;

use crate::endpoint::EndpointError;

/// Main error type for u2a operations
#[derive(Error, Debug)]
pub enum U2aError {
    /// Malformed, incomplete or unresolvable target address
    #[error("Address parse error: {0}")]
    AddressParse(#[from] EndpointError),

    /// Broker unreachable or connection refused during setup
    #[error("Connection error: {0}")]
    Connection(String),

    /// Exchange missing or binding refused by the broker
    #[error("Bind error on exchange `{exchange}`: {reason}")]
    Bind { exchange: String, reason: String },

    /// Socket send/receive failure or output failure
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Writing handler output failed (closed stdout, full disk)
    ///
    /// Never recoverable: a new broker session cannot fix the sink.
    #[error("Output error: {0}")]
    Output(io::Error),

    /// Broker-side failure after the session was established
    #[error("Broker error: {0}")]
    Broker(String),

    /// Event could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Local delivery handler failed
    #[error("Handler error: {0}")]
    Handler(String),

    /// Reconnection attempts exhausted
    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

/// Result type alias for u2a operations
pub type Result<T> = std::result::Result<T, U2aError>;

impl U2aError {
    /// Create a connection error with a message
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a bind error for an exchange
    pub fn bind(exchange: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bind {
            exchange: exchange.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error from a failed write
    pub fn output(err: io::Error) -> Self {
        Self::Output(err)
    }

    /// Create a broker error with a message
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    /// Check if this error is worth another connection attempt.
    ///
    /// Address and encoding errors are deterministic and never recover.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Broker(_) => true,
            Self::Transport(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Check if this is a connection error
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Broker(_) | Self::ReconnectExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_error_converts() {
        let err: U2aError = crate::endpoint::Endpoint::parse("udp://host")
            .unwrap_err()
            .into();
        assert!(matches!(err, U2aError::AddressParse(EndpointError::MissingPort(_))));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(U2aError::connection("refused").is_recoverable());
        assert!(U2aError::broker("channel closed").is_recoverable());
        assert!(U2aError::from(io::Error::from(io::ErrorKind::ConnectionReset)).is_recoverable());
        assert!(!U2aError::from(io::Error::from(io::ErrorKind::PermissionDenied)).is_recoverable());
        assert!(!U2aError::bind("x", "NOT_FOUND").is_recoverable());
    }

    #[test]
    fn test_output_failure_is_never_recoverable() {
        for kind in [io::ErrorKind::BrokenPipe, io::ErrorKind::ConnectionReset] {
            let err = U2aError::output(io::Error::from(kind));
            assert!(!err.is_recoverable(), "{kind:?}");
            assert!(!err.is_connection_error());
        }
    }

    #[test]
    fn test_bind_display() {
        let err = U2aError::bind("events", "NOT_FOUND - no exchange 'events'");
        assert_eq!(
            err.to_string(),
            "Bind error on exchange `events`: NOT_FOUND - no exchange 'events'"
        );
        assert!(!err.is_connection_error());
    }
}
