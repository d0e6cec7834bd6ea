//! Client error types.

use skywire_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server error code {code}")]
    Server { code: u8 },

    #[error("expected {expected} response, got {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },

    #[error("connection is unusable after an earlier failure")]
    Poisoned,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl ClientError {
    /// Returns whether this error is retryable on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }

    /// Returns whether the connection that produced this error has lost
    /// alignment with the server and must not be reused.
    pub fn poisons_connection(&self) -> bool {
        match self {
            ClientError::Io(_)
            | ClientError::Timeout
            | ClientError::ConnectionClosed
            | ClientError::Poisoned => true,
            ClientError::Protocol(err) => err.is_connection_fatal(),
            _ => false,
        }
    }

    /// Returns the server error code, if the server rejected the query.
    pub fn server_code(&self) -> Option<u8> {
        match self {
            ClientError::Server { code } => Some(*code),
            _ => None,
        }
    }
}

impl From<tokio::time::error::Elapsed> for ClientError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ClientError::Timeout
    }
}

/// Maps a decoder error, turning server error codes into [`ClientError::Server`].
pub(crate) fn from_decode(err: ProtocolError) -> ClientError {
    match err {
        ProtocolError::ResponseError(code) => ClientError::Server { code },
        other => ClientError::Protocol(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_keeps_connection() {
        let err = from_decode(ProtocolError::ResponseError(7));
        assert_eq!(err.server_code(), Some(7));
        assert!(!err.poisons_connection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_malformed_frame_poisons() {
        let err = from_decode(ProtocolError::UnknownTag(0x7f));
        assert!(err.poisons_connection());
        assert!(err.server_code().is_none());
    }

    #[test]
    fn test_unsupported_param_keeps_connection() {
        let err = ClientError::from(ProtocolError::UnsupportedParameterType("object".into()));
        assert!(!err.poisons_connection());
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(!ClientError::NotConnected.is_retryable());
        assert!(!ClientError::Server { code: 1 }.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ClientError::Server { code: 3 }.to_string(),
            "server error code 3"
        );
        let err = ClientError::UnexpectedResponse {
            expected: "row",
            found: "empty",
        };
        assert_eq!(err.to_string(), "expected row response, got empty");
    }
}
