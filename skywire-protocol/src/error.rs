//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding requests or decoding responses.
///
/// Running out of buffered bytes is not an error: decoders report it as
/// `Ok(None)` and expect to be called again once more data has arrived.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: unknown type tag {0:#04x}")]
    UnknownTag(u8),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("server returned error code {0}")]
    ResponseError(u8),

    #[error("handshake failed with status {code} (message {message})")]
    Handshake { code: String, message: u8 },

    #[error("unsupported parameter type: {0}")]
    UnsupportedParameterType(String),
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ProtocolError::MalformedFrame(reason.into())
    }

    /// Returns whether byte alignment with the server has been lost.
    ///
    /// After such an error no further frame on the same stream can be
    /// interpreted and the connection has to be dropped.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnknownTag(_)
                | ProtocolError::MalformedFrame(_)
                | ProtocolError::Handshake { .. }
        )
    }

    /// Returns the server error code for `ResponseError`.
    pub fn response_code(&self) -> Option<u8> {
        match self {
            ProtocolError::ResponseError(code) => Some(*code),
            _ => None,
        }
    }
}
