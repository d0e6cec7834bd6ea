//! Authentication handshake.
//!
//! Client frame (no outer length prefix):
//!
//! ```text
//! 'H' 0x00 0x00 0x00 0x00 0x00 0x00 <user_len>\n<pass_len>\n<user><pass>
//! ```
//!
//! Server reply: `H00` on success, `H01` followed by one message byte on
//! failure. The two status digits are accepted either as ASCII or as raw
//! `0x00`/`0x01` bytes.

use crate::error::ProtocolError;
use crate::value::put_line;
use bytes::{Buf, BufMut, BytesMut};

/// Fixed preamble: the handshake marker followed by reserved version bytes.
pub const HANDSHAKE_PREAMBLE: [u8; 7] = *b"H\x00\x00\x00\x00\x00\x00";

/// Length of the status part of the server reply.
pub const HANDSHAKE_STATUS_LEN: usize = 3;

/// Credentials sent when opening a session.
#[derive(Clone, PartialEq, Eq)]
pub struct Handshake {
    username: String,
    password: String,
}

impl Handshake {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Encodes the handshake frame.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(
            HANDSHAKE_PREAMBLE.len() + 16 + self.username.len() + self.password.len(),
        );
        buf.put_slice(&HANDSHAKE_PREAMBLE);
        put_line(&mut buf, self.username.len());
        put_line(&mut buf, self.password.len());
        buf.put_slice(self.username.as_bytes());
        buf.put_slice(self.password.as_bytes());
        buf
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome encoded in the reply status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    Success,
    Failure,
}

impl HandshakeStatus {
    pub fn code(self) -> &'static str {
        match self {
            HandshakeStatus::Success => "H00",
            HandshakeStatus::Failure => "H01",
        }
    }
}

fn status_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        0..=9 => Some(byte),
        _ => None,
    }
}

/// Parses the status bytes of a reply.
pub fn parse_status(bytes: [u8; HANDSHAKE_STATUS_LEN]) -> Result<HandshakeStatus, ProtocolError> {
    let digits = (status_digit(bytes[1]), status_digit(bytes[2]));
    match (bytes[0], digits) {
        (b'H', (Some(0), Some(0))) => Ok(HandshakeStatus::Success),
        (b'H', (Some(0), Some(1))) => Ok(HandshakeStatus::Failure),
        _ => Err(ProtocolError::malformed(format!(
            "invalid handshake status {:?}",
            bytes
        ))),
    }
}

/// Accumulates the server's handshake reply.
#[derive(Debug, Default)]
pub struct HandshakeDecoder {
    buffer: BytesMut,
}

impl HandshakeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the reply.
    ///
    /// Returns `Ok(Some(()))` once the session is accepted, `Ok(None)` while
    /// the reply is incomplete, and `Err(Handshake)` when it was refused.
    pub fn decode(&mut self) -> Result<Option<()>, ProtocolError> {
        if self.buffer.len() < HANDSHAKE_STATUS_LEN {
            return Ok(None);
        }

        let status = [self.buffer[0], self.buffer[1], self.buffer[2]];
        match parse_status(status)? {
            HandshakeStatus::Success => {
                self.buffer.advance(HANDSHAKE_STATUS_LEN);
                Ok(Some(()))
            }
            HandshakeStatus::Failure => match self.buffer.get(HANDSHAKE_STATUS_LEN) {
                Some(&message) => Err(ProtocolError::Handshake {
                    code: HandshakeStatus::Failure.code().to_string(),
                    message,
                }),
                None => Ok(None),
            },
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_handshake() {
        let encoded = Handshake::new("root", "pass123").encode();
        assert_eq!(&encoded[..], b"H\x00\x00\x00\x00\x00\x004\n7\nrootpass123");
        assert_eq!(&encoded[..7], &HANDSHAKE_PREAMBLE);
    }

    #[test]
    fn test_encode_uses_byte_lengths() {
        let encoded = Handshake::new("ü", "").encode();
        assert_eq!(&encoded[7..], "2\n0\nü".as_bytes());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", Handshake::new("root", "secret"));
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_success_ascii_and_raw() {
        for reply in [&b"H00"[..], &b"H\x00\x00"[..]] {
            let mut decoder = HandshakeDecoder::new();
            decoder.extend(reply);
            assert_eq!(decoder.decode().unwrap(), Some(()));
            assert_eq!(decoder.buffered(), 0);
        }
    }

    #[test]
    fn test_failure_carries_message() {
        let mut decoder = HandshakeDecoder::new();
        decoder.extend(b"H\x00\x01\x02");
        match decoder.decode() {
            Err(ProtocolError::Handshake { code, message }) => {
                assert_eq!(code, "H01");
                assert_eq!(message, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_partial_reply_suspends() {
        let mut decoder = HandshakeDecoder::new();
        decoder.extend(b"H0");
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.extend(b"1");
        // failure needs the message byte as well
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.extend(b"\x05");
        assert!(matches!(
            decoder.decode(),
            Err(ProtocolError::Handshake { message: 5, .. })
        ));
    }

    #[test]
    fn test_invalid_status() {
        assert!(matches!(
            parse_status(*b"X00"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_status(*b"H17"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert_eq!(parse_status(*b"H01").unwrap(), HandshakeStatus::Failure);
    }
}
