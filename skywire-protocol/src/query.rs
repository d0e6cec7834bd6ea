//! Query request framing.
//!
//! ```text
//! 'S' <envelope_len> '\n' <query_len> '\n' <query> <param>*
//! ```
//!
//! `envelope_len` counts every byte after its own newline: the query length
//! digits and newline, the query text, and the encoded parameters.

use crate::error::ProtocolError;
use crate::param::{encode_params, Param};
use crate::value::put_line;
use bytes::{BufMut, BytesMut};

/// First byte of every query request.
pub const QUERY_MARKER: u8 = b'S';

/// A query string with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    params: Vec<Param>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn push_param(&mut self, param: impl Into<Param>) {
        self.params.push(param.into());
    }

    /// Appends a parameter, builder style.
    pub fn bind(mut self, param: impl Into<Param>) -> Self {
        self.push_param(param);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Number of parameters pushed so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Length of the query text in bytes.
    pub fn query_len(&self) -> usize {
        self.text.len()
    }

    /// Serializes the full request frame.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        serialize(&self.text, &self.params)
    }
}

/// Serializes `text` and `params` into a request frame.
///
/// Parameters are validated before anything is written.
pub fn serialize(text: &str, params: &[Param]) -> Result<BytesMut, ProtocolError> {
    let encoded_params = encode_params(params)?;

    let query_len = text.len().to_string();
    let envelope_len = query_len.len() + 1 + text.len() + encoded_params.len();
    let envelope_digits = envelope_len.to_string();

    let mut buf = BytesMut::with_capacity(1 + envelope_digits.len() + 1 + envelope_len);
    buf.put_u8(QUERY_MARKER);
    put_line(&mut buf, envelope_digits);
    put_line(&mut buf, query_len);
    buf.put_slice(text.as_bytes());
    buf.put_slice(&encoded_params);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_with_unsigned_param() {
        let query = Query::new("SELECT * FROM t WHERE id = ?").bind(1u64);
        let encoded = query.encode().unwrap();
        assert_eq!(&encoded[..], b"S34\n28\nSELECT * FROM t WHERE id = ?\x021\n");
    }

    #[test]
    fn test_envelope_length_matches_payload() {
        let query = Query::new("INSERT INTO users(?, ?, ?)")
            .bind("tést")
            .bind(-12i64)
            .bind(None::<String>);
        let encoded = query.encode().unwrap();

        let first_newline = encoded.iter().position(|&b| b == b'\n').unwrap();
        let envelope_len: usize = std::str::from_utf8(&encoded[1..first_newline])
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(encoded[0], QUERY_MARKER);
        assert_eq!(envelope_len, encoded.len() - first_newline - 1);
    }

    #[test]
    fn test_query_without_params() {
        let encoded = serialize("sysctl report status", &[]).unwrap();
        assert_eq!(&encoded[..], b"S23\n20\nsysctl report status");
    }

    #[test]
    fn test_multibyte_query_uses_byte_length() {
        let query = Query::new("é");
        assert_eq!(query.query_len(), 2);
        assert_eq!(&query.encode().unwrap()[..], "S4\n2\né".as_bytes());
    }

    #[test]
    fn test_envelope_digit_count_grows() {
        let text = "x".repeat(120);
        let encoded = serialize(&text, &[]).unwrap();
        assert!(encoded.starts_with(b"S124\n120\n"));
    }

    #[test]
    fn test_param_count() {
        let mut query = Query::new("INSERT INTO t(?, [?])");
        assert_eq!(query.param_count(), 0);
        query.push_param(1u8);
        query.push_param(Param::list(["test"]));
        assert_eq!(query.param_count(), 2);
        assert_eq!(query.params()[1], Param::List(vec![Param::Text("test".into())]));
    }

    #[test]
    fn test_unsupported_param_fails_without_output() {
        let query = Query::new("SELECT ?").bind(f64::NAN);
        assert!(matches!(
            query.encode(),
            Err(ProtocolError::UnsupportedParameterType(_))
        ));
    }
}
