//! Query parameters and their wire encoding.
//!
//! ```text
//! null     0x00
//! bool     0x01 <0x00|0x01>
//! unsigned 0x02 <decimal>\n
//! signed   0x03 <decimal>\n
//! float    0x04 <decimal>\n
//! binary   0x05 <len>\n<bytes>
//! string   0x06 <byte len>\n<utf-8 bytes>
//! ```
//!
//! A list parameter has no wrapper of its own: it is written as the
//! concatenation of its elements.

use crate::error::ProtocolError;
use crate::types::ParamTag;
use crate::value::{put_line, Value};
use bytes::{BufMut, BytesMut};

/// A query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    UInt(u64),
    SInt(i64),
    Float(f64),
    Binary(Vec<u8>),
    Text(String),
    List(Vec<Param>),
}

/// The numeric domain a number parameter is sent in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

/// 2^64 and -2^63, the bounds of integral floats sent as integers.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;
const I64_FLOOR: f64 = -9_223_372_036_854_775_808.0;

impl Number {
    fn from_float(f: f64) -> Self {
        if f.fract() != 0.0 {
            Number::Float(f)
        } else if (0.0..U64_BOUND).contains(&f) {
            Number::Unsigned(f as u64)
        } else if (I64_FLOOR..0.0).contains(&f) {
            Number::Signed(f as i64)
        } else {
            Number::Float(f)
        }
    }

    fn from_signed(n: i64) -> Self {
        if n < 0 {
            Number::Signed(n)
        } else {
            Number::Unsigned(n as u64)
        }
    }
}

impl Param {
    /// Builds a list parameter from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Param>,
    {
        Param::List(items.into_iter().map(Into::into).collect())
    }

    /// Checks that this parameter can be represented on the wire.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Param::Float(f) if !f.is_finite() => Err(ProtocolError::UnsupportedParameterType(
                format!("non-finite float {f}"),
            )),
            Param::List(items) => items.iter().try_for_each(Param::validate),
            _ => Ok(()),
        }
    }

    /// Number of wire values this parameter expands to.
    pub fn wire_count(&self) -> usize {
        match self {
            Param::List(items) => items.iter().map(Param::wire_count).sum(),
            _ => 1,
        }
    }

    /// Appends the tagged encoding of this parameter.
    ///
    /// Nothing is written when the parameter fails validation.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), ProtocolError> {
        self.validate()?;
        self.put(buf);
        Ok(())
    }

    fn put(&self, buf: &mut BytesMut) {
        match self {
            Param::Null => buf.put_u8(ParamTag::Null.byte()),
            Param::Bool(b) => {
                buf.put_u8(ParamTag::Bool.byte());
                buf.put_u8(u8::from(*b));
            }
            Param::UInt(n) => put_number(buf, Number::Unsigned(*n)),
            Param::SInt(n) => put_number(buf, Number::from_signed(*n)),
            Param::Float(f) => put_number(buf, Number::from_float(*f)),
            Param::Binary(bytes) => {
                buf.put_u8(ParamTag::Binary.byte());
                put_line(buf, bytes.len());
                buf.put_slice(bytes);
            }
            Param::Text(text) => {
                buf.put_u8(ParamTag::String.byte());
                put_line(buf, text.len());
                buf.put_slice(text.as_bytes());
            }
            Param::List(items) => {
                for item in items {
                    item.put(buf);
                }
            }
        }
    }
}

fn put_number(buf: &mut BytesMut, number: Number) {
    match number {
        Number::Unsigned(n) => {
            buf.put_u8(ParamTag::UInt.byte());
            put_line(buf, n);
        }
        Number::Signed(n) => {
            buf.put_u8(ParamTag::SInt.byte());
            put_line(buf, n);
        }
        Number::Float(f) => {
            buf.put_u8(ParamTag::Float.byte());
            put_line(buf, f);
        }
    }
}

/// Appends the tagged encoding of `param` to `buf`.
pub fn encode_param(param: &Param, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    param.encode(buf)
}

/// Encodes every parameter in order into a fresh buffer.
///
/// All parameters are validated before the first byte is written.
pub fn encode_params(params: &[Param]) -> Result<BytesMut, ProtocolError> {
    params.iter().try_for_each(Param::validate)?;
    let mut buf = BytesMut::new();
    for param in params {
        param.put(&mut buf);
    }
    Ok(buf)
}

/// The value a server hands back for a stored parameter, after the same
/// numeric inference the encoder applies.
impl From<Param> for Value {
    fn from(param: Param) -> Self {
        let number = match param {
            Param::Null => return Value::Null,
            Param::Bool(b) => return Value::Bool(b),
            Param::Binary(bytes) => return Value::Binary(bytes),
            Param::Text(text) => return Value::Text(text),
            Param::List(items) => {
                return Value::List(items.into_iter().map(Value::from).collect())
            }
            Param::UInt(n) => Number::Unsigned(n),
            Param::SInt(n) => Number::from_signed(n),
            Param::Float(f) => Number::from_float(f),
        };
        match number {
            Number::Unsigned(n) => Value::UInt(n),
            Number::Signed(n) => Value::SInt(n),
            Number::Float(f) => Value::Float(f),
        }
    }
}

macro_rules! unsigned_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Param {
            fn from(n: $ty) -> Self {
                Param::UInt(n as u64)
            }
        })*
    };
}

macro_rules! signed_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Param {
            fn from(n: $ty) -> Self {
                if n < 0 {
                    Param::SInt(n as i64)
                } else {
                    Param::UInt(n as u64)
                }
            }
        })*
    };
}

unsigned_param!(u8, u16, u32, u64, usize);
signed_param!(i8, i16, i32, i64, isize);

impl From<f64> for Param {
    fn from(f: f64) -> Self {
        Param::Float(f)
    }
}

impl From<f32> for Param {
    fn from(f: f32) -> Self {
        Param::Float(f64::from(f))
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<&String> for Param {
    fn from(s: &String) -> Self {
        Param::Text(s.clone())
    }
}

impl From<&[u8]> for Param {
    fn from(bytes: &[u8]) -> Self {
        Param::Binary(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Param {
    fn from(bytes: Vec<u8>) -> Self {
        Param::Binary(bytes)
    }
}

impl From<bytes::Bytes> for Param {
    fn from(bytes: bytes::Bytes) -> Self {
        Param::Binary(bytes.to_vec())
    }
}

impl From<Vec<Param>> for Param {
    fn from(items: Vec<Param>) -> Self {
        Param::List(items)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Param::Null, Into::into)
    }
}

impl TryFrom<serde_json::Value> for Param {
    type Error = ProtocolError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;

        Ok(match json {
            Json::Null => Param::Null,
            Json::Bool(b) => Param::Bool(b),
            Json::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Param::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Param::SInt(i)
                } else if let Some(f) = n.as_f64() {
                    Param::Float(f)
                } else {
                    return Err(ProtocolError::UnsupportedParameterType(format!(
                        "number {n}"
                    )));
                }
            }
            Json::String(s) => Param::Text(s),
            Json::Array(items) => Param::List(
                items
                    .into_iter()
                    .map(Param::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Json::Object(_) => {
                return Err(ProtocolError::UnsupportedParameterType(
                    "object".to_string(),
                ))
            }
        })
    }
}
