//! Wire type registry.
//!
//! Every value on the wire starts with a single tag byte. Requests and
//! responses use two different tag tables:
//!
//! ```text
//! parameters            responses
//! 0x00 null             0x00 null          0x0A f32
//! 0x01 bool             0x01 bool          0x0B f64
//! 0x02 unsigned         0x02..0x05 u8..u64 0x0C binary
//! 0x03 signed           0x06..0x09 i8..i64 0x0D string
//! 0x04 float                               0x0E list
//! 0x05 binary           0x10 error         0x11 row
//! 0x06 string           0x12 empty         0x13 multi-row
//! ```
//!
//! Numbers of every width travel as decimal ASCII terminated by `\n`; the
//! width only bounds the accepted range.

use crate::error::ProtocolError;

/// Tag bytes for query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamTag {
    Null = 0x00,
    Bool = 0x01,
    UInt = 0x02,
    SInt = 0x03,
    Float = 0x04,
    Binary = 0x05,
    String = 0x06,
}

impl ParamTag {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ParamTag {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x00 => ParamTag::Null,
            0x01 => ParamTag::Bool,
            0x02 => ParamTag::UInt,
            0x03 => ParamTag::SInt,
            0x04 => ParamTag::Float,
            0x05 => ParamTag::Binary,
            0x06 => ParamTag::String,
            other => return Err(ProtocolError::UnknownTag(other)),
        })
    }
}

/// Tag bytes for response values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Null = 0x00,
    Bool = 0x01,
    UInt8 = 0x02,
    UInt16 = 0x03,
    UInt32 = 0x04,
    UInt64 = 0x05,
    SInt8 = 0x06,
    SInt16 = 0x07,
    SInt32 = 0x08,
    SInt64 = 0x09,
    Float32 = 0x0A,
    Float64 = 0x0B,
    Binary = 0x0C,
    String = 0x0D,
    List = 0x0E,
    Error = 0x10,
    Row = 0x11,
    Empty = 0x12,
    MultiRow = 0x13,
}

/// Shape of the payload that follows a response tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// No payload.
    Nothing,
    /// Exactly one byte.
    Byte,
    /// Decimal ASCII up to `\n`.
    Line,
    /// `<size>\n` followed by `size` raw bytes.
    SizedBytes,
    /// `<count>\n` followed by `count` nested values.
    Elements,
    /// `<columns>\n` followed by `columns` values.
    Row,
    /// `<rows>\n<columns>\n` followed by `rows * columns` values.
    Table,
}

impl WireType {
    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn layout(self) -> Layout {
        match self {
            WireType::Null | WireType::Empty => Layout::Nothing,
            WireType::Bool | WireType::Error => Layout::Byte,
            WireType::UInt8
            | WireType::UInt16
            | WireType::UInt32
            | WireType::UInt64
            | WireType::SInt8
            | WireType::SInt16
            | WireType::SInt32
            | WireType::SInt64
            | WireType::Float32
            | WireType::Float64 => Layout::Line,
            WireType::Binary | WireType::String => Layout::SizedBytes,
            WireType::List => Layout::Elements,
            WireType::Row => Layout::Row,
            WireType::MultiRow => Layout::Table,
        }
    }

    /// Returns whether this tag may only appear as the first byte of a response.
    pub fn is_response_only(self) -> bool {
        matches!(
            self,
            WireType::Error | WireType::Row | WireType::Empty | WireType::MultiRow
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            WireType::UInt8 | WireType::UInt16 | WireType::UInt32 | WireType::UInt64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            WireType::SInt8 | WireType::SInt16 | WireType::SInt32 | WireType::SInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, WireType::Float32 | WireType::Float64)
    }

    /// Largest value an unsigned tag may carry.
    pub(crate) fn unsigned_max(self) -> u64 {
        match self {
            WireType::UInt8 => u8::MAX as u64,
            WireType::UInt16 => u16::MAX as u64,
            WireType::UInt32 => u32::MAX as u64,
            _ => u64::MAX,
        }
    }

    /// Inclusive range a signed tag may carry.
    pub(crate) fn signed_range(self) -> (i64, i64) {
        match self {
            WireType::SInt8 => (i8::MIN as i64, i8::MAX as i64),
            WireType::SInt16 => (i16::MIN as i64, i16::MAX as i64),
            WireType::SInt32 => (i32::MIN as i64, i32::MAX as i64),
            _ => (i64::MIN, i64::MAX),
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        Ok(match byte {
            0x00 => WireType::Null,
            0x01 => WireType::Bool,
            0x02 => WireType::UInt8,
            0x03 => WireType::UInt16,
            0x04 => WireType::UInt32,
            0x05 => WireType::UInt64,
            0x06 => WireType::SInt8,
            0x07 => WireType::SInt16,
            0x08 => WireType::SInt32,
            0x09 => WireType::SInt64,
            0x0A => WireType::Float32,
            0x0B => WireType::Float64,
            0x0C => WireType::Binary,
            0x0D => WireType::String,
            0x0E => WireType::List,
            0x10 => WireType::Error,
            0x11 => WireType::Row,
            0x12 => WireType::Empty,
            0x13 => WireType::MultiRow,
            other => return Err(ProtocolError::UnknownTag(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_byte_mapping() {
        for byte in (0x00..=0x0E).chain(0x10..=0x13) {
            let ty = WireType::try_from(byte).unwrap();
            assert_eq!(ty.byte(), byte);
        }
    }

    #[test]
    fn test_unknown_wire_tags() {
        for byte in [0x0F, 0x14, 0x7F, 0xFF] {
            assert!(matches!(
                WireType::try_from(byte),
                Err(ProtocolError::UnknownTag(b)) if b == byte
            ));
        }
    }

    #[test]
    fn test_param_tag_mapping() {
        for byte in 0x00..=0x06 {
            assert_eq!(ParamTag::try_from(byte).unwrap().byte(), byte);
        }
        assert!(ParamTag::try_from(0x07).is_err());
    }

    #[test]
    fn test_layouts() {
        assert_eq!(WireType::Null.layout(), Layout::Nothing);
        assert_eq!(WireType::Empty.layout(), Layout::Nothing);
        assert_eq!(WireType::Bool.layout(), Layout::Byte);
        assert_eq!(WireType::Error.layout(), Layout::Byte);
        assert_eq!(WireType::UInt16.layout(), Layout::Line);
        assert_eq!(WireType::SInt64.layout(), Layout::Line);
        assert_eq!(WireType::Float32.layout(), Layout::Line);
        assert_eq!(WireType::String.layout(), Layout::SizedBytes);
        assert_eq!(WireType::List.layout(), Layout::Elements);
        assert_eq!(WireType::Row.layout(), Layout::Row);
        assert_eq!(WireType::MultiRow.layout(), Layout::Table);
    }

    #[test]
    fn test_response_only_tags() {
        assert!(WireType::Row.is_response_only());
        assert!(WireType::MultiRow.is_response_only());
        assert!(WireType::Error.is_response_only());
        assert!(WireType::Empty.is_response_only());
        assert!(!WireType::List.is_response_only());
        assert!(!WireType::Null.is_response_only());
    }

    #[test]
    fn test_width_bounds() {
        assert_eq!(WireType::UInt8.unsigned_max(), 255);
        assert_eq!(WireType::UInt64.unsigned_max(), u64::MAX);
        assert_eq!(WireType::SInt16.signed_range(), (-32768, 32767));
        assert_eq!(WireType::SInt64.signed_range(), (i64::MIN, i64::MAX));
    }
}
