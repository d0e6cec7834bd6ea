//! Decoded values and response shapes.

use crate::types::WireType;
use bytes::{BufMut, BytesMut};
use serde::Serialize;
use std::fmt::Display;
use std::ops::Index;

/// A single decoded value.
///
/// Integer widths are collapsed: every unsigned tag decodes to `UInt`, every
/// signed tag to `SInt`, both floats to `Float`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    UInt(u64),
    SInt(i64),
    Float(f64),
    Binary(Vec<u8>),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            Value::SInt(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SInt(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Writes this value using response tags.
    ///
    /// Integers and floats use their 64-bit tags and lists carry their own
    /// element count.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Value::Null => buf.put_u8(WireType::Null.byte()),
            Value::Bool(b) => {
                buf.put_u8(WireType::Bool.byte());
                buf.put_u8(u8::from(*b));
            }
            Value::UInt(n) => {
                buf.put_u8(WireType::UInt64.byte());
                put_line(buf, n);
            }
            Value::SInt(n) => {
                buf.put_u8(WireType::SInt64.byte());
                put_line(buf, n);
            }
            Value::Float(f) => {
                buf.put_u8(WireType::Float64.byte());
                put_line(buf, f);
            }
            Value::Binary(bytes) => {
                buf.put_u8(WireType::Binary.byte());
                put_line(buf, bytes.len());
                buf.put_slice(bytes);
            }
            Value::Text(text) => {
                buf.put_u8(WireType::String.byte());
                put_line(buf, text.len());
                buf.put_slice(text.as_bytes());
            }
            Value::List(items) => {
                buf.put_u8(WireType::List.byte());
                put_line(buf, items.len());
                for item in items {
                    item.encode(buf);
                }
            }
        }
    }
}

/// Writes `value` as decimal ASCII followed by `\n`.
pub(crate) fn put_line(buf: &mut BytesMut, value: impl Display) {
    buf.put_slice(value.to_string().as_bytes());
    buf.put_u8(b'\n');
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::SInt(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// One row of a result: a fixed number of column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn encode_values(&self, buf: &mut BytesMut) {
        for value in &self.values {
            value.encode(buf);
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, column: usize) -> &Value {
        &self.values[column]
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// A multi-row result sharing one column count.
///
/// Rows of a zero-column table carry no bytes on the wire, so they are
/// counted rather than stored: `rows()` is empty for such a table while
/// `row_count()` reports what the server declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    column_count: usize,
    row_count: usize,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(column_count: usize, rows: Vec<Row>) -> Self {
        Self {
            column_count,
            row_count: rows.len(),
            rows,
        }
    }

    /// A table of `row_count` rows with no columns.
    pub fn with_empty_rows(row_count: usize) -> Self {
        Self {
            column_count: 0,
            row_count,
            rows: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for Table {
    type Item = Row;
    type IntoIter = TableRows;

    fn into_iter(self) -> Self::IntoIter {
        TableRows {
            padding: self.row_count - self.rows.len(),
            rows: self.rows.into_iter(),
        }
    }
}

/// Owning iterator over a table's rows, yielding counted empty rows last.
#[derive(Debug)]
pub struct TableRows {
    rows: std::vec::IntoIter<Row>,
    padding: usize,
}

impl Iterator for TableRows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if let Some(row) = self.rows.next() {
            return Some(row);
        }
        if self.padding == 0 {
            return None;
        }
        self.padding -= 1;
        Some(Row::default())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.rows.len().saturating_add(self.padding);
        (len, Some(len))
    }
}

/// A fully decoded server response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// Success with nothing to return.
    Empty,
    Row(Row),
    Table(Table),
    /// A bare value for non-tabular commands.
    Value(Value),
}

impl Response {
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    /// Short name of the response shape, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Empty => "empty",
            Response::Row(_) => "row",
            Response::Table(_) => "multi-row",
            Response::Value(_) => "value",
        }
    }

    /// Writes this response as a server would send it.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Response::Empty => buf.put_u8(WireType::Empty.byte()),
            Response::Row(row) => {
                buf.put_u8(WireType::Row.byte());
                put_line(buf, row.len());
                row.encode_values(buf);
            }
            Response::Table(table) => {
                buf.put_u8(WireType::MultiRow.byte());
                put_line(buf, table.row_count());
                if table.is_empty() {
                    return;
                }
                put_line(buf, table.column_count());
                for row in table.rows() {
                    row.encode_values(buf);
                }
            }
            Response::Value(value) => value.encode(buf),
        }
    }

    /// Encodes a server error response.
    pub fn encode_error(code: u8, buf: &mut BytesMut) {
        buf.put_u8(WireType::Error.byte());
        buf.put_u8(code);
    }
}
