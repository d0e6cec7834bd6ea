//! Resumable response decoding.
//!
//! A response can arrive split at any byte. [`DecoderState`] walks the bytes
//! received so far and either completes the response or stops where the data
//! runs out, keeping everything it already learned:
//!
//! - a resolved size prefix (string, binary, list, row and table counts) is
//!   cached in its pending frame and never parsed twice;
//! - a partially scanned numeric line remembers how far it looked for `\n`;
//! - collections keep the elements decoded so far and continue at the next one.
//!
//! Nested values are tracked on an explicit stack of pending collections, so
//! deeply nested lists need no recursion.

use crate::error::ProtocolError;
use crate::types::{Layout, WireType};
use crate::value::{Response, Row, Table, Value};
use bytes::{Buf, Bytes, BytesMut};
use std::mem;

/// Read position inside the response bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    /// First unconsumed byte.
    pos: usize,
    /// Bytes after `pos` already searched for `\n`.
    scanned: usize,
}

impl Cursor {
    fn take_byte(&mut self, buf: &[u8]) -> Option<u8> {
        let byte = *buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take_line<'a>(&mut self, buf: &'a [u8]) -> Option<&'a [u8]> {
        let start = self.pos + self.scanned;
        let unscanned = buf.get(start..)?;
        match unscanned.iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = start + offset;
                let line = &buf[self.pos..end];
                self.pos = end + 1;
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = buf.len() - self.pos;
                None
            }
        }
    }

    fn take_bytes<'a>(&mut self, buf: &'a [u8], len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }
}

/// Something a finished frame hands to its parent.
#[derive(Debug)]
enum Output {
    Value(Value),
    Response(Response),
}

impl Output {
    fn into_response(self) -> Response {
        match self {
            Output::Value(value) => Response::Value(value),
            Output::Response(response) => response,
        }
    }
}

/// A scalar whose tag was read but whose payload is incomplete.
#[derive(Debug, Clone, PartialEq)]
enum Leaf {
    Bool,
    ErrorCode,
    Number(WireType),
    Sized { ty: WireType, size: Option<usize> },
}

impl Leaf {
    fn poll(&mut self, cursor: &mut Cursor, buf: &[u8]) -> Result<Option<Value>, ProtocolError> {
        match self {
            Leaf::Bool => match cursor.take_byte(buf) {
                None => Ok(None),
                Some(0) => Ok(Some(Value::Bool(false))),
                Some(1) => Ok(Some(Value::Bool(true))),
                Some(other) => Err(ProtocolError::malformed(format!(
                    "invalid boolean byte {other:#04x}"
                ))),
            },
            Leaf::ErrorCode => match cursor.take_byte(buf) {
                None => Ok(None),
                Some(code) => Err(ProtocolError::ResponseError(code)),
            },
            Leaf::Number(ty) => match cursor.take_line(buf) {
                None => Ok(None),
                Some(line) => parse_number(*ty, line).map(Some),
            },
            Leaf::Sized { ty, size } => {
                let Some(len) = resolve_size(size, cursor, buf)? else {
                    return Ok(None);
                };
                let Some(body) = cursor.take_bytes(buf, len) else {
                    return Ok(None);
                };
                Ok(Some(match ty {
                    WireType::String => Value::Text(String::from_utf8_lossy(body).into_owned()),
                    _ => Value::Binary(body.to_vec()),
                }))
            }
        }
    }

    fn pending_size(&self) -> Option<usize> {
        match self {
            Leaf::Sized { size, .. } => *size,
            _ => None,
        }
    }
}

/// What a pending collection needs next.
enum Step {
    Suspend,
    NextElement,
    Complete(Output),
}

/// A collection still waiting for elements.
#[derive(Debug, Clone, PartialEq)]
enum Container {
    List {
        len: Option<usize>,
        items: Vec<Value>,
    },
    Row {
        columns: Option<usize>,
        values: Vec<Value>,
    },
    Table {
        rows: Option<usize>,
        columns: Option<usize>,
        done: Vec<Row>,
        current: Vec<Value>,
    },
}

impl Container {
    fn poll(&mut self, cursor: &mut Cursor, buf: &[u8]) -> Result<Step, ProtocolError> {
        match self {
            Container::List { len, items } => {
                let Some(len) = resolve_size(len, cursor, buf)? else {
                    return Ok(Step::Suspend);
                };
                if items.len() == len {
                    return Ok(Step::Complete(Output::Value(Value::List(mem::take(items)))));
                }
            }
            Container::Row { columns, values } => {
                let Some(columns) = resolve_size(columns, cursor, buf)? else {
                    return Ok(Step::Suspend);
                };
                if values.len() == columns {
                    let row = Row::new(mem::take(values));
                    return Ok(Step::Complete(Output::Response(Response::Row(row))));
                }
            }
            Container::Table {
                rows,
                columns,
                done,
                current,
            } => {
                let Some(row_count) = resolve_size(rows, cursor, buf)? else {
                    return Ok(Step::Suspend);
                };
                if row_count == 0 {
                    return Ok(Step::Complete(Output::Response(Response::Table(
                        Table::default(),
                    ))));
                }
                let Some(column_count) = resolve_size(columns, cursor, buf)? else {
                    return Ok(Step::Suspend);
                };
                if column_count == 0 {
                    let table = Table::with_empty_rows(row_count);
                    return Ok(Step::Complete(Output::Response(Response::Table(table))));
                }
                if done.len() == row_count {
                    let table = Table::new(column_count, mem::take(done));
                    return Ok(Step::Complete(Output::Response(Response::Table(table))));
                }
                debug_assert!(current.len() < column_count);
            }
        }
        Ok(Step::NextElement)
    }

    fn accept(&mut self, value: Value) {
        match self {
            Container::List { items, .. } => items.push(value),
            Container::Row { values, .. } => values.push(value),
            Container::Table {
                columns,
                done,
                current,
                ..
            } => {
                current.push(value);
                if Some(current.len()) == *columns {
                    done.push(Row::new(mem::take(current)));
                }
            }
        }
    }

    fn pending_size(&self) -> Option<usize> {
        match self {
            Container::List { len, .. } => *len,
            Container::Row { columns, .. } => *columns,
            Container::Table { rows, .. } => *rows,
        }
    }
}

/// The result of reading a tag.
enum Opened {
    Leaf(Leaf),
    Container(Container),
    Done(Output),
}

fn open(ty: WireType) -> Opened {
    match ty.layout() {
        Layout::Nothing if ty == WireType::Empty => Opened::Done(Output::Response(Response::Empty)),
        Layout::Nothing => Opened::Done(Output::Value(Value::Null)),
        Layout::Byte if ty == WireType::Error => Opened::Leaf(Leaf::ErrorCode),
        Layout::Byte => Opened::Leaf(Leaf::Bool),
        Layout::Line => Opened::Leaf(Leaf::Number(ty)),
        Layout::SizedBytes => Opened::Leaf(Leaf::Sized { ty, size: None }),
        Layout::Elements => Opened::Container(Container::List {
            len: None,
            items: Vec::new(),
        }),
        Layout::Row => Opened::Container(Container::Row {
            columns: None,
            values: Vec::new(),
        }),
        Layout::Table => Opened::Container(Container::Table {
            rows: None,
            columns: None,
            done: Vec::new(),
            current: Vec::new(),
        }),
    }
}

/// Returns the cached size, or parses and caches it once its line is complete.
fn resolve_size(
    slot: &mut Option<usize>,
    cursor: &mut Cursor,
    buf: &[u8],
) -> Result<Option<usize>, ProtocolError> {
    if slot.is_none() {
        if let Some(line) = cursor.take_line(buf) {
            *slot = Some(parse_size(line)?);
        }
    }
    Ok(*slot)
}

/// Parses a decimal size prefix.
///
/// One leading unsigned integer tag (`0x02..=0x05`) is tolerated in front
/// of the digits.
fn parse_size(line: &[u8]) -> Result<usize, ProtocolError> {
    let digits = match line.first() {
        Some(0x02..=0x05) => &line[1..],
        _ => line,
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid_line("size prefix", line));
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| invalid_line("size prefix", line))
}

fn parse_number(ty: WireType, line: &[u8]) -> Result<Value, ProtocolError> {
    let text = std::str::from_utf8(line).map_err(|_| invalid_line("number", line))?;

    if ty.is_unsigned() {
        let n: u64 = text.parse().map_err(|_| invalid_line("unsigned integer", line))?;
        if n > ty.unsigned_max() {
            return Err(out_of_range(ty, text));
        }
        Ok(Value::UInt(n))
    } else if ty.is_signed() {
        let n: i64 = text.parse().map_err(|_| invalid_line("signed integer", line))?;
        let (min, max) = ty.signed_range();
        if n < min || n > max {
            return Err(out_of_range(ty, text));
        }
        Ok(Value::SInt(n))
    } else if ty == WireType::Float32 {
        let f: f32 = text.parse().map_err(|_| invalid_line("float", line))?;
        Ok(Value::Float(f64::from(f)))
    } else {
        let f: f64 = text.parse().map_err(|_| invalid_line("float", line))?;
        Ok(Value::Float(f))
    }
}

fn invalid_line(what: &str, line: &[u8]) -> ProtocolError {
    ProtocolError::malformed(format!(
        "invalid {what} {:?}",
        String::from_utf8_lossy(line)
    ))
}

fn out_of_range(ty: WireType, text: &str) -> ProtocolError {
    ProtocolError::malformed(format!("value {text} out of range for {ty:?}"))
}

/// Progress of one response decode.
///
/// `resume` must be called with the bytes of the response from its first
/// byte on; between calls the slice may only grow at the end. The state
/// remembers where it stopped, so each call only looks at new bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderState {
    cursor: Cursor,
    containers: Vec<Container>,
    leaf: Option<Leaf>,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues decoding over `buf`.
    ///
    /// Returns `Ok(Some(response))` when the response is complete,
    /// `Ok(None)` when more bytes are needed, or `Err` on a malformed frame
    /// or a server error.
    pub fn resume(&mut self, buf: &[u8]) -> Result<Option<Response>, ProtocolError> {
        loop {
            if let Some(leaf) = self.leaf.as_mut() {
                let Some(value) = leaf.poll(&mut self.cursor, buf)? else {
                    return Ok(None);
                };
                self.leaf = None;
                if let Some(response) = self.deliver(Output::Value(value))? {
                    return Ok(Some(response));
                }
                continue;
            }

            let nested = match self.containers.last_mut() {
                None => false,
                Some(container) => match container.poll(&mut self.cursor, buf)? {
                    Step::Suspend => return Ok(None),
                    Step::NextElement => true,
                    Step::Complete(output) => {
                        self.containers.pop();
                        if let Some(response) = self.deliver(output)? {
                            return Ok(Some(response));
                        }
                        continue;
                    }
                },
            };

            let Some(tag) = self.cursor.take_byte(buf) else {
                return Ok(None);
            };
            let ty = WireType::try_from(tag)?;
            if nested && ty.is_response_only() {
                return Err(ProtocolError::malformed(format!(
                    "{ty:?} tag inside a collection"
                )));
            }

            match open(ty) {
                Opened::Leaf(leaf) => self.leaf = Some(leaf),
                Opened::Container(container) => self.containers.push(container),
                Opened::Done(output) => {
                    if let Some(response) = self.deliver(output)? {
                        return Ok(Some(response));
                    }
                }
            }
        }
    }

    /// Hands a finished value to the innermost collection, or finishes the
    /// response when there is none.
    fn deliver(&mut self, output: Output) -> Result<Option<Response>, ProtocolError> {
        match (self.containers.last_mut(), output) {
            (None, output) => Ok(Some(output.into_response())),
            (Some(parent), Output::Value(value)) => {
                parent.accept(value);
                Ok(None)
            }
            (Some(_), Output::Response(_)) => Err(ProtocolError::malformed(
                "response nested inside a collection",
            )),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor.pos
    }

    /// Returns whether no value has been started.
    pub fn is_idle(&self) -> bool {
        self.leaf.is_none() && self.containers.is_empty()
    }

    /// Number of values currently in progress, outermost included.
    pub fn depth(&self) -> usize {
        self.containers.len() + usize::from(self.leaf.is_some())
    }

    /// The size prefix resolved for the innermost value in progress, if any.
    ///
    /// For a table this is the row count.
    pub fn pending_size(&self) -> Option<usize> {
        match &self.leaf {
            Some(leaf) => leaf.pending_size(),
            None => self.containers.last().and_then(Container::pending_size),
        }
    }
}

/// Decodes responses from byte chunks as they arrive.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    buffer: BytesMut,
    state: DecoderState,
    consumed: usize,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            state: DecoderState::new(),
            consumed: 0,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Appends bytes to the internal buffer.
    pub fn extend_bytes(&mut self, data: Bytes) {
        self.buffer.extend_from_slice(&data);
    }

    /// Attempts to decode the pending response.
    ///
    /// On completion the response's bytes are dropped from the buffer and the
    /// decoder is ready for the next response. A server error also consumes
    /// its frame; after any other error the decoder must be discarded.
    pub fn decode(&mut self) -> Result<Option<Response>, ProtocolError> {
        match self.state.resume(&self.buffer) {
            Ok(Some(response)) => {
                self.finish();
                Ok(Some(response))
            }
            Ok(None) => Ok(None),
            Err(err @ ProtocolError::ResponseError(_)) => {
                self.finish();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn finish(&mut self) {
        self.consumed = self.state.position();
        self.buffer.advance(self.consumed);
        self.state = DecoderState::new();
    }

    /// Length in bytes of the last completed response.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Drops buffered bytes and any partial progress.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::new();
        self.consumed = 0;
    }
}

/// Decodes one complete response from `bytes`.
///
/// Returns the response and the number of bytes it occupied, or `None` if
/// `bytes` ends before the response does.
pub fn decode_response(bytes: &[u8]) -> Result<Option<(Response, usize)>, ProtocolError> {
    let mut state = DecoderState::new();
    Ok(state
        .resume(bytes)?
        .map(|response| (response, state.position())))
}

/// Decodes one value (not a row, table or empty response) from `bytes`.
pub fn decode_value(bytes: &[u8]) -> Result<Option<(Value, usize)>, ProtocolError> {
    match decode_response(bytes)? {
        None => Ok(None),
        Some((Response::Value(value), used)) => Ok(Some((value, used))),
        Some((other, _)) => Err(ProtocolError::malformed(format!(
            "expected a value, found a {} response",
            other.kind()
        ))),
    }
}
