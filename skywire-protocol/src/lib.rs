//! # skywire-protocol
//!
//! Client side of the Skyhash wire protocol.
//!
//! This crate provides:
//! - Query framing with tagged positional parameters
//! - The authentication handshake frame and reply parsing
//! - A resumable response decoder that accepts bytes in arbitrary chunks
//! - Row and multi-row assembly of decoded values
//!
//! It performs no I/O; the `skywire-client` crate drives it over a socket.

pub mod decode;
pub mod error;
pub mod handshake;
pub mod param;
pub mod query;
pub mod types;
pub mod value;

pub use decode::{decode_response, decode_value, DecoderState, ResponseDecoder};
pub use error::ProtocolError;
pub use handshake::{
    parse_status, Handshake, HandshakeDecoder, HandshakeStatus, HANDSHAKE_PREAMBLE,
};
pub use param::{encode_param, encode_params, Param};
pub use query::{serialize, Query, QUERY_MARKER};
pub use types::{Layout, ParamTag, WireType};
pub use value::{Response, Row, Table, TableRows, Value};

/// Default port of the database server.
pub const DEFAULT_PORT: u16 = 2003;

/// Default host of the database server.
pub const DEFAULT_HOST: &str = "127.0.0.1";
