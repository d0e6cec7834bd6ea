//! # skywire-client
//!
//! Async client for Skyhash servers.
//!
//! This crate provides:
//! - TCP connections with optional TLS (`rustls`)
//! - The authentication handshake
//! - Sequential query execution with per-request timeouts
//! - A cloneable, shared [`Client`] with typed result helpers

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod tls;
pub mod transport;

pub use client::Client;
pub use config::{ConnectionConfig, TlsClientConfig};
pub use connection::Connection;
pub use error::ClientError;
pub use transport::Transport;

pub use skywire_protocol::{Param, Query, Response, Row, Table, Value};
