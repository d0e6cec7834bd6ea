//! High-level client API.

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::transport::Transport;
use skywire_protocol::{Query, Response, Row, Table, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

/// Shared handle to one server session.
///
/// Clones share the same connection; concurrent callers are serialized so
/// that responses always pair with the query that caused them. A connection
/// that lost alignment is dropped and later calls fail with
/// [`ClientError::NotConnected`] until [`Client::connect`] is called again.
pub struct Client<S = Transport> {
    config: ConnectionConfig,
    conn: Arc<Mutex<Option<Connection<S>>>>,
}

impl<S> Clone for Client<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            conn: Arc::clone(&self.conn),
        }
    }
}

impl Client<Transport> {
    /// Creates a client; no connection is made until [`Client::connect`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Connects and authenticates, replacing any existing connection.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let conn = Connection::connect(self.config.clone()).await?;
        if let Some(mut old) = self.conn.lock().await.replace(conn) {
            old.close().await?;
        }
        Ok(())
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established connection.
    pub fn from_connection(conn: Connection<S>) -> Self {
        Self {
            config: conn.config().clone(),
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns whether a usable connection is held.
    pub async fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .await
            .as_ref()
            .is_some_and(Connection::is_connected)
    }

    /// Runs a query and returns the raw response.
    pub async fn query(&self, query: &Query) -> Result<Response, ClientError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let result = conn.query(query).await;
        if conn.is_poisoned() {
            tracing::debug!("Dropping unusable connection to {}", self.config.endpoint());
            *guard = None;
        }
        result
    }

    /// Runs a statement that returns no data.
    pub async fn execute(&self, query: &Query) -> Result<(), ClientError> {
        match self.query(query).await? {
            Response::Empty => Ok(()),
            other => Err(unexpected("empty", &other)),
        }
    }

    /// Runs a query expected to return a single row.
    pub async fn query_row(&self, query: &Query) -> Result<Row, ClientError> {
        match self.query(query).await? {
            Response::Row(row) => Ok(row),
            other => Err(unexpected("row", &other)),
        }
    }

    /// Runs a query expected to return multiple rows.
    pub async fn query_rows(&self, query: &Query) -> Result<Table, ClientError> {
        match self.query(query).await? {
            Response::Table(table) => Ok(table),
            other => Err(unexpected("multi-row", &other)),
        }
    }

    /// Runs a command that answers with a bare value.
    pub async fn query_value(&self, query: &Query) -> Result<Value, ClientError> {
        match self.query(query).await? {
            Response::Value(value) => Ok(value),
            other => Err(unexpected("value", &other)),
        }
    }

    /// Closes the connection, if any.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(mut conn) = self.conn.lock().await.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn unexpected(expected: &'static str, found: &Response) -> ClientError {
    ClientError::UnexpectedResponse {
        expected,
        found: found.kind(),
    }
}
