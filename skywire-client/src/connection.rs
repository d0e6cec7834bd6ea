//! Connection management.

use crate::config::{ConnectionConfig, MAX_READ_BUFFER_SIZE, MIN_READ_BUFFER_SIZE};
use crate::error::{from_decode, ClientError};
use crate::transport::Transport;
use skywire_protocol::{
    Handshake, HandshakeDecoder, ProtocolError, Query, Response, ResponseDecoder,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// An authenticated session with the server.
///
/// Requests are strictly sequential: each query writes one frame and reads
/// exactly one response before returning. After an I/O failure, timeout or
/// malformed frame the connection is poisoned and refuses further queries.
pub struct Connection<S = Transport> {
    stream: Option<S>,
    config: ConnectionConfig,
    read_buf: Vec<u8>,
    poisoned: bool,
}

impl Connection<Transport> {
    /// Opens a TCP (and optionally TLS) stream and performs the handshake.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let endpoint = config.endpoint();
        tracing::debug!("Connecting to {}...", endpoint);

        let transport = tokio::time::timeout(config.connect_timeout, Transport::open(&config))
            .await
            .map_err(|_| {
                tracing::debug!("Connection to {} timed out", endpoint);
                ClientError::Timeout
            })??;

        Self::establish(transport, config).await
    }

    /// Returns whether the underlying stream is TLS-encrypted.
    pub fn is_tls(&self) -> bool {
        self.stream.as_ref().is_some_and(Transport::is_tls)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates over an already open stream.
    pub async fn establish(mut stream: S, config: ConnectionConfig) -> Result<Self, ClientError> {
        let buffer_size = config
            .read_buffer_size
            .clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        let mut read_buf = vec![0u8; buffer_size];
        let handshake = Handshake::new(&config.username, &config.password);

        tracing::debug!("Starting handshake as {}", handshake.username());
        tokio::time::timeout(
            config.connect_timeout,
            perform_handshake(&mut stream, &handshake, &mut read_buf),
        )
        .await??;
        tracing::debug!("Handshake complete");

        Ok(Self {
            stream: Some(stream),
            config,
            read_buf,
            poisoned: false,
        })
    }

    /// Runs one query and returns its response.
    ///
    /// A server error is returned as [`ClientError::Server`] and leaves the
    /// connection usable.
    pub async fn query(&mut self, query: &Query) -> Result<Response, ClientError> {
        if self.poisoned {
            return Err(ClientError::Poisoned);
        }
        let frame = query.encode()?;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        tracing::debug!(
            "Sending query ({} bytes, {} params)",
            frame.len(),
            query.param_count()
        );
        let result = tokio::time::timeout(
            self.config.request_timeout,
            exchange(stream, &frame, &mut self.read_buf),
        )
        .await
        .unwrap_or(Err(ClientError::Timeout));

        match &result {
            Ok(response) => tracing::debug!("Received {} response", response.kind()),
            Err(err) if err.poisons_connection() => {
                tracing::warn!("Connection unusable after error: {}", err);
                self.poisoned = true;
            }
            Err(err) => tracing::debug!("Query failed: {}", err),
        }
        result
    }

    /// Returns whether queries can be sent.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some() && !self.poisoned
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Shuts down the write side and drops the stream.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!("Closing connection");
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("Shutdown failed: {}", e);
            }
        }
        Ok(())
    }
}

async fn perform_handshake<S>(
    stream: &mut S,
    handshake: &Handshake,
    buf: &mut [u8],
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&handshake.encode()).await?;
    stream.flush().await?;

    let mut decoder = HandshakeDecoder::new();
    loop {
        let n = stream.read(buf).await?;
        if n == 0 {
            tracing::debug!("Connection closed during handshake");
            return Err(ClientError::ConnectionClosed);
        }
        decoder.extend(&buf[..n]);

        if decoder.decode()?.is_some() {
            return match decoder.buffered() {
                0 => Ok(()),
                extra => Err(trailing_bytes(extra)),
            };
        }
    }
}

async fn exchange<S>(stream: &mut S, frame: &[u8], buf: &mut [u8]) -> Result<Response, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(frame).await?;
    stream.flush().await?;

    let mut decoder = ResponseDecoder::new();
    loop {
        let n = stream.read(buf).await?;
        if n == 0 {
            tracing::debug!("Connection closed mid-response");
            return Err(ClientError::ConnectionClosed);
        }
        decoder.extend(&buf[..n]);

        match decoder.decode() {
            Ok(None) => {
                tracing::debug!("Buffered {} bytes, waiting for more", decoder.buffered());
            }
            Ok(Some(response)) => {
                ensure_drained(&decoder)?;
                return Ok(response);
            }
            Err(err @ ProtocolError::ResponseError(_)) => {
                ensure_drained(&decoder)?;
                return Err(from_decode(err));
            }
            Err(err) => return Err(from_decode(err)),
        }
    }
}

/// One request gets one response; anything after it means lost alignment.
fn ensure_drained(decoder: &ResponseDecoder) -> Result<(), ClientError> {
    match decoder.buffered() {
        0 => Ok(()),
        extra => Err(trailing_bytes(extra)),
    }
}

fn trailing_bytes(count: usize) -> ClientError {
    ClientError::Protocol(ProtocolError::MalformedFrame(format!(
        "{count} unexpected bytes after response"
    )))
}
