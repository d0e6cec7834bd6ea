//! Socket setup: TCP with optional TLS, behind one stream type.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::tls::build_connector;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

trait Socket: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Socket for T {}

/// The byte stream a [`Connection`](crate::Connection) talks over.
pub struct Transport {
    socket: Box<dyn Socket>,
    tls: bool,
}

impl Transport {
    /// Dials the configured endpoint, wrapping the socket in TLS when enabled.
    pub(crate) async fn open(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                ClientError::Io(e)
            })?;
        tcp.set_nodelay(true).ok();
        if let Ok(peer) = tcp.peer_addr() {
            tracing::debug!("TCP connected to {}", peer);
        }

        let Some(tls) = &config.tls else {
            return Ok(Self {
                socket: Box::new(tcp),
                tls: false,
            });
        };

        let (connector, server_name) = build_connector(tls, &config.host)?;
        tracing::debug!("Performing TLS handshake...");
        let stream = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;
        tracing::debug!("TLS handshake complete");

        Ok(Self {
            socket: Box::new(stream),
            tls: true,
        })
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    fn socket(self: Pin<&mut Self>) -> Pin<&mut (dyn Socket + 'static)> {
        Pin::new(&mut *self.get_mut().socket)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("tls", &self.tls).finish()
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.socket().poll_read(cx, buf)
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.socket().poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.socket().poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.socket().poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsClientConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn local_listener() -> (TcpListener, ConnectionConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::new("root", "pass").with_port(port);
        (listener, config)
    }

    #[tokio::test]
    async fn test_plain_transport_carries_bytes() {
        let (listener, config) = local_listener().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 3];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(b"H00").await.unwrap();
            buf
        });

        let mut transport = Transport::open(&config).await.unwrap();
        assert!(!transport.is_tls());
        transport.write_all(b"abc").await.unwrap();
        let mut reply = [0u8; 3];
        transport.read_exact(&mut reply).await.unwrap();

        assert_eq!(&reply, b"H00");
        assert_eq!(&server.await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_tls_handshake_against_plain_server_fails() {
        let (listener, config) = local_listener().await;
        let config = config.with_tls(TlsClientConfig::new().with_insecure());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let err = Transport::open(&config).await.err().unwrap();
        assert!(matches!(err, ClientError::TlsHandshake(_)), "got {:?}", err);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_is_io_error() {
        let (listener, config) = local_listener().await;
        drop(listener);
        let err = Transport::open(&config).await.err().unwrap();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
