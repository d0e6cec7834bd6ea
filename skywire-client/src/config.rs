//! Connection settings.

use skywire_protocol::{DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// TLS settings for a connection.
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// PEM file with the CA certificate(s) the server is verified against.
    /// Bundled web roots are used when unset.
    pub ca_cert_path: Option<PathBuf>,
    /// PEM client certificate for mutual TLS.
    pub client_cert_path: Option<PathBuf>,
    /// PEM private key matching `client_cert_path`.
    pub client_key_path: Option<PathBuf>,
    /// Accept any server certificate. Development only.
    pub insecure: bool,
    /// SNI name; defaults to the configured host.
    pub server_name: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Connection configuration.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Limit for TCP connect, TLS setup and the handshake together.
    pub connect_timeout: Duration,
    /// Limit for one query round trip.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// TLS is used when set.
    pub tls: Option<TlsClientConfig>,
}

impl ConnectionConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            tls: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_tls(mut self, tls_config: TlsClientConfig) -> Self {
        self.tls = Some(tls_config);
        self
    }

    /// `host:port`, for logging.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("tls", &self.tls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::new("root", "secret");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 2003);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert!(config.tls.is_none());
        assert_eq!(config.endpoint(), "127.0.0.1:2003");
    }

    #[test]
    fn test_read_buffer_clamped() {
        let small = ConnectionConfig::new("u", "p").with_read_buffer_size(1);
        assert_eq!(small.read_buffer_size, MIN_READ_BUFFER_SIZE);
        let large = ConnectionConfig::new("u", "p").with_read_buffer_size(usize::MAX);
        assert_eq!(large.read_buffer_size, MAX_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::new("root", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_tls_builder() {
        let tls = TlsClientConfig::new()
            .with_ca_cert("/etc/ca.pem")
            .with_client_cert("/etc/c.pem", "/etc/k.pem")
            .with_server_name("db.internal");
        let config = ConnectionConfig::new("u", "p")
            .with_host("db.internal")
            .with_port(2004)
            .with_tls(tls);
        let tls = config.tls.unwrap();
        assert_eq!(tls.ca_cert_path, Some(PathBuf::from("/etc/ca.pem")));
        assert_eq!(tls.client_key_path, Some(PathBuf::from("/etc/k.pem")));
        assert!(!tls.insecure);
        assert_eq!(config.port, 2004);
    }
}
