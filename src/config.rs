//! Command-line client configuration.
//!
//! Loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (`--config` or `SKYWIRE_CONFIG`)
//! 3. Environment variables
//! 4. Command-line flags

use serde::{Deserialize, Serialize};
use skywire_client::{ConnectionConfig, TlsClientConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionSection,
    pub tls: TlsSection,
    pub repl: ReplSection,
}

/// Server address and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub read_buffer_size: usize,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            host: skywire_protocol::DEFAULT_HOST.to_string(),
            port: skywire_protocol::DEFAULT_PORT,
            username: "root".to_string(),
            password: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            read_buffer_size: skywire_client::config::DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSection {
    pub enabled: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub insecure: bool,
    pub server_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplSection {
    /// Defaults to `~/.skywire_history`.
    pub history_file: Option<PathBuf>,
}

impl Config {
    /// Loads defaults, the config file if any, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Applies `SKYWIRE_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let conn = &mut self.connection;
        if let Some(host) = lookup("SKYWIRE_HOST") {
            conn.host = host;
        }
        if let Some(port) = lookup("SKYWIRE_PORT") {
            conn.port = parse_var("SKYWIRE_PORT", port)?;
        }
        if let Some(user) = lookup("SKYWIRE_USER") {
            conn.username = user;
        }
        if let Some(password) = lookup("SKYWIRE_PASSWORD") {
            conn.password = password;
        }
        if let Some(secs) = lookup("SKYWIRE_REQUEST_TIMEOUT") {
            conn.request_timeout_secs = parse_var("SKYWIRE_REQUEST_TIMEOUT", secs)?;
        }
        if let Some(tls) = lookup("SKYWIRE_TLS") {
            self.tls.enabled = tls == "1" || tls.eq_ignore_ascii_case("true");
        }
        if let Some(path) = lookup("SKYWIRE_CA_CERT") {
            self.tls.ca_cert = Some(PathBuf::from(path));
            self.tls.enabled = true;
        }
        Ok(())
    }

    /// Builds the client connection settings.
    pub fn connection_config(&self) -> ConnectionConfig {
        let conn = &self.connection;
        let mut config = ConnectionConfig::new(&conn.username, &conn.password)
            .with_host(&conn.host)
            .with_port(conn.port)
            .with_connect_timeout(Duration::from_secs(conn.connect_timeout_secs))
            .with_request_timeout(Duration::from_secs(conn.request_timeout_secs))
            .with_read_buffer_size(conn.read_buffer_size);

        if self.tls.enabled {
            let mut tls = TlsClientConfig::new();
            if let Some(ca) = &self.tls.ca_cert {
                tls = tls.with_ca_cert(ca);
            }
            if let (Some(cert), Some(key)) = (&self.tls.client_cert, &self.tls.client_key) {
                tls = tls.with_client_cert(cert, key);
            }
            if self.tls.insecure {
                tls = tls.with_insecure();
            }
            if let Some(name) = &self.tls.server_name {
                tls = tls.with_server_name(name);
            }
            config = config.with_tls(tls);
        }
        config
    }

    pub fn history_path(&self) -> PathBuf {
        self.repl.history_file.clone().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".skywire_history"))
                .unwrap_or_else(|_| ".skywire_history".into())
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.host, "127.0.0.1");
        assert_eq!(config.connection.port, 2003);
        assert!(!config.tls.enabled);

        let conn = config.connection_config();
        assert_eq!(conn.request_timeout, Duration::from_secs(30));
        assert!(conn.tls.is_none());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "connection:\n  host: db.internal\n  port: 2004\n  username: admin\ntls:\n  enabled: true\n  insecure: true"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 2004);
        assert_eq!(config.connection.username, "admin");
        // unspecified fields keep their defaults
        assert_eq!(config.connection.request_timeout_secs, 30);

        let tls = config.connection_config().tls.unwrap();
        assert!(tls.insecure);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/skywire.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connection: [not, a, map]").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("SKYWIRE_HOST", "10.0.0.5"),
                ("SKYWIRE_PORT", "2100"),
                ("SKYWIRE_USER", "alice"),
                ("SKYWIRE_PASSWORD", "pw"),
                ("SKYWIRE_CA_CERT", "/etc/ca.pem"),
            ]))
            .unwrap();

        let conn = config.connection_config();
        assert_eq!(conn.endpoint(), "10.0.0.5:2100");
        assert_eq!(conn.username, "alice");
        assert_eq!(conn.password, "pw");
        assert_eq!(
            conn.tls.unwrap().ca_cert_path,
            Some(PathBuf::from("/etc/ca.pem"))
        );
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("SKYWIRE_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "SKYWIRE_PORT",
                ..
            }
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.connection.port, config.connection.port);
        assert_eq!(parsed.connection.username, config.connection.username);
    }
}
