use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::types::expiry_after;

/// Default token lifetime: one day.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Lifetime of tokens issued at login, in seconds.
    pub token_ttl_seconds: i64,
}

impl ServerConfig {
    /// Loads a TOML config file; keys left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_seconds <= 0 {
            return Err(Error::Config(
                "token_ttl_seconds must be positive".to_string(),
            ));
        }
        if expiry_after(Utc::now(), self.token_ttl_seconds).is_none() {
            return Err(Error::Config(
                "token_ttl_seconds is too large".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("apihub.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("apihub.toml");
        fs::write(&path, "port = 9090\ntoken_ttl_seconds = 60\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.token_ttl_seconds, 60);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path(), PathBuf::from("./data/apihub.db"));
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("apihub.toml");
        fs::write(&path, "token_ttl_seconds = 0\n").unwrap();

        assert!(matches!(
            ServerConfig::from_file(&path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unrepresentable_ttl() {
        for ttl in [i64::MAX, 10_000_000_000_000] {
            let config = ServerConfig {
                token_ttl_seconds: ttl,
                ..ServerConfig::default()
            };
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("apihub.toml");
        fs::write(&path, "port = \"not a port\"\n").unwrap();

        assert!(matches!(
            ServerConfig::from_file(&path),
            Err(Error::Config(_))
        ));
    }
}
