//! Default sizing and limits, resolved once at startup.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/game-settings.json";
const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Sizing defaults and bounds. Field names follow `game-settings.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub default_rows: i64,
    pub default_cols: i64,
    pub default_max_drops: i64,
    pub min_size: i64,
    pub max_rows: i64,
    pub max_cols: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_rows: 20,
            default_cols: 10,
            default_max_drops: 150,
            min_size: 5,
            max_rows: 40,
            max_cols: 20,
        }
    }
}

impl GameConfig {
    /// Makes the bounds usable: a positive minimum and maxima no smaller than it.
    pub fn sanitized(mut self) -> Self {
        self.min_size = self.min_size.max(1);
        self.max_rows = self.max_rows.max(self.min_size);
        self.max_cols = self.max_cols.max(self.min_size);
        self.default_max_drops = self.default_max_drops.max(1);
        self
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
    InvalidUri(String),
    Http(String),
    Status(u16),
    Timeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config read failed: {err}"),
            ConfigError::Parse(err) => write!(f, "config parse failed: {err}"),
            ConfigError::InvalidUri(uri) => write!(f, "invalid config url: {uri}"),
            ConfigError::Http(err) => write!(f, "config fetch failed: {err}"),
            ConfigError::Status(code) => write!(f, "config fetch returned HTTP {code}"),
            ConfigError::Timeout => write!(f, "config fetch timed out"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Where the config document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Http(String),
}

impl ConfigSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") {
            ConfigSource::Http(raw.to_string())
        } else {
            ConfigSource::File(PathBuf::from(raw))
        }
    }

    fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Http(url) => url.clone(),
        }
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::File(PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

pub fn parse_config(bytes: &[u8]) -> Result<GameConfig, ConfigError> {
    serde_json::from_slice::<GameConfig>(bytes)
        .map(GameConfig::sanitized)
        .map_err(ConfigError::Parse)
}

pub fn try_load_config(source: &ConfigSource) -> Result<GameConfig, ConfigError> {
    let bytes = match source {
        ConfigSource::File(path) => Bytes::from(fs::read(path).map_err(ConfigError::Io)?),
        ConfigSource::Http(url) => fetch_blocking(url)?,
    };
    parse_config(&bytes)
}

/// Resolves the config, substituting the built-in fallback on any failure.
pub fn load_config(source: &ConfigSource) -> GameConfig {
    match try_load_config(source) {
        Ok(config) => {
            info!(source = %source.describe(), "config loaded");
            config
        }
        Err(err) => {
            warn!(source = %source.describe(), "{err}; using built-in defaults");
            GameConfig::default()
        }
    }
}

fn fetch_blocking(url: &str) -> Result<Bytes, ConfigError> {
    let uri: hyper::Uri = url
        .parse()
        .map_err(|_| ConfigError::InvalidUri(url.to_string()))?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ConfigError::Io)?;
    rt.block_on(async {
        tokio::time::timeout(FETCH_TIMEOUT, fetch(uri))
            .await
            .map_err(|_| ConfigError::Timeout)?
    })
}

async fn fetch(uri: hyper::Uri) -> Result<Bytes, ConfigError> {
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
    let res = client
        .get(uri)
        .await
        .map_err(|e| ConfigError::Http(e.to_string()))?;
    if !res.status().is_success() {
        return Err(ConfigError::Status(res.status().as_u16()));
    }
    let body = res
        .into_body()
        .collect()
        .await
        .map_err(|e| ConfigError::Http(e.to_string()))?;
    Ok(body.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_document() {
        let cfg = parse_config(
            br#"{"defaultRows":22,"defaultCols":12,"defaultMaxDrops":90,"minSize":6,"maxRows":30,"maxCols":16}"#,
        )
        .unwrap();
        assert_eq!(
            cfg,
            GameConfig {
                default_rows: 22,
                default_cols: 12,
                default_max_drops: 90,
                min_size: 6,
                max_rows: 30,
                max_cols: 16,
            }
        );
    }

    #[test]
    fn missing_fields_fall_back_individually() {
        let cfg = parse_config(br#"{"maxRows":25}"#).unwrap();
        assert_eq!(cfg.max_rows, 25);
        assert_eq!(cfg.default_rows, 20);
        assert_eq!(cfg.min_size, 5);
    }

    #[test]
    fn sanitized_keeps_bounds_ordered() {
        let cfg = GameConfig {
            min_size: 0,
            max_rows: -4,
            max_cols: 3,
            default_max_drops: 0,
            ..GameConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.min_size, 1);
        assert_eq!(cfg.max_rows, 1);
        assert_eq!(cfg.max_cols, 3);
        assert_eq!(cfg.default_max_drops, 1);
    }

    #[test]
    fn missing_file_yields_fallback() {
        let source = ConfigSource::File(PathBuf::from("/nonexistent/tetris/game-settings.json"));
        assert!(matches!(try_load_config(&source), Err(ConfigError::Io(_))));
        assert_eq!(load_config(&source), GameConfig::default());
    }

    #[test]
    fn malformed_url_yields_fallback() {
        let source = ConfigSource::parse("http://bad host/config.json");
        assert!(matches!(source, ConfigSource::Http(_)));
        assert!(matches!(
            try_load_config(&source),
            Err(ConfigError::InvalidUri(_))
        ));
        assert_eq!(load_config(&source), GameConfig::default());
    }

    #[test]
    fn source_parse_distinguishes_http() {
        assert_eq!(
            ConfigSource::parse("public/config/game-settings.json"),
            ConfigSource::File(PathBuf::from("public/config/game-settings.json"))
        );
    }
}
