//! Configuration for the conversion service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_PATH_ENV: &str = "PDF_CONVERT_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Artifact storage directories
    pub storage: StorageConfig,
    /// Table extraction policy
    pub extraction: ExtractionConfig,
    /// Conversion job limits
    pub conversion: ConversionConfig,
}

impl ConverterConfig {
    /// Load configuration: defaults, then the optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read configuration from a TOML file; missing sections keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PORT: {}", port)))?;
        }
        if let Some(url) = lookup("PUBLIC_URL") {
            self.server.public_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(dir) = lookup("UPLOAD_FOLDER") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("CONVERTED_FOLDER") {
            self.storage.converted_dir = PathBuf::from(dir);
        }
        if lookup("RENDER_ENV").as_deref() == Some("production") {
            self.extraction.deployment = Deployment::Hosted;
        }
        if let Some(flag) = lookup("TABULA_FALLBACK") {
            self.extraction.heuristic_first = flag.eq_ignore_ascii_case("true");
        }
        if let Some(flag) = lookup("GRID_EXTRACTION") {
            self.extraction.grid_enabled = !flag.eq_ignore_ascii_case("false");
        }
        if let Some(secs) = lookup("CONVERSION_TIMEOUT_SECS") {
            self.conversion.timeout_secs = secs.parse().map_err(|_| {
                Error::Config(format!("Invalid CONVERSION_TIMEOUT_SECS: {}", secs))
            })?;
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 16MB)
    pub max_upload_size: usize,
    /// Base URL used in download/preview links; derived from the Host header when unset
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_upload_size: 16 * 1024 * 1024, // 16MB
            public_url: None,
        }
    }
}

/// Artifact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding uploaded originals
    pub uploads_dir: PathBuf,
    /// Directory holding converted artifacts
    pub converted_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            uploads_dir: base.join("uploads"),
            converted_dir: base.join("converted"),
        }
    }
}

/// Where the service runs; hosted deployments lack the grid toolchain by default
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    #[default]
    Local,
    Hosted,
}

/// Table extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Deployment environment
    pub deployment: Deployment,
    /// Try the heuristic strategy before the grid strategy
    pub heuristic_first: bool,
    /// Allow the grid (ruling line) strategy
    pub grid_enabled: bool,
    /// Timeout for the primary text extractor in seconds
    pub text_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            deployment: Deployment::Local,
            heuristic_first: false,
            grid_enabled: true,
            text_timeout_secs: 60,
        }
    }
}

impl ExtractionConfig {
    pub fn text_timeout(&self) -> Duration {
        Duration::from_secs(self.text_timeout_secs)
    }
}

/// Conversion job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Wall-clock budget for a single conversion in seconds (default: 300 = 5 minutes)
    pub timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_size, 16 * 1024 * 1024);
        assert_eq!(config.extraction.deployment, Deployment::Local);
        assert!(config.extraction.grid_enabled);
        assert!(!config.extraction.heuristic_first);
        assert_eq!(config.conversion.timeout(), Duration::from_secs(300));
        assert!(config.storage.uploads_dir.ends_with("uploads"));
        assert!(config.storage.converted_dir.ends_with("converted"));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("PORT", "8081"),
            ("RENDER_ENV", "production"),
            ("TABULA_FALLBACK", "TRUE"),
            ("GRID_EXTRACTION", "false"),
            ("UPLOAD_FOLDER", "/tmp/in"),
            ("PUBLIC_URL", "https://convert.example.com/"),
        ]);
        let mut config = ConverterConfig::default();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.extraction.deployment, Deployment::Hosted);
        assert!(config.extraction.heuristic_first);
        assert!(!config.extraction.grid_enabled);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("/tmp/in"));
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://convert.example.com")
        );
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let vars = env(&[("PORT", "not-a-port")]);
        let mut config = ConverterConfig::default();
        let err = config.apply_env(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConverterConfig::from_toml(
            r#"
            [server]
            port = 9000

            [extraction]
            deployment = "hosted"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.extraction.deployment, Deployment::Hosted);
        assert_eq!(config.extraction.text_timeout_secs, 60);
        assert_eq!(config.conversion.timeout_secs, 300);
    }
}
