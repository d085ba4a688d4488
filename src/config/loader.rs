// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::core::AppConfig;
use super::validation::ConfigValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

pub struct ConfigLoader {
    config_path: PathBuf,
    format: ConfigFormat,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref().to_path_buf();
        let format = Self::detect_format(&config_path)?;

        Ok(Self {
            config_path,
            format,
        })
    }

    pub fn with_format<P: AsRef<Path>>(config_path: P, format: ConfigFormat) -> Result<Self> {
        Ok(Self {
            config_path: config_path.as_ref().to_path_buf(),
            format,
        })
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .context("Config file has no extension")?;

        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(anyhow::anyhow!("Unsupported config format: {}", extension)),
        }
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        info!("Loading configuration from {:?}", self.config_path);

        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;

        let mut config = Self::parse(&content, self.format)?;

        apply_overrides(&mut config, |key| std::env::var(key).ok())?;

        ConfigValidator::validate_app_config(&config)?;

        Ok(config)
    }

    fn parse(content: &str, format: ConfigFormat) -> Result<AppConfig> {
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .context("Failed to parse YAML config")?,
            ConfigFormat::Toml => toml::from_str(content)
                .context("Failed to parse TOML config")?,
            ConfigFormat::Json => serde_json::from_str(content)
                .context("Failed to parse JSON config")?,
        };
        Ok(config)
    }
}

/// Defaults plus environment overrides, for runs without a config file
pub fn load_default_config() -> Result<AppConfig> {
    let mut config = AppConfig::default();
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    ConfigValidator::validate_app_config(&config)?;
    Ok(config)
}

/// `DDP_URL`, `DDP_TOKEN`, `DDP_PROXY` and `DDP_CONCURRENCY` replace file values
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DDP_URL") {
        debug!("DDP_URL overrides target url");
        config.target.url = Some(url);
    }

    if let Some(token) = lookup("DDP_TOKEN") {
        config.target.token = Some(token);
        config.target.username = None;
        config.target.email = None;
        config.target.password = None;
    }

    if let Some(proxy) = lookup("DDP_PROXY") {
        config.target.proxy = Some(proxy);
    }

    if let Some(concurrency) = lookup("DDP_CONCURRENCY") {
        config.probing.concurrency = concurrency.parse()
            .context("Invalid DDP_CONCURRENCY")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigLoader::detect_format(Path::new("config.ini")).is_err());
        assert!(ConfigLoader::detect_format(Path::new("config")).is_err());
    }

    #[test]
    fn test_load_yaml_config() -> Result<()> {
        let yaml_content = r#"
target:
  url: "https://app.example.com"
  username: "admin"
  password: "hunter2"
probing:
  concurrency: 12
  parallelism: 4
capture:
  include_ping_pong: true
"#;

        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(yaml_content.as_bytes())?;
        temp_file.flush()?;

        let loader = ConfigLoader::with_format(temp_file.path(), ConfigFormat::Yaml)?;
        let config = loader.load_config()?;

        assert_eq!(config.target.url.as_deref(), Some("https://app.example.com"));
        assert_eq!(config.probing.parallelism, 4);
        assert!(config.capture.include_ping_pong);
        assert!(config.client.auto_connect);

        Ok(())
    }

    #[test]
    fn test_load_toml_config() -> Result<()> {
        let toml_content = r#"
[target]
url = "wss://app.example.com/websocket"
token = "resume-me"

[client]
connect_timeout_secs = 3
open_retries = 5
"#;

        let mut temp_file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        temp_file.write_all(toml_content.as_bytes())?;
        temp_file.flush()?;

        let config = ConfigLoader::new(temp_file.path())?.load_config()?;
        assert_eq!(config.client.connect_timeout_secs, 3);
        assert_eq!(config.client.retry().max_attempts, 5);

        Ok(())
    }

    #[test]
    fn test_invalid_credentials_rejected_on_load() -> Result<()> {
        let json_content = r#"{"target": {"url": "https://x.io", "token": "t", "password": "p"}}"#;
        let mut temp_file = tempfile::Builder::new().suffix(".json").tempfile()?;
        temp_file.write_all(json_content.as_bytes())?;
        temp_file.flush()?;

        assert!(ConfigLoader::new(temp_file.path())?.load_config().is_err());
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let env: HashMap<&str, &str> = [
            ("DDP_URL", "http://localhost:3000"),
            ("DDP_TOKEN", "tok"),
            ("DDP_CONCURRENCY", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.target.username = Some("admin".into());
        config.target.password = Some("pw".into());
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(config.target.url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.target.token.as_deref(), Some("tok"));
        assert!(config.target.username.is_none());
        assert_eq!(config.probing.concurrency, 0);
        assert!(config.target.credentials()?.is_some());

        let mut config = AppConfig::default();
        let bad = |k: &str| (k == "DDP_CONCURRENCY").then(|| "many".to_string());
        assert!(apply_overrides(&mut config, bad).is_err());

        Ok(())
    }
}
