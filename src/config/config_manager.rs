// src/config/config_manager.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::errors::ConfigError;

/// 单个 bidder 的接入配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub endpoint: String,
    #[serde(default)]
    pub usersync_url: String,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_stored_requests_dir() -> String {
    "static/stored_requests".to_string()
}

/// 服务配置（JSON 文件）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 请求未携带超时时使用的默认值（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_stored_requests_dir")]
    pub stored_requests_dir: String,
    /// bidder code -> 接入配置
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            stored_requests_dir: default_stored_requests_dir(),
            adapters: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConfigManager {
    pub config: AppConfig,
}

impl ConfigManager {
    pub fn new(config: AppConfig) -> Self {
        ConfigManager { config }
    }

    /// 从 JSON 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        info!(
            "Loaded config from {:?}: {} adapter(s)",
            path,
            config.config.adapters.len()
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        Ok(ConfigManager::new(config))
    }

    /// 已启用的 bidder
    pub fn enabled_adapters(&self) -> impl Iterator<Item = (&str, &AdapterConfig)> {
        self.config
            .adapters
            .iter()
            .filter(|(_, adapter)| adapter.enabled)
            .map(|(code, adapter)| (code.as_str(), adapter))
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.config.default_timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let manager = ConfigManager::from_json("{}").unwrap();
        assert_eq!(manager.config, AppConfig::default());
        assert_eq!(manager.default_timeout_ms(), 1000);
        assert_eq!(manager.config.stored_requests_dir, "static/stored_requests");
    }

    #[test]
    fn only_enabled_adapters_are_listed() {
        let manager = ConfigManager::from_json(
            r#"{
                "default_timeout_ms": 250,
                "adapters": {
                    "indexExchange": {"endpoint": "http://127.0.0.1:9001/bid", "usersync_url": "//sync.example.com"},
                    "rubicon": {"enabled": false, "endpoint": "http://rubicon.example.com"}
                }
            }"#,
        )
        .unwrap();

        let codes: Vec<&str> = manager.enabled_adapters().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["indexExchange"]);
        assert_eq!(manager.default_timeout_ms(), 250);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = ConfigManager::from_json("{not json").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = ConfigManager::load("/definitely/not/here/config.json").unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)));
    }
}
