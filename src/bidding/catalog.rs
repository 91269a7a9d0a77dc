// src/bidding/catalog.rs

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bidding::adapter::BidderRequester;
use crate::bidding::dispatcher::HttpDispatcher;
use crate::bidding::http_connector::HttpConnector;
use crate::bidding::index_exchange::{IndexExchangeAdapter, INDEX_EXCHANGE_CODE};
use crate::config::ConfigManager;
use crate::errors::ConfigError;

/// bidder code -> 可调用的竞价方
#[derive(Default, Clone)]
pub struct AdapterCatalog {
    requesters: HashMap<String, Arc<dyn BidderRequester>>,
}

impl AdapterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据配置装配所有已启用且已知的适配器
    pub fn from_config(
        config: &ConfigManager,
        dispatcher: Arc<dyn HttpDispatcher>,
    ) -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for (code, adapter_config) in config.enabled_adapters() {
            match code {
                INDEX_EXCHANGE_CODE => {
                    let adapter = IndexExchangeAdapter::new(
                        &adapter_config.endpoint,
                        &adapter_config.usersync_url,
                    )?;
                    catalog.register(Arc::new(HttpConnector::new(adapter, dispatcher.clone())));
                }
                unknown => warn!("No adapter implementation for bidder code {}, skipped", unknown),
            }
        }
        info!("Adapter catalog ready with {} bidder(s)", catalog.len());
        Ok(catalog)
    }

    pub fn register(&mut self, requester: Arc<dyn BidderRequester>) {
        self.requesters.insert(requester.code().to_string(), requester);
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn BidderRequester>> {
        self.requesters.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.requesters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requesters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::testutils::MockDispatcher;

    fn config(json: &str) -> ConfigManager {
        ConfigManager::from_json(json).unwrap()
    }

    #[test]
    fn builds_enabled_known_adapters() {
        let catalog = AdapterCatalog::from_config(
            &config(
                r#"{"adapters": {
                    "indexExchange": {"endpoint": "http://127.0.0.1:9001/bid", "usersync_url": "//sync.org"},
                    "someoneElse": {"endpoint": "http://else.org"}
                }}"#,
            ),
            Arc::new(MockDispatcher::new()),
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("indexExchange").unwrap().code(), "indexExchange");
        assert!(catalog.get("someoneElse").is_none());
    }

    #[test]
    fn disabled_adapters_are_skipped() {
        let catalog = AdapterCatalog::from_config(
            &config(r#"{"adapters": {"indexExchange": {"enabled": false, "endpoint": "not a url"}}}"#),
            Arc::new(MockDispatcher::new()),
        )
        .unwrap();

        assert!(catalog.is_empty());
    }

    #[test]
    fn invalid_endpoint_fails_construction() {
        let error = AdapterCatalog::from_config(
            &config(r#"{"adapters": {"indexExchange": {"endpoint": "invalid_url"}}}"#),
            Arc::new(MockDispatcher::new()),
        )
        .err()
        .unwrap();

        assert_eq!(error.to_string(), "URL supplied is not valid");
    }
}
