// src/lib.rs

use std::sync::Arc;

pub mod api;
pub mod auction;
pub mod bidding;
pub mod config;
pub mod errors;
pub mod logging;
pub mod mock_bidder;
pub mod model;
pub mod openrtb;
pub mod settings;

use auction::stored_request_processor::StoredRequestProcessor;
use bidding::catalog::AdapterCatalog;
use config::ConfigManager;
use logging::logger::LogManager;

/// HTTP 处理器共享的状态
pub struct AppState {
    pub processor: Arc<StoredRequestProcessor>,
    pub catalog: Arc<AdapterCatalog>,
    pub log_manager: Arc<LogManager>,
    pub config: Arc<ConfigManager>,
}
