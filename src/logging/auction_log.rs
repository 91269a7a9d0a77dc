use serde::{Deserialize, Serialize};

use crate::logging::local_timestamp;
use crate::model::result::BidderResult;

/// **一次 /auction 扇出的日志**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuctionLog {
    pub timestamp: String,        // 记录时间
    pub log_type: String,         // 日志类型，固定为 "auction"
    pub tid: String,              // 交易 id
    pub is_app: bool,             // 是否 app 流量
    pub bidder_count: usize,      // 参与的 bidder 数
    pub total_bids: usize,        // 出价总数
    pub bidders: Vec<BidderLog>,  // 各 bidder 的调用日志
}

/// **单个 bidder 的调用日志**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidderLog {
    pub bidder: String,
    pub response_time_ms: u64,
    pub num_bids: usize,
    pub status: String, // "success", "no_bid", "timeout", "error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuctionLog {
    pub fn new(tid: &str, is_app: bool) -> Self {
        Self {
            timestamp: local_timestamp(),
            log_type: "auction".to_string(),
            tid: tid.to_string(),
            is_app,
            bidder_count: 0,
            total_bids: 0,
            bidders: Vec::new(),
        }
    }

    /// **记录一个 bidder 的结果**
    pub fn add_bidder_result(&mut self, result: &BidderResult) {
        let status = if result.timed_out {
            "timeout"
        } else if result.bidder_status.error.is_some() {
            "error"
        } else if result.bids.is_empty() {
            "no_bid"
        } else {
            "success"
        };
        self.bidders.push(BidderLog {
            bidder: result.bidder_status.bidder.clone(),
            response_time_ms: result.bidder_status.response_time_ms,
            num_bids: result.bids.len(),
            status: status.to_string(),
            error: result.bidder_status.error.clone(),
        });
        self.bidder_count += 1;
        self.total_bids += result.bids.len();
    }
}
