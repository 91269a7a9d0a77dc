// src/model/result.rs

use serde::{Deserialize, Serialize};

/// 用户同步描述（usersync）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UsersyncInfo {
    pub url: String,
    #[serde(rename = "type")]
    pub sync_type: String,
    #[serde(rename = "supportCORS")]
    pub support_cors: bool,
}

impl UsersyncInfo {
    pub fn redirect(url: &str) -> Self {
        Self {
            url: url.to_string(),
            sync_type: "redirect".to_string(),
            support_cors: false,
        }
    }
}

/// 一次出站调用的调试记录
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BidderDebug {
    #[serde(rename = "requesturi")]
    pub request_uri: String,
    #[serde(rename = "requestbody")]
    pub request_body: String,
    #[serde(rename = "responsebody", skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(rename = "statuscode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// 每个 bidder 的竞价状态
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BidderStatus {
    pub bidder: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_bids: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_bid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_cookie: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usersync: Option<UsersyncInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Vec<BidderDebug>>,
}

/// 归一化后的出价
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Bid {
    pub code: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub bidder: String,
    pub bid_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    pub response_time_ms: u64,
}

/// 单个适配器调用的最终结果；错误也编码在 `bidder_status.error` 里
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BidderResult {
    pub bidder_status: BidderStatus,
    pub bids: Vec<Bid>,
    pub timed_out: bool,
}

impl BidderResult {
    /// 未能发起调用时的结果（例如 bidder code 未注册）
    pub fn error(bidder: &str, message: &str) -> Self {
        Self {
            bidder_status: BidderStatus {
                bidder: bidder.to_string(),
                error: Some(message.to_string()),
                ..Default::default()
            },
            bids: Vec::new(),
            timed_out: false,
        }
    }
}

/// `/auction` 的应答
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PreBidResponse {
    pub tid: String,
    pub status: String,
    #[serde(rename = "bidders")]
    pub bidder_status: Vec<BidderStatus>,
    pub bids: Vec<Bid>,
}
