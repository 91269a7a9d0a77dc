// src/model/prebid.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::model::adunit::{AdUnitBid, Bidder, MediaType, Size, VideoParams};
use crate::openrtb::request::{App, Device, User};

/// 广告位上配置的单个 bidder
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdUnitBidderConfig {
    pub bidder: String,
    #[serde(default)]
    pub bid_id: Option<String>,
    pub params: Option<Value>,
}

/// 发布方页面上的广告位
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdUnit {
    pub code: String,
    #[serde(default)]
    pub sizes: Vec<Size>,
    pub topframe: Option<i32>,
    pub instl: Option<i32>,
    pub media_types: Option<BTreeSet<MediaType>>,
    pub video: Option<VideoParams>,
    #[serde(default)]
    pub bids: Vec<AdUnitBidderConfig>,
}

/// `/auction` 请求体
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PreBidRequest {
    pub tid: Option<String>,
    pub timeout_millis: Option<u64>,
    #[serde(default)]
    pub is_debug: bool,
    pub app: Option<App>,
    pub device: Option<Device>,
    pub user: Option<User>,
    #[serde(default)]
    pub ad_units: Vec<AdUnit>,
}

impl PreBidRequest {
    /// 按 bidder code 分组，组的顺序为首次出现的顺序
    pub fn to_bidders(&self) -> Vec<Bidder> {
        let mut bidders: Vec<Bidder> = Vec::new();
        for ad_unit in &self.ad_units {
            for (index, config) in ad_unit.bids.iter().enumerate() {
                let ad_unit_bid = AdUnitBid {
                    bidder_code: config.bidder.clone(),
                    ad_unit_code: ad_unit.code.clone(),
                    bid_id: config
                        .bid_id
                        .clone()
                        .unwrap_or_else(|| format!("{}-{}", ad_unit.code, index)),
                    sizes: ad_unit.sizes.clone(),
                    topframe: ad_unit.topframe,
                    instl: ad_unit.instl,
                    params: config.params.clone(),
                    video: ad_unit.video.clone(),
                    media_types: ad_unit
                        .media_types
                        .clone()
                        .unwrap_or_else(|| BTreeSet::from([MediaType::Banner])),
                };
                match bidders.iter_mut().find(|b| b.bidder_code == config.bidder) {
                    Some(bidder) => bidder.ad_unit_bids.push(ad_unit_bid),
                    None => bidders.push(Bidder::from(&config.bidder, vec![ad_unit_bid])),
                }
            }
        }
        bidders
    }
}
