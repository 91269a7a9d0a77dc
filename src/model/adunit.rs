// src/model/adunit.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::openrtb::request::Format;

/// 广告位尺寸（像素）
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl From<Size> for Format {
    fn from(size: Size) -> Self {
        Format::sized(size.w, size.h)
    }
}

/// 广告位请求的媒体类型
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Banner,
    Video,
}

/// 发布方侧的视频参数
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VideoParams {
    #[serde(default)]
    pub mimes: Vec<String>,
    pub minduration: Option<i32>,
    pub maxduration: Option<i32>,
    pub startdelay: Option<i32>,
    #[serde(rename = "playback_method")]
    pub playback_method: Option<i32>,
    pub protocols: Option<Vec<i32>>,
}

/// 等待竞价的单个广告位（AdUnitBid）
///
/// `ad_unit_code` 用于把 DSP 返回的 `impid` 关联回广告位；
/// `params` 是 bidder 专属参数，由各个适配器自行解析。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdUnitBid {
    pub bidder_code: String,
    pub ad_unit_code: String,
    #[serde(default)]
    pub bid_id: String,
    #[serde(default)]
    pub sizes: Vec<Size>,
    pub topframe: Option<i32>,
    pub instl: Option<i32>,
    pub params: Option<Value>,
    pub video: Option<VideoParams>,
    #[serde(default = "default_media_types")]
    pub media_types: BTreeSet<MediaType>,
}

fn default_media_types() -> BTreeSet<MediaType> {
    BTreeSet::from([MediaType::Banner])
}

impl Default for AdUnitBid {
    fn default() -> Self {
        Self {
            bidder_code: String::new(),
            ad_unit_code: String::new(),
            bid_id: String::new(),
            sizes: Vec::new(),
            topframe: None,
            instl: None,
            params: None,
            video: None,
            media_types: default_media_types(),
        }
    }
}

/// 一次适配器调用的工作单元
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bidder {
    pub bidder_code: String,
    pub ad_unit_bids: Vec<AdUnitBid>,
}

impl Bidder {
    pub fn from(bidder_code: &str, ad_unit_bids: Vec<AdUnitBid>) -> Self {
        Self {
            bidder_code: bidder_code.to_string(),
            ad_unit_bids,
        }
    }
}
