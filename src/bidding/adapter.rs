// src/bidding/adapter.rs

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AdapterError;
use crate::model::adunit::{AdUnitBid, Bidder};
use crate::model::context::PreBidRequestContext;
use crate::model::result::{BidderResult, UsersyncInfo};
use crate::openrtb::request::BidRequest;

/// 一次逻辑出站调用：目标地址、OpenRTB 请求体以及它覆盖的广告位
#[derive(Debug, Clone)]
pub struct AdapterHttpRequest {
    pub uri: String,
    pub bid_request: BidRequest,
    pub ad_unit_bids: Vec<AdUnitBid>,
}

/// 单个 bidder 的接入逻辑
///
/// 适配器只负责校验参数并构造出站请求；调度、响应分类和结果归并
/// 由 [`HttpConnector`](crate::bidding::http_connector::HttpConnector) 统一完成。
pub trait Adapter: Send + Sync + 'static {
    /// bidder 专属参数
    type Params: DeserializeOwned;

    /// bidder code，如 `indexExchange`
    fn code(&self) -> &str;

    /// 用于错误信息的展示名
    fn name(&self) -> &str;

    /// 在 uids cookie 中查找用户 id 的家族名
    fn cookie_family(&self) -> &str;

    fn usersync_info(&self) -> &UsersyncInfo;

    /// 为 false 时 app 请求在构造出站请求之前即被拒绝
    fn supports_app(&self) -> bool {
        true
    }

    /// 解析并校验单个广告位上的 bidder 参数
    fn parse_params(&self, ad_unit_bid: &AdUnitBid) -> Result<Self::Params, AdapterError>;

    fn make_http_requests(
        &self,
        bidder: &Bidder,
        context: &PreBidRequestContext,
    ) -> Result<Vec<AdapterHttpRequest>, AdapterError>;
}

/// 对外暴露的竞价操作：结果永远成功，失败编码在 `BidderStatus.error` 中
#[async_trait]
pub trait BidderRequester: Send + Sync {
    fn code(&self) -> &str;

    async fn request_bids(&self, bidder: &Bidder, context: &PreBidRequestContext) -> BidderResult;
}

/// 把不透明的 params 反序列化为 bidder 专属参数
pub fn unmarshal_params<P: DeserializeOwned>(
    params_name: &str,
    params: Option<&Value>,
) -> Result<P, AdapterError> {
    let raw = match params {
        None | Some(Value::Null) => return Err(AdapterError::ParamsMissing(params_name.to_string())),
        Some(raw) => raw,
    };
    P::deserialize(raw).map_err(|e| AdapterError::ParamsUnmarshal {
        raw: raw.to_string(),
        cause: e.to_string(),
    })
}
