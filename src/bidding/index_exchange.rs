// src/bidding/index_exchange.rs

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::bidding::adapter::{unmarshal_params, Adapter, AdapterHttpRequest};
use crate::errors::{AdapterError, ConfigError};
use crate::model::adunit::{AdUnitBid, Bidder, MediaType};
use crate::model::context::PreBidRequestContext;
use crate::model::result::UsersyncInfo;
use crate::openrtb::request::{
    Banner, BidRequest, Device, Format, Imp, Publisher, Site, Source, User, Video,
};

pub const INDEX_EXCHANGE_CODE: &str = "indexExchange";

/// Index Exchange 的 bidder 参数
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexExchangeParams {
    #[serde(rename = "siteID")]
    pub site_id: Option<i32>,
}

/// Index Exchange 适配器：不支持 app 流量，所有广告位合并为一个 OpenRTB 请求
pub struct IndexExchangeAdapter {
    endpoint_url: String,
    usersync_info: UsersyncInfo,
}

impl IndexExchangeAdapter {
    pub fn new(endpoint_url: &str, usersync_url: &str) -> Result<Self, ConfigError> {
        Url::parse(endpoint_url).map_err(|_| ConfigError::InvalidEndpoint(endpoint_url.to_string()))?;
        Ok(Self {
            endpoint_url: endpoint_url.to_string(),
            usersync_info: UsersyncInfo::redirect(usersync_url),
        })
    }

    fn make_imps(&self, ad_unit_bids: &[&AdUnitBid], context: &PreBidRequestContext) -> Vec<Imp> {
        let secure = context
            .referer
            .as_deref()
            .filter(|referer| referer.starts_with("https"))
            .map(|_| 1);

        ad_unit_bids
            .iter()
            .flat_map(|ad_unit_bid| {
                ad_unit_bid
                    .media_types
                    .iter()
                    .filter_map(move |media_type| make_imp(ad_unit_bid, *media_type, secure))
            })
            .collect()
    }
}

fn make_imp(ad_unit_bid: &AdUnitBid, media_type: MediaType, secure: Option<i32>) -> Option<Imp> {
    let imp = Imp {
        id: ad_unit_bid.ad_unit_code.clone(),
        instl: ad_unit_bid.instl,
        tagid: Some(ad_unit_bid.ad_unit_code.clone()),
        secure,
        ..Default::default()
    };
    let first_size = ad_unit_bid.sizes.first();

    match media_type {
        MediaType::Banner => {
            let size = first_size?;
            Some(Imp {
                banner: Some(Banner {
                    w: Some(size.w),
                    h: Some(size.h),
                    topframe: ad_unit_bid.topframe,
                    format: Some(ad_unit_bid.sizes.iter().copied().map(Format::from).collect()),
                    ..Default::default()
                }),
                ..imp
            })
        }
        MediaType::Video => {
            let video = ad_unit_bid.video.as_ref().filter(|video| !video.mimes.is_empty())?;
            Some(Imp {
                video: Some(Video {
                    mimes: Some(video.mimes.clone()),
                    minduration: video.minduration,
                    maxduration: video.maxduration,
                    w: first_size.map(|size| size.w),
                    h: first_size.map(|size| size.h),
                    startdelay: video.startdelay,
                    playbackmethod: video.playback_method.map(|method| vec![method]),
                    protocols: video.protocols.clone(),
                    ..Default::default()
                }),
                ..imp
            })
        }
    }
}

/// 请求视频却没有任何 mime 的广告位视为无效
fn validate_media_types(ad_unit_bids: &[AdUnitBid]) -> Result<(), AdapterError> {
    let invalid = ad_unit_bids.iter().any(|ad_unit_bid| {
        ad_unit_bid.media_types.contains(&MediaType::Video)
            && ad_unit_bid
                .video
                .as_ref()
                .map_or(true, |video| video.mimes.is_empty())
    });
    if invalid {
        Err(AdapterError::InvalidVideo)
    } else {
        Ok(())
    }
}

impl Adapter for IndexExchangeAdapter {
    type Params = IndexExchangeParams;

    fn code(&self) -> &str {
        INDEX_EXCHANGE_CODE
    }

    fn name(&self) -> &str {
        "Index"
    }

    fn cookie_family(&self) -> &str {
        INDEX_EXCHANGE_CODE
    }

    fn usersync_info(&self) -> &UsersyncInfo {
        &self.usersync_info
    }

    fn supports_app(&self) -> bool {
        false
    }

    fn parse_params(&self, ad_unit_bid: &AdUnitBid) -> Result<IndexExchangeParams, AdapterError> {
        let params: IndexExchangeParams =
            unmarshal_params("IndexExchange", ad_unit_bid.params.as_ref())?;
        if params.site_id.is_none() {
            return Err(AdapterError::MissingParam("siteID"));
        }
        Ok(params)
    }

    fn make_http_requests(
        &self,
        bidder: &Bidder,
        context: &PreBidRequestContext,
    ) -> Result<Vec<AdapterHttpRequest>, AdapterError> {
        validate_media_types(&bidder.ad_unit_bids)?;

        let params = bidder
            .ad_unit_bids
            .iter()
            .map(|ad_unit_bid| self.parse_params(ad_unit_bid))
            .collect::<Result<Vec<_>, _>>()?;

        // 同一个广告位 code 只发一次
        let mut seen_codes = HashSet::new();
        let ad_unit_bids: Vec<&AdUnitBid> = bidder
            .ad_unit_bids
            .iter()
            .filter(|ad_unit_bid| seen_codes.insert(ad_unit_bid.ad_unit_code.as_str()))
            .collect();

        let imps = self.make_imps(&ad_unit_bids, context);
        if imps.is_empty() {
            return Err(AdapterError::NoImps);
        }

        let site_id = params.first().and_then(|params| params.site_id);
        let buyeruid = context
            .uids_cookie
            .uid_from(self.cookie_family())
            .map(str::to_string);
        let user_id = context.user.as_ref().and_then(|user| user.id.clone());
        let user = (buyeruid.is_some() || user_id.is_some()).then(|| User {
            id: user_id,
            buyeruid,
            ..Default::default()
        });

        let bid_request = BidRequest {
            id: context.tid.clone(),
            imp: imps,
            at: Some(1),
            tmax: Some(context.timeout),
            site: Some(Site {
                domain: context.domain.clone(),
                page: context.referer.clone(),
                publisher: Some(Publisher {
                    id: site_id.map(|id| id.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            device: Some(Device {
                ua: context.ua.clone(),
                ip: context.ip.clone(),
                ..Default::default()
            }),
            user,
            source: Some(Source {
                fd: Some(1),
                tid: Some(context.tid.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok(vec![AdapterHttpRequest {
            uri: self.endpoint_url.clone(),
            bid_request,
            ad_unit_bids: ad_unit_bids.into_iter().cloned().collect(),
        }])
    }
}
