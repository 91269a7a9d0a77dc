// src/bidding/engine.rs

use futures::future::join_all;
use tracing::{debug, info};

use crate::bidding::catalog::AdapterCatalog;
use crate::model::adunit::Bidder;
use crate::model::context::PreBidRequestContext;
use crate::model::result::{BidderResult, PreBidResponse};

pub const UNSUPPORTED_BIDDER: &str = "Unsupported bidder";

/// 并发调用所有 bidder，结果顺序与输入顺序一致
///
/// 每个 bidder 的失败只体现在它自己的结果里，不影响其它 bidder。
pub async fn request_all_bids(
    catalog: &AdapterCatalog,
    bidders: &[Bidder],
    context: &PreBidRequestContext,
) -> Vec<BidderResult> {
    let calls = bidders.iter().map(|bidder| async move {
        match catalog.get(&bidder.bidder_code) {
            Some(requester) => requester.request_bids(bidder, context).await,
            None => {
                debug!("Unsupported bidder code {}", bidder.bidder_code);
                BidderResult::error(&bidder.bidder_code, UNSUPPORTED_BIDDER)
            }
        }
    });
    join_all(calls).await
}

/// 汇总所有 bidder 的结果
pub fn to_pre_bid_response(context: &PreBidRequestContext, results: Vec<BidderResult>) -> PreBidResponse {
    let status = if !context.is_app() && context.uids_cookie.uids.is_empty() {
        "no_cookie"
    } else {
        "OK"
    };

    let mut response = PreBidResponse {
        tid: context.tid.clone(),
        status: status.to_string(),
        ..Default::default()
    };
    for result in results {
        response.bids.extend(result.bids);
        response.bidder_status.push(result.bidder_status);
    }
    info!(
        "tid={} bidders={} bids={}",
        response.tid,
        response.bidder_status.len(),
        response.bids.len()
    );
    response
}
