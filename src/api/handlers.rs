use axum::http::header::{COOKIE, REFERER, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bidding::engine::{request_all_bids, to_pre_bid_response};
use crate::logging::auction_log::AuctionLog;
use crate::model::context::{PreBidRequestContext, UidsCookie};
use crate::model::prebid::PreBidRequest;
use crate::model::result::PreBidResponse;
use crate::openrtb::request::BidRequest;
use crate::AppState;

const UIDS_COOKIE_NAME: &str = "uids";

/// **解析 OpenRTB 请求中引用的存储请求**
pub async fn handle_openrtb_auction(
    State(state): State<Arc<AppState>>,
    Json(bid_request): Json<BidRequest>,
) -> Response {
    let request_id = bid_request.id.clone();
    match state.processor.process_stored_requests(bid_request).await {
        Ok(resolved) => (StatusCode::OK, Json(resolved)).into_response(),
        Err(e) => {
            warn!("Invalid request {}: {}", request_id, e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": e.messages })),
            )
                .into_response()
        }
    }
}

/// **并发调用请求中的所有 bidder**
pub async fn handle_auction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PreBidRequest>,
) -> Json<PreBidResponse> {
    let context = build_context(&request, &headers, state.config.default_timeout_ms());
    let bidders = request.to_bidders();
    info!(
        "Auction {} with {} bidder(s), timeout {}ms",
        context.tid,
        bidders.len(),
        context.timeout
    );

    let results = request_all_bids(&state.catalog, &bidders, &context).await;

    let mut auction_log = AuctionLog::new(&context.tid, context.is_app());
    for result in &results {
        auction_log.add_bidder_result(result);
    }
    state.log_manager.log_auction(&auction_log).await;

    Json(to_pre_bid_response(&context, results))
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn uids_cookie(headers: &HeaderMap) -> UidsCookie {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == UIDS_COOKIE_NAME)
        .map(|(_, value)| UidsCookie::from_cookie_value(value))
        .unwrap_or_default()
}

/// 由请求体与请求头构造竞价上下文；请求体中的设备信息优先
fn build_context(request: &PreBidRequest, headers: &HeaderMap, default_timeout_ms: u64) -> PreBidRequestContext {
    let referer = header_str(headers, REFERER).map(str::to_string);
    let domain = referer
        .as_deref()
        .and_then(|referer| Url::parse(referer).ok())
        .and_then(|url| url.host_str().map(str::to_string));
    let device = request.device.as_ref();
    let ip = device.and_then(|device| device.ip.clone()).or_else(|| {
        header_str(headers, "x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').next())
            .map(|ip| ip.trim().to_string())
    });
    let ua = device
        .and_then(|device| device.ua.clone())
        .or_else(|| header_str(headers, USER_AGENT).map(str::to_string));

    PreBidRequestContext {
        uids_cookie: uids_cookie(headers),
        timeout: request.timeout_millis.unwrap_or(default_timeout_ms),
        is_debug: request.is_debug,
        app: request.app.clone(),
        user: request.user.clone(),
        referer,
        domain,
        ip,
        ua,
        tid: request
            .tid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    }
}
