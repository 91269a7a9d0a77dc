// src/bidding/http_connector.rs

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::bidding::adapter::{Adapter, AdapterHttpRequest, BidderRequester};
use crate::bidding::dispatcher::{HttpDispatcher, HttpRequest, HttpResponse};
use crate::errors::{AdapterError, DispatchError};
use crate::model::adunit::{AdUnitBid, Bidder};
use crate::model::context::PreBidRequestContext;
use crate::model::result::{Bid, BidderDebug, BidderResult, BidderStatus};
use crate::openrtb::response::{self, BidResponse};

/// 单次调用的失败原因
#[derive(Debug, Clone, PartialEq)]
struct CallFailure {
    message: String,
    timed_out: bool,
}

impl CallFailure {
    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    fn timeout() -> Self {
        Self {
            message: DispatchError::Timeout.to_string(),
            timed_out: true,
        }
    }
}

struct ExchangeCall {
    debug: Option<BidderDebug>,
    outcome: Result<Vec<Bid>, CallFailure>,
}

/// 把适配器、HTTP 调度与响应分类组合成一次完整的竞价调用
pub struct HttpConnector<A: Adapter> {
    adapter: A,
    dispatcher: Arc<dyn HttpDispatcher>,
}

impl<A: Adapter> HttpConnector<A> {
    pub fn new(adapter: A, dispatcher: Arc<dyn HttpDispatcher>) -> Self {
        Self {
            adapter,
            dispatcher,
        }
    }

    async fn call(&self, request: AdapterHttpRequest, timeout: Duration) -> ExchangeCall {
        let body = match serde_json::to_string(&request.bid_request) {
            Ok(body) => body,
            Err(e) => {
                return ExchangeCall {
                    debug: None,
                    outcome: Err(CallFailure::error(AdapterError::Encode(e.to_string()).to_string())),
                }
            }
        };

        let mut debug = BidderDebug {
            request_uri: request.uri.clone(),
            request_body: body.clone(),
            response_body: None,
            status_code: None,
        };

        let outcome = match self
            .dispatcher
            .dispatch(HttpRequest::post_json(&request.uri, body, timeout))
            .await
        {
            Err(DispatchError::Timeout) => Err(CallFailure::timeout()),
            Err(DispatchError::Transport(message)) => Err(CallFailure::error(message)),
            Ok(response) => {
                debug.response_body = Some(response.body.clone());
                debug.status_code = Some(response.status_code);
                classify_response(response, &request.ad_unit_bids).map_err(CallFailure::error)
            }
        };

        ExchangeCall {
            debug: Some(debug),
            outcome,
        }
    }

    fn to_bidder_result(
        &self,
        bidder: &Bidder,
        context: &PreBidRequestContext,
        outcome: Result<Vec<Bid>, CallFailure>,
        debug_entries: Vec<BidderDebug>,
        response_time_ms: u64,
    ) -> BidderResult {
        let (mut bids, error, timed_out) = match outcome {
            Ok(bids) => (bids, None, false),
            Err(failure) => (Vec::new(), Some(failure.message), failure.timed_out),
        };
        for bid in &mut bids {
            bid.response_time_ms = response_time_ms;
        }

        let no_cookie = !context.is_app()
            && context
                .uids_cookie
                .uid_from(self.adapter.cookie_family())
                .is_none();

        BidderResult {
            bidder_status: BidderStatus {
                bidder: bidder.bidder_code.clone(),
                response_time_ms,
                num_bids: (!bids.is_empty()).then_some(bids.len()),
                no_bid: (bids.is_empty() && error.is_none()).then_some(true),
                no_cookie: no_cookie.then_some(true),
                usersync: no_cookie.then(|| self.adapter.usersync_info().clone()),
                error,
                debug: context.is_debug.then_some(debug_entries),
            },
            bids,
            timed_out,
        }
    }
}

#[async_trait]
impl<A: Adapter> BidderRequester for HttpConnector<A> {
    fn code(&self) -> &str {
        self.adapter.code()
    }

    async fn request_bids(&self, bidder: &Bidder, context: &PreBidRequestContext) -> BidderResult {
        let start = Instant::now();
        let mut debug_entries = Vec::new();

        let prepared = if context.is_app() && !self.adapter.supports_app() {
            Err(AdapterError::AppNotSupported(self.adapter.name().to_string()))
        } else {
            self.adapter.make_http_requests(bidder, context)
        };

        let outcome = match prepared {
            Err(e) => {
                debug!("{} request rejected before dispatch: {}", bidder.bidder_code, e);
                Err(CallFailure::error(e.to_string()))
            }
            Ok(requests) => {
                let timeout = Duration::from_millis(context.timeout);
                let calls = join_all(requests.into_iter().map(|r| self.call(r, timeout))).await;

                let mut bids = Vec::new();
                let mut failure = None;
                for call in calls {
                    debug_entries.extend(call.debug);
                    match call.outcome {
                        Ok(call_bids) => bids.extend(call_bids),
                        Err(f) => {
                            failure.get_or_insert(f);
                        }
                    }
                }
                match failure {
                    Some(f) => Err(f),
                    None => Ok(dedupe_by_code(bids)),
                }
            }
        };

        let response_time_ms = start.elapsed().as_millis() as u64;
        let result = self.to_bidder_result(bidder, context, outcome, debug_entries, response_time_ms);
        info!(
            "bidder={} bids={} error={:?} timed_out={} response_time_ms={}",
            result.bidder_status.bidder,
            result.bids.len(),
            result.bidder_status.error,
            result.timed_out,
            response_time_ms
        );
        result
    }
}

/// 按状态码与响应体对一次调用分类
///
/// 204 表示无出价；200 之外的状态码、无法解析的响应体、
/// 以及 impid 无法对应到广告位的出价都会使整个响应作废。
pub(crate) fn classify_response(
    response: HttpResponse,
    ad_unit_bids: &[AdUnitBid],
) -> Result<Vec<Bid>, String> {
    match response.status_code {
        204 => return Ok(Vec::new()),
        200 => {}
        code => return Err(format!("HTTP status {}", code)),
    }

    let mut body = response.body.into_bytes();
    let bid_response: BidResponse = simd_json::serde::from_slice(&mut body)
        .map_err(|e| format!("Error parsing response: {}", e))?;

    let mut seen_codes = HashSet::new();
    let mut bids = Vec::new();
    for bid in bid_response.bids() {
        let ad_unit_bid = ad_unit_bids
            .iter()
            .find(|ad_unit_bid| ad_unit_bid.ad_unit_code == bid.impid)
            .ok_or_else(|| format!("Unknown ad unit code '{}'", bid.impid))?;
        if seen_codes.insert(ad_unit_bid.ad_unit_code.as_str()) {
            bids.push(to_bid(bid, ad_unit_bid));
        }
    }
    Ok(bids)
}

fn to_bid(bid: &response::Bid, ad_unit_bid: &AdUnitBid) -> Bid {
    Bid {
        code: ad_unit_bid.ad_unit_code.clone(),
        price: bid.price,
        adm: bid.adm.clone(),
        creative_id: bid.crid.clone(),
        width: bid.w,
        height: bid.h,
        bidder: ad_unit_bid.bidder_code.clone(),
        bid_id: ad_unit_bid.bid_id.clone(),
        deal_id: bid.dealid.clone(),
        response_time_ms: 0,
    }
}

fn dedupe_by_code(bids: Vec<Bid>) -> Vec<Bid> {
    let mut seen_codes = HashSet::new();
    bids.into_iter()
        .filter(|bid| seen_codes.insert(bid.code.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::testutils::MockDispatcher;
    use crate::model::result::UsersyncInfo;
    use crate::openrtb::request::{App, BidRequest, Imp};
    use serde_json::{json, Value};

    fn ad_unit_bid(code: &str) -> AdUnitBid {
        AdUnitBid {
            bidder_code: "splitter".to_string(),
            ad_unit_code: code.to_string(),
            bid_id: format!("bid-{}", code),
            ..Default::default()
        }
    }

    fn response(status_code: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status_code,
            body: body.to_string(),
        }
    }

    fn bid_response(impids: &[&str]) -> Value {
        let bids: Vec<Value> = impids
            .iter()
            .map(|impid| json!({"id": "b", "impid": impid, "price": 1.25}))
            .collect();
        json!({"id": "resp", "seatbid": [{"bid": bids}]})
    }

    /// 每个广告位单独发起一次请求
    struct SplittingAdapter {
        usersync: UsersyncInfo,
        app_traffic: bool,
    }

    impl Adapter for SplittingAdapter {
        type Params = Value;

        fn code(&self) -> &str {
            "splitter"
        }

        fn name(&self) -> &str {
            "Splitter"
        }

        fn cookie_family(&self) -> &str {
            "splitter"
        }

        fn usersync_info(&self) -> &UsersyncInfo {
            &self.usersync
        }

        fn supports_app(&self) -> bool {
            self.app_traffic
        }

        fn parse_params(&self, _ad_unit_bid: &AdUnitBid) -> Result<Value, AdapterError> {
            Ok(Value::Null)
        }

        fn make_http_requests(
            &self,
            bidder: &Bidder,
            _context: &PreBidRequestContext,
        ) -> Result<Vec<AdapterHttpRequest>, AdapterError> {
            Ok(bidder
                .ad_unit_bids
                .iter()
                .map(|ad_unit_bid| AdapterHttpRequest {
                    uri: "http://splitter.org/bid".to_string(),
                    bid_request: BidRequest {
                        id: ad_unit_bid.ad_unit_code.clone(),
                        imp: vec![Imp {
                            id: ad_unit_bid.ad_unit_code.clone(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                    ad_unit_bids: vec![ad_unit_bid.clone()],
                })
                .collect())
        }
    }

    fn connector_with(dispatcher: Arc<MockDispatcher>, app_traffic: bool) -> HttpConnector<SplittingAdapter> {
        HttpConnector::new(
            SplittingAdapter {
                usersync: UsersyncInfo::redirect("//splitter.org/sync"),
                app_traffic,
            },
            dispatcher,
        )
    }

    fn connector(dispatcher: Arc<MockDispatcher>) -> HttpConnector<SplittingAdapter> {
        connector_with(dispatcher, true)
    }

    fn context() -> PreBidRequestContext {
        PreBidRequestContext {
            timeout: 500,
            ..Default::default()
        }
    }

    #[test]
    fn no_content_means_no_bids() {
        let bids = classify_response(response(204, json!("ignored")), &[ad_unit_bid("a")]).unwrap();
        assert!(bids.is_empty());
    }

    #[test]
    fn unexpected_status_is_an_error() {
        let error = classify_response(response(503, json!("response")), &[]).unwrap_err();
        assert_eq!(error, "HTTP status 503");
    }

    #[test]
    fn unparsable_body_is_an_error() {
        let error = classify_response(
            HttpResponse {
                status_code: 200,
                body: "response".to_string(),
            },
            &[ad_unit_bid("a")],
        )
        .unwrap_err();
        assert!(error.starts_with("Error parsing response: "));
    }

    #[test]
    fn unknown_impid_discards_whole_response() {
        let error = classify_response(
            response(200, bid_response(&["a", "other"])),
            &[ad_unit_bid("a")],
        )
        .unwrap_err();
        assert_eq!(error, "Unknown ad unit code 'other'");
    }

    #[test]
    fn one_bid_per_ad_unit_code() {
        let bids = classify_response(
            response(200, bid_response(&["a", "a", "b"])),
            &[ad_unit_bid("a"), ad_unit_bid("b")],
        )
        .unwrap();

        let codes: Vec<&str> = bids.iter().map(|bid| bid.code.as_str()).collect();
        assert_eq!(codes, vec!["a", "b"]);
        assert_eq!(bids[0].bid_id, "bid-a");
        assert_eq!(bids[0].price, 1.25);
    }

    #[test]
    fn missing_seatbid_means_no_bids() {
        let bids = classify_response(response(200, json!({"id": "resp"})), &[ad_unit_bid("a")]).unwrap();
        assert!(bids.is_empty());
    }

    #[tokio::test]
    async fn bids_from_all_calls_are_combined() {
        let dispatcher = Arc::new(MockDispatcher::new());
        dispatcher.push_response(200, &bid_response(&["a"]).to_string());
        dispatcher.push_response(200, &bid_response(&["b"]).to_string());
        let connector = connector(dispatcher.clone());
        let bidder = Bidder::from("splitter", vec![ad_unit_bid("a"), ad_unit_bid("b")]);

        let result = connector.request_bids(&bidder, &context()).await;

        assert_eq!(dispatcher.requests().len(), 2);
        assert_eq!(result.bidder_status.error, None);
        assert_eq!(result.bidder_status.num_bids, Some(2));
        assert!(result
            .bids
            .iter()
            .all(|bid| bid.response_time_ms == result.bidder_status.response_time_ms));
    }

    #[tokio::test]
    async fn any_failed_call_drops_all_bids() {
        let dispatcher = Arc::new(MockDispatcher::new());
        dispatcher.push_response(200, &bid_response(&["a"]).to_string());
        dispatcher.push(Err(DispatchError::Timeout));
        let connector = connector(dispatcher.clone());
        let bidder = Bidder::from("splitter", vec![ad_unit_bid("a"), ad_unit_bid("b")]);

        let result = connector.request_bids(&bidder, &context()).await;

        assert!(result.bids.is_empty());
        assert!(result.timed_out);
        assert_eq!(result.bidder_status.error.as_deref(), Some("Timed out"));
        assert_eq!(result.bidder_status.no_bid, None);
    }

    #[tokio::test]
    async fn app_request_is_rejected_before_building_when_unsupported() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let connector = connector_with(dispatcher.clone(), false);
        let bidder = Bidder::from("splitter", vec![ad_unit_bid("a")]);
        let context = PreBidRequestContext {
            app: Some(App::default()),
            ..context()
        };

        let result = connector.request_bids(&bidder, &context).await;

        assert_eq!(result.bidder_status.error.as_deref(), Some("Splitter doesn't support apps"));
        assert!(result.bids.is_empty());
        assert_eq!(result.bidder_status.no_cookie, None);
        assert!(dispatcher.requests().is_empty());
    }

    #[tokio::test]
    async fn app_request_goes_out_when_supported() {
        let dispatcher = Arc::new(MockDispatcher::responding(204, ""));
        let connector = connector(dispatcher.clone());
        let bidder = Bidder::from("splitter", vec![ad_unit_bid("a")]);
        let context = PreBidRequestContext {
            app: Some(App::default()),
            ..context()
        };

        let result = connector.request_bids(&bidder, &context).await;

        assert_eq!(result.bidder_status.error, None);
        assert_eq!(dispatcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn each_attempted_call_is_recorded_in_debug() {
        let dispatcher = Arc::new(MockDispatcher::new());
        dispatcher.push_response(503, "unavailable");
        dispatcher.push(Err(DispatchError::Transport("connection reset".to_string())));
        let connector = connector(dispatcher);
        let bidder = Bidder::from("splitter", vec![ad_unit_bid("a"), ad_unit_bid("b")]);
        let context = PreBidRequestContext {
            is_debug: true,
            ..context()
        };

        let result = connector.request_bids(&bidder, &context).await;

        let debug = result.bidder_status.debug.unwrap();
        assert_eq!(debug.len(), 2);
        assert_eq!(debug[0].status_code, Some(503));
        assert_eq!(debug[0].response_body.as_deref(), Some("unavailable"));
        assert_eq!(debug[1].status_code, None);
        assert!(!debug[1].request_body.is_empty());
        assert_eq!(result.bidder_status.error.as_deref(), Some("HTTP status 503"));
    }
}
