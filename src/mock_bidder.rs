// src/mock_bidder.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, serve, Json, Router};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::openrtb::request::{BidRequest, Imp};
use crate::openrtb::response::{Bid, BidResponse, SeatBid};

/// 不出价的概率
const NO_BID_RATE: f64 = 0.1;

fn make_adm(imp: &Imp, bid_id: &str) -> String {
    if imp.video.is_some() {
        format!(
            r#"<VAST version="3.0"><Ad id="{bid_id}"><InLine><AdSystem>Mock Bidder</AdSystem><Impression><![CDATA[http://bidder-tracker.local/impression?bid={bid_id}]]></Impression></InLine></Ad></VAST>"#,
            bid_id = bid_id
        )
    } else {
        format!(
            "<html><body>Mock Bidder Banner Ad<img src=\"http://bidder-tracker.local/impression?bid={bid_id}\" style=\"display:none;\" /></body></html>",
            bid_id = bid_id
        )
    }
}

fn make_bid(imp: &Imp, rng: &mut impl Rng) -> Bid {
    let bid_id = format!("bid-{}", imp.id);
    // 视频出价区间更高
    let price = if imp.video.is_some() {
        rng.gen_range(2.0..12.0)
    } else {
        rng.gen_range(0.5..6.0)
    };
    let (w, h) = match (&imp.banner, &imp.video) {
        (Some(banner), _) => (banner.w, banner.h),
        (None, Some(video)) => (video.w, video.h),
        (None, None) => (None, None),
    };

    Bid {
        adm: Some(make_adm(imp, &bid_id)),
        crid: Some(format!("creative-{}", imp.id)),
        id: bid_id,
        impid: imp.id.clone(),
        price: (price * 100.0_f64).round() / 100.0,
        w,
        h,
        ..Default::default()
    }
}

/// 为每个 imp 随机生成一个出价；返回 None 表示整体不出价（204）
pub fn make_bid_response(request: &BidRequest, rng: &mut impl Rng) -> Option<BidResponse> {
    if request.imp.is_empty() || rng.gen_bool(NO_BID_RATE) {
        return None;
    }
    let bids = request.imp.iter().map(|imp| make_bid(imp, rng)).collect();

    Some(BidResponse {
        id: request.id.clone(),
        seatbid: Some(vec![SeatBid {
            bid: bids,
            seat: Some("mock_seat".to_string()),
            ..Default::default()
        }]),
        cur: Some("USD".to_string()),
        ..Default::default()
    })
}

async fn handle_bid(Json(request): Json<BidRequest>) -> Response {
    info!(
        "Mock bidder received BidRequest: id={}, imp_count={}",
        request.id,
        request.imp.len()
    );

    // 模拟处理延迟（20 ~ 150 毫秒）
    let delay_ms = rand::thread_rng().gen_range(20..150);
    sleep(Duration::from_millis(delay_ms)).await;

    match make_bid_response(&request, &mut rand::thread_rng()) {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub fn router() -> Router {
    Router::new().route("/bid", post(handle_bid))
}

/// 启动本地 Mock Bidder，路由为 `/bid`
pub async fn start_mock_bidder_server(port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Mock bidder running at http://{}", addr);
    serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrtb::request::{Banner, Video};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request() -> BidRequest {
        BidRequest {
            id: "tid-1".to_string(),
            imp: vec![
                Imp {
                    id: "top".to_string(),
                    banner: Some(Banner {
                        w: Some(728),
                        h: Some(90),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Imp {
                    id: "preroll".to_string(),
                    video: Some(Video {
                        mimes: Some(vec!["video/mp4".to_string()]),
                        w: Some(640),
                        h: Some(360),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn bids_match_impressions() {
        let mut rng = StdRng::seed_from_u64(7);
        let response = (0..20)
            .find_map(|_| make_bid_response(&request(), &mut rng))
            .unwrap();

        assert_eq!(response.id, "tid-1");
        let bids: Vec<&Bid> = response.bids().collect();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].impid, "top");
        assert_eq!((bids[0].w, bids[0].h), (Some(728), Some(90)));
        assert!(bids[0].adm.as_deref().unwrap().starts_with("<html>"));
        assert_eq!(bids[1].impid, "preroll");
        assert!(bids[1].adm.as_deref().unwrap().starts_with("<VAST"));
        assert!(bids.iter().all(|bid| bid.price > 0.0));
    }

    #[test]
    fn empty_request_gets_no_bid() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(make_bid_response(&BidRequest::default(), &mut rng).is_none());
    }
}
