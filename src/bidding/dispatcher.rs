// src/bidding/dispatcher.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::DispatchError;

/// 所有出站竞价请求的标准请求头
pub static DEFAULT_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=utf-8"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
});

/// 出站 HTTP 请求（POST）
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub uri: String,
    pub headers: HeaderMap,
    pub body: String,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn post_json(uri: &str, body: String, timeout: Duration) -> Self {
        Self {
            uri: uri.to_string(),
            headers: DEFAULT_HEADERS.clone(),
            body,
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
}

/// HTTP 调度接口：超时由调用方随请求传入，结果中区分超时与其它传输错误
#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, DispatchError>;
}

/// 基于 reqwest 的调度实现
#[derive(Clone, Default)]
pub struct ReqwestDispatcher {
    client: Client,
}

impl ReqwestDispatcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify(error: reqwest::Error) -> DispatchError {
    if error.is_timeout() {
        DispatchError::Timeout
    } else {
        DispatchError::Transport(error.to_string())
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, DispatchError> {
        debug!("POST {} (timeout {:?})", request.uri, request.timeout);
        let response = self
            .client
            .post(&request.uri)
            .headers(request.headers)
            .timeout(request.timeout)
            .body(request.body)
            .send()
            .await
            .map_err(classify)?;

        let status_code = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(HttpResponse { status_code, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_json_carries_standard_headers() {
        let request = HttpRequest::post_json("http://exchange.org", "{}".to_string(), Duration::from_millis(1000));

        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json;charset=utf-8");
        assert_eq!(request.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(request.timeout, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let dispatcher = ReqwestDispatcher::default();
        let request = HttpRequest::post_json("http://127.0.0.1:1/bid", "{}".to_string(), Duration::from_secs(2));

        let error = dispatcher.dispatch(request).await.unwrap_err();
        assert!(matches!(error, DispatchError::Transport(_)));
    }
}
