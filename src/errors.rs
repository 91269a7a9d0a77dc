// src/errors.rs

use thiserror::Error;

/// 存储请求解析失败：携带全部错误信息，一次性返回给调用方
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", messages.join("\n"))]
pub struct InvalidRequestError {
    pub messages: Vec<String>,
}

impl InvalidRequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    pub fn from_messages(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

/// 存储后端（stored request store）错误
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored request store is unavailable: {0}")]
    Unavailable(String),
}

/// Merge-patch 执行失败
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("origin object can't be turned into a patch: {0}")]
    Patch(#[source] serde_json::Error),

    #[error("merged document can't be converted back: {0}")]
    Convert(#[source] serde_json::Error),
}

/// HTTP 调度层的结果：超时与其它传输错误分开
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

/// 适配器校验失败；Display 即写入 `BidderStatus.error` 的文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{0} doesn't support apps")]
    AppNotSupported(String),

    #[error("{0} params section is missing")]
    ParamsMissing(String),

    #[error("unmarshal params '{raw}' failed: {cause}")]
    ParamsUnmarshal { raw: String, cause: String },

    #[error("Missing {0} param")]
    MissingParam(&'static str),

    #[error("Invalid AdUnit: VIDEO media type with no video data")]
    InvalidVideo,

    #[error("openRTB bids need at least one Imp")]
    NoImps,

    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("URL supplied is not valid")]
    InvalidEndpoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_joins_all_messages() {
        let error = InvalidRequestError::from_messages(vec![
            "Id is not found in storedRequest".to_string(),
            "Id is not found in storedRequest".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Id is not found in storedRequest\nId is not found in storedRequest"
        );
    }

    #[test]
    fn adapter_errors_render_status_text() {
        assert_eq!(
            AdapterError::ParamsMissing("IndexExchange".into()).to_string(),
            "IndexExchange params section is missing"
        );
        assert_eq!(
            AdapterError::MissingParam("siteID").to_string(),
            "Missing siteID param"
        );
        assert_eq!(
            AdapterError::AppNotSupported("Index".into()).to_string(),
            "Index doesn't support apps"
        );
    }
}
