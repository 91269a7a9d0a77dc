// src/model/context.rs

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::openrtb::request::{App, User};

/// `uids` cookie：记录各个 bidder 家族的用户 id
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UidsCookie {
    #[serde(default)]
    pub uids: HashMap<String, String>,
}

impl UidsCookie {
    pub fn new(uids: HashMap<String, String>) -> Self {
        Self { uids }
    }

    /// 解析 base64(JSON) 形式的 cookie 值，解析失败时退化为空 cookie
    pub fn from_cookie_value(value: &str) -> Self {
        let decoded = match URL_SAFE.decode(value.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to decode uids cookie: {}", e);
                return Self::default();
            }
        };
        serde_json::from_slice(&decoded).unwrap_or_else(|e| {
            warn!("Failed to parse uids cookie: {}", e);
            Self::default()
        })
    }

    pub fn uid_from(&self, family_name: &str) -> Option<&str> {
        self.uids.get(family_name).map(String::as_str)
    }
}

/// 单次竞价的共享上下文
#[derive(Debug, Clone, Default)]
pub struct PreBidRequestContext {
    pub uids_cookie: UidsCookie,
    /// 超时预算（毫秒）
    pub timeout: u64,
    pub is_debug: bool,
    pub app: Option<App>,
    pub user: Option<User>,
    pub referer: Option<String>,
    pub domain: Option<String>,
    pub ip: Option<String>,
    pub ua: Option<String>,
    /// 交易 id（transaction id）
    pub tid: String,
}

impl PreBidRequestContext {
    pub fn is_app(&self) -> bool {
        self.app.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_uids_cookie() {
        let value = URL_SAFE.encode(r#"{"uids":{"indexExchange":"buyer-1"},"bday":"2017-08-15T19:47:59.523908376Z"}"#);
        let cookie = UidsCookie::from_cookie_value(&value);
        assert_eq!(cookie.uid_from("indexExchange"), Some("buyer-1"));
        assert_eq!(cookie.uid_from("rubicon"), None);
    }

    #[test]
    fn malformed_cookie_is_empty() {
        assert!(UidsCookie::from_cookie_value("%%%").uids.is_empty());
        let not_json = URL_SAFE.encode("not json");
        assert!(UidsCookie::from_cookie_value(&not_json).uids.is_empty());
    }
}
