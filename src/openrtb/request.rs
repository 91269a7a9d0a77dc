// src/openrtb/request.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenRTB BidRequest 结构体
///
/// 只对核心流程需要的字段做强类型建模，其余字段通过 `extra` 原样保留，
/// 这样与存储模板做 merge-patch 时不会丢失任何字段。
/// 所有可选字段在为空时都不序列化：缺失字段在 merge-patch 中表示“继承模板值”。
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BidRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// 广告展示请求列表；为空时视为未提供，允许从模板继承
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imp: Vec<Imp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regs: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wseat: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bseat: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allimps: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cur: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wlang: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcat: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badv: Option<Vec<String>>,

    /// 扩展字段，可能携带 `prebid.storedrequest`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// 单个广告展示请求
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Imp {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instl: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidfloorcur: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Banner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Vec<Format>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topframe: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<i32>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// banner 可接受的尺寸；也可以用宽高比描述（wratio/hratio/wmin）
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Format {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wratio: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hratio: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wmin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Format {
    pub fn sized(w: u32, h: u32) -> Self {
        Self {
            w: Some(w),
            h: Some(h),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Video {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minduration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxduration: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startdelay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playbackmethod: Option<Vec<i32>>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Site {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct App {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Publisher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Device {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ua: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyeruid: Option<String>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fd: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// `BidRequest.ext` 中与存储请求相关的部分，其它扩展字段忽略
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtBidRequest {
    pub prebid: Option<ExtRequestPrebid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtRequestPrebid {
    pub storedrequest: Option<ExtStoredRequest>,
}

/// `Imp.ext` 中与存储请求相关的部分
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtImp {
    pub prebid: Option<ExtImpPrebid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtImpPrebid {
    pub storedrequest: Option<ExtStoredRequest>,
}

/// `ext.prebid.storedrequest`：出现时必须带 id
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExtStoredRequest {
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "id": "req-1",
            "imp": [{"id": "imp-1", "displaymanager": "dm", "banner": {"w": 300, "h": 250, "mimes": ["a"]}}],
            "tmax": 500,
            "customfield": {"a": 1}
        });

        let request: BidRequest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(request.tmax, Some(500));
        assert_eq!(request.imp[0].extra.get("displaymanager"), Some(&json!("dm")));

        assert_eq!(serde_json::to_value(&request).unwrap(), raw);
    }

    #[test]
    fn banner_formats_keep_ext_and_flexible_sizes() {
        let raw = json!({
            "id": "req-1",
            "imp": [{
                "id": "imp-1",
                "banner": {"format": [
                    {"w": 300, "h": 250, "ext": {"k": 1}},
                    {"wratio": 16, "hratio": 9, "wmin": 300}
                ]}
            }]
        });

        let request: BidRequest = serde_json::from_value(raw.clone()).unwrap();
        let formats = request.imp[0].banner.as_ref().unwrap().format.as_ref().unwrap();
        assert_eq!(formats[0].ext, Some(json!({"k": 1})));
        assert_eq!(formats[1].w, None);
        assert_eq!(formats[1].wratio, Some(16));

        assert_eq!(serde_json::to_value(&request).unwrap(), raw);
    }

    #[test]
    fn absent_optionals_are_not_serialized() {
        let request = BidRequest {
            id: "req-1".to_string(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"id": "req-1"}));
    }
}
