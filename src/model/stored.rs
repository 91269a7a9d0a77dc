// src/model/stored.rs

use std::collections::HashMap;

/// 批量读取存储请求的结果；`errors` 非空时整个解析失败
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRequestResult {
    pub stored_id_to_json: HashMap<String, String>,
    pub errors: Vec<String>,
}

impl StoredRequestResult {
    pub fn new(stored_id_to_json: HashMap<String, String>, errors: Vec<String>) -> Self {
        Self {
            stored_id_to_json,
            errors,
        }
    }
}
