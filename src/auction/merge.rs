// src/auction/merge.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::MergeError;

/// RFC 7396 merge-patch：把 `patch` 应用到 `target` 上
///
/// - patch 中出现的字段覆盖 target，显式 `null` 删除对应字段
/// - patch 中缺失的字段保持 target 原值
/// - 对象递归合并，数组整体替换
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(target_fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// 以 `original` 作为 patch 合并到存储模板上，再转换回原类型
///
/// 请求方字段优先；请求方省略的字段从模板继承。
pub fn merge<T>(original: &T, stored: &Value) -> Result<T, MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let patch = serde_json::to_value(original).map_err(MergeError::Patch)?;
    let mut merged = stored.clone();
    merge_patch(&mut merged, &patch);
    serde_json::from_value(merged).map_err(MergeError::Convert)
}
