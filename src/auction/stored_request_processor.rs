// src/auction/stored_request_processor.rs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auction::merge::merge;
use crate::errors::{InvalidRequestError, MergeError};
use crate::model::stored::StoredRequestResult;
use crate::openrtb::request::{BidRequest, ExtBidRequest, ExtImp, ExtStoredRequest, Imp};
use crate::settings::StoredRequestFetcher;

type Extractor<K> = fn(&K) -> Result<Option<ExtStoredRequest>, String>;

/// 存储请求处理器
///
/// 从 BidRequest 及其 Imp 的 `ext.prebid.storedrequest` 收集 id，
/// 一次性批量读取模板，再把原始请求作为 patch 合并到模板上。
/// 任意一步出错都返回 `InvalidRequestError`，不存在部分成功。
pub struct StoredRequestProcessor {
    fetcher: Arc<dyn StoredRequestFetcher>,
}

impl StoredRequestProcessor {
    pub fn new(fetcher: Arc<dyn StoredRequestFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn process_stored_requests(
        &self,
        bid_request: BidRequest,
    ) -> Result<BidRequest, InvalidRequestError> {
        // 请求级与 Imp 级的错误全部收集后统一返回
        let mut errors = Vec::new();
        let request_stored_id = map_stored_request_ids(
            std::slice::from_ref(&bid_request),
            stored_request_from_bid_request,
            &mut errors,
        )
        .pop()
        .flatten();
        let imp_stored_ids =
            map_stored_request_ids(&bid_request.imp, stored_request_from_imp, &mut errors);
        if !errors.is_empty() {
            return Err(InvalidRequestError::from_messages(errors));
        }

        let stored_ids: HashSet<String> = request_stored_id
            .iter()
            .chain(imp_stored_ids.iter().flatten())
            .cloned()
            .collect();
        if stored_ids.is_empty() {
            return Ok(bid_request);
        }

        debug!(
            "Fetching {} stored requests for bid request {}",
            stored_ids.len(),
            bid_request.id
        );
        let stored_result = self
            .fetcher
            .get_stored_requests_by_id(&stored_ids)
            .await
            .map_err(|e| {
                warn!("Stored request fetching failed: {}", e);
                InvalidRequestError::new(format!(
                    "Stored request fetching failed with exception: {}",
                    e
                ))
            })?;
        if !stored_result.errors.is_empty() {
            return Err(InvalidRequestError::from_messages(stored_result.errors));
        }

        merge_bid_request_and_imps(
            bid_request,
            request_stored_id.as_deref(),
            &imp_stored_ids,
            &stored_result,
        )
    }
}

fn merge_bid_request_and_imps(
    bid_request: BidRequest,
    request_stored_id: Option<&str>,
    imp_stored_ids: &[Option<String>],
    stored_result: &StoredRequestResult,
) -> Result<BidRequest, InvalidRequestError> {
    let mut merged = match request_stored_id {
        Some(id) => merge_with_stored(&bid_request, id, stored_result)?,
        None => bid_request.clone(),
    };

    if imp_stored_ids.iter().any(Option::is_some) {
        merged.imp = bid_request
            .imp
            .into_iter()
            .zip(imp_stored_ids)
            .map(|(imp, stored_id)| match stored_id {
                Some(id) => merge_with_stored(&imp, id, stored_result),
                None => Ok(imp),
            })
            .collect::<Result<Vec<Imp>, _>>()?;
    }
    Ok(merged)
}

/// 将对象与 id 对应的存储 JSON 合并，并转换回原类型
fn merge_with_stored<T>(
    original: &T,
    stored_id: &str,
    stored_result: &StoredRequestResult,
) -> Result<T, InvalidRequestError>
where
    T: Serialize + DeserializeOwned,
{
    let stored_json: Value = stored_result
        .stored_id_to_json
        .get(stored_id)
        .and_then(|json| serde_json::from_str(json).ok())
        .ok_or_else(|| {
            InvalidRequestError::new(format!(
                "Can't parse Json for stored request with id {}",
                stored_id
            ))
        })?;

    merge(original, &stored_json).map_err(|e| match e {
        MergeError::Patch(cause) => {
            let message = format!(
                "Couldn't create merge patch from origin object node for storedRequestId {}",
                stored_id
            );
            warn!("{}: {}", message, cause);
            InvalidRequestError::new(message)
        }
        MergeError::Convert(cause) => {
            debug!("Merged stored request {} is not convertible: {}", stored_id, cause);
            InvalidRequestError::new(format!(
                "Can't convert merging result for storedRequestId {}",
                stored_id
            ))
        }
    })
}

/// 逐个扫描持有者，返回与输入顺序一致的 id 列表；错误追加到 `errors`
fn map_stored_request_ids<K>(
    holders: &[K],
    extractor: Extractor<K>,
    errors: &mut Vec<String>,
) -> Vec<Option<String>> {
    holders
        .iter()
        .map(|holder| match extractor(holder) {
            Ok(Some(ExtStoredRequest { id: Some(id) })) => Some(id),
            Ok(Some(ExtStoredRequest { id: None })) => {
                errors.push("Id is not found in storedRequest".to_string());
                None
            }
            Ok(None) => None,
            Err(message) => {
                errors.push(message);
                None
            }
        })
        .collect()
}

fn stored_request_from_bid_request(
    bid_request: &BidRequest,
) -> Result<Option<ExtStoredRequest>, String> {
    let Some(ext) = &bid_request.ext else {
        return Ok(None);
    };
    ExtBidRequest::deserialize(ext)
        .map(|ext| ext.prebid.and_then(|prebid| prebid.storedrequest))
        .map_err(|_| {
            format!(
                "Incorrect bid request extension format for bidRequest with id {}",
                bid_request.id
            )
        })
}

fn stored_request_from_imp(imp: &Imp) -> Result<Option<ExtStoredRequest>, String> {
    let Some(ext) = &imp.ext else {
        return Ok(None);
    };
    ExtImp::deserialize(ext)
        .map(|ext| ext.prebid.and_then(|prebid| prebid.storedrequest))
        .map_err(|_| format!("Incorrect Imp extension format for Imp with id {}", imp.id))
}
