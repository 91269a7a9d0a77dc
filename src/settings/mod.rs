// src/settings/mod.rs

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::FetchError;
use crate::model::stored::StoredRequestResult;

/// 存储请求读取接口：按 id 集合一次性批量读取
#[async_trait]
pub trait StoredRequestFetcher: Send + Sync {
    async fn get_stored_requests_by_id(
        &self,
        ids: &HashSet<String>,
    ) -> Result<StoredRequestResult, FetchError>;
}

fn lookup(ids: &HashSet<String>, source: &HashMap<String, String>) -> StoredRequestResult {
    let mut stored_id_to_json = HashMap::with_capacity(ids.len());
    let mut errors = Vec::new();
    for id in ids {
        match source.get(id) {
            Some(json) => {
                stored_id_to_json.insert(id.clone(), json.clone());
            }
            None => errors.push(format!("No stored request found for id: {}", id)),
        }
    }
    // HashSet 迭代顺序不固定，排序后错误信息稳定
    errors.sort();
    StoredRequestResult::new(stored_id_to_json, errors)
}

/// 从目录加载存储请求：每个 `<id>.json` 文件对应一个存储请求
pub struct FileStoredRequestFetcher {
    stored_requests: HashMap<String, String>,
}

impl FileStoredRequestFetcher {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let dir = dir.as_ref();
        let mut stored_requests = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            debug!("Loaded stored request {} from {:?}", id, path);
            stored_requests.insert(id.to_string(), content);
        }
        info!(
            "Loaded {} stored requests from {}",
            stored_requests.len(),
            dir.display()
        );
        Ok(Self { stored_requests })
    }
}

#[async_trait]
impl StoredRequestFetcher for FileStoredRequestFetcher {
    async fn get_stored_requests_by_id(
        &self,
        ids: &HashSet<String>,
    ) -> Result<StoredRequestResult, FetchError> {
        Ok(lookup(ids, &self.stored_requests))
    }
}

/// 内存中的存储请求
#[derive(Default)]
pub struct InMemoryStoredRequestFetcher {
    stored_requests: HashMap<String, String>,
}

impl InMemoryStoredRequestFetcher {
    pub fn new(stored_requests: HashMap<String, String>) -> Self {
        Self { stored_requests }
    }
}

#[async_trait]
impl StoredRequestFetcher for InMemoryStoredRequestFetcher {
    async fn get_stored_requests_by_id(
        &self,
        ids: &HashSet<String>,
    ) -> Result<StoredRequestResult, FetchError> {
        Ok(lookup(ids, &self.stored_requests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn in_memory_reports_unknown_ids() {
        let fetcher = InMemoryStoredRequestFetcher::new(HashMap::from([(
            "1".to_string(),
            r#"{"tmax":100}"#.to_string(),
        )]));

        let result = fetcher
            .get_stored_requests_by_id(&ids(&["1", "2"]))
            .await
            .unwrap();

        assert_eq!(result.stored_id_to_json.get("1").unwrap(), r#"{"tmax":100}"#);
        assert_eq!(result.errors, vec!["No stored request found for id: 2".to_string()]);
    }

    #[tokio::test]
    async fn file_fetcher_loads_json_files_by_stem() {
        let dir = std::env::temp_dir().join(format!("stored-requests-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("abc.json"), r#"{"at":2}"#).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let fetcher = FileStoredRequestFetcher::load(&dir).unwrap();
        let result = fetcher
            .get_stored_requests_by_id(&ids(&["abc", "notes"]))
            .await
            .unwrap();

        assert_eq!(result.stored_id_to_json.get("abc").unwrap(), r#"{"at":2}"#);
        assert_eq!(result.errors, vec!["No stored request found for id: notes".to_string()]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_fetcher_fails_on_missing_directory() {
        let result = FileStoredRequestFetcher::load("/definitely/not/here");
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
