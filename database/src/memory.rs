use analytics_core::{CacheError, ClassificationCache, ClassificationMap, ClassificationResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local classification cache, used when no database is configured
/// and in tests.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, ClassificationResult>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ClassificationCache for InMemoryCache {
    async fn lookup(&self, post_ids: &[String]) -> Result<ClassificationMap, CacheError> {
        let entries = self.entries.read().await;
        Ok(post_ids
            .iter()
            .filter_map(|id| entries.get(id).map(|result| (id.clone(), result.clone())))
            .collect())
    }

    async fn store(&self, post_id: &str, result: &ClassificationResult) -> Result<(), CacheError> {
        self.entries
            .write()
            .await
            .entry(post_id.to_string())
            .or_insert_with(|| result.clone());
        Ok(())
    }
}
