use crate::error::CacheError;
use crate::types::{ClassificationMap, ClassificationResult};
use async_trait::async_trait;

/// Persisted post id → classification store.
///
/// Entries are written once and never updated in place. Storing an id that is
/// already present must succeed and leave the existing entry untouched.
#[async_trait]
pub trait ClassificationCache: Send + Sync {
    /// Return the subset of `post_ids` that has a stored classification.
    async fn lookup(&self, post_ids: &[String]) -> Result<ClassificationMap, CacheError>;

    /// Persist one classification.
    async fn store(&self, post_id: &str, result: &ClassificationResult) -> Result<(), CacheError>;
}
