use crate::progress::{ProgressReporter, ProgressTracker};
use analytics_core::{
    ClassificationCache, ClassificationError, ClassificationMap, ClassificationResult, CoreError,
    ErrorReporter, Post,
};
use futures::future::join_all;
use llm_interface::Categorizer;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Classifies posts in fixed-size batches, consulting the cache first.
///
/// Batches run one after another; the categorizer calls inside a batch run
/// concurrently, so at most `batch_size` requests are in flight. Failures for
/// individual posts are logged and those posts are left out of the result.
pub struct BatchClassifier {
    categorizer: Arc<dyn Categorizer>,
    cache: Arc<dyn ClassificationCache>,
    batch_size: usize,
    reporter: ErrorReporter,
}

impl BatchClassifier {
    pub fn new(categorizer: Arc<dyn Categorizer>, cache: Arc<dyn ClassificationCache>) -> Self {
        Self {
            categorizer,
            cache,
            batch_size: DEFAULT_BATCH_SIZE,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, CoreError> {
        if batch_size == 0 {
            return Err(CoreError::InvalidInput {
                message: "batch size must be at least 1".to_string(),
            });
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn categorizer(&self) -> &Arc<dyn Categorizer> {
        &self.categorizer
    }

    pub async fn classify_posts(
        &self,
        posts: &[Post],
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<ClassificationMap, CoreError> {
        if posts.is_empty() {
            return Ok(ClassificationMap::new());
        }
        if let Some(index) = posts.iter().position(|post| post.id.trim().is_empty()) {
            return Err(CoreError::InvalidInput {
                message: format!("post at index {} has an empty id", index),
            });
        }

        let span = info_span!(
            "classify_posts",
            run_id = %Uuid::new_v4(),
            posts = posts.len(),
            batch_size = self.batch_size
        );
        self.run_batches(posts, progress).instrument(span).await
    }

    async fn run_batches(
        &self,
        posts: &[Post],
        progress: Option<&dyn ProgressReporter>,
    ) -> Result<ClassificationMap, CoreError> {
        let mut results = ClassificationMap::new();
        let mut tracker = ProgressTracker::new(posts.len());
        let mut processed = 0;

        for (index, batch) in posts.chunks(self.batch_size).enumerate() {
            let cache_hits = self.cached_results(batch, &results).await;
            debug!(
                "Batch {}: {} posts, {} cached",
                index + 1,
                batch.len(),
                cache_hits.len()
            );
            results.extend(cache_hits);

            let mut seen = HashSet::new();
            let pending: Vec<&Post> = batch
                .iter()
                .filter(|post| !results.contains_key(&post.id))
                .filter(|post| seen.insert(post.id.as_str()))
                .collect();

            let outcomes = join_all(pending.into_iter().map(|post| self.classify_one(post))).await;
            for (post_id, outcome) in outcomes {
                match outcome {
                    Ok(result) => {
                        results.insert(post_id, result);
                    }
                    Err(e) => {
                        debug!("Skipping post {}", post_id);
                        self.reporter.report_warning(&e);
                    }
                }
            }

            processed += batch.len();
            let percent = tracker.advance(processed);
            if let Some(progress) = progress {
                progress.report(percent);
            }
        }

        info!("Classified {}/{} posts", results.len(), posts.len());
        Ok(results)
    }

    /// Cache hits for the batch, restricted to ids not already resolved.
    /// A failed lookup counts as a miss for every post.
    async fn cached_results(&self, batch: &[Post], resolved: &ClassificationMap) -> ClassificationMap {
        let mut seen = HashSet::new();
        let ids: Vec<String> = batch
            .iter()
            .filter(|post| !resolved.contains_key(&post.id))
            .filter(|post| seen.insert(post.id.as_str()))
            .map(|post| post.id.clone())
            .collect();
        if ids.is_empty() {
            return ClassificationMap::new();
        }

        match self.cache.lookup(&ids).await {
            Ok(mut hits) => {
                hits.retain(|id, _| seen.contains(id.as_str()));
                hits
            }
            Err(e) => {
                debug!("Cache lookup failed, classifying batch uncached");
                self.reporter.report_warning(&e);
                ClassificationMap::new()
            }
        }
    }

    async fn classify_one(
        &self,
        post: &Post,
    ) -> (String, Result<ClassificationResult, ClassificationError>) {
        if post.title.trim().is_empty() {
            return (post.id.clone(), Err(ClassificationError::EmptyTitle));
        }

        let outcome = self.categorizer.classify(&post.title, &post.content).await;
        if let Ok(result) = &outcome {
            if let Err(e) = self.cache.store(&post.id, result).await {
                debug!("Classification for {} was not cached", post.id);
                self.reporter.report_warning(&e);
            }
        }
        (post.id.clone(), outcome)
    }
}
