use crate::orchestrator::BatchClassifier;
use crate::themes::group_by_theme;
use analytics_core::{
    ClassificationMap, ClassificationResult, CoreError, ErrorReporter, Post, ThemeCategory,
};
use chrono::{DateTime, Utc};
use database::Database;
use reddit_client::{normalize_community_name, PostFetcher};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

const ALL_FAILED_NOTICE: &str = "Failed to analyze posts";

/// Result of one fetch-and-classify run for a community.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub community: String,
    pub posts: Vec<Post>,
    pub classifications: ClassificationMap,
    pub themes: Vec<ThemeCategory>,
    pub progress: f64,
    pub completed_at: DateTime<Utc>,
    /// Set when posts were fetched but none could be classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub struct AnalysisService {
    fetcher: Arc<dyn PostFetcher>,
    classifier: Arc<BatchClassifier>,
    snapshots: RwLock<HashMap<String, AnalysisSnapshot>>,
    progress: RwLock<HashMap<String, watch::Sender<f64>>>,
    /// One run at a time per community.
    runs: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AnalysisService {
    pub fn new(fetcher: Arc<dyn PostFetcher>, classifier: Arc<BatchClassifier>) -> Self {
        Self {
            fetcher,
            classifier,
            snapshots: RwLock::new(HashMap::new()),
            progress: RwLock::new(HashMap::new()),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub async fn fetch_posts(&self, community: &str) -> Result<Vec<Post>, CoreError> {
        Ok(self.fetcher.fetch_recent_posts(community).await?)
    }

    /// Classify free-standing text. Nothing is cached since there is no post id.
    pub async fn classify_text(
        &self,
        title: &str,
        content: &str,
    ) -> Result<ClassificationResult, CoreError> {
        Ok(self.classifier.categorizer().classify(title, content).await?)
    }

    /// Fetch, classify and group the recent posts of `community`, replacing
    /// its stored snapshot.
    ///
    /// A call made while another run for the same community is in flight
    /// waits for it and returns its snapshot instead of starting over.
    pub async fn analyze_community(&self, community: &str) -> Result<AnalysisSnapshot, CoreError> {
        let community = normalize_community_name(community)?;
        let lock = self.run_lock(&community).await;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let waiting_since = Utc::now();
                let guard = lock.lock().await;
                if let Some(snapshot) = self.snapshots.read().await.get(&community) {
                    if snapshot.completed_at >= waiting_since {
                        debug!("r/{}: joined in-flight analysis", community);
                        return Ok(snapshot.clone());
                    }
                }
                guard
            }
        };

        let span = info_span!("analyze_community", community = %community, run_id = %Uuid::new_v4());
        self.run_analysis(community).instrument(span).await
    }

    async fn run_lock(&self, community: &str) -> Arc<Mutex<()>> {
        self.runs
            .lock()
            .await
            .entry(community.to_string())
            .or_default()
            .clone()
    }

    async fn run_analysis(&self, community: String) -> Result<AnalysisSnapshot, CoreError> {
        let progress = self.progress_sender(&community).await;
        progress.send_replace(0.0);

        let posts = self.fetcher.fetch_recent_posts(&community).await?;

        let reporter = {
            let progress = progress.clone();
            move |percent: f64| {
                progress.send_replace(percent);
            }
        };
        let classifications = self
            .classifier
            .classify_posts(&posts, Some(&reporter))
            .await?;
        if posts.is_empty() {
            progress.send_replace(100.0);
        }

        let notice = (!posts.is_empty() && classifications.is_empty())
            .then(|| ALL_FAILED_NOTICE.to_string());
        let snapshot = AnalysisSnapshot {
            themes: group_by_theme(&posts, &classifications),
            community: community.clone(),
            classifications,
            posts,
            progress: *progress.borrow(),
            completed_at: Utc::now(),
            notice,
        };

        info!(
            "r/{}: {} posts, {} classified",
            community,
            snapshot.posts.len(),
            snapshot.classifications.len()
        );
        self.snapshots
            .write()
            .await
            .insert(community, snapshot.clone());
        Ok(snapshot)
    }

    pub async fn snapshot(&self, community: &str) -> Option<AnalysisSnapshot> {
        let community = normalize_community_name(community).ok()?;
        self.snapshots.read().await.get(&community).cloned()
    }

    /// The stored snapshot, or a fresh analysis when none exists yet.
    pub async fn snapshot_or_analyze(&self, community: &str) -> Result<AnalysisSnapshot, CoreError> {
        match self.snapshot(community).await {
            Some(snapshot) => Ok(snapshot),
            None => self.analyze_community(community).await,
        }
    }

    /// Last progress value observed for `community`, if it was ever analyzed.
    pub async fn progress(&self, community: &str) -> Option<f64> {
        let community = normalize_community_name(community).ok()?;
        self.progress
            .read()
            .await
            .get(&community)
            .map(|sender| *sender.borrow())
    }

    pub async fn subscribe_progress(&self, community: &str) -> Result<watch::Receiver<f64>, CoreError> {
        let community = normalize_community_name(community)?;
        Ok(self.progress_sender(&community).await.subscribe())
    }

    async fn progress_sender(&self, community: &str) -> watch::Sender<f64> {
        if let Some(sender) = self.progress.read().await.get(community) {
            return sender.clone();
        }
        self.progress
            .write()
            .await
            .entry(community.to_string())
            .or_insert_with(|| watch::channel(0.0).0)
            .clone()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Periodically analyzes every tracked community.
pub struct PollingService {
    service: Arc<AnalysisService>,
    database: Arc<Database>,
    interval: Duration,
    reporter: ErrorReporter,
}

impl PollingService {
    pub fn new(service: Arc<AnalysisService>, database: Arc<Database>, polling_interval_minutes: u64) -> Self {
        Self {
            service,
            database,
            interval: Duration::from_secs(polling_interval_minutes.max(1) * 60),
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll on every tick until `shutdown` turns true or its sender is dropped.
    /// The first poll runs immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Polling tracked communities every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.poll_once().await;
                    info!(
                        "Poll finished: {} succeeded, {} failed",
                        summary.succeeded, summary.failed
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Polling service stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Analyze every tracked community once. A failing community does not
    /// stop the others.
    pub async fn poll_once(&self) -> PollSummary {
        let mut summary = PollSummary::default();
        let communities = match self.database.list_tracked().await {
            Ok(communities) => communities,
            Err(e) => {
                self.reporter.report_error(&e);
                return summary;
            }
        };

        for community in communities {
            match self.service.analyze_community(&community).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    self.reporter.report_error(&e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}
