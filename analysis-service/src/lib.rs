pub mod directory;
pub mod orchestrator;
pub mod progress;
pub mod service;
pub mod themes;

pub use directory::{is_stale, SubredditDirectory};
pub use orchestrator::{BatchClassifier, DEFAULT_BATCH_SIZE};
pub use progress::{ProgressReporter, ProgressTracker};
pub use service::{AnalysisService, AnalysisSnapshot, PollSummary, PollingService};
pub use themes::group_by_theme;
