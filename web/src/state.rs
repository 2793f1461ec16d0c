use analysis_service::{AnalysisService, SubredditDirectory};
use database::Database;
use std::sync::Arc;

pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub directory: Arc<SubredditDirectory>,
    pub database: Arc<Database>,
}
