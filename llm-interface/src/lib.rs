pub mod openai;
pub mod prompt;

pub use openai::OpenAiProvider;

use analytics_core::{ClassificationError, ClassificationResult};
use async_trait::async_trait;

/// Classifies a single post into category flags.
///
/// Implementations must return results whose `is_other` flag is derived from
/// the four other flags, never taken from the model.
#[async_trait]
pub trait Categorizer: Send + Sync {
    async fn classify(
        &self,
        title: &str,
        content: &str,
    ) -> Result<ClassificationResult, ClassificationError>;
}
