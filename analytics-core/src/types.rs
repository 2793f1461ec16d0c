use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping of post id to its classification, as returned by the batch classifier.
pub type ClassificationMap = HashMap<String, ClassificationResult>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub score: i64,
    pub num_comments: u64,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

/// The qualitative buckets a post can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    SolutionRequest,
    PainPoint,
    Idea,
    AdviceRequest,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::SolutionRequest,
        Category::PainPoint,
        Category::Idea,
        Category::AdviceRequest,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::SolutionRequest => "Solution Request",
            Category::PainPoint => "Pain Point",
            Category::Idea => "Idea",
            Category::AdviceRequest => "Advice Request",
            Category::Other => "Other",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::SolutionRequest => "Posts asking for solutions to problems",
            Category::PainPoint => "Posts expressing pain points or problems",
            Category::Idea => "Posts introducing new ideas or concepts, including startup ideas",
            Category::AdviceRequest => "Posts asking for advice",
            Category::Other => "Only true if post does not fit into any other category",
        }
    }

    /// Field name used in the structured-output schema and JSON payloads.
    pub fn field_name(&self) -> &'static str {
        match self {
            Category::SolutionRequest => "isSolutionRequest",
            Category::PainPoint => "isPainPoint",
            Category::Idea => "isIdea",
            Category::AdviceRequest => "isAdviceRequest",
            Category::Other => "isOther",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw category flags exactly as a classifier or a stored row reports them.
///
/// `is_other` here is whatever the source said; it is discarded when the flags
/// are turned into a [`ClassificationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryFlags {
    pub is_solution_request: bool,
    pub is_pain_point: bool,
    pub is_idea: bool,
    pub is_advice_request: bool,
    pub is_other: bool,
}

/// Classification of a single post.
///
/// `is_other` is always the NOR of the four other flags. The fields are private
/// so no value can be built that breaks this, including through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CategoryFlags")]
pub struct ClassificationResult {
    is_solution_request: bool,
    is_pain_point: bool,
    is_idea: bool,
    is_advice_request: bool,
    is_other: bool,
}

impl ClassificationResult {
    pub fn new(
        is_solution_request: bool,
        is_pain_point: bool,
        is_idea: bool,
        is_advice_request: bool,
    ) -> Self {
        Self {
            is_solution_request,
            is_pain_point,
            is_idea,
            is_advice_request,
            is_other: !(is_solution_request || is_pain_point || is_idea || is_advice_request),
        }
    }

    pub fn from_categories(categories: &[Category]) -> Self {
        Self::new(
            categories.contains(&Category::SolutionRequest),
            categories.contains(&Category::PainPoint),
            categories.contains(&Category::Idea),
            categories.contains(&Category::AdviceRequest),
        )
    }

    pub fn is_solution_request(&self) -> bool {
        self.is_solution_request
    }

    pub fn is_pain_point(&self) -> bool {
        self.is_pain_point
    }

    pub fn is_idea(&self) -> bool {
        self.is_idea
    }

    pub fn is_advice_request(&self) -> bool {
        self.is_advice_request
    }

    pub fn is_other(&self) -> bool {
        self.is_other
    }

    pub fn has(&self, category: Category) -> bool {
        match category {
            Category::SolutionRequest => self.is_solution_request,
            Category::PainPoint => self.is_pain_point,
            Category::Idea => self.is_idea,
            Category::AdviceRequest => self.is_advice_request,
            Category::Other => self.is_other,
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.has(*category))
            .collect()
    }
}

impl From<CategoryFlags> for ClassificationResult {
    fn from(flags: CategoryFlags) -> Self {
        // flags.is_other is ignored on purpose: it is recomputed from the rest.
        Self::new(
            flags.is_solution_request,
            flags.is_pain_point,
            flags.is_idea,
            flags.is_advice_request,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subreddit {
    /// Reddit fullname, e.g. `t5_2qh33`.
    pub id: String,
    /// Lowercase display name.
    pub name: String,
    pub member_count: u64,
    pub description: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Posts grouped under one category for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeCategory {
    pub category: Category,
    pub name: String,
    pub description: String,
    pub posts: Vec<Post>,
}

impl ThemeCategory {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            name: category.label().to_string(),
            description: category.description().to_string(),
            posts: Vec::new(),
        }
    }
}
