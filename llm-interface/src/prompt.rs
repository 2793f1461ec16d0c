use analytics_core::Category;
use serde_json::{json, Map, Value};

pub const SYSTEM_PROMPT: &str = "You are a post categorization assistant. Analyze Reddit posts and categorize them according to the specified categories.";

pub const SCHEMA_NAME: &str = "post_category_analysis";

const EMPTY_CONTENT_PLACEHOLDER: &str = "[No content]";

pub fn user_prompt(title: &str, content: &str) -> String {
    let content = if content.is_empty() {
        EMPTY_CONTENT_PLACEHOLDER
    } else {
        content
    };
    format!(
        "Analyze this Reddit post and categorize it:\n\nTitle: {}\nContent: {}",
        title, content
    )
}

/// JSON schema for the structured response: one required boolean per category.
pub fn category_schema() -> Value {
    let mut properties = Map::new();
    for category in Category::ALL {
        properties.insert(
            category.field_name().to_string(),
            json!({ "type": "boolean", "description": category.description() }),
        );
    }
    let required: Vec<&str> = Category::ALL.iter().map(|c| c.field_name()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "strict": true,
            "schema": category_schema()
        }
    })
}
