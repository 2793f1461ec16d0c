use analysis_service::BatchClassifier;
use analytics_core::AppConfig;
use database::InMemoryCache;
use llm_interface::OpenAiProvider;
use reddit_client::{PostFetcher, RedditClient, RedditClientConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let community = std::env::args().nth(1).unwrap_or_else(|| "startups".to_string());
    let config = AppConfig::load()?;

    let reddit = RedditClient::new(RedditClientConfig::from_app_config(&config)?)?;
    let categorizer = Arc::new(OpenAiProvider::from_config(&config.llm)?);
    let classifier = BatchClassifier::new(categorizer, Arc::new(InMemoryCache::new()));

    let posts: Vec<_> = reddit
        .fetch_recent_posts(&community)
        .await?
        .into_iter()
        .take(5)
        .collect();
    println!("Categorizing {} posts from r/{}\n", posts.len(), community);

    let progress = |percent: f64| println!("  progress: {:.0}%", percent);
    let results = classifier.classify_posts(&posts, Some(&progress)).await?;

    for post in &posts {
        println!("{}", post.title);
        match results.get(&post.id) {
            Some(result) => {
                let labels: Vec<&str> = result.categories().iter().map(|c| c.label()).collect();
                println!("  -> {}", labels.join(", "));
            }
            None => println!("  -> (not classified)"),
        }
    }

    Ok(())
}
