#[cfg(test)]
mod tests {
    use crate::{Database, InMemoryCache, DEFAULT_TRACKED_COMMUNITIES};
    use analytics_core::{CacheError, ClassificationCache, ClassificationResult, Subreddit};
    use chrono::{Duration, TimeZone, Utc};
    use std::env;

    async fn setup_test_db() -> Database {
        let db_path = env::temp_dir().join(format!("test_reddit_analytics_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let mut db = Database::new(db_url);
        db.connect()
            .await
            .expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");

        db
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sample_subreddit(name: &str, members: u64) -> Subreddit {
        Subreddit {
            id: format!("t5_{}", name),
            name: name.to_string(),
            member_count: members,
            description: Some(format!("All about {}", name)),
            url: format!("https://reddit.com/r/{}", name),
            created_at: Utc.timestamp_opt(1_200_000_000, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_queries_fail_before_connect() {
        let db = Database::new("sqlite::memory:".to_string());
        assert!(matches!(db.pool(), Err(CacheError::NotConnected)));
        assert!(matches!(
            db.lookup(&ids(&["a"])).await,
            Err(CacheError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_migrations_are_rerunnable() {
        let db = setup_test_db().await;
        db.run_migrations().await.expect("second migration run");
        assert_eq!(db.classification_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_classification_store_and_lookup() {
        let db = setup_test_db().await;
        let result = ClassificationResult::new(true, false, false, true);
        db.store("abc", &result).await.unwrap();

        let found = db.lookup(&ids(&["abc", "missing"])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get("abc"), Some(&result));
        assert!(!found["abc"].is_other());

        assert!(db.lookup(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_entries_are_write_once() {
        let db = setup_test_db().await;
        let first = ClassificationResult::new(false, true, false, false);
        let second = ClassificationResult::new(false, false, true, false);

        db.store("post", &first).await.unwrap();
        db.store("post", &second).await.unwrap();

        let found = db.lookup(&ids(&["post"])).await.unwrap();
        assert_eq!(found["post"], first);
        assert_eq!(db.classification_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_spans_chunks() {
        let db = setup_test_db().await;
        let all: Vec<String> = (0..1200).map(|i| format!("p{}", i)).collect();
        for id in all.iter().step_by(100) {
            db.store(id, &ClassificationResult::new(false, false, false, false))
                .await
                .unwrap();
        }

        let found = db.lookup(&all).await.unwrap();
        assert_eq!(found.len(), 12);
        assert!(found["p1100"].is_other());
    }

    #[tokio::test]
    async fn test_subreddit_upsert_and_order() {
        let db = setup_test_db().await;
        let refreshed_at = Utc::now() - Duration::hours(30);
        db.upsert_subreddit(&sample_subreddit("rust", 100), refreshed_at)
            .await
            .unwrap();
        db.upsert_subreddit(&sample_subreddit("golang", 50), refreshed_at)
            .await
            .unwrap();

        let stored = db
            .get_subreddits(&ids(&["golang", "unknown", "Rust"]))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].subreddit.name, "golang");
        assert_eq!(stored[1].subreddit.name, "rust");
        assert_eq!(stored[1].updated_at.timestamp(), refreshed_at.timestamp());

        let now = Utc::now();
        db.upsert_subreddit(&sample_subreddit("rust", 150), now)
            .await
            .unwrap();
        let stored = db.get_subreddits(&ids(&["rust"])).await.unwrap();
        assert_eq!(stored[0].subreddit.member_count, 150);
        assert_eq!(stored[0].updated_at.timestamp(), now.timestamp());
    }

    #[tokio::test]
    async fn test_tracked_list_is_seeded_once() {
        let db = setup_test_db().await;
        let initial = db.list_tracked().await.unwrap();
        assert_eq!(initial, DEFAULT_TRACKED_COMMUNITIES.to_vec());

        for name in DEFAULT_TRACKED_COMMUNITIES {
            assert!(db.remove_tracked(name).await.unwrap());
        }
        assert!(db.list_tracked().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tracked_add_and_remove() {
        let db = setup_test_db().await;

        assert!(db.add_tracked("Rust").await.unwrap());
        assert!(!db.add_tracked("rust").await.unwrap());
        assert!(!db.add_tracked("openai").await.unwrap());

        let names = db.list_tracked().await.unwrap();
        assert_eq!(names.last().map(String::as_str), Some("rust"));
        assert_eq!(names.len(), DEFAULT_TRACKED_COMMUNITIES.len() + 1);

        assert!(db.remove_tracked("startups").await.unwrap());
        assert!(!db.remove_tracked("startups").await.unwrap());
        assert!(db.add_tracked("startups").await.unwrap());

        let names = db.list_tracked().await.unwrap();
        assert_eq!(names.last().map(String::as_str), Some("startups"));
        assert_eq!(names[0], "cscareerquestions");
    }

    #[tokio::test]
    async fn test_basic_functionality() {
        let db = setup_test_db().await;

        db.save_setting("test_key", "test_value")
            .await
            .expect("Failed to save setting");
        db.save_setting("test_key", "updated_value")
            .await
            .expect("Failed to overwrite setting");
        let value = db
            .get_setting("test_key")
            .await
            .expect("Failed to get setting");
        assert_eq!(value, Some("updated_value".to_string()));
        assert_eq!(db.get_setting("absent").await.unwrap(), None);
    }

    #[test]
    fn test_in_memory_cache() {
        let cache = InMemoryCache::new();
        let result = ClassificationResult::new(false, false, true, false);

        tokio_test::block_on(async {
            cache.store("a", &result).await.unwrap();
            cache
                .store("a", &ClassificationResult::new(true, false, false, false))
                .await
                .unwrap();

            let found = cache.lookup(&ids(&["a", "b"])).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found["a"], result);
            assert_eq!(cache.len().await, 1);
        });
    }
}
