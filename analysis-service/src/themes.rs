use analytics_core::{Category, ClassificationMap, Post, ThemeCategory};

/// Group classified posts under one theme per category, in `Category::ALL`
/// order. Posts keep their input order; unclassified posts are dropped and a
/// post flagged with several categories appears under each of them.
pub fn group_by_theme(posts: &[Post], classifications: &ClassificationMap) -> Vec<ThemeCategory> {
    Category::ALL
        .iter()
        .map(|&category| {
            let mut theme = ThemeCategory::empty(category);
            theme.posts = posts
                .iter()
                .filter(|post| {
                    classifications
                        .get(&post.id)
                        .map_or(false, |result| result.has(category))
                })
                .cloned()
                .collect();
            theme
        })
        .collect()
}
