//! Collapses articles that represent the same underlying content.

use std::collections::HashSet;

use crate::article::Article;

/// Stable, order-preserving filter keeping the first occurrence per content id.
///
/// Idempotent: applying it twice is the same as applying it once. Runs after
/// normalization, before ranking, and again after merging phase results, since
/// a merge can reintroduce the same syndicated story from two providers.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::with_capacity(articles.len());
    articles
        .into_iter()
        .filter(|article| seen.insert(article.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::test_article;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut first = test_article("a");
        first.title = "first".to_string();
        let mut duplicate = test_article("a");
        duplicate.title = "second".to_string();
        let other = test_article("b");

        let result = dedupe(vec![first, other, duplicate]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[0].title, "first");
        assert_eq!(result[1].id, "b");
    }

    #[test]
    fn is_idempotent_and_never_grows() {
        let input = vec![
            test_article("a"),
            test_article("b"),
            test_article("a"),
            test_article("c"),
            test_article("b"),
        ];
        let once = dedupe(input.clone());
        let twice = dedupe(once.clone());
        assert!(once.len() <= input.len());
        assert_eq!(
            once.iter().map(|a| &a.id).collect::<Vec<_>>(),
            twice.iter().map(|a| &a.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
