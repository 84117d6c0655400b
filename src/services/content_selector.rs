use rand::seq::{index, IndexedRandom, SliceRandom};

use crate::{
    db::ContentStore,
    error::Result,
    models::GameItem,
};

/// Narrows the content pool by category/level/exclusions and draws from it.
/// Both the live game endpoints and duel question-fixing go through here so
/// they share the same exclusion semantics.
pub struct ContentSelector<S> {
    store: S,
}

impl<S: ContentStore> ContentSelector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// One uniform-random item for the given category and exact level, or
    /// `None` when nothing survives the exclusion filter. The caller decides
    /// whether that is a 404 or an empty success.
    pub async fn pick_one(
        &self,
        category_id: i64,
        level: i32,
        exclude_ids: &[i64],
    ) -> Result<Option<GameItem>> {
        let candidates = self
            .store
            .fetch_game_items(Some(category_id), Some(level))
            .await?;
        let remaining = filter_excluded(candidates, exclude_ids);

        let mut rng = rand::rng();
        Ok(remaining.choose(&mut rng).cloned())
    }

    /// Uniform sample of `min(count, candidates)` items without replacement.
    /// Level 0 means "any level" on this path only. The caller is responsible
    /// for checking the returned count against its own minimum.
    pub async fn pick_batch(&self, level: i32, count: usize) -> Result<Vec<GameItem>> {
        let level_filter = if level > 0 { Some(level) } else { None };
        let candidates = self.store.fetch_game_items(None, level_filter).await?;
        Ok(sample_items(candidates, count))
    }
}

pub fn filter_excluded(items: Vec<GameItem>, exclude_ids: &[i64]) -> Vec<GameItem> {
    if exclude_ids.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| !exclude_ids.contains(&item.id))
        .collect()
}

pub fn sample_items(items: Vec<GameItem>, count: usize) -> Vec<GameItem> {
    let amount = count.min(items.len());
    if amount == 0 {
        return Vec::new();
    }

    let mut rng = rand::rng();
    index::sample(&mut rng, items.len(), amount)
        .into_iter()
        .map(|idx| items[idx].clone())
        .collect()
}

/// Shuffles the words/options of a response payload. Uses its own fresh RNG
/// handle so response-side ordering never correlates with item selection.
pub fn shuffle<T>(values: &mut [T]) {
    let mut rng = rand::rng();
    values.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn item(id: i64, level: i32) -> GameItem {
        GameItem {
            id,
            game_type_id: 1,
            category_id: Some(1),
            level,
            content: serde_json::json!({"en": format!("sentence {id}")}),
        }
    }

    struct FixedStore {
        items: Vec<GameItem>,
    }

    #[async_trait]
    impl ContentStore for FixedStore {
        async fn fetch_game_items(
            &self,
            _category_id: Option<i64>,
            level: Option<i32>,
        ) -> Result<Vec<GameItem>> {
            Ok(self
                .items
                .iter()
                .filter(|i| level.map(|l| i.level == l).unwrap_or(true))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn excluding_every_candidate_leaves_nothing() {
        let items = vec![item(1, 1), item(2, 1), item(3, 1)];
        let remaining = filter_excluded(items, &[1, 2, 3]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn exclusion_removes_only_listed_ids() {
        let items = vec![item(1, 1), item(2, 1), item(3, 1)];
        let remaining = filter_excluded(items, &[2]);
        let ids: Vec<i64> = remaining.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn sample_is_capped_at_candidate_count() {
        let items = vec![item(1, 1), item(2, 1)];
        let sampled = sample_items(items, 20);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn sample_has_no_duplicates() {
        let items: Vec<GameItem> = (1..=50).map(|id| item(id, 1)).collect();
        let sampled = sample_items(items, 20);
        assert_eq!(sampled.len(), 20);
        let mut ids: Vec<i64> = sampled.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut words = vec!["the", "cat", "sat", "on", "the", "mat"];
        shuffle(&mut words);
        words.sort_unstable();
        let mut expected = vec!["the", "cat", "sat", "on", "the", "mat"];
        expected.sort_unstable();
        assert_eq!(words, expected);
    }

    #[tokio::test]
    async fn pick_one_returns_none_when_all_excluded() {
        let store = FixedStore {
            items: vec![item(1, 1), item(2, 1)],
        };
        let selector = ContentSelector::new(store);
        let picked = selector.pick_one(1, 1, &[1, 2]).await.unwrap();
        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn pick_batch_level_zero_draws_across_levels() {
        let store = FixedStore {
            items: vec![item(1, 1), item(2, 3), item(3, 5)],
        };
        let selector = ContentSelector::new(store);
        let batch = selector.pick_batch(0, 10).await.unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn pick_batch_respects_level_filter() {
        let store = FixedStore {
            items: vec![item(1, 1), item(2, 3), item(3, 3)],
        };
        let selector = ContentSelector::new(store);
        let batch = selector.pick_batch(3, 10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|i| i.level == 3));
    }
}
