//! Generated-question cache.
//!
//! Records are read least-used first so fresh content surfaces before repeats.
//! Unlike the generator, cache errors are returned to the caller; the pipeline
//! decides what a failed read means.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{question_matches_category, CachedQuestionRecord, Question};

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache transport error: {0}")]
    Transport(String),
    #[error("cache http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("cache json error: {0}")]
    Json(String),
}

/// How many rows to fetch for a read of `limit` questions.
/// With a category filter we over-fetch so client-side filtering does not starve the result.
pub fn fetch_window(limit: usize, category: Option<&str>) -> usize {
    if category.is_some() {
        limit.saturating_mul(2)
    } else {
        limit
    }
}

/// Apply the client-side category filter and cap at `limit`.
pub fn filter_records(
    rows: Vec<CachedQuestionRecord>,
    limit: usize,
    category: Option<&str>,
) -> Vec<CachedQuestionRecord> {
    rows.into_iter()
        .filter(|r| category.map_or(true, |c| question_matches_category(&r.question, c)))
        .take(limit)
        .collect()
}

#[async_trait]
pub trait QuestionCache: Send + Sync {
    /// Records for `age_group`, ascending `used_count`, at most `limit`.
    async fn read(
        &self,
        age_group: &str,
        limit: usize,
        category: Option<&str>,
    ) -> Result<Vec<CachedQuestionRecord>, CacheError>;

    /// One new record per question with `used_count = 0`.
    async fn insert(&self, age_group: &str, questions: &[Question]) -> Result<(), CacheError>;

    /// Bump `used_count` for each served record.
    async fn mark_used(&self, records: &[CachedQuestionRecord]) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// Process-local cache bounded by `capacity`.
///
/// Eviction: when an insert overflows, the most-used records go first
/// (ties broken by insertion order, oldest first).
pub struct InMemoryCache {
    records: RwLock<Vec<CachedQuestionRecord>>,
    capacity: usize,
}

impl InMemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self { records: RwLock::new(Vec::new()), capacity: capacity.max(1) }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    fn evict(records: &mut Vec<CachedQuestionRecord>, capacity: usize) -> usize {
        let overflow = records.len().saturating_sub(capacity);
        if overflow == 0 {
            return 0;
        }
        // Positions are insertion order; pick highest used_count, then lowest position.
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| records[b].used_count.cmp(&records[a].used_count).then(a.cmp(&b)));
        let mut doomed: Vec<usize> = order.into_iter().take(overflow).collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for idx in doomed {
            records.remove(idx);
        }
        overflow
    }
}

#[async_trait]
impl QuestionCache for InMemoryCache {
    #[instrument(level = "debug", skip(self), fields(backend = "memory"))]
    async fn read(
        &self,
        age_group: &str,
        limit: usize,
        category: Option<&str>,
    ) -> Result<Vec<CachedQuestionRecord>, CacheError> {
        let records = self.records.read().await;
        let mut rows: Vec<CachedQuestionRecord> =
            records.iter().filter(|r| r.age_group == age_group).cloned().collect();
        // Stable sort keeps insertion order among equal counts.
        rows.sort_by_key(|r| r.used_count);
        rows.truncate(fetch_window(limit, category));
        Ok(filter_records(rows, limit, category))
    }

    #[instrument(level = "debug", skip(self, questions), fields(backend = "memory", count = questions.len()))]
    async fn insert(&self, age_group: &str, questions: &[Question]) -> Result<(), CacheError> {
        let mut records = self.records.write().await;
        records.extend(questions.iter().map(|q| CachedQuestionRecord {
            id: Uuid::new_v4().to_string(),
            age_group: age_group.to_string(),
            question: q.clone(),
            used_count: 0,
        }));
        let evicted = Self::evict(&mut records, self.capacity);
        if evicted > 0 {
            debug!(target: "questions", evicted, capacity = self.capacity, "Cache over capacity; evicted most-used records");
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, served), fields(backend = "memory", count = served.len()))]
    async fn mark_used(&self, served: &[CachedQuestionRecord]) -> Result<(), CacheError> {
        let mut records = self.records.write().await;
        for r in records.iter_mut() {
            if served.iter().any(|s| s.id == r.id) {
                r.used_count = r.used_count.saturating_add(1);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(text: &str, topic: Option<&str>) -> Question {
        Question {
            text: text.into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 0,
            topic: topic.map(String::from),
        }
    }

    #[tokio::test]
    async fn reads_least_used_first_and_respects_limit() {
        let cache = InMemoryCache::new(100);
        cache.insert("G3", &[q("one", None), q("two", None), q("three", None)]).await.expect("insert");
        cache.insert("G4", &[q("other group", None)]).await.expect("insert");

        let first = cache.read("G3", 2, None).await.expect("read");
        assert_eq!(first.iter().map(|r| r.question.text.as_str()).collect::<Vec<_>>(), vec!["one", "two"]);
        cache.mark_used(&first).await.expect("mark");

        let second = cache.read("G3", 3, None).await.expect("read");
        assert_eq!(second[0].question.text, "three");
        assert_eq!(second[0].used_count, 0);
        assert!(second[1..].iter().all(|r| r.used_count == 1));
    }

    #[tokio::test]
    async fn category_read_filters_client_side() {
        let cache = InMemoryCache::new(100);
        cache
            .insert("G3", &[q("m1", Some("math")), q("s1", Some("science")), q("u1", None), q("m2", Some("math"))])
            .await
            .expect("insert");
        let rows = cache.read("G3", 2, Some("matematik")).await.expect("read");
        // Window is 4 rows; untagged matches too, limit caps at 2.
        assert_eq!(rows.iter().map(|r| r.question.text.as_str()).collect::<Vec<_>>(), vec!["m1", "u1"]);
    }

    #[tokio::test]
    async fn capacity_evicts_most_used_then_oldest() {
        let cache = InMemoryCache::new(3);
        cache.insert("G3", &[q("a", None), q("b", None), q("c", None)]).await.expect("insert");
        let served = cache.read("G3", 1, None).await.expect("read");
        assert_eq!(served[0].question.text, "a");
        cache.mark_used(&served).await.expect("mark");

        cache.insert("G3", &[q("d", None), q("e", None)]).await.expect("insert");
        assert_eq!(cache.len().await, 3);
        let left = cache.read("G3", 10, None).await.expect("read");
        let texts: Vec<_> = left.iter().map(|r| r.question.text.as_str()).collect();
        // "a" (used) goes first, then the oldest unused "b".
        assert_eq!(texts, vec!["c", "d", "e"]);
    }

    #[test]
    fn window_doubles_only_with_category() {
        assert_eq!(fetch_window(5, None), 5);
        assert_eq!(fetch_window(5, Some("fen")), 10);
    }
}
