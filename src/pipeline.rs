//! Question supply pipeline: generation / cache first, bundled bank for the shortfall.
//!
//! Per call:
//!   1. more than one category: fan out one single-category fetch per category with a target of
//!      `ceil(count / k)`, join, shuffle the concatenation, truncate to `count`
//!   2. single (or no) category: cache (if configured, least-used first), then generate the
//!      remaining shortfall (if a generator is configured)
//!   3. remote yield >= count: first `count`, in order
//!   4. otherwise append exactly the shortfall from the local bank, after the remote items
//!   5. cache rows that survive the final cut get their `used_count` bumped
//!
//! `get_questions` never fails; an empty list is the "nothing available" signal.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::cache::{CacheError, QuestionCache};
use crate::domain::{AgeGroup, CachedQuestionRecord, Question};
use crate::generator::{GenerationRequest, QuestionGenerator};
use crate::local::LocalQuestionBank;
use crate::prompt::build_prompt;
use crate::util::{div_ceil, shuffle};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub struct QuestionPipeline {
    generator: Option<Arc<dyn QuestionGenerator>>,
    cache: Option<Arc<dyn QuestionCache>>,
    local: LocalQuestionBank,
}

/// Cache rows are keyed by the legacy id so the generation function and the pipeline agree.
pub fn cache_key(age_group: &str) -> &'static str {
    AgeGroup::normalize(age_group).legacy_key()
}

impl QuestionPipeline {
    pub fn new(local: LocalQuestionBank) -> Self {
        Self { generator: None, cache: None, local }
    }

    pub fn with_generator(mut self, generator: Arc<dyn QuestionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn QuestionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.as_ref().map_or("none", |g| g.name())
    }

    pub fn cache_name(&self) -> &'static str {
        self.cache.as_ref().map_or("none", |c| c.name())
    }

    /// Never fails. `categories` with more than one entry takes precedence over `category`.
    #[instrument(level = "info", skip(self), fields(%age_group, count))]
    pub async fn get_questions(
        &self,
        age_group: &str,
        count: usize,
        category: Option<&str>,
        categories: &[String],
    ) -> Vec<Question> {
        match self.try_get_questions(age_group, count, category, categories).await {
            Ok(qs) => qs,
            Err(e) => {
                error!(target: "questions", %age_group, count, error = %e, "Question supply failed; returning no questions");
                Vec::new()
            }
        }
    }

    pub async fn try_get_questions(
        &self,
        age_group: &str,
        count: usize,
        category: Option<&str>,
        categories: &[String],
    ) -> Result<Vec<Question>, PipelineError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let picks = if categories.len() > 1 {
            let per_category = div_ceil(count, categories.len());
            let fetches = categories
                .iter()
                .map(|c| self.single_category(age_group, per_category, Some(c.as_str())));
            let mut all = Vec::new();
            for result in join_all(fetches).await {
                all.extend(result?);
            }
            let pooled = all.len();
            shuffle(&mut all);
            all.truncate(count);
            info!(target: "questions", %age_group, categories = categories.len(), per_category, pooled, served = all.len(), "Merged multi-category questions");
            all
        } else {
            let category = categories.first().map(String::as_str).or(category);
            self.single_category(age_group, count, category).await?
        };

        self.mark_served(&picks).await;
        Ok(picks.into_iter().map(Pick::into_question).collect())
    }

    async fn single_category(
        &self,
        age_group: &str,
        count: usize,
        category: Option<&str>,
    ) -> Result<Vec<Pick>, PipelineError> {
        let mut out = self.remote(age_group, count, category).await?;
        out.retain(|p| p.question().is_well_formed());

        if out.len() >= count {
            out.truncate(count);
            return Ok(out);
        }

        let remote = out.len();
        let shortfall = count - remote;
        out.extend(
            self.local
                .read_local(age_group, shortfall, category)
                .into_iter()
                .filter(Question::is_well_formed)
                .map(Pick::Fresh),
        );
        info!(target: "questions", %age_group, category = ?category, requested = count, remote, local = out.len() - remote, "Topped up from local bank");
        Ok(out)
    }

    /// Cache read (errors propagate), then generation for what the cache could not cover.
    async fn remote(
        &self,
        age_group: &str,
        count: usize,
        category: Option<&str>,
    ) -> Result<Vec<Pick>, PipelineError> {
        let key = cache_key(age_group);
        let mut out: Vec<Pick> = Vec::new();

        if let Some(cache) = &self.cache {
            let rows = cache.read(key, count, category).await?;
            out.extend(rows.into_iter().map(Pick::Cached));
            if out.len() >= count {
                return Ok(out);
            }
        }

        let Some(generator) = &self.generator else {
            return Ok(out);
        };

        let need = count - out.len();
        let cats: Vec<&str> = category.into_iter().collect();
        let request = GenerationRequest {
            prompt: build_prompt(age_group, need, &cats),
            age_group: age_group.to_string(),
            count: need,
            category: category.map(String::from),
        };
        let generated = generator.generate(&request).await;

        if let Some(cache) = &self.cache {
            if !generated.is_empty() {
                if let Err(e) = cache.insert(key, &generated).await {
                    warn!(target: "questions", error = %e, "Failed to cache generated questions");
                }
            }
        }
        out.extend(generated.into_iter().map(Pick::Fresh));
        Ok(out)
    }

    /// Bump `used_count` only for cache rows that made it into the final result.
    async fn mark_served(&self, picks: &[Pick]) {
        let Some(cache) = &self.cache else {
            return;
        };
        let served: Vec<CachedQuestionRecord> = picks
            .iter()
            .filter_map(|p| match p {
                Pick::Cached(r) => Some(r.clone()),
                Pick::Fresh(_) => None,
            })
            .collect();
        if served.is_empty() {
            return;
        }
        if let Err(e) = cache.mark_used(&served).await {
            warn!(target: "questions", error = %e, "Failed to bump used_count for served cache rows");
        }
    }
}

/// A candidate question, remembering the cache row it came from.
enum Pick {
    Cached(CachedQuestionRecord),
    Fresh(Question),
}

impl Pick {
    fn question(&self) -> &Question {
        match self {
            Pick::Cached(r) => &r.question,
            Pick::Fresh(q) => q,
        }
    }

    fn into_question(self) -> Question {
        match self {
            Pick::Cached(r) => r.question,
            Pick::Fresh(q) => q,
        }
    }
}
