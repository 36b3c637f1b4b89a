//! Bundled question bank: the last line of supply when generation and cache come up short.
//!
//! Keyed by legacy ids (`G1`..`G5`). The data ships inside the binary (`data/questions.json`)
//! and can be replaced at startup with a file of the same shape.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::{question_matches_category, AgeGroup, Question};
use crate::util::pick_random;

const BUNDLED: &str = include_str!("../data/questions.json");

/// Key served when neither the requested key nor its legacy mapping exists.
pub const DEFAULT_KEY: &str = "G3";

#[derive(Debug, Error)]
pub enum LocalBankError {
  #[error("io error reading {path}: {source}")]
  Io { path: String, source: std::io::Error },
  #[error("invalid question bank json: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default)]
pub struct LocalQuestionBank {
  by_age: HashMap<String, Vec<Question>>,
}

impl LocalQuestionBank {
  pub fn new(by_age: HashMap<String, Vec<Question>>) -> Self {
    Self { by_age }
  }

  pub fn from_json_str(json: &str) -> Result<Self, LocalBankError> {
    Ok(Self::new(serde_json::from_str(json)?))
  }

  pub fn bundled() -> Result<Self, LocalBankError> {
    Self::from_json_str(BUNDLED)
  }

  pub fn from_path(path: &str) -> Result<Self, LocalBankError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LocalBankError::Io { path: path.to_string(), source })?;
    Self::from_json_str(&raw)
  }

  /// Total question count per key, for the startup inventory log.
  pub fn inventory(&self) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = self.by_age.iter().map(|(k, v)| (k.clone(), v.len())).collect();
    out.sort();
    out
  }

  /// Exact key, then the normalized group's legacy key, then `G3`.
  fn questions_for(&self, age_group: &str) -> Option<(&str, &Vec<Question>)> {
    let legacy = AgeGroup::normalize(age_group).legacy_key();
    [age_group, legacy, DEFAULT_KEY]
      .into_iter()
      .find_map(|k| self.by_age.get_key_value(k).map(|(k, v)| (k.as_str(), v)))
  }

  /// Up to `count` questions for `age_group`, preferring `category`.
  /// An empty category match falls back to the whole age-group set.
  #[instrument(level = "debug", skip(self))]
  pub fn read_local(&self, age_group: &str, count: usize, category: Option<&str>) -> Vec<Question> {
    let Some((key, all)) = self.questions_for(age_group) else {
      warn!(target: "questions", %age_group, "No local questions for age group");
      return Vec::new();
    };
    if all.is_empty() {
      warn!(target: "questions", %age_group, %key, "Local question set is empty");
      return Vec::new();
    }

    let mut pool: Vec<Question> = match category {
      Some(c) => all.iter().filter(|q| question_matches_category(q, c)).cloned().collect(),
      None => all.clone(),
    };
    if pool.is_empty() {
      warn!(target: "questions", %age_group, %key, category = ?category, "No local match for category; using all questions for the age group");
      pool = all.clone();
    }

    let picked = pick_random(&pool, count);
    info!(target: "questions", %age_group, %key, requested = count, served = picked.len(), "Local questions served");
    picked
  }
}
