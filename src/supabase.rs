//! PostgREST-backed cache (`ai_questions_cache` table on the project's Supabase instance).
//!
//! Table contract: `id` (surrogate), `age_group` text, `question` jsonb, `used_count` int default 0.
//! No eviction happens here; retention of that table is managed on the database side.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::cache::{fetch_window, filter_records, CacheError, QuestionCache};
use crate::domain::{CachedQuestionRecord, Question};
use crate::generator::validate_entry;

pub const DEFAULT_TABLE: &str = "ai_questions_cache";

pub struct SupabaseCache {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  table: String,
}

#[derive(Serialize)]
struct NewRow<'a> {
  age_group: &'a str,
  question: &'a Question,
  used_count: u32,
}

/// Rows as PostgREST returns them; `id` may be numeric or uuid depending on the schema.
/// `question` stays raw: other writers store unvalidated model output in the same table.
#[derive(Deserialize)]
struct Row {
  id: Value,
  age_group: String,
  question: Value,
  #[serde(default)]
  used_count: u32,
}

impl Row {
  fn id_string(&self) -> String {
    match &self.id {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    }
  }

  fn into_record(self) -> Option<CachedQuestionRecord> {
    let id = self.id_string();
    let question = validate_entry(self.question)?;
    Some(CachedQuestionRecord { id, age_group: self.age_group, question, used_count: self.used_count })
  }
}

/// Malformed rows are dropped one by one; the rest of the page is still served.
fn decode_rows(rows: Vec<Row>) -> Vec<CachedQuestionRecord> {
  rows
    .into_iter()
    .filter_map(|row| {
      let id = row.id_string();
      let record = row.into_record();
      if record.is_none() {
        warn!(target: "questions", %id, "Skipping malformed cached question row");
      }
      record
    })
    .collect()
}

impl SupabaseCache {
  pub fn new(base_url: String, api_key: String, table: String, timeout: Duration) -> Result<Self, CacheError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| CacheError::Transport(e.to_string()))?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key, table })
  }

  fn table_url(&self) -> String {
    format!("{}/rest/v1/{}", self.base_url, self.table)
  }

  fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
    self.client.request(method, url)
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .header(CONTENT_TYPE, "application/json")
  }

  async fn check(res: reqwest::Response) -> Result<reqwest::Response, CacheError> {
    if res.status().is_success() {
      return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(CacheError::Http { status, body })
  }
}

fn transport(e: reqwest::Error) -> CacheError {
  CacheError::Transport(e.to_string())
}

#[async_trait]
impl QuestionCache for SupabaseCache {
  #[instrument(level = "debug", skip(self), fields(backend = "supabase"))]
  async fn read(
    &self,
    age_group: &str,
    limit: usize,
    category: Option<&str>,
  ) -> Result<Vec<CachedQuestionRecord>, CacheError> {
    let window = fetch_window(limit, category).to_string();
    let age_filter = format!("eq.{age_group}");
    let res = self.request(reqwest::Method::GET, self.table_url())
      .query(&[
        ("select", "id,age_group,question,used_count"),
        ("age_group", age_filter.as_str()),
        ("order", "used_count.asc"),
        ("limit", window.as_str()),
      ])
      .send().await.map_err(transport)?;
    let res = Self::check(res).await?;
    let rows: Vec<Row> = res.json().await.map_err(|e| CacheError::Json(e.to_string()))?;
    Ok(filter_records(decode_rows(rows), limit, category))
  }

  #[instrument(level = "debug", skip(self, questions), fields(backend = "supabase", count = questions.len()))]
  async fn insert(&self, age_group: &str, questions: &[Question]) -> Result<(), CacheError> {
    if questions.is_empty() {
      return Ok(());
    }
    let rows: Vec<NewRow> = questions.iter().map(|q| NewRow { age_group, question: q, used_count: 0 }).collect();
    let res = self.request(reqwest::Method::POST, self.table_url())
      .header("Prefer", "return=minimal")
      .json(&rows)
      .send().await.map_err(transport)?;
    Self::check(res).await?;
    info!(target: "questions", age_group, count = questions.len(), "Cached generated questions");
    Ok(())
  }

  #[instrument(level = "debug", skip(self, served), fields(backend = "supabase", count = served.len()))]
  async fn mark_used(&self, served: &[CachedQuestionRecord]) -> Result<(), CacheError> {
    // PostgREST has no increment; write back the count we read plus one.
    for r in served {
      let id_filter = format!("eq.{}", r.id);
      let res = self.request(reqwest::Method::PATCH, self.table_url())
        .query(&[("id", id_filter.as_str())])
        .header("Prefer", "return=minimal")
        .json(&serde_json::json!({ "used_count": r.used_count.saturating_add(1) }))
        .send().await.map_err(transport)?;
      Self::check(res).await?;
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "supabase"
  }
}
