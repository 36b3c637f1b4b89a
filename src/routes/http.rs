//! HTTP endpoint handlers. These are thin wrappers that forward to the pipeline.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument, warn};

use crate::domain::LegacyAgeGroup;
use crate::prompt::{build_function_prompt, build_prompt};
use crate::protocol::*;
use crate::state::AppState;

/// The generation function caps a single call at this many questions.
const FUNCTION_MAX_COUNT: usize = 10;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(age_group = %q.age_group))]
pub async fn http_get_questions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionsQuery>,
) -> impl IntoResponse {
  let count = state.limits.effective_count(q.count);
  let categories = split_categories(q.categories.as_deref());
  let questions = state.pipeline
    .get_questions(&q.age_group, count, q.category.as_deref(), &categories)
    .await;
  info!(target: "questions", age_group = %q.age_group, requested = count, served = questions.len(), "HTTP questions served");
  Json(QuestionsOut { count: questions.len(), questions })
}

#[instrument(level = "info", skip(state), fields(age_group = %q.age_group))]
pub async fn http_get_prompt(
  State(state): State<Arc<AppState>>,
  Query(q): Query<PromptQuery>,
) -> impl IntoResponse {
  let count = state.limits.effective_count(q.count);
  let categories = split_categories(q.categories.as_deref());
  Json(PromptOut { prompt: build_prompt(&q.age_group, count, &categories) })
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
  (status, Json(ErrorOut { error: message.into() })).into_response()
}

/// Server-side generation: legacy age ids only, at most ten questions, results written to the cache.
#[instrument(level = "info", skip(state, body), fields(age_group = %body.age_group, count = ?body.count, topic = ?body.topic))]
pub async fn http_post_generate_function(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Response {
  let Some(group) = LegacyAgeGroup::parse(&body.age_group) else {
    return error_response(StatusCode::BAD_REQUEST, "Invalid age group");
  };
  let Some(client) = &state.function_generator else {
    return error_response(StatusCode::INTERNAL_SERVER_ERROR, "GEMINI_API_KEY is not configured");
  };

  let count = body.count.unwrap_or(5).clamp(1, FUNCTION_MAX_COUNT);
  let prompt = build_function_prompt(group, count, body.topic.as_deref());
  let questions = match client.generate_strict(&prompt).await {
    Ok(qs) => qs,
    Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
  };

  if let Some(cache) = &state.cache {
    if let Err(e) = cache.insert(group.id(), &questions).await {
      warn!(target: "questions", error = %e, "Failed to cache function-generated questions");
    }
  }

  info!(target: "questions", age_group = group.id(), generated = questions.len(), "Generation function completed");
  (StatusCode::OK, Json(GenerateOut { success: true, questions })).into_response()
}
