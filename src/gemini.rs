//! Minimal Gemini client for question generation.
//!
//! One `generateContent` call per request. The model answers in free text which is expected to
//! contain a single JSON array of questions, possibly wrapped in prose or code fences.
//! Calls are instrumented and log model name, latency, and response size (not contents).
//!
//! NOTE: The API key travels in a header, never in the URL, so it cannot leak through logged URLs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::Question;
use crate::generator::{validate_entries, GenerationRequest, QuestionGenerator};
use crate::util::trunc_for_log;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Every request carries a threshold for each of these.
const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Appended to pipeline prompts so the model sees the output type once more, right before answering.
const SCHEMA_REMINDER: &str = r#"

Lütfen sadece aşağıdaki tipe uyan, geçerli bir JSON array döndür:

type Question = {
  text: string;
  options: string[];
  correct_index: number;
  topic?: string;
};

Yanıtın şu formatta olsun:
[
  {
    "text": "...",
    "options": ["A", "B", "C", "D"],
    "correct_index": 0,
    "topic": "math"
  }
]"#;

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
  #[error("missing api key: GEMINI_API_KEY not set")]
  MissingApiKey,
  #[error("network error: {0}")]
  Transport(String),
  #[error("timeout")]
  Timeout,
  #[error("http {status}: {body}")]
  Http { status: u16, body: String },
  #[error("model returned no text")]
  EmptyResponse,
  #[error("no JSON array found in model output")]
  NoJsonArray,
  #[error("json error: {0}")]
  Json(String),
}

impl GeneratorError {
  pub fn from_reqwest(e: reqwest::Error) -> Self {
    if e.is_timeout() { GeneratorError::Timeout } else { GeneratorError::Transport(e.to_string()) }
  }
}

/// Sampling and safety knobs sent as `generationConfig` / `safetySettings`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sampling {
  pub temperature: f32,
  pub top_k: u32,
  pub top_p: f32,
  pub max_output_tokens: u32,
  pub safety_threshold: String,
}

impl Default for Sampling {
  fn default() -> Self {
    Self {
      temperature: 0.7,
      top_k: 40,
      top_p: 0.95,
      max_output_tokens: 2048,
      safety_threshold: DEFAULT_SAFETY_THRESHOLD.into(),
    }
  }
}

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub sampling: Sampling,
}

impl GeminiClient {
  pub fn new(
    api_key: String,
    base_url: String,
    model: String,
    sampling: Sampling,
    timeout: Duration,
  ) -> Result<Self, GeneratorError> {
    if api_key.trim().is_empty() {
      return Err(GeneratorError::MissingApiKey);
    }
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| GeneratorError::Transport(e.to_string()))?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, sampling })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url, self.model)
  }

  fn request_body(&self, prompt: &str) -> GenerateContentRequest {
    let s = &self.sampling;
    GenerateContentRequest {
      contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
      generation_config: GenerationConfig {
        temperature: s.temperature,
        top_k: s.top_k,
        top_p: s.top_p,
        max_output_tokens: s.max_output_tokens,
      },
      safety_settings: SAFETY_CATEGORIES
        .iter()
        .map(|&category| SafetySetting { category, threshold: s.safety_threshold.clone() })
        .collect(),
    }
  }

  /// Raw text completion for `prompt`, sent as given.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn complete_text(&self, prompt: &str) -> Result<String, GeneratorError> {
    let req = self.request_body(prompt);

    let res = self.client.post(self.endpoint())
      .header(USER_AGENT, "peeky-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await.map_err(GeneratorError::from_reqwest)?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(GeneratorError::Http { status: status.as_u16(), body: msg });
    }

    let body: Value = res.json().await.map_err(|e| GeneratorError::Json(e.to_string()))?;
    if let Some(usage) = body.get("usageMetadata") {
      info!(prompt_tokens = ?usage.get("promptTokenCount"), output_tokens = ?usage.get("candidatesTokenCount"), "Gemini usage");
    }
    let text = response_text(&body);
    if text.trim().is_empty() {
      return Err(GeneratorError::EmptyResponse);
    }
    Ok(text)
  }

  /// Generate and parse, surfacing every failure. The prompt goes out unchanged;
  /// the server-side generation function calls this directly.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model))]
  pub async fn generate_strict(&self, prompt: &str) -> Result<Vec<Question>, GeneratorError> {
    let start = Instant::now();
    let result = self.complete_text(prompt).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => {
        info!(?elapsed, response_len = t.len(), "Model response received");
        t
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during question generation");
        return Err(e);
      }
    };

    let parsed = try_parse_generated_questions(&text);
    if let Err(e) = &parsed {
      warn!(error = %e, preview = %trunc_for_log(&text, 120), "Model output rejected");
    }
    parsed
  }
}

#[async_trait]
impl QuestionGenerator for GeminiClient {
  async fn generate(&self, request: &GenerationRequest) -> Vec<Question> {
    let prompt = format!("{}{SCHEMA_REMINDER}", request.prompt);
    match self.generate_strict(&prompt).await {
      Ok(qs) => {
        info!(target: "questions", requested = request.count, received = qs.len(), "Generated questions");
        qs
      }
      Err(e) => {
        error!(target: "questions", error = %e, "Generation failed; returning no questions");
        Vec::new()
      }
    }
  }

  fn name(&self) -> &'static str {
    "gemini"
  }
}

/// Slice from the first `[` to the last `]`, tolerating prose and code fences around the array.
pub fn extract_json_array(text: &str) -> Option<&str> {
  let start = text.find('[')?;
  let end = text.rfind(']')?;
  if end < start {
    return None;
  }
  Some(&text[start..=end])
}

pub fn try_parse_generated_questions(text: &str) -> Result<Vec<Question>, GeneratorError> {
  let slice = extract_json_array(text).ok_or(GeneratorError::NoJsonArray)?;
  let values: Vec<Value> = serde_json::from_str(slice).map_err(|e| GeneratorError::Json(e.to_string()))?;
  Ok(validate_entries(values))
}

/// `candidates[0].content.parts[0].text`, else `candidates[0].output_text`, else empty.
fn response_text(body: &Value) -> String {
  let first = body.get("candidates").and_then(|c| c.get(0));
  first
    .and_then(|c| c.pointer("/content/parts/0/text"))
    .or_else(|| first.and_then(|c| c.get("output_text")))
    .and_then(Value::as_str)
    .unwrap_or_default()
    .to_string()
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
  safety_settings: Vec<SafetySetting>,
}
#[derive(Serialize)]
struct Content { parts: Vec<Part> }
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  top_k: u32,
  top_p: f32,
  max_output_tokens: u32,
}
#[derive(Serialize)]
struct SafetySetting {
  category: &'static str,
  threshold: String,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
