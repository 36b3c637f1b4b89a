//! Question generation seam.
//!
//! `QuestionGenerator` is what the pipeline talks to. Implementations never fail:
//! transport errors and malformed model output both come back as an empty (or short) list.
//!
//! Two transports exist:
//!   - `GeminiClient` (gemini.rs) calls the generative endpoint directly with a built prompt
//!   - `EdgeFunctionGenerator` (below) delegates to the hosted `generate-questions` function,
//!     falling back to a direct client when the function call fails

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::domain::{AgeGroup, Question, OPTION_COUNT};
use crate::gemini::{GeminiClient, GeneratorError};

/// Everything a transport may need; the direct client only reads `prompt`.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub prompt: String,
    pub age_group: String,
    pub count: usize,
    pub category: Option<String>,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Vec<Question>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Keep only entries with a string `text`, exactly four string `options`,
/// and an integer `correct_index` pointing into them. Invalid entries are dropped.
pub fn validate_entries(values: Vec<Value>) -> Vec<Question> {
    values.into_iter().filter_map(validate_entry).collect()
}

pub fn validate_entry(v: Value) -> Option<Question> {
    let text = v.get("text")?.as_str()?.to_string();
    let options = v
        .get("options")?
        .as_array()?
        .iter()
        .map(|o| o.as_str().map(String::from))
        .collect::<Option<Vec<String>>>()?;
    if options.len() != OPTION_COUNT {
        return None;
    }
    let correct_index = v.get("correct_index")?.as_u64()? as usize;
    if correct_index >= OPTION_COUNT {
        return None;
    }
    let topic = v.get("topic").and_then(Value::as_str).map(String::from);
    Some(Question { text, options, correct_index, topic })
}

#[derive(Serialize)]
struct FunctionRequest<'a> {
    age_group: &'a str,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
}

#[derive(Deserialize)]
struct FunctionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    questions: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Calls `{base_url}/functions/v1/generate-questions` on the backend.
pub struct EdgeFunctionGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    fallback: Option<GeminiClient>,
}

impl EdgeFunctionGenerator {
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
        fallback: Option<GeminiClient>,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key, fallback })
    }

    pub fn function_url(&self) -> String {
        format!("{}/functions/v1/generate-questions", self.base_url)
    }

    #[instrument(level = "info", skip(self, request), fields(age_group = %request.age_group, count = request.count))]
    async fn invoke(&self, request: &GenerationRequest) -> Result<Vec<Question>, GeneratorError> {
        // The function only understands legacy ids and topic values.
        let body = FunctionRequest {
            age_group: AgeGroup::normalize(&request.age_group).legacy_key(),
            count: request.count,
            topic: request.category.as_deref().map(crate::domain::topic_filter_for),
        };

        let res = self
            .client
            .post(self.function_url())
            .header(USER_AGENT, "peeky-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GeneratorError::from_reqwest)?;

        let status = res.status();
        let text = res.text().await.map_err(GeneratorError::from_reqwest)?;
        if !status.is_success() {
            return Err(GeneratorError::Http { status: status.as_u16(), body: text });
        }

        let parsed: FunctionResponse = serde_json::from_str(&text).map_err(|e| GeneratorError::Json(e.to_string()))?;
        if !parsed.success {
            return Err(GeneratorError::Http {
                status: status.as_u16(),
                body: parsed.error.unwrap_or_else(|| "function reported failure".into()),
            });
        }
        Ok(validate_entries(parsed.questions))
    }
}

#[async_trait]
impl QuestionGenerator for EdgeFunctionGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Vec<Question> {
        match self.invoke(request).await {
            Ok(qs) => {
                info!(target: "questions", count = qs.len(), "Edge function returned questions");
                qs
            }
            Err(e) => match &self.fallback {
                Some(direct) => {
                    warn!(target: "questions", error = %e, "Edge function failed; calling generation endpoint directly");
                    direct.generate(request).await
                }
                None => {
                    error!(target: "questions", error = %e, "Edge function failed; no direct fallback configured");
                    Vec::new()
                }
            },
        }
    }

    fn name(&self) -> &'static str {
        "edge_function"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{Sampling, DEFAULT_MODEL};
    use crate::test_http::StubServer;
    use serde_json::json;

    fn request(category: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            prompt: "p".into(),
            age_group: "LATE_PRIMARY".into(),
            count: 2,
            category: category.map(String::from),
        }
    }

    fn function_for(server: &StubServer, fallback: Option<GeminiClient>) -> EdgeFunctionGenerator {
        EdgeFunctionGenerator::new(server.base_url.clone(), "anon".into(), Duration::from_secs(5), fallback)
            .expect("client")
    }

    #[test]
    fn validation_drops_structurally_invalid_entries() {
        let values = vec![
            json!({"text": "2+2?", "options": ["3", "4", "5", "6"], "correct_index": 1, "topic": "math"}),
            json!({"text": "string index", "options": ["a", "b", "c", "d"], "correct_index": "1"}),
            json!({"text": "three options", "options": ["a", "b", "c"], "correct_index": 0}),
            json!({"text": "out of range", "options": ["a", "b", "c", "d"], "correct_index": 4}),
            json!({"text": 12, "options": ["a", "b", "c", "d"], "correct_index": 0}),
            json!({"text": "non-string option", "options": ["a", 2, "c", "d"], "correct_index": 0}),
            json!({"text": "negative", "options": ["a", "b", "c", "d"], "correct_index": -1}),
            json!("not an object"),
        ];
        let out = validate_entries(values);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "2+2?");
        assert_eq!(out[0].topic.as_deref(), Some("math"));
    }

    #[test]
    fn validation_keeps_untagged_entries() {
        let out = validate_entries(vec![json!({"text": "?", "options": ["a", "b", "c", "d"], "correct_index": 3})]);
        assert_eq!(out.len(), 1);
        assert!(out[0].topic.is_none());
        assert!(out[0].is_well_formed());
    }

    #[tokio::test]
    async fn unreachable_function_without_fallback_yields_empty() {
        let gen = EdgeFunctionGenerator::new(
            "http://127.0.0.1:9/".into(),
            "anon".into(),
            Duration::from_millis(300),
            None,
        )
        .expect("client");
        assert_eq!(gen.function_url(), "http://127.0.0.1:9/functions/v1/generate-questions");
        let req = GenerationRequest { prompt: "p".into(), age_group: "G3".into(), count: 3, category: Some("fen".into()) };
        assert!(gen.generate(&req).await.is_empty());
    }

    #[tokio::test]
    async fn function_success_is_validated_and_request_uses_legacy_ids() {
        let body = json!({
            "success": true,
            "questions": [
                {"text": "Su kaç derecede kaynar?", "options": ["50", "80", "100", "120"], "correct_index": 2, "topic": "science"},
                {"text": "broken", "options": ["a", "b"], "correct_index": 0}
            ]
        });
        let server = StubServer::start(vec![(200, body.to_string())]).await;
        let out = function_for(&server, None).generate(&request(Some("fen"))).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].options[out[0].correct_index], "100");

        let req = &server.requests()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/functions/v1/generate-questions");
        assert_eq!(req.header("authorization"), Some("Bearer anon"));
        assert_eq!(req.json(), json!({"age_group": "G4", "count": 2, "topic": "science"}));
    }

    #[tokio::test]
    async fn reported_failure_uses_direct_fallback() {
        let function = StubServer::start(vec![(200, json!({"success": false, "error": "quota"}).to_string())]).await;
        let model_text = r#"[{"text": "Fallback?", "options": ["a", "b", "c", "d"], "correct_index": 3}]"#;
        let gemini = StubServer::start(vec![(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": model_text}]}}]}).to_string(),
        )])
        .await;
        let direct = GeminiClient::new(
            "k".into(),
            gemini.base_url.clone(),
            DEFAULT_MODEL.into(),
            Sampling::default(),
            Duration::from_secs(5),
        )
        .expect("direct client");

        let out = function_for(&function, Some(direct)).generate(&request(None)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Fallback?");
        assert_eq!(function.requests().len(), 1);
        assert_eq!(gemini.requests().len(), 1);
        assert!(function.requests()[0].json().get("topic").is_none());
    }

    #[tokio::test]
    async fn reported_failure_without_fallback_yields_empty() {
        let server = StubServer::start(vec![(200, json!({"success": false}).to_string())]).await;
        assert!(function_for(&server, None).generate(&request(None)).await.is_empty());
    }
}
