//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and app independently.

use serde::{Deserialize, Serialize};

use crate::domain::Question;

/// Split a comma-separated category list, trimming blanks.
pub fn split_categories(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Messages the app can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetQuestions {
        #[serde(rename = "ageGroup")]
        age_group: String,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        categories: Vec<String>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Questions { questions: Vec<Question> },
    Error { message: String },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    #[serde(rename = "ageGroup")]
    pub age_group: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    /// Comma-separated, e.g. `matematik,fen`.
    #[serde(default)]
    pub categories: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsOut {
    pub count: usize,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    #[serde(rename = "ageGroup", default)]
    pub age_group: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub categories: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptOut {
    pub prompt: String,
}

/// Body of the server-side generation function.
#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub age_group: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub success: bool,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
