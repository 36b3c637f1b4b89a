//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - question API under `/api/v1/...`
/// - the server-side generation function at `/functions/v1/generate-questions`
/// - CORS (allow any origin/method/headers); the mobile app calls from arbitrary origins
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/questions", get(http::http_get_questions))
        .route("/api/v1/prompt", get(http::http_get_prompt))
        .route("/functions/v1/generate-questions", post(http::http_post_generate_function))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::{Secrets, ServiceConfig};

    fn app() -> Router {
        build_router(Arc::new(AppState::from_config(ServiceConfig::default(), Secrets::default())))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        let res = app().oneshot(req).await.expect("response");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn questions_endpoint_serves_local_fallback() {
        let (status, body) = send(get("/api/v1/questions?ageGroup=G3&count=4&category=matematik")).await;
        assert_eq!(status, StatusCode::OK);
        let questions = body["questions"].as_array().expect("array");
        assert_eq!(questions.len(), 4);
        assert_eq!(body["count"], 4);
        for q in questions {
            assert_eq!(q["options"].as_array().map(Vec::len), Some(4));
            assert!(q["correct_index"].as_u64().is_some_and(|i| i < 4));
        }
    }

    #[tokio::test]
    async fn questions_count_is_clamped_and_defaulted() {
        let (_, body) = send(get("/api/v1/questions?ageGroup=G3&count=500")).await;
        // Bundled G3 holds ten questions, below the default max of twenty.
        assert_eq!(body["count"], 10);
        let (_, body) = send(get("/api/v1/questions?ageGroup=G3")).await;
        assert_eq!(body["count"], 5);
    }

    #[tokio::test]
    async fn multi_category_query_is_bounded() {
        let (status, body) = send(get("/api/v1/questions?ageGroup=EARLY_PRIMARY&count=3&categories=matematik,fen,tarih,cografya")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["questions"].as_array().expect("array").len() <= 3);
    }

    #[tokio::test]
    async fn prompt_preview_uses_default_profile_for_unknown_group() {
        let (status, body) = send(get("/api/v1/prompt?ageGroup=XX&count=3")).await;
        assert_eq!(status, StatusCode::OK);
        let prompt = body["prompt"].as_str().expect("prompt");
        assert!(prompt.contains("5-8 yaş"));
        assert!(prompt.contains("Genel Kültür"));
    }

    #[tokio::test]
    async fn generation_function_rejects_semantic_age_ids() {
        let (status, body) = send(post_json("/functions/v1/generate-questions", r#"{"age_group":"EARLY_PRIMARY"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid age group");
    }

    #[tokio::test]
    async fn generation_function_without_key_is_a_server_error() {
        let (status, body) = send(post_json("/functions/v1/generate-questions", r#"{"age_group":"G3","count":3}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn generation_function_is_post_only() {
        let (status, _) = send(get("/functions/v1/generate-questions")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
