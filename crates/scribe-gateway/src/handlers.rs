use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use scribe_core::ChatError;

use super::server::AppState;

const INDEX_PAGE: &str = include_str!("../static/index.html");

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(serde::Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(serde::Serialize)]
struct TestResponse {
    message: &'static str,
    timestamp: String,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    index_ready: bool,
}

pub(crate) fn error_response(status: StatusCode, error: &'static str, message: Option<String>) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

fn prompt_required() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Prompt is required", None)
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let prompt = match payload {
        Ok(Json(ChatRequest {
            prompt: Some(prompt),
        })) if !prompt.trim().is_empty() => prompt,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable chat request body");
            return prompt_required();
        }
        Ok(_) => return prompt_required(),
    };

    match state.chat.answer(&prompt).await {
        Ok(response) => Json(ChatResponse { response }).into_response(),
        Err(ChatError::EmptyPrompt) => prompt_required(),
        Err(e) if e.is_unavailable() => {
            tracing::error!(error = %e, "chat service error");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Chat service unavailable",
                Some(e.to_string()),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "error processing chat request");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            )
        }
    }
}

pub(crate) async fn test_handler() -> impl IntoResponse {
    Json(TestResponse {
        message: "API is working correctly",
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        index_ready: state.chat.index().is_ready(),
    })
}

pub(crate) async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub(crate) async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Route not found", None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_omits_missing_message() {
        let json = serde_json::to_string(&ErrorBody {
            error: "Route not found",
            message: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"Route not found"}"#);
    }

    #[test]
    fn chat_request_tolerates_missing_prompt() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.prompt.is_none());
    }

    #[test]
    fn index_page_posts_to_chat_api() {
        assert!(INDEX_PAGE.contains("/api/chat"));
    }
}
