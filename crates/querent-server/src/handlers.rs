use std::panic::AssertUnwindSafe;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::adapter::{collect_answer, AnswerError};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub dialect: &'static str,
    pub model: String,
}

/// `POST /chat`: turn a question into a checked SQL query.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "invalid request body");
        ApiError::from(rejection)
    })?;
    info!(question = %request.question, "received request");

    let question = request.question.trim();
    if question.is_empty() {
        warn!("invalid input: empty question");
        return Err(ApiError::BadRequest("Question cannot be empty".into()));
    }

    let run = AssertUnwindSafe(collect_answer(state.pipeline.stream(question))).catch_unwind();
    let Ok(outcome) = tokio::time::timeout(state.request_timeout, run).await else {
        error!(timeout_secs = state.request_timeout.as_secs(), "pipeline timed out");
        return Err(ApiError::Internal(format!(
            "Error processing request: timed out after {}s",
            state.request_timeout.as_secs()
        )));
    };

    match outcome {
        Ok(Ok(query)) => {
            info!(query = %query, "returning response");
            Ok(Json(ChatResponse { query }))
        }
        Ok(Err(AnswerError::NotFound)) => {
            warn!("no query generated");
            Err(ApiError::NotFound(AnswerError::NotFound.to_string()))
        }
        Ok(Err(AnswerError::StepFailed(failure))) => {
            error!(error = %failure, "workflow error");
            Err(ApiError::Internal(failure.to_string()))
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| panic.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic");
            error!(panic = %message, "pipeline panicked");
            Err(ApiError::Internal(format!("Error processing request: {message}")))
        }
    }
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        dialect: state.pipeline.dialect().as_str(),
        model: state.pipeline.model().to_string(),
    })
}
