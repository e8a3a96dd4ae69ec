//! Conversational endpoint served next to the MCP transport in HTTP mode.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{ChatMessage, GroqRequest};
use crate::transport::Transport;

pub const SYSTEM_PROMPT: &str = "You are a supply chain compliance assistant. You help compliance officers \
understand supplier risk: risk scores from 0 to 10, risk categories, locations, industries, audit dates, \
and compliance status (Compliant, Non-Compliant, Under Review). Answer concisely and say so when you \
do not have the data to answer.";

#[derive(Clone)]
pub struct ChatState {
    transport: Arc<dyn Transport>,
    model: String,
    temperature: f32,
    max_tokens: i32,
}

impl ChatState {
    pub fn new(transport: Arc<dyn Transport>, model: String) -> Self {
        Self {
            transport,
            model,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, cfg: &Config) -> Self {
        Self::new(transport, cfg.groq.chat_model.clone())
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid messages format")]
    InvalidMessages,

    #[error("Internal Server Error")]
    Internal(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidMessages => StatusCode::BAD_REQUEST,
            Self::Internal(detail) => {
                error!("Chat route error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Pulls a non-empty history out of `{"messages": [...]}`.
fn parse_messages(body: &str) -> Result<Vec<ChatMessage>, ChatError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Chat body is not JSON: {}", e);
        ChatError::InvalidMessages
    })?;
    let messages = value
        .get("messages")
        .filter(|m| m.is_array())
        .cloned()
        .ok_or(ChatError::InvalidMessages)?;
    let messages: Vec<ChatMessage> =
        serde_json::from_value(messages).map_err(|_| ChatError::InvalidMessages)?;
    if messages.is_empty() {
        return Err(ChatError::InvalidMessages);
    }
    Ok(messages)
}

async fn handle_chat(
    State(state): State<ChatState>,
    body: String,
) -> Result<Json<ChatReply>, ChatError> {
    let history = parse_messages(&body)?;
    info!("Chat request with {} messages", history.len());

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: SYSTEM_PROMPT.to_string(),
    });
    messages.extend(history);

    let request = GroqRequest {
        model: state.model.clone(),
        messages,
        temperature: state.temperature,
        max_tokens: state.max_tokens,
        response_format: None,
    };

    let response = state
        .transport
        .chat(&request)
        .await
        .map_err(|e| ChatError::Internal(e.to_string()))?;
    let text = response
        .first_content()
        .ok_or_else(|| ChatError::Internal("No completion choices returned".to_string()))?
        .to_string();

    Ok(Json(ChatReply { text }))
}
