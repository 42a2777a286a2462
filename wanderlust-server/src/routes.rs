use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wanderlust_core::{
    MatchSummary, Quiz, ResultsSnapshot, SNAPSHOT_SIZE, ScoreMap, Session, top_matches,
};
use wanderlust_guard::RateDecision;

use crate::{
    error::AppError,
    fallback::{INVALID_REQUEST_MESSAGE, chat_reply, explain_reply},
    llm::ChatTurn,
    prompt::{assistant_system_prompt, chat_system_prompt, explain_system_prompt, history_window},
    state::AppState,
};

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Generic `error` value for rejected assistant requests. The actual reason
/// only goes to the log.
pub const REJECTED: &str = "invalid_request";

const EXPLAIN_QUESTION: &str = "Why do these destinations suit me?";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub user_scores: ScoreMap,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub scores: ScoreMap,
    pub question_count: u32,
    pub force_results: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantAction {
    #[default]
    Chat,
    Explain,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssistantContext {
    #[serde(default)]
    pub scores: ScoreMap,
    /// Quiz question id to option id.
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: AssistantContext,
    #[serde(default)]
    pub action: AssistantAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssistantResponse {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message,
            error: None,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(REJECTED.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub ai_enabled: bool,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub build: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub scores: ScoreMap,
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matches: Vec<MatchSummary>,
    pub snapshot: ResultsSnapshot,
}

/// Rate-limit key: the peer IP, or the first `X-Forwarded-For` hop when the
/// proxy in front is trusted to set it.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr, trust_forwarded: bool) -> String {
    if !trust_forwarded {
        return peer.ip().to_string();
    }
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

fn enforce_rate(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> Result<(), AppError> {
    let client = client_key(headers, peer, state.config.server.trust_forwarded_for);
    match state.check_rate(&client) {
        RateDecision::Allowed { remaining } => {
            debug!("{client}: {remaining} requests left in window");
            Ok(())
        }
        RateDecision::Limited { retry_after } => {
            warn!("{client} rate limited, retry in {}s", retry_after.as_secs());
            Err(AppError::RateLimited { retry_after })
        }
    }
}

/// Ask the model, then screen its reply. `None` means use the local fallback.
async fn model_reply(state: &AppState, system: &str, turns: &[ChatTurn]) -> Option<String> {
    let llm = state.llm.as_ref()?;
    match llm.chat_complete(system, turns).await {
        Ok(text) => {
            let check = state.filter.filter_output(&text);
            if check.is_valid {
                Some(check.filtered_output)
            } else {
                warn!(
                    "model reply rejected: {}",
                    check.reason.map(|r| r.as_str()).unwrap_or("unknown")
                );
                None
            }
        }
        Err(e) => {
            warn!("model call failed, using fallback: {e:#}");
            None
        }
    }
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    enforce_rate(&state, &headers, peer)?;

    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if req.messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".to_string()));
    }
    let Some(latest) = req.messages.iter().rev().find(|t| t.is_user()) else {
        return Err(AppError::BadRequest("no user message".to_string()));
    };
    let user_turns = req.messages.iter().filter(|t| t.is_user()).count();
    let earlier = u32::try_from(user_turns.saturating_sub(1)).unwrap_or(u32::MAX);

    let mut session = Session::resume(req.user_scores, earlier);

    let check = state.filter.validate_input(&latest.content);
    if !check.is_valid {
        warn!(
            "chat input rejected: {}",
            check.reason.map(|r| r.as_str()).unwrap_or("unknown")
        );
        return Ok(Json(ChatResponse {
            message: state.filter.redirect_message().to_string(),
            scores: session.scores,
            question_count: session.question_count,
            force_results: false,
        }));
    }

    let delta = session.absorb_message(&state.extractor, &check.sanitized_input);
    let force_results = session.ready_for_results(state.config.chat.max_questions);
    debug!(
        "chat turn {}: {} new traits, force_results={force_results}",
        session.question_count,
        delta.len()
    );

    let system = chat_system_prompt(&session, force_results);
    let history = history_window(&state.filter, &req.messages, state.config.chat.max_history);
    let message = match model_reply(&state, &system, &history).await {
        Some(text) => text,
        None => chat_reply(&session, &delta, force_results, &state.catalog),
    };

    Ok(Json(ChatResponse {
        message,
        scores: session.scores,
        question_count: session.question_count,
        force_results,
    }))
}

/// Validation and content failures answer 200 with `success: false`.
pub async fn assistant_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<AssistantRequest>, JsonRejection>,
) -> Result<Json<AssistantResponse>, AppError> {
    enforce_rate(&state, &headers, peer)?;

    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            warn!("assistant payload rejected: {}", e.body_text());
            return Ok(Json(AssistantResponse::rejected(INVALID_REQUEST_MESSAGE)));
        }
    };

    let mut scores = req.context.scores;
    scores.merge(&state.quiz.score_known(&req.context.selections));
    let mut session = Session::resume(scores, 0);

    let message = match req.action {
        AssistantAction::Explain if req.message.trim().is_empty() => {
            explain(&state, &session, EXPLAIN_QUESTION).await
        }
        action => {
            let check = state.filter.validate_input(&req.message);
            if !check.is_valid {
                warn!(
                    "assistant input rejected: {}",
                    check.reason.map(|r| r.as_str()).unwrap_or("unknown")
                );
                return Ok(Json(AssistantResponse::rejected(
                    state.filter.redirect_message(),
                )));
            }
            match action {
                AssistantAction::Explain => explain(&state, &session, &check.sanitized_input).await,
                AssistantAction::Chat => {
                    let delta = session.absorb_message(&state.extractor, &check.sanitized_input);
                    let top = top_matches(&session.scores, &state.catalog, SNAPSHOT_SIZE);
                    let system = assistant_system_prompt(&session, &top);
                    let turns = [ChatTurn::new("user", check.sanitized_input)];
                    match model_reply(&state, &system, &turns).await {
                        Some(text) => text,
                        None => chat_reply(&session, &delta, false, &state.catalog),
                    }
                }
            }
        }
    };

    Ok(Json(AssistantResponse::ok(message)))
}

async fn explain(state: &AppState, session: &Session, question: &str) -> String {
    let top = top_matches(&session.scores, &state.catalog, SNAPSHOT_SIZE);
    let system = explain_system_prompt(session, &top);
    let turns = [ChatTurn::new("user", question)];
    match model_reply(state, &system, &turns).await {
        Some(text) => text,
        None => explain_reply(&top),
    }
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ai_enabled: state.ai_enabled(),
        model: state.model().to_string(),
        timestamp: Utc::now(),
        build: env!("WANDERLUST_BUILD_SHA").to_string(),
    })
}

pub async fn quiz_handler(State(state): State<Arc<AppState>>) -> Json<Quiz> {
    Json(state.quiz.clone())
}

/// Unlike the assistant, unknown quiz selections are a 400 here.
pub async fn match_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut scores = req.scores;
    let answered = state
        .quiz
        .score_all(&req.selections)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    scores.merge(&answered);

    let limit = req.limit.unwrap_or(SNAPSHOT_SIZE).min(state.catalog.len());
    let matches = top_matches(&scores, &state.catalog, limit)
        .iter()
        .map(|m| m.summary())
        .collect();

    let answered_count = u32::try_from(req.selections.len()).unwrap_or(u32::MAX);
    let snapshot = Session::resume(scores, answered_count).snapshot(&state.catalog, Utc::now());

    Ok(Json(MatchResponse { matches, snapshot }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "10.0.0.7:5555".parse().unwrap()
    }

    #[test]
    fn test_client_key_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.1.1.1"));
        assert_eq!(client_key(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_client_key_ignores_forwarded_hop_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_key(&headers, peer(), false), "10.0.0.7");
    }

    #[test]
    fn test_client_key_falls_back_to_peer() {
        assert_eq!(client_key(&HeaderMap::new(), peer(), true), "10.0.0.7");
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(""));
        assert_eq!(client_key(&headers, peer(), true), "10.0.0.7");
    }

    #[test]
    fn test_assistant_request_defaults() {
        let req: AssistantRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.action, AssistantAction::Chat);
        assert!(req.context.selections.is_empty());

        let req: AssistantRequest =
            serde_json::from_str(r#"{"action":"explain","context":{"scores":{"beach":3}}}"#)
                .unwrap();
        assert_eq!(req.action, AssistantAction::Explain);
        assert_eq!(req.context.scores.get("beach"), 3.0);
    }

    #[test]
    fn test_chat_response_is_camel_case() {
        let v = serde_json::to_value(ChatResponse {
            message: "hi".to_string(),
            scores: ScoreMap::new(),
            question_count: 2,
            force_results: true,
        })
        .unwrap();
        assert_eq!(v["questionCount"], 2);
        assert_eq!(v["forceResults"], true);
    }

    #[test]
    fn test_assistant_success_omits_error() {
        let v = serde_json::to_value(AssistantResponse::ok("x".to_string())).unwrap();
        assert!(v.get("error").is_none());
        let v = serde_json::to_value(AssistantResponse::rejected("no")).unwrap();
        assert_eq!(v["error"], REJECTED);
        assert_eq!(v["success"], false);
    }
}
