//! HTTP API endpoints
//!
//! Two bindings expose the same poll operations:
//! - `/` reads everything from the query string (`action=create|vote|result`).
//! - `/api` takes writes as a JSON body on POST and reads via `GET ?pollId=`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{debug, error, info};

use crate::{
    error::ApiError,
    metrics::PollMetrics,
    store::{option_position, parse_option_list, PollError, PollOps},
};

#[derive(Clone)]
pub struct AppState {
    /// Store addressed by the query-string binding.
    pub query_store: Arc<dyn PollOps>,
    /// Store addressed by the JSON body binding. Same handle as `query_store` when shared.
    pub body_store: Arc<dyn PollOps>,
    pub shared_store: bool,
    pub metrics: Arc<PollMetrics>,
}

impl AppState {
    pub fn total_polls(&self) -> usize {
        if self.shared_store {
            self.query_store.poll_count()
        } else {
            self.query_store.poll_count() + self.body_store.poll_count()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    poll_id: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(query_binding))
        .route("/api", any(body_binding))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared operation layer
// ---------------------------------------------------------------------------

fn create_poll(
    state: &AppState,
    store: &dyn PollOps,
    question: &str,
    options: Vec<String>,
) -> Result<Response, ApiError> {
    let poll_id = store.create(question, options)?;

    state.metrics.polls_created.inc();
    state.metrics.active_polls.set(state.total_polls() as f64);
    info!("Created poll {}", poll_id);

    Ok((StatusCode::CREATED, Json(CreateResponse { poll_id })).into_response())
}

fn cast_vote(
    state: &AppState,
    store: &dyn PollOps,
    poll_id: &str,
    option_index: Option<i64>,
) -> Result<Response, ApiError> {
    // A numeric index that is not an integer addresses no option.
    let option_index = option_index.ok_or_else(PollError::vote_target_not_found)?;
    store.vote(poll_id, option_index)?;

    state.metrics.votes_recorded.inc();
    debug!("Recorded vote for poll {} option {}", poll_id, option_index);

    Ok((StatusCode::OK, Json(MessageResponse { message: "Vote recorded" })).into_response())
}

fn read_poll(state: &AppState, store: &dyn PollOps, poll_id: &str) -> Result<Response, ApiError> {
    let poll = store.read(poll_id)?;
    state.metrics.results_served.inc();
    Ok((StatusCode::OK, Json(poll)).into_response())
}

fn finish(state: &AppState, start: Instant, result: Result<Response, ApiError>) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            state.metrics.error_counts.inc();
            debug!("Rejected request ({}): {}", e.status(), e);
            e.into_response()
        }
    };

    state.metrics.request_latency.observe(start.elapsed().as_secs_f64());
    response
}

// ---------------------------------------------------------------------------
// Query-string binding
// ---------------------------------------------------------------------------

/// Query pairs in arrival order; repeated keys are kept.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn from_uri(uri: &Uri) -> Result<Self, ApiError> {
        Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| Self(pairs))
            .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e)))
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Parses a transport-string option index.
///
/// Anything that is not a number is rejected as invalid input; a number that is
/// not an integer maps to `None`.
fn parse_option_index(raw: &str) -> Result<Option<i64>, ApiError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::from(PollError::missing_vote_target()))?;

    if value.is_nan() {
        return Err(PollError::missing_vote_target().into());
    }

    Ok(option_position(value))
}

// GET /?action=create|vote|result
pub async fn query_binding(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let start = Instant::now();

    let result = if method != Method::GET {
        Err(ApiError::MethodNotAllowed("Only GET allowed"))
    } else {
        QueryParams::from_uri(&uri).and_then(|params| handle_query(&state, &params))
    };

    finish(&state, start, result)
}

fn handle_query(state: &AppState, params: &QueryParams) -> Result<Response, ApiError> {
    let store = state.query_store.as_ref();

    match params.first("action") {
        Some("create") => {
            let question = params.first("question").filter(|q| !q.is_empty());
            let raw_options = params.all("options");

            let (question, options) = match (question, raw_options.as_slice()) {
                (None, _) | (_, []) | (_, [""]) => return Err(PollError::missing_question().into()),
                (Some(question), [single]) => (question, parse_option_list(single)),
                (Some(question), many) => (question, many.iter().map(|s| s.to_string()).collect()),
            };

            create_poll(state, store, question, options)
        }
        Some("vote") => {
            let poll_id = params.first("pollId").filter(|id| !id.is_empty());
            let (poll_id, raw_index) = match (poll_id, params.first("optionIndex")) {
                (Some(poll_id), Some(raw_index)) => (poll_id, raw_index),
                _ => return Err(PollError::missing_vote_target().into()),
            };

            let option_index = parse_option_index(raw_index)?;
            cast_vote(state, store, poll_id, option_index)
        }
        Some("result") => {
            let poll_id = params.first("pollId").unwrap_or_default();
            read_poll(state, store, poll_id)
        }
        _ => Err(ApiError::InvalidAction),
    }
}

// ---------------------------------------------------------------------------
// JSON body binding
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BodyRequest {
    action: Option<String>,
    question: Option<Value>,
    options: Option<Value>,
    poll_id: Option<Value>,
    option_index: Option<Value>,
}

impl BodyRequest {
    fn parse(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
    }

    fn poll_id(&self) -> Option<String> {
        match self.poll_id.as_ref()? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(n) => n.as_u64().filter(|id| *id > 0).map(|id| id.to_string()),
            _ => None,
        }
    }

    /// The index must already be a JSON number; numeric strings are rejected.
    fn option_index(&self) -> Option<Option<i64>> {
        match self.option_index.as_ref()? {
            Value::Number(n) => Some(n.as_i64().or_else(|| n.as_f64().and_then(option_position))),
            _ => None,
        }
    }
}

fn invalid_question_or_options() -> ApiError {
    PollError::InvalidInput("Invalid question or options".to_string()).into()
}

// POST /api  (JSON body)
// GET  /api?pollId=<id>
pub async fn body_binding(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let start = Instant::now();

    let result = match method {
        Method::POST => BodyRequest::parse(&body).and_then(|request| handle_body(&state, &request)),
        Method::GET => {
            let poll_id = Query::<HashMap<String, String>>::try_from_uri(&uri)
                .ok()
                .and_then(|Query(mut params)| params.remove("pollId"))
                .unwrap_or_default();
            read_poll(&state, state.body_store.as_ref(), &poll_id)
        }
        _ => Err(ApiError::MethodNotAllowed("Method not allowed")),
    };

    finish(&state, start, result)
}

fn handle_body(state: &AppState, request: &BodyRequest) -> Result<Response, ApiError> {
    let store = state.body_store.as_ref();

    match request.action.as_deref() {
        Some("create") => {
            let question = request
                .question
                .as_ref()
                .and_then(Value::as_str)
                .filter(|q| !q.is_empty())
                .ok_or_else(invalid_question_or_options)?;

            let options = request
                .options
                .as_ref()
                .and_then(Value::as_array)
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(invalid_question_or_options)?;

            create_poll(state, store, question, options)
        }
        Some("vote") => {
            let (poll_id, option_index) = match (request.poll_id(), request.option_index()) {
                (Some(poll_id), Some(option_index)) => (poll_id, option_index),
                _ => return Err(PollError::missing_vote_target().into()),
            };

            cast_vote(state, store, &poll_id, option_index)
        }
        _ => Err(ApiError::InvalidAction),
    }
}

// ---------------------------------------------------------------------------
// Operational endpoints
// ---------------------------------------------------------------------------

// GET /health
pub async fn get_health(State(state): State<AppState>) -> Response {
    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "polls": state.total_polls(),
    });

    (StatusCode::OK, Json(response)).into_response()
}

// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.export_prometheus() {
        Ok(text) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_index() {
        assert_eq!(parse_option_index("1").unwrap(), Some(1));
        assert_eq!(parse_option_index(" 2 ").unwrap(), Some(2));
        assert_eq!(parse_option_index("-3").unwrap(), Some(-3));
        assert_eq!(parse_option_index("1.5").unwrap(), None);
        assert!(parse_option_index("abc").is_err());
        assert!(parse_option_index("").is_err());
        assert!(parse_option_index("NaN").is_err());
    }

    #[test]
    fn test_query_params_keep_repeats() {
        let uri: Uri = "/?options=a&options=b&question=Q".parse().unwrap();
        let params = QueryParams::from_uri(&uri).unwrap();
        assert_eq!(params.all("options"), ["a", "b"]);
        assert_eq!(params.first("question"), Some("Q"));
        assert_eq!(params.first("missing"), None);
    }

    #[test]
    fn test_body_request_fields() {
        let request = BodyRequest::parse(br#"{"action":"vote","pollId":"3","optionIndex":1}"#).unwrap();
        assert_eq!(request.poll_id().as_deref(), Some("3"));
        assert_eq!(request.option_index(), Some(Some(1)));

        let request = BodyRequest::parse(br#"{"pollId":7,"optionIndex":"1"}"#).unwrap();
        assert_eq!(request.poll_id().as_deref(), Some("7"));
        assert_eq!(request.option_index(), None);

        let request = BodyRequest::parse(br#"{"optionIndex":0.5}"#).unwrap();
        assert_eq!(request.option_index(), Some(None));
    }

    #[test]
    fn test_empty_body_is_empty_request() {
        let request = BodyRequest::parse(b"  ").unwrap();
        assert!(request.action.is_none());
        assert!(BodyRequest::parse(b"{not json").is_err());
    }
}
