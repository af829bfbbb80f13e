use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use wpaste_core::{parse_ttl, CreateRequest, PasteError, PasteService};

use crate::error::{ServerError, ServerResult};
use crate::form::PasteForm;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PasteService>,
}

impl AppState {
    pub fn new(service: Arc<PasteService>) -> Self {
        Self { service }
    }
}

const HELP: &str = "\
wpaste: a minimal paste service

  POST /          create an entry (form fields below), responds with its name
  GET  /NAME      read an entry        ?ap=ACCESS_SECRET if it has one
  PUT  /NAME      replace the payload  form fields f and ep
  DELETE /NAME    delete an entry      ?ep=EDIT_SECRET

Form fields (application/x-www-form-urlencoded):
  f     payload (required)
  name  choose the name instead of getting a random one
  e     time to live in seconds
  ap    secret required to read
  ep    secret required to edit or delete; without one the entry is read-only

Examples:
  curl --data-urlencode f@notes.txt http://HOST/
  curl --data-urlencode f@notes.txt -d e=3600 -d ep=s3cret http://HOST/
  curl -X PUT --data-urlencode f@notes.txt -d ep=s3cret http://HOST/abc
  curl -X DELETE 'http://HOST/abc?ep=s3cret'
";

#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    pub ap: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    pub ep: Option<String>,
}

/// Run a service call on the blocking pool; secret hashing is CPU-bound.
async fn run_blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> Result<T, PasteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

fn payload_response(payload: Vec<u8>) -> Response {
    let content_type = if std::str::from_utf8(&payload).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    };
    ([(header::CONTENT_TYPE, content_type)], payload).into_response()
}

/// Usage text.
pub async fn help_handler() -> &'static str {
    HELP
}

/// Liveness and entry count.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "entries": state.service.store().len(),
    }))
}

pub async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<String> {
    let form = PasteForm::from_request(&headers, &body)?;
    let ttl_secs = match form.e.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_ttl(raw)?),
        _ => None,
    };
    let request = CreateRequest {
        payload: form.f.unwrap_or_default(),
        name: form.name,
        ttl_secs,
        access_secret: form.ap,
        edit_secret: form.ep,
    };

    let service = Arc::clone(&state.service);
    run_blocking(move || service.create(request)).await
}

pub async fn read_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReadQuery>,
) -> ServerResult<Response> {
    let service = Arc::clone(&state.service);
    let payload = run_blocking(move || service.read(&name, query.ap.as_deref())).await?;
    Ok(payload_response(payload))
}

pub async fn edit_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<String> {
    let form = PasteForm::from_request(&headers, &body)?;
    let payload = form.f.unwrap_or_default();
    let service = Arc::clone(&state.service);
    run_blocking(move || {
        service.edit(&name, payload, form.ep.as_deref())?;
        Ok(name)
    })
    .await
}

pub async fn remove_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> ServerResult<StatusCode> {
    let service = Arc::clone(&state.service);
    run_blocking(move || service.remove(&name, query.ep.as_deref())).await?;
    Ok(StatusCode::OK)
}
