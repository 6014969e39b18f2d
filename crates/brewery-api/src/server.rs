// brewery-api/src/server.rs
// ============================================================================
// Module: Brewery HTTP Server
// Description: REST access endpoint for brewery records.
// Purpose: Route /breweries requests through auth to the record store.
// Dependencies: axum, brewery-core, brewery-store-sqlite, http-body-util, tokio
// ============================================================================

//! ## Overview
//! The server exposes list, get, create, update, and delete for breweries.
//! Each handler builds a [`RequestContext`], asks the [`BreweryAuthz`] policy
//! for the operation's capability, runs the store call on the blocking pool,
//! and maps the outcome to a status code and JSON body. Failures use the body
//! `{"error":{"kind":..,"message":..}}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use brewery_config::BreweryConfig;
use brewery_config::ServerAuthMode;
use brewery_core::Brewery;
use brewery_core::BreweryId;
use brewery_core::BreweryStore;
use brewery_core::SharedBreweryStore;
use brewery_core::StoreError;
use brewery_store_sqlite::SqliteBreweryStore;
use http_body_util::LengthLimitError;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::ApiAuditEvent;
use crate::audit::ApiAuditEventParams;
use crate::audit::ApiAuditSink;
use crate::audit::audit_sink_from_config;
use crate::auth::AuthAction;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthContext;
use crate::auth::AuthError;
use crate::auth::BreweryAuthz;
use crate::auth::DefaultBreweryAuthz;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying a caller-supplied request identifier.
const REQUEST_ID_HEADER: &str = "x-request-id";
/// Maximum accepted request identifier length.
const MAX_REQUEST_ID_BYTES: usize = 128;
/// Message returned when an update matches no row.
const UPDATE_NOT_FOUND: &str = "Brewery not found to update.";
/// Message returned when a delete matches no row.
const DELETE_NOT_FOUND: &str = "Brewery not found to delete.";

// ============================================================================
// SECTION: Brewery Server
// ============================================================================

/// Brewery HTTP server instance.
pub struct BreweryServer {
    /// Server configuration.
    config: BreweryConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl BreweryServer {
    /// Builds a server from configuration, opening the `SQLite` store.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or the store or
    /// audit sink cannot be opened.
    pub fn from_config(config: BreweryConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = SqliteBreweryStore::new(&config.store.sqlite_config())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let audit = audit_sink_from_config(&config.server.audit)
            .map_err(|err| ServerError::Init(format!("audit sink: {err}")))?;
        emit_local_only_warning(&config);
        Ok(Self::with_store(config, SharedBreweryStore::from_store(store), audit))
    }

    /// Builds a server around an existing store and audit sink.
    #[must_use]
    pub fn with_store(
        config: BreweryConfig,
        store: SharedBreweryStore,
        audit: Arc<dyn ApiAuditSink>,
    ) -> Self {
        let authz = Arc::new(DefaultBreweryAuthz::from_config(config.server.auth.as_ref()));
        let state = Arc::new(ServerState {
            store,
            authz,
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Self {
            config,
            state,
        }
    }

    /// Returns the HTTP router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves requests until the process
    /// exits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serves requests on `listener` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Shared server state for HTTP handlers.
struct ServerState {
    /// Record store.
    store: SharedBreweryStore,
    /// Capability policy.
    authz: Arc<dyn BreweryAuthz>,
    /// Audit sink.
    audit: Arc<dyn ApiAuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Builds the `/breweries` routes over shared state.
fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/breweries", get(list_breweries).post(create_brewery).put(update_brewery))
        .route("/breweries/{id}", get(get_brewery).delete(delete_brewery))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `GET /breweries`.
async fn list_breweries(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let context = http_request_context(peer, &headers);
    let mut meta = RequestMeta::new("GET", "/breweries");
    let result: Result<(StatusCode, Vec<Brewery>), ApiError> = async {
        meta.subject = authorize(&state, &context, AuthAction::ListBreweries)?.subject;
        let breweries = run_store(&state, |store| store.fetch_all()).await?;
        Ok((StatusCode::OK, breweries))
    }
    .await;
    finish(&state, &context, meta, result)
}

/// Handles `GET /breweries/{id}`.
async fn get_brewery(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let context = http_request_context(peer, &headers);
    let mut meta = RequestMeta::new("GET", "/breweries/{id}");
    let result: Result<(StatusCode, Brewery), ApiError> = async {
        let id = parse_brewery_id(&raw_id)?;
        meta.brewery_id = Some(id);
        meta.subject = authorize(&state, &context, AuthAction::GetBrewery)?.subject;
        let brewery = run_store(&state, move |store| store.fetch_one(id)).await?;
        Ok((StatusCode::OK, brewery))
    }
    .await;
    finish(&state, &context, meta, result)
}

/// Handles `POST /breweries`.
async fn create_brewery(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let context = http_request_context(peer, &headers);
    let mut meta = RequestMeta::new("POST", "/breweries");
    let result: Result<(StatusCode, Brewery), ApiError> = async {
        let body = read_body(&state, body).await?;
        meta.request_bytes = body.len();
        meta.subject = authorize(&state, &context, AuthAction::CreateBrewery)?.subject;
        let brewery = parse_brewery(&body)?;
        let created = run_store(&state, move |store| store.insert(&brewery)).await?;
        meta.brewery_id = Some(created.brewery_id);
        Ok((StatusCode::CREATED, created))
    }
    .await;
    finish(&state, &context, meta, result)
}

/// Handles `PUT /breweries`.
async fn update_brewery(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let context = http_request_context(peer, &headers);
    let mut meta = RequestMeta::new("PUT", "/breweries");
    let result: Result<(StatusCode, bool), ApiError> = async {
        let body = read_body(&state, body).await?;
        meta.request_bytes = body.len();
        meta.subject = authorize(&state, &context, AuthAction::UpdateBrewery)?.subject;
        let brewery = parse_brewery(&body)?;
        meta.brewery_id = Some(brewery.brewery_id);
        let updated = run_store(&state, move |store| store.update(&brewery)).await?;
        if !updated {
            return Err(ApiError::NotFound(UPDATE_NOT_FOUND.to_string()));
        }
        Ok((StatusCode::OK, true))
    }
    .await;
    finish(&state, &context, meta, result)
}

/// Handles `DELETE /breweries/{id}`.
async fn delete_brewery(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Response {
    let context = http_request_context(peer, &headers);
    let mut meta = RequestMeta::new("DELETE", "/breweries/{id}");
    let result: Result<(StatusCode, bool), ApiError> = async {
        let id = parse_brewery_id(&raw_id)?;
        meta.brewery_id = Some(id);
        meta.subject = authorize(&state, &context, AuthAction::DeleteBrewery)?.subject;
        let deleted = run_store(&state, move |store| store.delete(id)).await?;
        if !deleted {
            return Err(ApiError::NotFound(DELETE_NOT_FOUND.to_string()));
        }
        Ok((StatusCode::OK, true))
    }
    .await;
    finish(&state, &context, meta, result)
}

// ============================================================================
// SECTION: Request Handling
// ============================================================================

/// Request facts collected for the audit event.
struct RequestMeta {
    /// HTTP method.
    method: &'static str,
    /// Route template.
    route: &'static str,
    /// Request body size.
    request_bytes: usize,
    /// Brewery addressed by the request.
    brewery_id: Option<BreweryId>,
    /// Resolved caller subject.
    subject: Option<String>,
}

impl RequestMeta {
    /// Starts request metadata for a route.
    const fn new(method: &'static str, route: &'static str) -> Self {
        Self {
            method,
            route,
            request_bytes: 0,
            brewery_id: None,
            subject: None,
        }
    }
}

/// Runs the capability check and records the decision.
fn authorize(
    state: &ServerState,
    context: &RequestContext,
    action: AuthAction,
) -> Result<AuthContext, ApiError> {
    match state.authz.authorize(context, action) {
        Ok(auth) => {
            state.audit.record_auth(&AuthAuditEvent::allowed(context, action, &auth));
            Ok(auth)
        }
        Err(err) => {
            state.audit.record_auth(&AuthAuditEvent::denied(context, action, &err));
            Err(ApiError::from(err))
        }
    }
}

/// Runs a store call on the blocking pool.
async fn run_store<T, F>(state: &ServerState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SharedBreweryStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| ApiError::StoreFailure(format!("store task failed: {err}")))?
        .map_err(ApiError::from)
}

/// Buffers the request body, failing once it exceeds the configured limit.
async fn read_body(state: &ServerState, body: Body) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, state.max_body_bytes).await.map_err(|err| body_read_error(&err))
}

/// Maps a body read failure; only the length limit yields 413.
fn body_read_error(err: &axum::Error) -> ApiError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return ApiError::PayloadTooLarge;
        }
        source = current.source();
    }
    ApiError::InvalidRequest(format!("failed to read request body: {err}"))
}

/// Decodes a brewery JSON payload.
fn parse_brewery(body: &Bytes) -> Result<Brewery, ApiError> {
    serde_json::from_slice(body.as_ref())
        .map_err(|err| ApiError::InvalidRequest(format!("invalid brewery payload: {err}")))
}

/// Parses a brewery identifier path segment.
fn parse_brewery_id(raw: &str) -> Result<BreweryId, ApiError> {
    raw.parse::<i64>()
        .map(BreweryId::new)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid brewery id: {raw}")))
}

/// Records the request audit event and renders the response.
fn finish<T: Serialize>(
    state: &ServerState,
    context: &RequestContext,
    meta: RequestMeta,
    result: Result<(StatusCode, T), ApiError>,
) -> Response {
    let (status, error_kind, response) = match result {
        Ok((status, body)) => (status, None, (status, Json(body)).into_response()),
        Err(err) => {
            let status = err.status();
            (status, Some(err.kind()), (status, Json(ErrorEnvelope::from(&err))).into_response())
        }
    };
    state.audit.record(&ApiAuditEvent::new(ApiAuditEventParams {
        request_id: context.request_id.clone(),
        peer_ip: context.peer_ip.map(|ip| ip.to_string()),
        method: meta.method,
        route: meta.route,
        status: status.as_u16(),
        error_kind,
        brewery_id: meta.brewery_id,
        subject: meta.subject,
        request_bytes: meta.request_bytes,
    }));
    response
}

/// Builds the auth context for an HTTP request.
fn http_request_context(peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let context = RequestContext::http(Some(peer.ip()), auth_header);
    match headers.get(REQUEST_ID_HEADER).and_then(|value| value.to_str().ok()) {
        Some(request_id) if !request_id.is_empty() && request_id.len() <= MAX_REQUEST_ID_BYTES => {
            context.with_request_id(request_id)
        }
        _ => context,
    }
}

/// Warns on stderr when writes are gated by loopback access alone.
fn emit_local_only_warning(config: &BreweryConfig) {
    if config.server.auth_mode() == ServerAuthMode::LocalOnly {
        let _ = writeln!(
            std::io::stderr(),
            "brewery-api: WARNING: server running in local-only mode without explicit auth; \
             configure server.auth to enable bearer_token"
        );
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request-level API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Requested brewery does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Record store failed.
    #[error("{0}")]
    StoreFailure(String),
    /// Caller could not be authenticated.
    #[error("{0}")]
    Unauthenticated(String),
    /// Caller lacks the required role.
    #[error("{0}")]
    Unauthorized(String),
    /// Malformed payload or path.
    #[error("{0}")]
    InvalidRequest(String),
    /// Request body exceeds the configured limit.
    #[error("request body too large")]
    PayloadTooLarge,
}

impl ApiError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Returns the stable error kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::StoreFailure(_) => "store_failure",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidRequest(_) => "invalid_request",
            Self::PayloadTooLarge => "payload_too_large",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::StoreFailure(err.to_string())
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(_) => Self::Unauthenticated(err.to_string()),
            AuthError::Unauthorized(_) => Self::Unauthorized(err.to_string()),
        }
    }
}

/// Error response envelope.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    /// Error payload.
    error: ErrorBody,
}

/// Error response payload.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Stable error kind.
    kind: &'static str,
    /// Human-readable message.
    message: String,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(err: &ApiError) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

/// Brewery server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use axum::http::StatusCode;
    use brewery_core::BreweryId;
    use brewery_core::StoreError;

    use axum::body::Body;

    use super::ApiError;
    use super::body_read_error;
    use super::parse_brewery_id;

    #[test]
    fn parse_brewery_id_accepts_integers() {
        assert_eq!(parse_brewery_id("42").unwrap(), BreweryId::new(42));
        assert_eq!(parse_brewery_id("-3").unwrap(), BreweryId::new(-3));
    }

    #[test]
    fn parse_brewery_id_rejects_non_numeric() {
        let err = parse_brewery_id("hop-house").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "invalid_request");
    }

    #[tokio::test]
    async fn body_over_limit_maps_to_payload_too_large() {
        let err = axum::body::to_bytes(Body::from("hop house"), 4).await.unwrap_err();
        let mapped = body_read_error(&err);
        assert_eq!(mapped.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(mapped.kind(), "payload_too_large");
    }

    #[test]
    fn broken_body_stream_maps_to_invalid_request() {
        let err = axum::Error::new(std::io::Error::other("connection reset"));
        let mapped = body_read_error(&err);
        assert_eq!(mapped.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mapped.kind(), "invalid_request");
        assert!(mapped.to_string().contains("connection reset"));
    }

    #[test]
    fn store_errors_split_into_not_found_and_failure() {
        let not_found = ApiError::from(StoreError::NotFound(BreweryId::new(9)));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "brewery with id 9 was not found");

        for err in [
            StoreError::Io("disk".to_string()),
            StoreError::Store("locked".to_string()),
            StoreError::Invalid("column".to_string()),
            StoreError::VersionMismatch("2".to_string()),
        ] {
            let api = ApiError::from(err);
            assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api.kind(), "store_failure");
        }
    }
}
