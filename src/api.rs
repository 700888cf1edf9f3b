// 🌐 HTTP API - read endpoints over the current graph snapshot

use crate::config::EngineConfig;
use crate::query::{QueryError, QueryService};
use crate::snapshot::SnapshotStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(store: Arc<SnapshotStore>, config: EngineConfig) -> Self {
        AppState {
            store,
            config: Arc::new(config),
        }
    }

    /// Query service bound to the latest completed snapshot
    fn queries(&self) -> QueryService {
        QueryService::new(self.store.current(), self.config.max_documents_per_address)
    }

    /// A query that hit a dangling reference flagged the snapshot; rebuild off the request path
    fn schedule_rebuild_if_needed(&self) {
        if self.store.current().needs_rebuild() {
            let store = Arc::clone(&self.store);
            tokio::task::spawn_blocking(move || {
                if store.rebuild_if_needed() {
                    info!("Snapshot rebuilt after index inconsistency");
                }
            });
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Error body; `allowed` lists valid values when the caller sent a bad one
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<String>>,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, allowed) = match &self {
            QueryError::InvalidNetwork { allowed, .. } => (StatusCode::BAD_REQUEST, Some(allowed.clone())),
            QueryError::DocumentNotFound(_) => (StatusCode::NOT_FOUND, None),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            allowed,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/blockchain/address/:address - Documents mentioning an address (any network)
async fn get_by_address(State(state): State<AppState>, Path(address): Path<String>) -> impl IntoResponse {
    let decoded = urlencoding::decode(&address)
        .unwrap_or_else(|_| address.clone().into())
        .into_owned();

    let response = state.queries().by_address(decoded.trim());
    state.schedule_rebuild_if_needed();

    (StatusCode::OK, Json(response))
}

/// GET /api/blockchain/network/:network - Documents classified to a network
async fn get_by_network(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> Result<impl IntoResponse, QueryError> {
    let response = state.queries().by_network(&network).map_err(|e| {
        warn!("Rejected network query: {}", e);
        e
    })?;

    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/blockchain/addresses - Address index with bounded document summaries
async fn get_all_addresses(State(state): State<AppState>, Query(page): Query<PageParams>) -> impl IntoResponse {
    let response = state.queries().all_addresses(page.offset, page.limit);
    state.schedule_rebuild_if_needed();

    (StatusCode::OK, Json(response))
}

/// GET /api/blockchain/related/:id - Relationship edges touching a document
async fn get_related(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, QueryError> {
    let response = state.queries().related(&id)?;
    state.schedule_rebuild_if_needed();

    Ok((StatusCode::OK, Json(response)))
}

/// Router with every API route; tests drive it with `oneshot`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/blockchain/address/:address", get(get_by_address))
        .route("/blockchain/network/:network", get(get_by_network))
        .route("/blockchain/addresses", get(get_all_addresses))
        .route("/blockchain/related/:id", get(get_related))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
