//! REST API handlers.
//!
//! Each handler calls the orchestrator and returns JSON responses in a
//! consistent envelope. Error kinds map onto status codes in
//! [`status_for`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use warden_core::{CoreError, Inventory};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Status code for each error kind: client mistakes are 4xx, backend
/// failures 5xx, with cluster trouble reported as a bad gateway.
fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        CoreError::NoTemplatesFound
        | CoreError::Template { .. }
        | CoreError::DefaultsUnreadable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CoreError::Cluster(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &CoreError) -> axum::response::Response {
    (
        status_for(err),
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }),
    )
        .into_response()
}

// ── Probes ─────────────────────────────────────────────────────

/// GET /ready
pub async fn ready() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /alive
pub async fn alive() -> impl IntoResponse {
    StatusCode::OK
}

// ── Inventories ────────────────────────────────────────────────

/// Create request body.
#[derive(serde::Deserialize)]
pub struct CreateRequest {
    pub namespace: String,
}

/// POST /inventories
pub async fn create_namespace(
    State(state): State<ApiState>,
    Json(req): Json<CreateRequest>,
) -> impl IntoResponse {
    match state.orch.create(&req.namespace).await {
        Ok(inventory) => (StatusCode::CREATED, ApiResponse::ok(inventory)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /inventories
pub async fn list_inventories(State(state): State<ApiState>) -> impl IntoResponse {
    match state.orch.list_inventories().await {
        Ok(inventories) => ApiResponse::ok(inventories).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /inventories/:namespace
pub async fn get_inventory(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.orch.get_inventory(&namespace).await {
        Ok(inventory) => ApiResponse::ok(inventory).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT /inventories/:namespace
pub async fn update_inventory(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
    Json(inventory): Json<Inventory>,
) -> impl IntoResponse {
    match state.orch.update(&namespace, inventory).await {
        Ok(stored) => ApiResponse::ok(stored).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Delete query options.
#[derive(Default, serde::Deserialize)]
pub struct DeleteOptions {
    #[serde(default)]
    pub wait: bool,
}

/// DELETE /inventories/:namespace (`?wait=true` defers local cleanup to
/// the reconciler)
pub async fn delete_namespace(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
    Query(opts): Query<DeleteOptions>,
) -> impl IntoResponse {
    match state.orch.delete(&namespace, opts.wait).await {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Status & cluster reads ─────────────────────────────────────

/// GET /inventories/:namespace/status
pub async fn namespace_status(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.orch.namespace_status(&namespace).await {
        Ok(status) => ApiResponse::ok(status).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /inventories/:namespace/reset
pub async fn reset_namespace(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.orch.reset(&namespace).await {
        Ok(inventory) => ApiResponse::ok(inventory).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /inventories/:namespace/services
pub async fn list_services(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.orch.list_services(&namespace).await {
        Ok(services) => ApiResponse::ok(services).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /inventories/:namespace/deployments
pub async fn list_deployments(
    State(state): State<ApiState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.orch.list_deployments(&namespace).await {
        Ok(deployments) => ApiResponse::ok(deployments).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /resources/:namespace/jobs/:job
pub async fn delete_job(
    State(state): State<ApiState>,
    Path((namespace, job)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.orch.delete_resource(&namespace, &job).await {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Playbook & version ─────────────────────────────────────────

/// GET /defaults
pub async fn defaults(State(state): State<ApiState>) -> impl IntoResponse {
    match state.orch.defaults().await {
        Ok(defaults) => ApiResponse::ok(defaults).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /version
pub async fn version(State(state): State<ApiState>) -> impl IntoResponse {
    match state.orch.version().await {
        Ok(version) => ApiResponse::ok(version).into_response(),
        Err(e) => error_response(&e),
    }
}
