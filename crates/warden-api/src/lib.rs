//! warden-api — REST API for Warden.
//!
//! Provides axum route handlers over the namespace [`Orchestrator`].
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/ready`, `/alive` | Probes |
//! | POST | `/inventories` | Provision a namespace |
//! | GET | `/inventories` | List managed namespaces (inventories) |
//! | GET | `/inventories/:ns` | Get one inventory |
//! | PUT | `/inventories/:ns` | Replace an inventory and re-apply |
//! | DELETE | `/inventories/:ns` | Delete the namespace (`?wait=true` cleans up locally) |
//! | GET | `/inventories/:ns/status` | Aggregate namespace health |
//! | POST | `/inventories/:ns/reset` | Reset the inventory to defaults and re-apply |
//! | GET | `/inventories/:ns/services` | Services in the namespace |
//! | GET | `/inventories/:ns/deployments` | Deployment readiness in the namespace |
//! | DELETE | `/resources/:ns/jobs/:job` | Delete one batch job |
//! | GET | `/defaults` | Playbook default parameter set |
//! | GET | `/version` | Tool/client/server version triple |

pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use warden_core::Orchestrator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orch: Orchestrator,
}

/// Build the complete API router. `cors` enables a permissive CORS layer
/// for browser-based clients.
pub fn build_router(orch: Orchestrator, cors: bool) -> Router {
    let state = ApiState { orch };

    let router = Router::new()
        .route("/ready", get(handlers::ready))
        .route("/alive", get(handlers::alive))
        .route(
            "/inventories",
            get(handlers::list_inventories).post(handlers::create_namespace),
        )
        .route(
            "/inventories/{namespace}",
            get(handlers::get_inventory)
                .put(handlers::update_inventory)
                .delete(handlers::delete_namespace),
        )
        .route(
            "/inventories/{namespace}/status",
            get(handlers::namespace_status),
        )
        .route(
            "/inventories/{namespace}/reset",
            post(handlers::reset_namespace),
        )
        .route(
            "/inventories/{namespace}/services",
            get(handlers::list_services),
        )
        .route(
            "/inventories/{namespace}/deployments",
            get(handlers::list_deployments),
        )
        .route(
            "/resources/{namespace}/jobs/{job}",
            delete(handlers::delete_job),
        )
        .route("/defaults", get(handlers::defaults))
        .route("/version", get(handlers::version))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
