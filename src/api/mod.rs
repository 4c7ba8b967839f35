//! API module - read-only inspection of the address space

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::nodespace::{AddressSpace, NodeId};

/// Shared state for the inspection handlers
#[derive(Clone)]
pub struct InspectState {
    pub space: Arc<AddressSpace>,
    /// Node listed by `GET /api/nodes`
    pub root: NodeId,
}

pub fn routes() -> Router<InspectState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Address space
        .route("/api/namespaces", get(handlers::list_namespaces))
        .route("/api/nodes", get(handlers::get_tree))
        .route("/api/nodes/:ns/:id", get(handlers::get_node))
}

pub fn app(state: InspectState) -> Router {
    routes()
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
