//! Address space browsing handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::InspectState;
use crate::error::AppError;
use crate::nodespace::memory::{Node, NodeTree};
use crate::nodespace::NodeId;

#[derive(Serialize)]
pub struct NamespaceEntry {
    pub index: u16,
    pub uri: String,
}

/// List registered namespaces
pub async fn list_namespaces(State(state): State<InspectState>) -> Json<Vec<NamespaceEntry>> {
    let entries = state
        .space
        .namespaces()
        .await
        .into_iter()
        .enumerate()
        .map(|(index, uri)| NamespaceEntry {
            index: index as u16,
            uri,
        })
        .collect();
    Json(entries)
}

/// Folder → devices → sensors
pub async fn get_tree(State(state): State<InspectState>) -> Result<Json<NodeTree>, AppError> {
    state
        .space
        .tree(state.root)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Node {} not found", state.root)))
}

/// Get one node; `ns` is a namespace index or a registered namespace name
pub async fn get_node(
    State(state): State<InspectState>,
    Path((ns, id)): Path<(String, String)>,
) -> Result<Json<Node>, AppError> {
    let namespaces = state.space.namespaces().await;
    let namespace = resolve_namespace(&namespaces, &ns)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown namespace: {}", ns)))?;
    let identifier: u32 = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid node id: {}", id)))?;

    let node_id = NodeId::new(namespace, identifier);
    state
        .space
        .get(node_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Node {} not found", node_id)))
}

fn resolve_namespace(namespaces: &[String], ns: &str) -> Option<u16> {
    let index = match ns.parse::<usize>() {
        Ok(index) => index,
        Err(_) => namespaces.iter().position(|uri| uri == ns)?,
    };
    if index < namespaces.len() {
        u16::try_from(index).ok()
    } else {
        None
    }
}
