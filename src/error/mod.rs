//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::nodespace::{NodeId, StatusCode as NodeStatus};

/// Failure to get any usable response out of the remote API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("empty response body")]
    EmptyBody,
}

/// Credential exchange errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("token exchange failed: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("token response is not valid JSON: {0}")]
    Malformed(String),

    #[error("token response is missing `{0}`")]
    MissingField(&'static str),
}

/// A single inbound record (sensor or device) could not be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid number: {value:?}")]
    Unparsable { field: &'static str, value: String },

    #[error("unsupported sensor type id: {0}")]
    UnsupportedType(i64),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A listing page was rejected as a whole
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageError {
    #[error("listing request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("listing response is not valid JSON: {0}")]
    Malformed(String),

    #[error("listing response is missing `{0}`")]
    MissingField(&'static str),

    #[error("listing rejected with flag {flag:?}: {msg}")]
    Rejected { flag: String, msg: String },

    #[error("`{0}` is not an array")]
    NotAnArray(&'static str),
}

/// The node-space host refused a create or write request
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{op} on {node} rejected with {status}")]
pub struct HostError {
    pub op: &'static str,
    pub node: NodeId,
    pub status: NodeStatus,
}

impl HostError {
    /// Turn a host status into a `Result`
    pub fn check(op: &'static str, node: NodeId, status: NodeStatus) -> Result<(), HostError> {
        if status.is_good() {
            Ok(())
        } else {
            Err(HostError { op, node, status })
        }
    }
}

/// Errors surfaced by the inspection API
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
