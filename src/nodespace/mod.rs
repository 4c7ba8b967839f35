//! Node-space host contract
//!
//! - `NodeSpace`: the four operations the sync engine needs from the host
//! - `memory`: in-process address space implementing the contract

pub mod memory;

pub use memory::AddressSpace;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::sync::coerce::TypedValue;

/// Numeric node identifier scoped by a namespace index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: u32,
}

impl NodeId {
    /// Standard `ObjectsFolder` in namespace 0
    pub const OBJECTS_FOLDER: NodeId = NodeId::new(0, 85);

    pub const fn new(namespace: u16, identifier: u32) -> Self {
        Self {
            namespace,
            identifier,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};i={}", self.namespace, self.identifier)
    }
}

/// Result of a host operation, also used as a variable's value status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusCode {
    Good,
    Bad,
    BadNodeIdExists,
    BadNodeIdUnknown,
    BadParentNodeIdInvalid,
    BadTypeMismatch,
    BadNodeClassInvalid,
}

impl StatusCode {
    pub fn is_good(&self) -> bool {
        matches!(self, StatusCode::Good)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessLevel {
    ReadOnly,
}

/// Namespace indexes for the three node families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub folder: u16,
    pub device: u16,
    pub sensor: u16,
}

/// Operations the host exposes to the sync engine
#[async_trait]
pub trait NodeSpace: Send + Sync {
    async fn create_object_node(
        &self,
        id: NodeId,
        parent: NodeId,
        name: &str,
        description: &str,
    ) -> StatusCode;

    /// Create a scalar variable typed after `value`, which also becomes its initial value
    async fn create_variable_node(
        &self,
        id: NodeId,
        parent: NodeId,
        name: &str,
        description: &str,
        value: &TypedValue,
        access: AccessLevel,
    ) -> StatusCode;

    /// Replace the value; the value status goes back to `Good`
    async fn write_value(&self, id: NodeId, value: &TypedValue) -> StatusCode;

    /// Replace only the value status
    async fn write_status(&self, id: NodeId, status: StatusCode) -> StatusCode;
}
