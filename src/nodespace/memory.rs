//! In-process address space
//!
//! Holds the browsable object/variable tree behind a single lock. Enforces the
//! same rules a protocol server would: unique node ids, existing parents, and
//! writes that match the variable's declared data type.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{AccessLevel, NodeId, NodeSpace, StatusCode};
use crate::sync::coerce::{DataType, TypedValue};

const STANDARD_NAMESPACE: &str = "http://opcfoundation.org/UA/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeClass {
    Object,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataValue {
    pub value: TypedValue,
    pub status: StatusCode,
    pub source_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub class: NodeClass,
    pub browse_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<DataValue>,
    #[serde(skip)]
    children: Vec<NodeId>,
}

/// Node plus its descendants, for browsing
#[derive(Debug, Clone, Serialize)]
pub struct NodeTree {
    #[serde(flatten)]
    pub node: Node,
    pub children: Vec<NodeTree>,
}

#[derive(Debug, Default)]
struct Inner {
    namespaces: Vec<String>,
    nodes: BTreeMap<NodeId, Node>,
}

impl Inner {
    fn insert(&mut self, node: Node) -> StatusCode {
        if self.nodes.contains_key(&node.id) {
            return StatusCode::BadNodeIdExists;
        }
        let Some(parent_id) = node.parent else {
            return StatusCode::BadParentNodeIdInvalid;
        };
        let Some(parent) = self.nodes.get_mut(&parent_id) else {
            return StatusCode::BadParentNodeIdInvalid;
        };
        parent.children.push(node.id);
        self.nodes.insert(node.id, node);
        StatusCode::Good
    }

    fn variable_mut(&mut self, id: NodeId) -> Result<&mut Node, StatusCode> {
        let node = self.nodes.get_mut(&id).ok_or(StatusCode::BadNodeIdUnknown)?;
        if node.class != NodeClass::Variable {
            return Err(StatusCode::BadNodeClassInvalid);
        }
        Ok(node)
    }

    fn tree(&self, id: NodeId) -> Option<NodeTree> {
        let node = self.nodes.get(&id)?;
        let children = node
            .children
            .iter()
            .filter_map(|child| self.tree(*child))
            .collect();
        Some(NodeTree {
            node: node.clone(),
            children,
        })
    }
}

/// Address space host living in this process
pub struct AddressSpace {
    inner: RwLock<Inner>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace {
    /// Empty space containing only namespace 0 and its `ObjectsFolder`
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.namespaces.push(STANDARD_NAMESPACE.to_string());
        inner.nodes.insert(
            NodeId::OBJECTS_FOLDER,
            Node {
                id: NodeId::OBJECTS_FOLDER,
                parent: None,
                class: NodeClass::Object,
                browse_name: "Objects".to_string(),
                description: "Objects".to_string(),
                data_type: None,
                access_level: None,
                value: None,
                children: Vec::new(),
            },
        );

        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Register a namespace URI and return its index; existing URIs keep their index
    pub async fn add_namespace(&self, uri: &str) -> u16 {
        let mut inner = self.inner.write().await;
        if let Some(index) = inner.namespaces.iter().position(|ns| ns == uri) {
            return index as u16;
        }
        inner.namespaces.push(uri.to_string());
        (inner.namespaces.len() - 1) as u16
    }

    pub async fn namespaces(&self) -> Vec<String> {
        self.inner.read().await.namespaces.clone()
    }

    pub async fn get(&self, id: NodeId) -> Option<Node> {
        self.inner.read().await.nodes.get(&id).cloned()
    }

    pub async fn tree(&self, root: NodeId) -> Option<NodeTree> {
        self.inner.read().await.tree(root)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.nodes.len()
    }
}

#[async_trait]
impl NodeSpace for AddressSpace {
    async fn create_object_node(
        &self,
        id: NodeId,
        parent: NodeId,
        name: &str,
        description: &str,
    ) -> StatusCode {
        let status = self.inner.write().await.insert(Node {
            id,
            parent: Some(parent),
            class: NodeClass::Object,
            browse_name: name.to_string(),
            description: description.to_string(),
            data_type: None,
            access_level: None,
            value: None,
            children: Vec::new(),
        });
        tracing::debug!("[AddressSpace] {}|create object {} [{}]", status, id, name);
        status
    }

    async fn create_variable_node(
        &self,
        id: NodeId,
        parent: NodeId,
        name: &str,
        description: &str,
        value: &TypedValue,
        access: AccessLevel,
    ) -> StatusCode {
        let status = self.inner.write().await.insert(Node {
            id,
            parent: Some(parent),
            class: NodeClass::Variable,
            browse_name: name.to_string(),
            description: description.to_string(),
            data_type: Some(value.data_type()),
            access_level: Some(access),
            value: Some(DataValue {
                value: value.clone(),
                status: StatusCode::Good,
                source_timestamp: Utc::now(),
            }),
            children: Vec::new(),
        });
        tracing::debug!("[AddressSpace] {}|create variable {} [{}]", status, id, name);
        status
    }

    async fn write_value(&self, id: NodeId, value: &TypedValue) -> StatusCode {
        let mut inner = self.inner.write().await;
        let node = match inner.variable_mut(id) {
            Ok(node) => node,
            Err(status) => return status,
        };
        if node.data_type != Some(value.data_type()) {
            return StatusCode::BadTypeMismatch;
        }
        node.value = Some(DataValue {
            value: value.clone(),
            status: StatusCode::Good,
            source_timestamp: Utc::now(),
        });
        StatusCode::Good
    }

    async fn write_status(&self, id: NodeId, status: StatusCode) -> StatusCode {
        let mut inner = self.inner.write().await;
        let node = match inner.variable_mut(id) {
            Ok(node) => node,
            Err(status) => return status,
        };
        match node.value.as_mut() {
            Some(current) => {
                current.status = status;
                current.source_timestamp = Utc::now();
                StatusCode::Good
            }
            None => StatusCode::BadNodeIdUnknown,
        }
    }
}
