//! Test doubles for the two collaborator seams

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::nodespace::{AccessLevel, AddressSpace, NodeId, NodeSpace, Namespaces, StatusCode};
use crate::sync::coerce::TypedValue;
use crate::sync::materializer::NodeLayout;
use crate::tlink::TelemetryApi;

pub const GENERIC_NAME: &str = "4G压力表";

pub fn token_body(token: &str, expires_in: i64) -> String {
    json!({"userId": 42, "expires_in": expires_in, "access_token": token}).to_string()
}

pub fn page_body(total: usize, devices: Vec<Value>) -> String {
    json!({"flag": "00", "msg": "ok", "rowCount": total, "dataList": devices}).to_string()
}

pub fn device_json(id: u32, sensors: Vec<Value>) -> Value {
    json!({
        "id": id,
        "deviceNo": format!("SN-{}", id),
        "deviceName": format!("Device {}", id),
        "sensorsList": sensors
    })
}

/// `TelemetryApi` answering from queued responses
#[derive(Default)]
pub struct ScriptedApi {
    tokens: Mutex<VecDeque<Result<String, TransportError>>>,
    pages: Mutex<VecDeque<Result<String, TransportError>>>,
    fallback_token: Option<String>,
    token_requests: AtomicUsize,
    page_requests: Mutex<Vec<(u32, u32)>>,
    page_delay: Option<Duration>,
    pages_answered: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out this token body whenever the queue is empty
    pub fn with_token(body: String) -> Self {
        Self {
            fallback_token: Some(body),
            ..Self::default()
        }
    }

    /// Make every listing request take `delay` before it answers
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    pub fn push_token(&self, response: Result<String, TransportError>) {
        self.tokens.lock().unwrap().push_back(response);
    }

    pub fn push_page(&self, response: Result<String, TransportError>) {
        self.pages.lock().unwrap().push_back(response);
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    /// `(page, page_size)` of every listing request so far
    pub fn page_requests(&self) -> Vec<(u32, u32)> {
        self.page_requests.lock().unwrap().clone()
    }

    /// Listing requests that ran to completion
    pub fn pages_answered(&self) -> usize {
        self.pages_answered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryApi for ScriptedApi {
    async fn request_token(&self) -> Result<String, TransportError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        match self.tokens.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self
                .fallback_token
                .clone()
                .ok_or_else(|| TransportError::Request("no scripted token".to_string())),
        }
    }

    async fn request_device_page(
        &self,
        _token: &str,
        _user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<String, TransportError> {
        self.page_requests.lock().unwrap().push((page, page_size));
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        self.pages_answered.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::EmptyBody))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateObject { id: NodeId, parent: NodeId, name: String },
    CreateVariable { id: NodeId, parent: NodeId, name: String, value: TypedValue },
    WriteValue { id: NodeId, value: TypedValue },
    WriteStatus { id: NodeId, status: StatusCode },
}

/// `NodeSpace` that records every call before handing it to a real `AddressSpace`
pub struct RecordingNodeSpace {
    space: AddressSpace,
    layout: NodeLayout,
    calls: Mutex<Vec<HostCall>>,
    create_failures: Mutex<VecDeque<StatusCode>>,
}

impl RecordingNodeSpace {
    /// Space with the three namespaces registered and the vendor folder in place
    pub async fn new() -> Self {
        let space = AddressSpace::new();
        let namespaces = Namespaces {
            folder: space.add_namespace("folder").await,
            device: space.add_namespace("device").await,
            sensor: space.add_namespace("sensor").await,
        };
        let folder = NodeId::new(namespaces.folder, 1);
        space
            .create_object_node(folder, NodeId::OBJECTS_FOLDER, "Vendor", "Vendor")
            .await;

        Self {
            space,
            layout: NodeLayout {
                namespaces,
                folder,
                generic_device_name: GENERIC_NAME.to_string(),
            },
            calls: Mutex::new(Vec::new()),
            create_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn layout(&self) -> NodeLayout {
        self.layout.clone()
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Make the next create request fail with `status`
    pub fn fail_next_create(&self, status: StatusCode) {
        self.create_failures.lock().unwrap().push_back(status);
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn injected_failure(&self) -> Option<StatusCode> {
        self.create_failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl NodeSpace for RecordingNodeSpace {
    async fn create_object_node(
        &self,
        id: NodeId,
        parent: NodeId,
        name: &str,
        description: &str,
    ) -> StatusCode {
        self.record(HostCall::CreateObject {
            id,
            parent,
            name: name.to_string(),
        });
        if let Some(status) = self.injected_failure() {
            return status;
        }
        self.space.create_object_node(id, parent, name, description).await
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
        self.record(HostCall::CreateVariable {
            id,
            parent,
            name: name.to_string(),
            value: value.clone(),
        });
        if let Some(status) = self.injected_failure() {
            return status;
        }
        self.space
            .create_variable_node(id, parent, name, description, value, access)
            .await
    }

    async fn write_value(&self, id: NodeId, value: &TypedValue) -> StatusCode {
        self.record(HostCall::WriteValue {
            id,
            value: value.clone(),
        });
        self.space.write_value(id, value).await
    }

    async fn write_status(&self, id: NodeId, status: StatusCode) -> StatusCode {
        self.record(HostCall::WriteStatus { id, status });
        self.space.write_status(id, status).await
    }
}
