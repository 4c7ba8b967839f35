//! Address-space materializer
//!
//! Makes sure every device and sensor seen in a listing has a node in the
//! host. A node is requested once per registry entry; when the host rejects
//! the request the entry stays registered and creation is attempted again the
//! next time the record shows up (every cycle, no backoff).

use std::sync::Arc;

use crate::error::HostError;
use crate::nodespace::{AccessLevel, NodeId, NodeSpace, Namespaces};
use crate::sync::coerce::TypedValue;
use crate::sync::registry::{display_name, Device, DeviceRegistry, Sensor};
use crate::tlink::models::DeviceIdentity;

/// Where device and sensor nodes go
#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub namespaces: Namespaces,
    /// Vendor folder every device hangs under
    pub folder: NodeId,
    /// Device name shared by many devices, disambiguated with the id
    pub generic_device_name: String,
}

impl NodeLayout {
    pub fn device_node(&self, device_id: u32) -> NodeId {
        NodeId::new(self.namespaces.device, device_id)
    }

    pub fn sensor_node(&self, sensor_id: u32) -> NodeId {
        NodeId::new(self.namespaces.sensor, sensor_id)
    }
}

/// Outcome of [`Materializer::ensure_sensor`]
#[derive(Debug)]
pub enum Materialized<'d> {
    /// Node created just now, carrying the initial value
    Created(&'d mut Sensor),
    /// Node already existed
    Existing(&'d mut Sensor),
}

pub struct Materializer {
    nodes: Arc<dyn NodeSpace>,
    layout: NodeLayout,
}

impl Materializer {
    pub fn new(nodes: Arc<dyn NodeSpace>, layout: NodeLayout) -> Self {
        Self { nodes, layout }
    }

    pub async fn ensure_device<'r>(
        &self,
        registry: &'r mut DeviceRegistry,
        identity: &DeviceIdentity,
    ) -> Result<&'r mut Device, HostError> {
        let device = registry.get_or_register(identity.device_id, || {
            let name = display_name(
                &identity.device_name,
                identity.device_id,
                &self.layout.generic_device_name,
            );
            tracing::info!("[DeviceSync] New device {} [{}]", identity.device_id, name);
            Device::new(identity.device_id, &identity.device_no, name)
        });

        if !device.materialized {
            let node = self.layout.device_node(device.device_id);
            let status = self
                .nodes
                .create_object_node(node, self.layout.folder, &device.display_name, &device.device_no)
                .await;
            HostError::check("create_object_node", node, status)?;
            device.materialized = true;
        }

        Ok(device)
    }

    pub async fn ensure_sensor<'d>(
        &self,
        device: &'d mut Device,
        sensor_id: u32,
        sensor_name: &str,
        initial: &TypedValue,
    ) -> Result<Materialized<'d>, HostError> {
        let parent = self.layout.device_node(device.device_id);
        let sensor = device
            .sensors
            .entry(sensor_id)
            .or_insert_with(|| Sensor::new(sensor_id, sensor_name));

        if sensor.materialized {
            return Ok(Materialized::Existing(sensor));
        }

        let node = self.layout.sensor_node(sensor_id);
        let status = self
            .nodes
            .create_variable_node(
                node,
                parent,
                &sensor.sensor_name,
                &sensor.sensor_name,
                initial,
                AccessLevel::ReadOnly,
            )
            .await;
        HostError::check("create_variable_node", node, status)?;
        sensor.materialized = true;

        Ok(Materialized::Created(sensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodespace::StatusCode;
    use crate::testing::{HostCall, RecordingNodeSpace};

    fn identity(id: u32, name: &str) -> DeviceIdentity {
        DeviceIdentity {
            device_id: id,
            device_no: format!("SN-{}", id),
            device_name: name.to_string(),
        }
    }

    async fn setup() -> (Arc<RecordingNodeSpace>, Materializer) {
        let host = Arc::new(RecordingNodeSpace::new().await);
        let materializer = Materializer::new(host.clone(), host.layout());
        (host, materializer)
    }

    #[tokio::test]
    async fn test_ensure_device_creates_once() {
        let (host, materializer) = setup().await;
        let mut registry = DeviceRegistry::new();

        materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap();
        let device = materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap();
        assert!(device.materialized);

        assert_eq!(host.count(|c| matches!(c, HostCall::CreateObject { .. })), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_generic_device_name_gets_id() {
        let (host, materializer) = setup().await;
        let mut registry = DeviceRegistry::new();

        materializer
            .ensure_device(&mut registry, &identity(12, "4G压力表"))
            .await
            .unwrap();

        let node = host
            .space()
            .get(host.layout().device_node(12))
            .await
            .unwrap();
        assert_eq!(node.browse_name, "4G压力表(12)");
        assert_eq!(node.description, "SN-12");
    }

    #[tokio::test]
    async fn test_failed_device_creation_is_retried() {
        let (host, materializer) = setup().await;
        let mut registry = DeviceRegistry::new();

        host.fail_next_create(StatusCode::Bad);
        let err = materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::Bad);
        assert_eq!(registry.len(), 1);
        assert!(!registry.get(7).unwrap().materialized);

        materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap();
        assert!(registry.get(7).unwrap().materialized);
        assert_eq!(host.count(|c| matches!(c, HostCall::CreateObject { .. })), 2);
    }

    #[tokio::test]
    async fn test_ensure_sensor_creates_once() {
        let (host, materializer) = setup().await;
        let mut registry = DeviceRegistry::new();
        let device = materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap();

        let first = materializer
            .ensure_sensor(device, 10, "Temp", &TypedValue::Float(23.5))
            .await
            .unwrap();
        assert!(matches!(first, Materialized::Created(_)));

        let second = materializer
            .ensure_sensor(device, 10, "Temp", &TypedValue::Float(24.0))
            .await
            .unwrap();
        assert!(matches!(second, Materialized::Existing(_)));

        assert_eq!(host.count(|c| matches!(c, HostCall::CreateVariable { .. })), 1);
        let node = host
            .space()
            .get(host.layout().sensor_node(10))
            .await
            .unwrap();
        assert_eq!(node.parent, Some(host.layout().device_node(7)));
        assert_eq!(node.access_level, Some(AccessLevel::ReadOnly));
        assert_eq!(node.value.unwrap().value, TypedValue::Float(23.5));
    }

    #[tokio::test]
    async fn test_failed_sensor_creation_stays_registered() {
        let (host, materializer) = setup().await;
        let mut registry = DeviceRegistry::new();
        let device = materializer
            .ensure_device(&mut registry, &identity(7, "Pump"))
            .await
            .unwrap();

        host.fail_next_create(StatusCode::BadNodeIdExists);
        assert!(materializer
            .ensure_sensor(device, 10, "Temp", &TypedValue::Integer(1))
            .await
            .is_err());
        assert!(!device.sensors[&10].materialized);

        let retried = materializer
            .ensure_sensor(device, 10, "Temp", &TypedValue::Integer(1))
            .await
            .unwrap();
        assert!(matches!(retried, Materialized::Created(_)));
    }
}
