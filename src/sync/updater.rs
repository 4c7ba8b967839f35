//! Change-detected sensor updates
//!
//! A reading only counts as new data when its `updateDate` differs from the
//! one last applied. The online flag is tracked on every reading, but it only
//! reaches the host together with a value write, or right after creation.
//!
//! `last_update_at` advances as soon as a write is attempted, whether or not
//! the host accepts it, so a rejected write is not repeated for the same
//! timestamp.

use std::sync::Arc;

use crate::nodespace::{NodeSpace, StatusCode};
use crate::sync::coerce::{SensorReading, TypedValue};
use crate::sync::materializer::NodeLayout;
use crate::sync::registry::{Sensor, SensorStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same timestamp as last time, nothing written
    Unchanged,
    /// Value written; `status` is set when an offline status was also written
    Written {
        value: StatusCode,
        status: Option<StatusCode>,
    },
}

pub struct ChangeUpdater {
    nodes: Arc<dyn NodeSpace>,
    layout: NodeLayout,
}

impl ChangeUpdater {
    pub fn new(nodes: Arc<dyn NodeSpace>, layout: NodeLayout) -> Self {
        Self { nodes, layout }
    }

    pub async fn apply(
        &self,
        sensor: &mut Sensor,
        reading: &SensorReading,
        value: &TypedValue,
    ) -> UpdateOutcome {
        sensor.status = SensorStatus::from_online(reading.online);

        if reading.update_timestamp == sensor.last_update_at {
            return UpdateOutcome::Unchanged;
        }
        sensor.last_update_at = reading.update_timestamp.clone();

        let node = self.layout.sensor_node(sensor.sensor_id);
        let value_status = self.nodes.write_value(node, value).await;
        if value_status.is_good() {
            tracing::debug!("[DeviceSync] Value written to {}", node);
        } else {
            tracing::debug!("[DeviceSync] Value write to {} failed: {}", node, value_status);
        }

        // the status write does not depend on the value write succeeding
        let status = self.write_offline_status(sensor).await;

        UpdateOutcome::Written {
            value: value_status,
            status,
        }
    }

    /// Seed change detection for a node that was just created with `reading`'s value
    pub async fn seed(&self, sensor: &mut Sensor, reading: &SensorReading) -> Option<StatusCode> {
        sensor.status = SensorStatus::from_online(reading.online);
        sensor.last_update_at = reading.update_timestamp.clone();
        self.write_offline_status(sensor).await
    }

    async fn write_offline_status(&self, sensor: &Sensor) -> Option<StatusCode> {
        if sensor.status == SensorStatus::Good {
            return None;
        }

        let node = self.layout.sensor_node(sensor.sensor_id);
        let result = self
            .nodes
            .write_status(node, sensor.status.status_code())
            .await;
        if result.is_good() {
            tracing::debug!("[DeviceSync] Status written to {}", node);
        } else {
            tracing::debug!("[DeviceSync] Status write to {} failed: {}", node, result);
        }
        Some(result)
    }
}
