//! SyncEngine: one full synchronization cycle
//!
//! credential check → paginated listing → per device → per sensor.
//! The credential and both registries sit behind one mutex held for the whole
//! cycle, so overlapping cycles run one after the other and never see a
//! half-created device.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AuthError, PageError, ValidationError};
use crate::nodespace::NodeSpace;
use crate::sync::coerce::coerce;
use crate::sync::materializer::{Materialized, Materializer, NodeLayout};
use crate::sync::pagination::{fetch_page, has_next_page};
use crate::sync::registry::{Device, DeviceRegistry};
use crate::sync::updater::{ChangeUpdater, UpdateOutcome};
use crate::tlink::models::{DeviceRecord, SensorRecord};
use crate::tlink::{Credential, CredentialManager, TelemetryApi};

/// State owned by the engine between cycles
pub struct SyncState {
    pub credentials: CredentialManager,
    pub devices: DeviceRegistry,
}

/// Counters for one cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: u32,
    pub devices: usize,
    pub sensors_created: usize,
    pub values_written: usize,
    pub unchanged: usize,
    pub rejected: usize,
}

pub struct SyncEngine {
    api: Arc<dyn TelemetryApi>,
    materializer: Materializer,
    updater: ChangeUpdater,
    page_size: u32,
    state: Mutex<SyncState>,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn TelemetryApi>,
        nodes: Arc<dyn NodeSpace>,
        layout: NodeLayout,
        page_size: u32,
    ) -> Self {
        Self {
            materializer: Materializer::new(nodes.clone(), layout.clone()),
            updater: ChangeUpdater::new(nodes, layout),
            state: Mutex::new(SyncState {
                credentials: CredentialManager::new(api.clone()),
                devices: DeviceRegistry::new(),
            }),
            api,
            page_size,
        }
    }

    /// Run one cycle; an unusable credential skips the listing entirely
    pub async fn run_cycle(&self) -> Result<SyncReport, AuthError> {
        let mut state = self.state.lock().await;
        let SyncState {
            credentials,
            devices,
        } = &mut *state;

        let credential = credentials.ensure_valid().await?;
        let report = self.sync_all(devices, &credential).await;
        tracing::info!(
            "[DeviceSync] Tracking {} devices, {} sensors",
            devices.len(),
            devices.sensor_count()
        );

        tracing::debug!(
            "[DeviceSync] Cycle done: {} pages, {} devices, {} sensors created, {} values written, {} unchanged, {} rejected",
            report.pages,
            report.devices,
            report.sensors_created,
            report.values_written,
            report.unchanged,
            report.rejected
        );
        Ok(report)
    }

    /// Walk the listing page by page until the continuation rule says stop
    pub async fn sync_all(&self, devices: &mut DeviceRegistry, credential: &Credential) -> SyncReport {
        let mut report = SyncReport::default();
        let mut page = 1;

        loop {
            let listing = match fetch_page(self.api.as_ref(), credential, page, self.page_size).await {
                Ok(listing) => listing,
                Err(e) => {
                    log_page_error(page, &e);
                    break;
                }
            };
            report.pages += 1;

            for raw in &listing.devices {
                self.process_device(devices, raw, &mut report).await;
            }

            if !has_next_page(page, self.page_size, listing.devices.len(), listing.total) {
                break;
            }
            page += 1;
        }

        report
    }

    async fn process_device(&self, registry: &mut DeviceRegistry, raw: &Value, report: &mut SyncReport) {
        let record: DeviceRecord = match serde_json::from_value(raw.clone()) {
            Ok(record) => record,
            Err(e) => {
                reject("device", &ValidationError::Malformed(e.to_string()), raw, report);
                return;
            }
        };
        let identity = match record.identity() {
            Ok(identity) => identity,
            Err(e) => {
                reject("device", &e, raw, report);
                return;
            }
        };

        let device = match self.materializer.ensure_device(registry, &identity).await {
            Ok(device) => device,
            Err(e) => {
                tracing::warn!(
                    "[DeviceSync] Device {} node creation failed: {}",
                    identity.device_id,
                    e
                );
                return;
            }
        };
        report.devices += 1;

        let sensors = match record.sensors() {
            Ok(sensors) => sensors,
            Err(e) => {
                reject("device", &e, raw, report);
                return;
            }
        };

        for raw_sensor in sensors {
            self.process_sensor(device, raw_sensor, report).await;
        }
    }

    async fn process_sensor(&self, device: &mut Device, raw: &Value, report: &mut SyncReport) {
        let reading = match serde_json::from_value::<SensorRecord>(raw.clone()) {
            Ok(record) => record.into_reading(),
            Err(e) => Err(ValidationError::Malformed(e.to_string())),
        };
        let reading = match reading {
            Ok(reading) => reading,
            Err(e) => {
                reject("sensor", &e, raw, report);
                return;
            }
        };
        let value = match coerce(&reading) {
            Ok(value) => value,
            Err(e) => {
                reject("sensor", &e, raw, report);
                return;
            }
        };

        let device_id = device.device_id;
        let materialized = self
            .materializer
            .ensure_sensor(device, reading.sensor_id, &reading.sensor_name, &value)
            .await;

        match materialized {
            Ok(Materialized::Created(sensor)) => {
                report.sensors_created += 1;
                self.updater.seed(sensor, &reading).await;
            }
            Ok(Materialized::Existing(sensor)) => {
                match self.updater.apply(sensor, &reading, &value).await {
                    UpdateOutcome::Unchanged => report.unchanged += 1,
                    UpdateOutcome::Written { .. } => report.values_written += 1,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "[DeviceSync] Sensor {} of device {} node creation failed: {}",
                    reading.sensor_id,
                    device_id,
                    e
                );
            }
        }
    }

    #[cfg(test)]
    pub async fn state(&self) -> tokio::sync::MutexGuard<'_, SyncState> {
        self.state.lock().await
    }
}

fn reject(kind: &str, error: &ValidationError, raw: &Value, report: &mut SyncReport) {
    report.rejected += 1;
    tracing::warn!("[DeviceSync] Skipping {}: {}", kind, error);
    tracing::debug!("[DeviceSync] {}", raw);
}

fn log_page_error(page: u32, error: &PageError) {
    match error {
        PageError::Transport(_) => tracing::error!("[DeviceSync] Page {} fetch failed: {}", page, error),
        _ => tracing::warn!("[DeviceSync] Page {} rejected: {}", page, error),
    }
}
