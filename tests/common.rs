//! Test utilities & fixtures.
//! Scripted collaborator doubles shared by the integration tests. Tests that
//! mutate shared scripts should build their own instance.

#![allow(dead_code)] // each test binary uses a subset of the toolkit

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use dtulink::cloud::{CloudClient, OtaAction};
use dtulink::error::{CoreError, Result};
use dtulink::registry::Capability;
use dtulink::serial::SerialLink;

pub const FULL_CLOUD_CAPS: &[Capability] = &[
    Capability::Connect,
    Capability::Publish,
    Capability::OtaCheck,
    Capability::OtaAction,
    Capability::DeviceReport,
];

/// Cloud client double with scripted connect/publish outcomes.
///
/// Outcomes are popped from the front; when a script runs dry the default is
/// success. All calls are recorded for assertion.
pub struct ScriptedCloud {
    caps: Vec<Capability>,
    connect_script: Mutex<VecDeque<bool>>,
    publish_script: Mutex<VecDeque<bool>>,
    pub connects: Mutex<Vec<bool>>,
    pub publishes: Mutex<Vec<(String, String)>>,
    pub ota_actions: Mutex<Vec<u8>>,
    pub reports: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedCloud {
    pub fn new() -> Arc<Self> {
        Self::with_capabilities(FULL_CLOUD_CAPS.to_vec())
    }

    /// A double that only declares the given capability set.
    pub fn with_capabilities(caps: Vec<Capability>) -> Arc<Self> {
        Arc::new(Self {
            caps,
            connect_script: Mutex::new(VecDeque::new()),
            publish_script: Mutex::new(VecDeque::new()),
            connects: Mutex::new(Vec::new()),
            publishes: Mutex::new(Vec::new()),
            ota_actions: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
        })
    }

    pub fn script_connects(&self, outcomes: &[bool]) {
        self.connect_script.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn script_publishes(&self, outcomes: &[bool]) {
        self.publish_script.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.lock().unwrap().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

#[async_trait]
impl CloudClient for ScriptedCloud {
    fn capabilities(&self) -> &[Capability] {
        &self.caps
    }

    async fn connect(&self, force: bool) -> bool {
        self.connects.lock().unwrap().push(force);
        self.connect_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(true)
    }

    async fn publish(&self, payload: &str, topic_id: &str) -> Result<()> {
        self.publishes
            .lock()
            .unwrap()
            .push((topic_id.to_string(), payload.to_string()));
        match self.publish_script.lock().unwrap().pop_front() {
            Some(false) => Err(CoreError::Cloud("publish refused".to_string())),
            _ => Ok(()),
        }
    }

    async fn ota_check(&self) -> Result<()> {
        Ok(())
    }

    async fn ota_action(&self, action: OtaAction, _module: Option<&str>) -> Result<()> {
        self.ota_actions.lock().unwrap().push(action.code());
        Ok(())
    }

    async fn device_report(&self, report: serde_json::Value) -> Result<()> {
        self.reports.lock().unwrap().push(report);
        Ok(())
    }
}

/// Serial double: reads pop a scripted chunk queue (an empty queue reads as
/// a timeout), writes are recorded.
pub struct LoopSerial {
    reads: Mutex<VecDeque<Bytes>>,
    pub writes: Mutex<Vec<Bytes>>,
}

impl LoopSerial {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reads: Mutex::new(VecDeque::new()),
            writes: Mutex::new(Vec::new()),
        })
    }

    pub fn push_read(&self, chunk: &[u8]) {
        self.reads
            .lock()
            .unwrap()
            .push_back(Bytes::copy_from_slice(chunk));
    }
}

#[async_trait]
impl SerialLink for LoopSerial {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::SerialRead, Capability::SerialWrite]
    }

    async fn read(&self, _max_bytes: usize, timeout: Duration) -> Result<Option<Bytes>> {
        let next = self.reads.lock().unwrap().pop_front();
        match next {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                // emulate the bounded blocking read timing out
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push(Bytes::copy_from_slice(data));
        Ok(())
    }
}
