//! Downlink relay: cloud raw-data events written to the serial port.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::cloud::{InboundEvent, RawDataExecutor};
use crate::error::{CoreError, Result};
use crate::logutil::escape_log;
use crate::registry::Capability;
use crate::serial::SerialLink;

pub struct DownlinkRelay {
    serial: Arc<dyn SerialLink>,
}

impl DownlinkRelay {
    pub fn new(serial: Arc<dyn SerialLink>) -> Arc<Self> {
        Arc::new(Self { serial })
    }
}

#[async_trait]
impl RawDataExecutor for DownlinkRelay {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::RawData, Capability::Query]
    }

    /// Normalize the event payload to serial-writable bytes and write it.
    /// No retry: a write failure is logged and surfaced to the dispatch task.
    async fn on_raw_data(&self, event: InboundEvent) -> Result<()> {
        let data = event
            .kwargs
            .get("data")
            .ok_or_else(|| CoreError::Cloud("raw-data event carries no data".to_string()))?;
        let bytes = data.to_serial_bytes();
        debug!(
            "downlink write {} bytes: {}",
            bytes.len(),
            escape_log(&String::from_utf8_lossy(&bytes))
        );
        self.serial.write(&bytes).await
    }

    /// Object-model queries have no meaning on a transparent passthrough
    /// gateway; acknowledge by logging so the event is visibly consumed.
    async fn on_query(&self, event: InboundEvent) -> Result<()> {
        warn!(
            "object-model query ignored in passthrough mode ({} arg(s))",
            event.args.len()
        );
        Ok(())
    }
}
