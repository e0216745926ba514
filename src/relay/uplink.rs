//! Uplink relay: serial bytes to the cloud.
//!
//! The read loop is a supervised task. Every iteration pulses its heartbeat,
//! success or failure, so only a read that blocks past the supervision
//! interval without completing gets the loop killed and respawned.
//!
//! Segmented batches are forwarded on their own spawned task with a small
//! inter-message pacing delay, keeping the publisher off the read loop's
//! critical path. The forwarding task receives an owned batch; the
//! accumulation buffer never leaves the loop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::cloud::publish::ReliablePublisher;
use crate::logutil::hex_snippet;
use crate::relay::{OutboundMessage, Segmenter};
use crate::serial::SerialLink;
use crate::watchdog::{HeartbeatHandle, TaskFuture, TaskId, Watchdog};

/// Pacing delay between two messages of one forwarded batch.
const FORWARD_GAP: Duration = Duration::from_millis(10);

pub struct UplinkRelay {
    serial: Arc<dyn SerialLink>,
    publisher: Arc<ReliablePublisher>,
    segmenter: Arc<dyn Segmenter>,
    read_max_bytes: usize,
    read_timeout: Duration,
}

impl UplinkRelay {
    pub fn new(
        serial: Arc<dyn SerialLink>,
        publisher: Arc<ReliablePublisher>,
        segmenter: Arc<dyn Segmenter>,
        read_max_bytes: usize,
        read_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            serial,
            publisher,
            segmenter,
            read_max_bytes,
            read_timeout,
        })
    }

    /// Register the read loop with the watchdog and start it.
    pub fn start(self: &Arc<Self>, watchdog: &Arc<Watchdog>) -> TaskId {
        let relay = self.clone();
        watchdog.register(
            "uplink-read",
            Arc::new(move |hb: HeartbeatHandle| -> TaskFuture {
                let relay = relay.clone();
                Box::pin(async move { relay.read_loop(hb).await })
            }),
        )
    }

    /// The supervised read loop. Never returns; every failure is contained
    /// and the next iteration proceeds.
    async fn read_loop(&self, hb: HeartbeatHandle) {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            hb.pulse();
            match self.serial.read(self.read_max_bytes, self.read_timeout).await {
                Ok(None) => {} // timeout, nothing arrived
                Ok(Some(bytes)) => {
                    debug!("uart read {} bytes: {}", bytes.len(), hex_snippet(&bytes, 16));
                    self.ingest(&mut buf, &bytes);
                }
                Err(e) => {
                    error!("uart read error: {}", e);
                    // a dead port fails immediately; pace the loop so the
                    // error path costs no more than a timed-out read
                    tokio::time::sleep(self.read_timeout).await;
                }
            }
        }
    }

    /// Append freshly read bytes, segment, and hand any complete messages to
    /// a forwarding task. A segmentation error discards the buffer so the
    /// segmenter never re-attempts corrupted state.
    fn ingest(&self, buf: &mut Vec<u8>, bytes: &[u8]) {
        buf.extend_from_slice(bytes);
        let batch = match self.segmenter.segment(buf) {
            Ok(batch) => batch,
            Err(e) => {
                debug!("segment error, discarding buffer: {}", e);
                buf.clear();
                return;
            }
        };
        if batch.is_empty() {
            return;
        }
        debug!("forwarding batch of {} message(s)", batch.len());
        let publisher = self.publisher.clone();
        tokio::spawn(forward_batch(publisher, batch));
    }
}

/// Publish one batch in segmentation order with inter-message pacing.
async fn forward_batch(publisher: Arc<ReliablePublisher>, batch: Vec<OutboundMessage>) {
    for msg in batch {
        if !publisher.post(&msg.payload.to_wire(), &msg.topic_id).await {
            warn!("uplink message dropped on topic id {}", msg.topic_id);
        }
        tokio::time::sleep(FORWARD_GAP).await;
    }
}
