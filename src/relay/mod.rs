//! # Relay Module
//!
//! The data-moving transactions of the gateway:
//!
//! - [`uplink`] - supervised serial read loop, segmentation, batch forwarding
//! - [`downlink`] - cloud raw-data events written back to the serial port
//! - [`ota`] - startup update check and OTA plan handling
//!
//! Segmentation is a collaborator boundary: [`Segmenter`] turns the uplink
//! accumulation buffer into zero or more complete [`OutboundMessage`]s. The
//! base policy ships the whole buffer as one message under a fixed topic id.

pub mod downlink;
pub mod ota;
pub mod uplink;

use crate::cloud::Payload;
use crate::error::Result;

/// Topic id used by the passthrough segmentation policy.
pub const DEFAULT_TOPIC_ID: &str = "0";

/// One segmented message queued for publish.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub topic_id: String,
    pub payload: Payload,
}

/// Splits the accumulated uplink buffer into complete messages.
///
/// Contract: on success the implementation consumes whatever it segmented
/// out of `buf`; on error the caller discards the whole buffer, so an
/// implementation never sees corrupted leftover state again.
pub trait Segmenter: Send + Sync {
    fn segment(&self, buf: &mut Vec<u8>) -> Result<Vec<OutboundMessage>>;
}

/// Base policy: the entire buffer becomes one message tagged with a fixed
/// topic id, and the buffer is cleared.
pub struct PassthroughSegmenter {
    topic_id: String,
}

impl PassthroughSegmenter {
    pub fn new(topic_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
        }
    }
}

impl Default for PassthroughSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_ID)
    }
}

impl Segmenter for PassthroughSegmenter {
    fn segment(&self, buf: &mut Vec<u8>) -> Result<Vec<OutboundMessage>> {
        if buf.is_empty() {
            return Ok(Vec::new());
        }
        let taken = std::mem::take(buf);
        Ok(vec![OutboundMessage {
            topic_id: self.topic_id.clone(),
            payload: Payload::Bytes(taken.into()),
        }])
    }
}
