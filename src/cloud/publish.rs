//! Bounded retry-and-reconnect publisher.
//!
//! `post` is explicitly not a durable queue: at most two publish attempts and
//! at most two connect attempts per call, then a boolean verdict. A caller
//! that needs guaranteed delivery must re-submit.

use std::sync::Arc;

use log::{debug, error};

use crate::cloud::CloudClient;
use crate::logutil::escape_log;

pub struct ReliablePublisher {
    cloud: Arc<dyn CloudClient>,
}

impl ReliablePublisher {
    pub fn new(cloud: Arc<dyn CloudClient>) -> Self {
        Self { cloud }
    }

    /// Publish one payload under a topic id.
    ///
    /// Protocol: connect-if-needed, publish; on failure force a reconnect and
    /// retry the publish exactly once. Returns `false` when no connection can
    /// be established or both publish attempts fail.
    pub async fn post(&self, payload: &str, topic_id: &str) -> bool {
        if !self.cloud.connect(false).await {
            error!("cloud connect failed");
            return false;
        }
        if self.try_publish(payload, topic_id).await {
            return true;
        }
        if !self.cloud.connect(true).await {
            error!("cloud connect failed");
            return false;
        }
        self.try_publish(payload, topic_id).await
    }

    async fn try_publish(&self, payload: &str, topic_id: &str) -> bool {
        debug!("cloud post data: {},{}", topic_id, escape_log(payload));
        match self.cloud.publish(payload, topic_id).await {
            Ok(()) => {
                debug!("cloud post ok: {}", topic_id);
                true
            }
            Err(e) => {
                error!("cloud post fault: {}", e);
                false
            }
        }
    }
}
