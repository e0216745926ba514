//! Fire-and-forget downlink dispatch.
//!
//! The cloud collaborator calls [`DispatchRouter::dispatch`] from its own
//! receive path for every inbound message. Dispatch must never block that
//! path: each event is handed to its handler on a freshly spawned task and
//! the call returns immediately. Slow handlers therefore cannot starve
//! subsequent events, and no ordering is guaranteed between concurrently
//! dispatched events.
//!
//! An unknown kind tag or an unfilled handler slot produces exactly one error
//! log entry and nothing else; handler errors are logged inside the spawned
//! task.

use std::collections::HashMap;
use std::sync::Arc;

use log::error;

use crate::cloud::{EventKind, InboundEvent, Payload};
use crate::registry::HandlerRegistry;

pub struct DispatchRouter {
    registry: Arc<HandlerRegistry>,
}

impl DispatchRouter {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Route one inbound cloud message to its handler.
    ///
    /// Never blocks and never panics: failures are contained in logs.
    pub fn dispatch(&self, kind: &str, args: Vec<Payload>, kwargs: HashMap<String, Payload>) {
        let Some(parsed) = EventKind::parse(kind) else {
            error!("dispatch has no handler for kind [{}]", kind);
            return;
        };
        let event = InboundEvent::new(parsed, args, kwargs);
        match parsed {
            EventKind::RawData => match self.registry.raw_data_executor() {
                Ok(executor) => {
                    tokio::spawn(async move {
                        if let Err(e) = executor.on_raw_data(event).await {
                            error!("raw-data handler failed: {}", e);
                        }
                    });
                }
                Err(e) => error!("dispatch raw_data: {}", e),
            },
            EventKind::Query => match self.registry.raw_data_executor() {
                Ok(executor) => {
                    tokio::spawn(async move {
                        if let Err(e) = executor.on_query(event).await {
                            error!("query handler failed: {}", e);
                        }
                    });
                }
                Err(e) => error!("dispatch query: {}", e),
            },
            EventKind::OtaPlan => match self.registry.ota_executor() {
                Ok(executor) => {
                    tokio::spawn(async move {
                        if let Err(e) = executor.on_ota_plan(event).await {
                            error!("ota-plan handler failed: {}", e);
                        }
                    });
                }
                Err(e) => error!("dispatch ota_plain: {}", e),
            },
        }
    }
}
