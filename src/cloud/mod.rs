//! # Cloud Collaborator Interfaces
//!
//! Traits and message types at the boundary between the gateway core and the
//! cloud client. The wire protocol and connection management live inside the
//! collaborator; the core only sees the narrow surface below.
//!
//! - [`CloudClient`] - connect / publish / OTA operations
//! - [`RawDataExecutor`] / [`OtaExecutor`] - downlink event handlers
//! - [`Payload`] - payload normalization for both relay directions
//! - [`InboundEvent`] / [`EventKind`] - tagged downlink messages
//!
//! Submodules:
//!
//! - [`publish`] - the bounded retry-and-reconnect publisher
//! - [`dispatch`] - the fire-and-forget downlink router

pub mod dispatch;
pub mod publish;

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::registry::Capability;

/// A message payload at any relay stage.
///
/// Normalization rules are fixed: toward the cloud everything becomes a
/// wire-ready string (`to_wire`), toward the serial port everything becomes
/// bytes (`to_serial_bytes`). Raw bytes pass through the serial direction
/// untouched; structured values serialize to JSON text; anything else is
/// stringified.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl Payload {
    /// Wire-ready string form for publishing.
    pub fn to_wire(&self) -> String {
        match self {
            Payload::Text(s) => s.clone(),
            Payload::Json(v) => v.to_string(),
            Payload::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Serial-writable byte form for the downlink direction.
    pub fn to_serial_bytes(&self) -> Bytes {
        match self {
            Payload::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
            Payload::Json(v) => Bytes::from(v.to_string()),
            Payload::Bytes(b) => b.clone(),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(b))
    }
}

/// Kind tag of a downlink cloud message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Transparent passthrough data destined for the serial port.
    RawData,
    /// Object-model query.
    Query,
    /// OTA upgrade proposal.
    OtaPlan,
}

impl EventKind {
    /// Parse the kind tag as delivered by the cloud collaborator. Both the
    /// underscore and hyphen spellings seen across broker firmwares are
    /// accepted.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "raw_data" | "raw-data" => Some(EventKind::RawData),
            "query" => Some(EventKind::Query),
            "ota_plain" | "ota-plan" => Some(EventKind::OtaPlan),
            _ => None,
        }
    }
}

/// A tagged message received from the cloud. Constructed on arrival and
/// consumed by exactly one dispatch.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub args: Vec<Payload>,
    pub kwargs: HashMap<String, Payload>,
}

impl InboundEvent {
    pub fn new(kind: EventKind, args: Vec<Payload>, kwargs: HashMap<String, Payload>) -> Self {
        Self { kind, args, kwargs }
    }
}

/// OTA plan decision forwarded to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaAction {
    Confirm,
    Decline,
}

impl OtaAction {
    /// Numeric action code used by the cloud collaborator.
    pub fn code(&self) -> u8 {
        match self {
            OtaAction::Confirm => 1,
            OtaAction::Decline => 0,
        }
    }
}

/// The cloud client collaborator.
///
/// `connect` with `force = false` is connect-if-needed; with `force = true`
/// it tears down and redials. Both report success as a boolean because a
/// refused connection is an expected runtime condition, not an error.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Operations this client actually supports; checked at registration.
    fn capabilities(&self) -> &[Capability];

    async fn connect(&self, force: bool) -> bool;

    /// Publish one normalized payload under a short topic id. An `Err` means
    /// the attempt failed; callers above the reliable publisher never see it.
    async fn publish(&self, payload: &str, topic_id: &str) -> crate::error::Result<()>;

    async fn ota_check(&self) -> crate::error::Result<()>;

    async fn ota_action(&self, action: OtaAction, module: Option<&str>) -> crate::error::Result<()>;

    async fn device_report(&self, report: serde_json::Value) -> crate::error::Result<()>;
}

/// Handler for transparent downlink data and object-model queries.
#[async_trait]
pub trait RawDataExecutor: Send + Sync {
    fn capabilities(&self) -> &[Capability];

    async fn on_raw_data(&self, event: InboundEvent) -> crate::error::Result<()>;

    async fn on_query(&self, event: InboundEvent) -> crate::error::Result<()>;
}

/// Handler for OTA upgrade proposals.
#[async_trait]
pub trait OtaExecutor: Send + Sync {
    fn capabilities(&self) -> &[Capability];

    async fn on_ota_plan(&self, event: InboundEvent) -> crate::error::Result<()>;
}

/// Stand-in cloud client: always connected, logs every operation, delivers
/// nothing. Used by the binary when no broker client has been wired yet and
/// by examples; real deployments register their protocol client instead.
pub struct NullCloudClient;

#[async_trait]
impl CloudClient for NullCloudClient {
    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Connect,
            Capability::Publish,
            Capability::OtaCheck,
            Capability::OtaAction,
            Capability::DeviceReport,
        ]
    }

    async fn connect(&self, force: bool) -> bool {
        log::debug!("null cloud connect (force={})", force);
        true
    }

    async fn publish(&self, payload: &str, topic_id: &str) -> crate::error::Result<()> {
        log::info!(
            "null cloud publish topic={} payload={}",
            topic_id,
            crate::logutil::escape_log(payload)
        );
        Ok(())
    }

    async fn ota_check(&self) -> crate::error::Result<()> {
        log::debug!("null cloud ota check");
        Ok(())
    }

    async fn ota_action(&self, action: OtaAction, module: Option<&str>) -> crate::error::Result<()> {
        log::info!(
            "null cloud ota action code={} module={:?}",
            action.code(),
            module
        );
        Ok(())
    }

    async fn device_report(&self, report: serde_json::Value) -> crate::error::Result<()> {
        log::info!("null cloud device report: {}", report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_normalizes_to_wire_form() {
        assert_eq!(Payload::from("PING").to_wire(), "PING");
        assert_eq!(Payload::from(&b"abc"[..]).to_wire(), "abc");
        assert_eq!(
            Payload::Json(serde_json::json!({"k": 1})).to_wire(),
            r#"{"k":1}"#
        );
    }

    #[test]
    fn payload_bytes_pass_through_to_serial() {
        let raw = Payload::from(&b"\x01\x02"[..]);
        assert_eq!(&raw.to_serial_bytes()[..], b"\x01\x02");
        let structured = Payload::Json(serde_json::json!(["a"]));
        assert_eq!(&structured.to_serial_bytes()[..], br#"["a"]"#);
    }

    #[test]
    fn event_kind_parses_known_tags_only() {
        assert_eq!(EventKind::parse("raw_data"), Some(EventKind::RawData));
        assert_eq!(EventKind::parse("raw-data"), Some(EventKind::RawData));
        assert_eq!(EventKind::parse("query"), Some(EventKind::Query));
        assert_eq!(EventKind::parse("ota_plain"), Some(EventKind::OtaPlan));
        assert_eq!(EventKind::parse("ota-plan"), Some(EventKind::OtaPlan));
        assert_eq!(EventKind::parse("unknownKind"), None);
    }
}
