//! # Dtulink - Serial-to-Cloud Gateway Runtime
//!
//! Dtulink is the runtime core of a cellular DTU (Data Transfer Unit): a
//! gateway that bridges a locally attached serial instrument to a cloud
//! message broker. It supervises its worker loops so a hang or crash in any
//! one of them is detected and the worker is transparently restarted, and it
//! relays messages in both directions with bounded retry and failure
//! isolation so one bad message never stalls the pipeline.
//!
//! ## Features
//!
//! - **Supervision**: Heartbeat-based liveness checks with automatic restart
//!   of stale workers.
//! - **Uplink Relay**: Serial read loop, pluggable segmentation, paced batch
//!   forwarding through a bounded retry-and-reconnect publisher.
//! - **Downlink Dispatch**: Inbound cloud events routed by kind to handlers
//!   on independent fire-and-forget tasks.
//! - **Capability Wiring**: Collaborators are bound to roles at startup and
//!   rejected when they lack a required operation.
//! - **Async Design**: Built with Tokio for predictable behavior on
//!   constrained gateway hardware.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dtulink::config::{Config, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let settings = Arc::new(Settings::new(config));
//!     // wire collaborators via dtulink::registry::HandlerRegistry,
//!     // then start the uplink relay and the watchdog scan loop
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`watchdog`] - Task supervision (register, heartbeat, restart)
//! - [`cloud`] - Cloud collaborator traits, reliable publisher, dispatch router
//! - [`relay`] - Uplink/downlink relays and OTA orchestration
//! - [`serial`] - Serial link trait and the UART implementation
//! - [`registry`] - Role/capability based collaborator wiring
//! - [`config`] - Configuration management and the settings store
//!
//! ## Architecture
//!
//! ```text
//! serial bytes ─► Uplink Relay ─► Segmenter ─► Reliable Publisher ─► cloud
//! cloud event ─► Dispatch Router ─► (Downlink Relay | OTA | query) ─► serial/cloud
//!                         Watchdog supervises the long-lived loops
//! ```

pub mod cloud;
pub mod config;
pub mod error;
pub mod logutil;
pub mod registry;
pub mod relay;
pub mod serial;
pub mod watchdog;
