//! OTA orchestration: startup update check and plan handling.
//!
//! The plan acceptance policy is explicit configuration rather than an
//! implicit always-confirm: `system.base_function.ota_auto_confirm` decides
//! whether cloud upgrade plans are confirmed or declined, and declines are
//! logged at warn level so withheld upgrades stay visible to the operator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use crate::cloud::{CloudClient, InboundEvent, OtaAction, OtaExecutor};
use crate::config::Settings;
use crate::config::{PROJECT_NAME, PROJECT_VERSION};
use crate::error::Result;
use crate::registry::Capability;

/// Settle pause after the startup report, letting the collaborator flush.
const REPORT_SETTLE: Duration = Duration::from_secs(1);

pub struct OtaOrchestrator {
    cloud: Arc<dyn CloudClient>,
    settings: Arc<Settings>,
}

impl OtaOrchestrator {
    pub fn new(cloud: Arc<dyn CloudClient>, settings: Arc<Settings>) -> Arc<Self> {
        Arc::new(Self { cloud, settings })
    }

    /// Identity payload sent with the startup report.
    pub fn device_report(&self) -> serde_json::Value {
        let cfg = self.settings.get();
        serde_json::json!({
            "project": PROJECT_NAME,
            "version": PROJECT_VERSION,
            "cloud": cfg.system.cloud,
            "uart": cfg.uart.port,
        })
    }

    /// Startup update check. Skipped when the fota flag is off; any failure
    /// is logged and swallowed so startup never blocks on it.
    pub async fn check_for_update(&self) {
        if !self.settings.get().system.base_function.fota {
            debug!("fota disabled, skipping update check");
            return;
        }
        if let Err(e) = self.run_check().await {
            error!("startup ota check fault: {}", e);
        }
    }

    async fn run_check(&self) -> Result<()> {
        self.cloud.ota_check().await?;
        self.cloud.device_report(self.device_report()).await?;
        tokio::time::sleep(REPORT_SETTLE).await;
        Ok(())
    }
}

#[async_trait]
impl OtaExecutor for OtaOrchestrator {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::OtaPlan]
    }

    async fn on_ota_plan(&self, event: InboundEvent) -> Result<()> {
        debug!(
            "ota plan received: {} arg(s), {} kwarg(s)",
            event.args.len(),
            event.kwargs.len()
        );
        if self.settings.get().system.base_function.ota_auto_confirm {
            info!("confirming ota plan");
            self.cloud.ota_action(OtaAction::Confirm, None).await
        } else {
            warn!("ota_auto_confirm off: declining ota plan");
            self.cloud.ota_action(OtaAction::Decline, None).await
        }
    }
}
