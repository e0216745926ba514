//! OTA orchestration: feature-flag gating of the startup check and the
//! explicit plan acceptance policy.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::ScriptedCloud;
use dtulink::cloud::{EventKind, InboundEvent, OtaExecutor};
use dtulink::config::{Config, Settings};
use dtulink::relay::ota::OtaOrchestrator;

fn settings(fota: bool, auto_confirm: bool) -> Arc<Settings> {
    let mut cfg = Config::default();
    cfg.system.base_function.fota = fota;
    cfg.system.base_function.ota_auto_confirm = auto_confirm;
    Arc::new(Settings::new(cfg))
}

fn plan_event() -> InboundEvent {
    InboundEvent::new(EventKind::OtaPlan, Vec::new(), HashMap::new())
}

#[tokio::test(start_paused = true)]
async fn update_check_skipped_when_fota_disabled() {
    let cloud = ScriptedCloud::new();
    let ota = OtaOrchestrator::new(cloud.clone(), settings(false, true));

    ota.check_for_update().await;

    assert!(cloud.reports.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn update_check_reports_device_identity() {
    let cloud = ScriptedCloud::new();
    let ota = OtaOrchestrator::new(cloud.clone(), settings(true, true));

    ota.check_for_update().await;

    let reports = cloud.reports.lock().unwrap().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["project"], "dtulink");
    assert_eq!(reports[0]["cloud"], "mqtt");
}

#[tokio::test]
async fn plan_confirmed_when_auto_confirm_on() {
    let cloud = ScriptedCloud::new();
    let ota = OtaOrchestrator::new(cloud.clone(), settings(true, true));

    ota.on_ota_plan(plan_event()).await.unwrap();

    assert_eq!(cloud.ota_actions.lock().unwrap().clone(), vec![1]);
}

#[tokio::test]
async fn plan_declined_when_auto_confirm_off() {
    let cloud = ScriptedCloud::new();
    let ota = OtaOrchestrator::new(cloud.clone(), settings(true, false));

    ota.on_ota_plan(plan_event()).await.unwrap();

    assert_eq!(cloud.ota_actions.lock().unwrap().clone(), vec![0]);
}
