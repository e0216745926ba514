//! Dispatch router behavior: kind routing, fire-and-forget execution,
//! unknown kinds dropped without panic, and capability-checked registration.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::ScriptedCloud;
use dtulink::cloud::dispatch::DispatchRouter;
use dtulink::cloud::{InboundEvent, OtaExecutor, Payload, RawDataExecutor};
use dtulink::error::Result;
use dtulink::registry::{Capability, HandlerRegistry};

/// Raw-data/query executor that records normalized payloads it was handed.
struct RecordingExecutor {
    raw_payloads: Mutex<Vec<String>>,
    queries: Mutex<usize>,
}

impl RecordingExecutor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            raw_payloads: Mutex::new(Vec::new()),
            queries: Mutex::new(0),
        })
    }
}

#[async_trait]
impl RawDataExecutor for RecordingExecutor {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::RawData, Capability::Query]
    }

    async fn on_raw_data(&self, event: InboundEvent) -> Result<()> {
        let data = event.kwargs.get("data").expect("data kwarg");
        self.raw_payloads.lock().unwrap().push(data.to_wire());
        Ok(())
    }

    async fn on_query(&self, _event: InboundEvent) -> Result<()> {
        *self.queries.lock().unwrap() += 1;
        Ok(())
    }
}

struct RecordingOta {
    plans: Mutex<usize>,
}

#[async_trait]
impl OtaExecutor for RecordingOta {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::OtaPlan]
    }

    async fn on_ota_plan(&self, _event: InboundEvent) -> Result<()> {
        *self.plans.lock().unwrap() += 1;
        Ok(())
    }
}

fn kwargs_with_data(data: Payload) -> HashMap<String, Payload> {
    let mut kwargs = HashMap::new();
    kwargs.insert("data".to_string(), data);
    kwargs
}

#[tokio::test]
async fn raw_data_invokes_handler_once_with_normalized_payload() {
    let executor = RecordingExecutor::new();
    let mut registry = HandlerRegistry::new();
    registry.register_raw_data_executor(executor.clone()).unwrap();
    let router = DispatchRouter::new(Arc::new(registry));

    router.dispatch(
        "raw_data",
        Vec::new(),
        kwargs_with_data(Payload::from(&b"abc"[..])),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    let payloads = executor.raw_payloads.lock().unwrap().clone();
    assert_eq!(payloads, vec!["abc".to_string()]);
    assert_eq!(*executor.queries.lock().unwrap(), 0);
}

#[tokio::test]
async fn unknown_kind_is_dropped_without_handler_invocation() {
    let executor = RecordingExecutor::new();
    let mut registry = HandlerRegistry::new();
    registry.register_raw_data_executor(executor.clone()).unwrap();
    let router = DispatchRouter::new(Arc::new(registry));

    router.dispatch("unknownKind", Vec::new(), HashMap::new());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(executor.raw_payloads.lock().unwrap().is_empty());
    assert_eq!(*executor.queries.lock().unwrap(), 0);
}

#[tokio::test]
async fn missing_handler_slot_is_contained() {
    let router = DispatchRouter::new(Arc::new(HandlerRegistry::new()));
    // wiring bug: no executor registered; must log, not panic
    router.dispatch(
        "raw_data",
        Vec::new(),
        kwargs_with_data(Payload::from("x")),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn each_kind_routes_to_its_own_executor() {
    let executor = RecordingExecutor::new();
    let ota = Arc::new(RecordingOta {
        plans: Mutex::new(0),
    });
    let mut registry = HandlerRegistry::new();
    registry.register_raw_data_executor(executor.clone()).unwrap();
    registry.register_ota_executor(ota.clone()).unwrap();
    let router = DispatchRouter::new(Arc::new(registry));

    router.dispatch("query", Vec::new(), HashMap::new());
    router.dispatch("ota_plain", Vec::new(), HashMap::new());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*executor.queries.lock().unwrap(), 1);
    assert_eq!(*ota.plans.lock().unwrap(), 1);
    assert!(executor.raw_payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_does_not_block_on_slow_handlers() {
    struct SlowExecutor;

    #[async_trait]
    impl RawDataExecutor for SlowExecutor {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::RawData, Capability::Query]
        }
        async fn on_raw_data(&self, _event: InboundEvent) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn on_query(&self, _event: InboundEvent) -> Result<()> {
            Ok(())
        }
    }

    let mut registry = HandlerRegistry::new();
    registry
        .register_raw_data_executor(Arc::new(SlowExecutor))
        .unwrap();
    let router = DispatchRouter::new(Arc::new(registry));

    let started = std::time::Instant::now();
    for _ in 0..10 {
        router.dispatch(
            "raw_data",
            Vec::new(),
            kwargs_with_data(Payload::from("x")),
        );
    }
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "dispatch must return without waiting for handlers"
    );
}

#[tokio::test]
async fn cloud_registration_rejects_missing_capability_and_keeps_existing() {
    let mut registry = HandlerRegistry::new();
    let good = ScriptedCloud::new();
    registry.register_cloud(good.clone()).unwrap();

    // missing OtaAction must be rejected
    let bad = ScriptedCloud::with_capabilities(vec![
        Capability::Connect,
        Capability::Publish,
        Capability::OtaCheck,
        Capability::DeviceReport,
    ]);
    assert!(registry.register_cloud(bad).is_err());

    // the previously registered client is untouched
    let current = registry.cloud().unwrap();
    assert!(current.connect(false).await);
    assert_eq!(good.connect_count(), 1);
}
