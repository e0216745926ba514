//! # Watchdog Module
//!
//! Supervision of long-running worker tasks. Each worker registers with a
//! respawnable entry (an async factory) and proves liveness by pulsing its
//! [`HeartbeatHandle`] at least once per scan interval. The scan loop aborts
//! and respawns any task whose heartbeat has gone stale, under a fresh
//! [`TaskId`] with a fresh heartbeat baseline.
//!
//! Restart is the only recovery path: there is no backoff and no restart
//! limit, so a perpetually crashing worker is respawned every interval. A
//! worker that finishes naturally is treated the same way once its heartbeat
//! ages out, which matches the supervision contract: staying registered means
//! staying alive.
//!
//! Locking: the registry map has one mutex, taken briefly by `register`,
//! `heartbeat`, and the scan; each task's heartbeat timestamp sits behind its
//! own lock so workers pulse without contending on the registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default scan interval, seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 20;

/// Identifier of one supervised task incarnation. A restart produces a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Liveness handle a worker pulses from inside its loop.
#[derive(Clone)]
pub struct HeartbeatHandle {
    at: Arc<Mutex<Instant>>,
}

impl HeartbeatHandle {
    /// Record that the worker is still making progress.
    pub fn pulse(&self) {
        *self.at.lock().expect("heartbeat lock poisoned") = Instant::now();
    }
}

/// Future type a task factory produces.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Respawnable entry point of a supervised task. Invoked once at registration
/// and again on every restart, each time with the incarnation's heartbeat
/// handle.
pub type TaskFactory = Arc<dyn Fn(HeartbeatHandle) -> TaskFuture + Send + Sync>;

struct Entry {
    name: String,
    factory: TaskFactory,
    heartbeat: Arc<Mutex<Instant>>,
    handle: JoinHandle<()>,
}

impl Entry {
    fn last_heartbeat(&self) -> Instant {
        *self.heartbeat.lock().expect("heartbeat lock poisoned")
    }
}

/// Task supervisor.
pub struct Watchdog {
    interval: Duration,
    tasks: Mutex<HashMap<TaskId, Entry>>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl Watchdog {
    pub fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            cancel: CancellationToken::new(),
        })
    }

    /// Register and spawn a supervised task. The task is subject to liveness
    /// checks from this point on.
    pub fn register(&self, name: &str, factory: TaskFactory) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let heartbeat = Arc::new(Mutex::new(Instant::now()));
        let handle = tokio::spawn(factory(HeartbeatHandle {
            at: heartbeat.clone(),
        }));
        let entry = Entry {
            name: name.to_string(),
            factory,
            heartbeat,
            handle,
        };
        self.tasks
            .lock()
            .expect("watchdog lock poisoned")
            .insert(id, entry);
        debug!("watchdog registered task '{}' as {:?}", name, id);
        id
    }

    /// Refresh a task's heartbeat. Unknown ids are a no-op; safe to call
    /// concurrently with the scan loop.
    pub fn heartbeat(&self, id: TaskId) {
        let tasks = self.tasks.lock().expect("watchdog lock poisoned");
        if let Some(entry) = tasks.get(&id) {
            *entry.heartbeat.lock().expect("heartbeat lock poisoned") = Instant::now();
        }
    }

    /// Whether a task incarnation is still registered.
    pub fn is_registered(&self, id: TaskId) -> bool {
        self.tasks
            .lock()
            .expect("watchdog lock poisoned")
            .contains_key(&id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().expect("watchdog lock poisoned").len()
    }

    /// Start the scan loop. Runs until [`Watchdog::shutdown`].
    pub fn spawn_scan_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let dog = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = dog.cancel.cancelled() => break,
                    _ = tokio::time::sleep(dog.interval) => dog.scan(),
                }
            }
            debug!("watchdog scan loop terminated");
        })
    }

    /// One supervision pass: find stale tasks, then abort/remove/respawn them
    /// outside the iteration. Aborting a task that already finished is a
    /// no-op, which covers the already-dead-worker case.
    pub fn scan(&self) {
        let now = Instant::now();
        let mut stale = Vec::new();
        {
            let mut tasks = self.tasks.lock().expect("watchdog lock poisoned");
            let stale_ids: Vec<TaskId> = tasks
                .iter()
                .filter(|(_, e)| e.last_heartbeat() + self.interval < now)
                .map(|(id, _)| *id)
                .collect();
            for id in stale_ids {
                if let Some(entry) = tasks.remove(&id) {
                    entry.handle.abort();
                    stale.push((id, entry));
                }
            }
        }
        for (old_id, entry) in stale {
            info!("out of time for task '{}' ({:?})", entry.name, old_id);
            let new_id = self.register(&entry.name, entry.factory.clone());
            info!("respawned task '{}' as {:?}", entry.name, new_id);
        }
        debug!("watchdog check at {:?}", now);
    }

    /// Stop the scan loop and abort every supervised task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let mut tasks = self.tasks.lock().expect("watchdog lock poisoned");
        for (id, entry) in tasks.drain() {
            entry.handle.abort();
            debug!("watchdog aborted task '{}' ({:?})", entry.name, id);
        }
    }
}
