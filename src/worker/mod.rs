//! The offline cache controller.
//!
//! Service-worker semantics reframed as an explicit dispatch table: each
//! lifecycle event maps to a handler method that is a plain async function
//! from an event value to an outcome value. The hosting harness (the CLI
//! in this crate, anything else in principle) owns event delivery; the
//! controller owns the semantics.

mod interceptor;
mod lifecycle;
mod notify;
mod sync;

pub use notify::{ClickOutcome, Notification};
pub use sync::DrainReport;

use color_eyre::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::http::{Request, Response};
use crate::net::Fetch;

/// Versioned partition names. Bumping the configured version changes both
/// names, which is what makes activation drop the previous generation.
#[derive(Debug, Clone)]
pub struct CacheNames {
  pub static_partition: String,
  pub dynamic_partition: String,
}

impl CacheNames {
  pub fn for_version(version: &str) -> Self {
    Self {
      static_partition: format!("portfolio-static-v{}", version),
      dynamic_partition: format!("portfolio-dynamic-v{}", version),
    }
  }

  /// Whether a partition belongs to the current generation.
  pub fn is_current(&self, partition: &str) -> bool {
    partition == self.static_partition || partition == self.dynamic_partition
  }
}

/// Controller lifecycle phase. Install precedes activate; interception is
/// meaningful once the controller is active, though the cache itself is
/// shared across instances and survives the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Constructed, nothing populated yet
  Parsed,
  /// Static partition populated, eligible for activation
  Installed,
  /// Claimed clients, serving interceptions
  Active,
}

/// Events the hosting runtime can deliver.
#[derive(Debug)]
pub enum WorkerEvent {
  Install,
  Activate,
  Fetch(Request),
  Sync { tag: String },
  Push { payload: Option<String> },
  NotificationClick { action: String },
  Message(Message),
}

/// Messages posted by a controlled page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
  /// Activate a waiting (installed) controller immediately.
  SkipWaiting,
}

/// What a dispatched event produced.
#[derive(Debug)]
pub enum EventOutcome {
  Installed,
  Activated { removed: Vec<String> },
  Response(Response),
  Drained(DrainReport),
  Notification(Notification),
  Click(ClickOutcome),
  /// Event carried a tag or message this controller does not act on.
  Ignored,
}

/// The offline asset cache controller.
pub struct Controller<S: CacheStore, N: Fetch> {
  store: Arc<S>,
  net: N,
  config: Config,
  names: CacheNames,
  phase: Mutex<Phase>,
}

impl<S: CacheStore, N: Fetch> Controller<S, N> {
  pub fn new(store: S, net: N, config: Config) -> Self {
    let names = CacheNames::for_version(&config.version);
    Self {
      store: Arc::new(store),
      net,
      config,
      names,
      phase: Mutex::new(Phase::Parsed),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn names(&self) -> &CacheNames {
    &self.names
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn phase(&self) -> Phase {
    // The phase is a plain enum, so a poisoned lock still holds a valid
    // value; recover it rather than misreporting the lifecycle
    *self.phase.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub(crate) fn set_phase(&self, phase: Phase) {
    let mut current = self.phase.lock().unwrap_or_else(|e| e.into_inner());
    *current = phase;
  }

  /// The dispatch table: one entry per lifecycle event.
  pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
    match event {
      WorkerEvent::Install => {
        self.install().await?;
        Ok(EventOutcome::Installed)
      }
      WorkerEvent::Activate => {
        let removed = self.activate()?;
        Ok(EventOutcome::Activated { removed })
      }
      WorkerEvent::Fetch(request) => {
        let response = self.intercept(&request).await?;
        Ok(EventOutcome::Response(response))
      }
      WorkerEvent::Sync { tag } => {
        if tag != self.config.sync_tag {
          debug!(%tag, "ignoring unrelated sync tag");
          return Ok(EventOutcome::Ignored);
        }
        let report = self.drain_queue().await?;
        Ok(EventOutcome::Drained(report))
      }
      WorkerEvent::Push { payload } => {
        Ok(EventOutcome::Notification(self.push(payload.as_deref())))
      }
      WorkerEvent::NotificationClick { action } => {
        Ok(EventOutcome::Click(self.notification_click(&action)))
      }
      WorkerEvent::Message(Message::SkipWaiting) => {
        if self.phase() == Phase::Installed {
          let removed = self.activate()?;
          Ok(EventOutcome::Activated { removed })
        } else {
          debug!("skip-waiting message with no waiting controller");
          Ok(EventOutcome::Ignored)
        }
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::testutil::controller;
  use super::*;
  use crate::net::mock::MockNet;

  // Full lifecycle: install populates the shell, re-activation on a
  // clean generation deletes nothing, a dynamic fetch is persisted, and
  // a repeat fetch is served from cache without touching the network.
  #[tokio::test]
  async fn test_full_lifecycle_scenario() {
    let net = MockNet::new();
    net.respond("/", MockNet::ok_response("<html>shell</html>"));
    net.respond("/manifest.json", MockNet::ok_response("{}"));
    net.respond("/gallery/1.jpg", MockNet::ok_response("jpegbytes"));

    let worker = controller(net);

    let outcome = worker.dispatch(WorkerEvent::Install).await.unwrap();
    assert!(matches!(outcome, EventOutcome::Installed));

    let statics = worker.names().static_partition.clone();
    assert!(worker.store().get(&statics, "/").unwrap().is_some());
    assert!(worker.store().get(&statics, "/manifest.json").unwrap().is_some());

    // Only current-generation partitions exist, so nothing is pruned
    let outcome = worker.dispatch(WorkerEvent::Activate).await.unwrap();
    match outcome {
      EventOutcome::Activated { removed } => assert!(removed.is_empty()),
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(worker.phase(), Phase::Active);

    let request = Request::get("/gallery/1.jpg");
    worker
      .dispatch(WorkerEvent::Fetch(request.clone()))
      .await
      .unwrap();

    let dynamics = worker.names().dynamic_partition.clone();
    assert!(worker.store().get(&dynamics, "/gallery/1.jpg").unwrap().is_some());

    let calls_before = worker.net.calls();
    let outcome = worker.dispatch(WorkerEvent::Fetch(request)).await.unwrap();
    match outcome {
      EventOutcome::Response(response) => assert_eq!(response.body, b"jpegbytes"),
      other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(worker.net.calls(), calls_before);
  }

  #[tokio::test]
  async fn test_skip_waiting_activates_installed_controller() {
    let net = MockNet::new();
    net.respond("/", MockNet::ok_response("shell"));
    net.respond("/manifest.json", MockNet::ok_response("{}"));

    let worker = controller(net);
    worker.dispatch(WorkerEvent::Install).await.unwrap();
    assert_eq!(worker.phase(), Phase::Installed);

    let outcome = worker
      .dispatch(WorkerEvent::Message(Message::SkipWaiting))
      .await
      .unwrap();
    assert!(matches!(outcome, EventOutcome::Activated { .. }));
    assert_eq!(worker.phase(), Phase::Active);
  }

  #[tokio::test]
  async fn test_skip_waiting_is_noop_before_install() {
    let worker = controller(MockNet::new());
    let outcome = worker
      .dispatch(WorkerEvent::Message(Message::SkipWaiting))
      .await
      .unwrap();
    assert!(matches!(outcome, EventOutcome::Ignored));
    assert_eq!(worker.phase(), Phase::Parsed);
  }

  #[tokio::test]
  async fn test_unrelated_sync_tag_is_ignored() {
    let worker = controller(MockNet::new());
    let outcome = worker
      .dispatch(WorkerEvent::Sync {
        tag: "unrelated".to_string(),
      })
      .await
      .unwrap();
    assert!(matches!(outcome, EventOutcome::Ignored));
    assert_eq!(worker.net.calls(), 0);
  }

  #[test]
  fn test_phase_survives_poisoned_lock() {
    let worker = controller(MockNet::new());
    worker.set_phase(Phase::Installed);

    // Poison the phase lock by panicking while holding it
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let _guard = worker.phase.lock().unwrap();
      panic!("poison the lock");
    }));
    assert!(result.is_err());

    // The installed phase must still be observable, not rewound
    assert_eq!(worker.phase(), Phase::Installed);
    worker.set_phase(Phase::Active);
    assert_eq!(worker.phase(), Phase::Active);
  }

  #[test]
  fn test_cache_names_encode_version() {
    let names = CacheNames::for_version("4");
    assert_eq!(names.static_partition, "portfolio-static-v4");
    assert_eq!(names.dynamic_partition, "portfolio-dynamic-v4");
    assert!(names.is_current("portfolio-static-v4"));
    assert!(!names.is_current("portfolio-static-v3"));
  }
}
