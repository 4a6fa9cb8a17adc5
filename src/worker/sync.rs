//! Offline submission queue and the background sync drain.

use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};

use super::Controller;
use crate::cache::{CacheStore, Entry};
use crate::http::{Destination, Request};
use crate::net::Fetch;

/// Outcome of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
  /// Submissions delivered and evicted from the queue
  pub replayed: usize,
  /// Submissions left queued for the next sync
  pub pending: usize,
}

impl<S: CacheStore, N: Fetch> Controller<S, N> {
  /// Queue a form submission that could not be sent while offline.
  ///
  /// Entries share the dynamic partition and are recognized by the queue
  /// prefix in their URL; callers give each submission a distinct URL
  /// (last-write-wins otherwise).
  pub fn queue_submission(&self, request: &Request) -> Result<()> {
    if !request.url.contains(&self.config.offline_queue_prefix) {
      return Err(eyre!(
        "Refusing to queue {}: URL does not contain the queue prefix {}",
        request.url,
        self.config.offline_queue_prefix
      ));
    }

    self
      .store
      .put(&self.names.dynamic_partition, &Entry::from_request(request))?;
    info!(url = %request.url, "queued offline submission");
    Ok(())
  }

  /// Replay every queued submission against the network.
  ///
  /// A resolved fetch counts as delivery and evicts the entry, giving
  /// at-most-once eventual delivery per submission. A rejected fetch
  /// leaves the entry for the next sync; failures are logged, never
  /// escalated.
  pub async fn drain_queue(&self) -> Result<DrainReport> {
    let mut report = DrainReport::default();

    for entry in self.store.list(&self.names.dynamic_partition)? {
      if !entry.url.contains(&self.config.offline_queue_prefix) {
        continue;
      }

      let request = Request {
        method: entry.method.clone(),
        url: entry.url.clone(),
        destination: Destination::Other,
        body: entry.body.clone(),
      };

      match self.net.fetch(&request).await {
        Ok(_) => {
          self.store.delete(&self.names.dynamic_partition, &entry.url)?;
          report.replayed += 1;
          info!(url = %entry.url, "replayed offline submission");
        }
        Err(e) => {
          report.pending += 1;
          warn!(url = %entry.url, "submission replay failed, leaving queued: {}", e);
        }
      }
    }

    Ok(report)
  }
}
