//! Install and activate handlers.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use tracing::{error, info};

use super::{Controller, Phase};
use crate::cache::{CacheStore, Entry};
use crate::http::Request;
use crate::net::Fetch;

impl<S: CacheStore, N: Fetch> Controller<S, N> {
  /// Populate the static partition with every manifest URL.
  ///
  /// All-or-nothing: any fetch or store failure fails the whole install
  /// and drops the partition, so a broken deployment never serves a
  /// half-populated shell. Recovery is the next install attempt; nothing
  /// is retried here.
  pub async fn install(&self) -> Result<()> {
    info!(
      version = %self.config.version,
      assets = self.config.static_manifest.len(),
      "installing static shell"
    );

    let fetches = self.config.static_manifest.iter().map(|url| async move {
      let response = self.net.fetch(&Request::get(url.clone())).await?;
      if response.status >= 400 {
        return Err(eyre!(
          "Manifest fetch for {} returned status {}",
          url,
          response.status
        ));
      }
      Ok::<_, color_eyre::Report>((url, response))
    });

    let responses = match try_join_all(fetches).await {
      Ok(responses) => responses,
      Err(e) => {
        error!("install failed while fetching manifest: {}", e);
        self.store.drop_partition(&self.names.static_partition)?;
        return Err(e);
      }
    };

    for (url, response) in &responses {
      let entry = Entry::from_response(url, response);
      if let Err(e) = self.store.put(&self.names.static_partition, &entry) {
        error!("install failed while storing {}: {}", url, e);
        self.store.drop_partition(&self.names.static_partition)?;
        return Err(e);
      }
    }

    // Eligible to activate immediately; no waiting for open tabs
    self.set_phase(Phase::Installed);
    info!("static shell installed");
    Ok(())
  }

  /// Drop every partition that is not part of the current generation,
  /// then claim open clients. Returns the names of dropped partitions.
  ///
  /// This is the cache invalidation path across deploys: a version bump
  /// changes both current names, so the previous generation is deleted
  /// here on first activation.
  pub fn activate(&self) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    for partition in self.store.partitions()? {
      if !self.names.is_current(&partition) {
        self.store.drop_partition(&partition)?;
        info!(%partition, "dropped stale cache partition");
        removed.push(partition);
      }
    }

    self.set_phase(Phase::Active);
    info!("controller active, claiming open clients");
    Ok(removed)
  }
}
