//! Fetch interception: cache-first serving, conditional dynamic caching,
//! and the offline fallback policy.

use color_eyre::Result;
use tracing::{debug, info, warn};

use super::Controller;
use crate::cache::{CacheStore, Entry};
use crate::http::{placeholder_image, Destination, Request, Response};
use crate::net::Fetch;

impl<S: CacheStore, N: Fetch> Controller<S, N> {
  /// Intercept one request and produce the response the page receives.
  ///
  /// Cache-first with no revalidation: staleness is accepted in exchange
  /// for offline availability. Only GET requests over http(s) ever touch
  /// the cache; everything else goes straight to the network untouched.
  pub async fn intercept(&self, request: &Request) -> Result<Response> {
    if !request.method.is_get() || !request.is_http() {
      return self.net.fetch(request).await;
    }

    if let Some(entry) = self.lookup(&request.url)? {
      debug!(url = %request.url, "cache hit");
      return Ok(entry.into_response());
    }

    match self.net.fetch(request).await {
      Ok(response) => {
        // Storing a copy and returning the response are independent
        // outputs; a failed store never fails the fetch.
        if response.is_cacheable() && self.matches_dynamic(&request.url) {
          let entry = Entry::from_response(&request.url, &response);
          if let Err(e) = self.store.put(&self.names.dynamic_partition, &entry) {
            warn!(url = %request.url, "failed to cache dynamic asset: {}", e);
          } else {
            debug!(url = %request.url, "cached dynamic asset");
          }
        }
        Ok(response)
      }
      Err(err) => self.offline_fallback(request, err),
    }
  }

  /// Exact-URL lookup across the static then dynamic partition. Queued
  /// submissions share the dynamic partition but are non-GET entries and
  /// must never shadow a cached response.
  fn lookup(&self, url: &str) -> Result<Option<Entry>> {
    for partition in [&self.names.static_partition, &self.names.dynamic_partition] {
      if let Some(entry) = self.store.get(partition, url)? {
        if entry.method.is_get() {
          return Ok(Some(entry));
        }
      }
    }
    Ok(None)
  }

  fn matches_dynamic(&self, url: &str) -> bool {
    self
      .config
      .dynamic_patterns
      .iter()
      .any(|pattern| url.contains(pattern.as_str()))
  }

  /// Network failed and nothing was cached for the exact URL. Navigations
  /// get the cached shell, images get a generated placeholder, everything
  /// else propagates the failure to the caller.
  fn offline_fallback(&self, request: &Request, err: color_eyre::Report) -> Result<Response> {
    match request.destination {
      Destination::Document => {
        match self
          .store
          .get(&self.names.static_partition, &self.config.shell_url)?
        {
          Some(shell) => {
            info!(url = %request.url, "offline navigation, serving cached shell");
            Ok(shell.into_response())
          }
          None => Err(err),
        }
      }
      Destination::Image => {
        info!(url = %request.url, "offline image, serving placeholder");
        Ok(placeholder_image())
      }
      _ => Err(err),
    }
  }
}
