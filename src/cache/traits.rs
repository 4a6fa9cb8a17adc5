//! Core trait and record type for the partitioned cache.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::http::{Method, Request, Response, ResponseKind};

/// One record in a partition, keyed by URL.
///
/// A GET entry is a stored response for that URL. A non-GET entry under
/// the offline queue prefix is a pending form submission: `body` then
/// holds the request payload to replay, not a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
  pub url: String,
  pub method: Method,
  pub status: u16,
  pub content_type: Option<String>,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
  pub cached_at: DateTime<Utc>,
}

impl Entry {
  /// Capture a fetched response for later serving.
  pub fn from_response(url: &str, response: &Response) -> Self {
    Self {
      url: url.to_string(),
      method: Method::Get,
      status: response.status,
      content_type: response.content_type.clone(),
      headers: response.headers.clone(),
      body: response.body.clone(),
      cached_at: Utc::now(),
    }
  }

  /// Capture a request for later replay (offline submission queue).
  pub fn from_request(request: &Request) -> Self {
    Self {
      url: request.url.clone(),
      method: request.method.clone(),
      status: 0,
      content_type: None,
      headers: BTreeMap::new(),
      body: request.body.clone(),
      cached_at: Utc::now(),
    }
  }

  /// Reconstruct the response this entry was captured from.
  pub fn into_response(self) -> Response {
    Response {
      status: self.status,
      kind: ResponseKind::Basic,
      content_type: self.content_type,
      headers: self.headers,
      body: self.body,
    }
  }
}

/// Trait for cache storage backends.
///
/// Partitions are created implicitly on first write. Writes to the same
/// (partition, URL) pair are last-write-wins; entries are idempotent
/// representations of the same URL's content, so no merge logic exists.
pub trait CacheStore: Send + Sync {
  /// Store an entry, overwriting any previous entry for its URL.
  fn put(&self, partition: &str, entry: &Entry) -> Result<()>;

  /// Look up the entry for an exact URL.
  fn get(&self, partition: &str, url: &str) -> Result<Option<Entry>>;

  /// All entries in a partition, in insertion order.
  fn list(&self, partition: &str) -> Result<Vec<Entry>>;

  /// Remove the entry for a URL. Returns whether anything was removed.
  fn delete(&self, partition: &str, url: &str) -> Result<bool>;

  /// Names of all partitions that currently hold entries.
  fn partitions(&self) -> Result<Vec<String>>;

  /// Delete a partition and everything in it.
  fn drop_partition(&self, partition: &str) -> Result<()>;
}
