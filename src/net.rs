//! Network fetch seam.
//!
//! The controller talks to the network through the `Fetch` trait so the
//! interception logic stays independent of the transport. Production uses
//! a reqwest client; tests substitute a mock with a call counter.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;

use crate::http::{Request, Response, ResponseKind};

/// Asynchronous network fetch.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// reqwest-backed fetch that resolves site-relative URLs against the
/// configured origin.
pub struct HttpClient {
  client: reqwest::Client,
  origin: url::Url,
}

impl HttpClient {
  pub fn new(origin: &str) -> Result<Self> {
    let origin = url::Url::parse(origin).map_err(|e| eyre!("Invalid origin {}: {}", origin, e))?;

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  fn resolve(&self, url: &str) -> Result<url::Url> {
    match url::Url::parse(url) {
      Ok(absolute) => Ok(absolute),
      Err(url::ParseError::RelativeUrlWithoutBase) => self
        .origin
        .join(url)
        .map_err(|e| eyre!("Failed to resolve {} against origin: {}", url, e)),
      Err(e) => Err(eyre!("Invalid URL {}: {}", url, e)),
    }
  }
}

#[async_trait]
impl Fetch for HttpClient {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let url = self.resolve(&request.url)?;

    // Same-origin responses are fully visible; cross-origin ones are
    // treated as opaque and thus never cacheable.
    let kind = if url.host_str() == self.origin.host_str() {
      ResponseKind::Basic
    } else {
      ResponseKind::Opaque
    };

    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", request.method.as_str(), e))?;

    let mut builder = self.client.request(method, url.clone());
    if !request.body.is_empty() {
      builder = builder.body(request.body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Network fetch failed for {}: {}", url, e))?;

    let status = response.status().as_u16();

    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
      if let Ok(value) = value.to_str() {
        headers.insert(name.as_str().to_string(), value.to_string());
      }
    }
    let content_type = headers.get("content-type").cloned();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body from {}: {}", url, e))?
      .to_vec();

    Ok(Response {
      status,
      kind,
      content_type,
      headers,
      body,
    })
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_relative_against_origin() {
    let client = HttpClient::new("https://example.com").unwrap();
    let resolved = client.resolve("/gallery/1.jpg").unwrap();
    assert_eq!(resolved.as_str(), "https://example.com/gallery/1.jpg");
  }

  #[test]
  fn test_resolve_keeps_absolute_urls() {
    let client = HttpClient::new("https://example.com").unwrap();
    let resolved = client.resolve("https://cdn.example.net/font.css").unwrap();
    assert_eq!(resolved.host_str(), Some("cdn.example.net"));
  }

  #[test]
  fn test_rejects_invalid_origin() {
    assert!(HttpClient::new("not a url").is_err());
  }
}
