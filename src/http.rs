//! Request/response values used by the cache controller.
//!
//! These are deliberately decoupled from reqwest so handlers stay pure
//! functions over plain values and tests never need a transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request method. Only GET entries are ever served from cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
  Get,
  Post,
  /// Anything else the controller passes through untouched.
  Other(String),
}

impl Method {
  pub fn is_get(&self) -> bool {
    matches!(self, Method::Get)
  }

  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Other(m) => m,
    }
  }
}

impl std::str::FromStr for Method {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.to_uppercase().as_str() {
      "GET" => Method::Get,
      "POST" => Method::Post,
      other => Method::Other(other.to_string()),
    })
  }
}

/// What the requesting page intends to do with the response.
/// Drives the offline fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
  /// Top-level navigation
  Document,
  Image,
  Script,
  Style,
  Font,
  Other,
}

impl std::str::FromStr for Destination {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s.to_lowercase().as_str() {
      "document" => Destination::Document,
      "image" => Destination::Image,
      "script" => Destination::Script,
      "style" => Destination::Style,
      "font" => Destination::Font,
      "other" => Destination::Other,
      other => return Err(format!("unknown destination: {}", other)),
    })
  }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  /// Absolute or site-relative URL
  pub url: String,
  pub destination: Destination,
  /// Request body for queued submissions; empty for GETs
  pub body: Vec<u8>,
}

impl Request {
  /// A plain GET for a URL, the common case for interception.
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      url: url.into(),
      destination: Destination::Other,
      body: Vec::new(),
    }
  }

  pub fn with_destination(mut self, destination: Destination) -> Self {
    self.destination = destination;
    self
  }

  /// Whether the URL scheme is interceptable. Relative URLs resolve
  /// against the configured origin and count as http(s); anything with
  /// an explicit non-http scheme (extension-internal, data:) does not.
  pub fn is_http(&self) -> bool {
    match url::Url::parse(&self.url) {
      Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
      // Site-relative URL, resolved against the origin later
      Err(url::ParseError::RelativeUrlWithoutBase) => true,
      Err(_) => false,
    }
  }
}

/// Where a response came from, as far as cacheability is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
  /// Same-origin; headers and status are fully visible
  Basic,
  /// Cross-origin; cacheability cannot be verified
  Opaque,
  /// Network-level error surfaced as a response
  Error,
}

/// A response, either fetched from the network or reconstructed from cache.
#[derive(Debug, Clone)]
pub struct Response {
  pub status: u16,
  pub kind: ResponseKind,
  pub content_type: Option<String>,
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
}

impl Response {
  /// Only 200 same-origin responses are ever persisted. Opaque and
  /// error responses are returned to the caller but never cached.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Caption baked into the offline image placeholder.
pub const PLACEHOLDER_CAPTION: &str = "Image unavailable offline";

/// Build the offline placeholder: a fixed-dimension inline SVG returned
/// when an image request fails at the network layer with nothing cached.
pub fn placeholder_image() -> Response {
  let svg = format!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">
  <rect width="400" height="300" fill="#1a1a2e"/>
  <text x="200" y="150" fill="#e0e0e0" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>
</svg>"##,
    PLACEHOLDER_CAPTION
  );

  let mut headers = BTreeMap::new();
  headers.insert("content-type".to_string(), "image/svg+xml".to_string());

  Response {
    status: 200,
    kind: ResponseKind::Basic,
    content_type: Some("image/svg+xml".to_string()),
    headers,
    body: svg.into_bytes(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_method_parse() {
    assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
    assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
    assert_eq!(
      "PATCH".parse::<Method>().unwrap(),
      Method::Other("PATCH".to_string())
    );
  }

  #[test]
  fn test_relative_url_is_http() {
    assert!(Request::get("/gallery/1.jpg").is_http());
    assert!(Request::get("https://cdn.example.com/font.css").is_http());
  }

  #[test]
  fn test_extension_scheme_is_not_http() {
    assert!(!Request::get("chrome-extension://abcdef/script.js").is_http());
    assert!(!Request::get("data:text/plain,hello").is_http());
  }

  #[test]
  fn test_cacheable_rules() {
    let mut resp = placeholder_image();
    assert!(resp.is_cacheable());

    resp.status = 404;
    assert!(!resp.is_cacheable());

    resp.status = 200;
    resp.kind = ResponseKind::Opaque;
    assert!(!resp.is_cacheable());
  }

  #[test]
  fn test_placeholder_is_svg_with_caption() {
    let resp = placeholder_image();
    assert_eq!(resp.content_type.as_deref(), Some("image/svg+xml"));

    let body = resp.body_text();
    assert!(body.contains(PLACEHOLDER_CAPTION));
    // Hex color attributes must survive into the markup intact
    assert!(body.contains(r##"fill="#1a1a2e""##));
    assert!(body.ends_with("</svg>"));
  }
}
