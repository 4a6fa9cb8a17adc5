use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Controller configuration, loaded once at startup and treated as
/// immutable for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Cache generation. Bumping this and redeploying drops every
  /// partition of the previous generation on next activation.
  pub version: String,
  /// Absolute base URL that site-relative asset URLs resolve against.
  pub origin: String,
  /// Document shell served as the offline navigation fallback.
  #[serde(default = "default_shell_url")]
  pub shell_url: String,
  /// URLs populated eagerly into the static partition at install time.
  pub static_manifest: Vec<String>,
  /// URL substrings deciding whether a runtime fetch is persisted into
  /// the dynamic partition. Checked in order; first match wins.
  #[serde(default = "default_dynamic_patterns")]
  pub dynamic_patterns: Vec<String>,
  /// URL substring identifying queued offline form submissions.
  #[serde(default = "default_queue_prefix")]
  pub offline_queue_prefix: String,
  /// Sync tag that triggers the submission drain.
  #[serde(default = "default_sync_tag")]
  pub sync_tag: String,
  #[serde(default)]
  pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
  #[serde(default = "default_notification_title")]
  pub title: String,
  #[serde(default = "default_notification_body")]
  pub default_body: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      title: default_notification_title(),
      default_body: default_notification_body(),
    }
  }
}

fn default_shell_url() -> String {
  "/".to_string()
}

fn default_dynamic_patterns() -> Vec<String> {
  vec![
    "/api/".to_string(),
    "/gallery/".to_string(),
    "/images/".to_string(),
  ]
}

fn default_queue_prefix() -> String {
  "/api/contact".to_string()
}

fn default_sync_tag() -> String {
  "contact-form-sync".to_string()
}

fn default_notification_title() -> String {
  "Portfolio Update".to_string()
}

fn default_notification_body() -> String {
  "Something new is up on the portfolio.".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./liferaft.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/liferaft/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/liferaft/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("liferaft.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("liferaft").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.version.trim().is_empty() {
      return Err(eyre!("version must not be empty"));
    }
    if config.static_manifest.is_empty() {
      return Err(eyre!("static_manifest must list at least the shell URL"));
    }

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal_yaml() -> &'static str {
    r#"
version: "3"
origin: "https://example.com"
static_manifest:
  - "/"
  - "/manifest.json"
"#
  }

  #[test]
  fn test_parse_minimal_config_with_defaults() {
    let config = Config::parse(minimal_yaml()).unwrap();
    assert_eq!(config.version, "3");
    assert_eq!(config.shell_url, "/");
    assert_eq!(
      config.dynamic_patterns,
      vec!["/api/", "/gallery/", "/images/"]
    );
    assert_eq!(config.offline_queue_prefix, "/api/contact");
    assert_eq!(config.sync_tag, "contact-form-sync");
  }

  #[test]
  fn test_parse_rejects_empty_manifest() {
    let yaml = r#"
version: "3"
origin: "https://example.com"
static_manifest: []
"#;
    assert!(Config::parse(yaml).is_err());
  }

  #[test]
  fn test_parse_custom_patterns() {
    let yaml = r#"
version: "7"
origin: "https://example.com"
static_manifest: ["/"]
dynamic_patterns: ["/cdn/"]
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.dynamic_patterns, vec!["/cdn/"]);
  }
}
