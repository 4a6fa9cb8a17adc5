//! Push messages and notification clicks.

use tracing::debug;

use super::Controller;
use crate::cache::CacheStore;
use crate::net::Fetch;

pub const ACTION_VIEW: &str = "view";
pub const ACTION_DISMISS: &str = "dismiss";

/// A notification to display, as a plain value; the hosting runtime owns
/// the actual presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
  pub action: &'static str,
  pub title: &'static str,
}

/// What clicking a notification should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
  /// Open or focus a window at this URL
  OpenWindow(String),
  /// Close the notification and do nothing else
  Dismissed,
}

impl<S: CacheStore, N: Fetch> Controller<S, N> {
  /// Build the notification for a push message. The body comes from the
  /// payload text when present, the configured default otherwise.
  pub fn push(&self, payload: Option<&str>) -> Notification {
    let body = payload
      .filter(|text| !text.trim().is_empty())
      .unwrap_or(&self.config.notifications.default_body)
      .to_string();

    debug!(%body, "push message received");

    Notification {
      title: self.config.notifications.title.clone(),
      body,
      actions: vec![
        NotificationAction {
          action: ACTION_VIEW,
          title: "View portfolio",
        },
        NotificationAction {
          action: ACTION_DISMISS,
          title: "Dismiss",
        },
      ],
    }
  }

  /// Resolve a notification click. Only the view action opens a window;
  /// every other action (including the notification body itself being
  /// dismissed) just closes it.
  pub fn notification_click(&self, action: &str) -> ClickOutcome {
    if action == ACTION_VIEW {
      ClickOutcome::OpenWindow(self.config.shell_url.clone())
    } else {
      ClickOutcome::Dismissed
    }
  }
}

#[cfg(test)]
mod tests {
  use super::super::testutil::controller;
  use super::*;
  use crate::net::mock::MockNet;

  #[test]
  fn test_push_uses_payload_text() {
    let worker = controller(MockNet::new());
    let notification = worker.push(Some("New project published"));
    assert_eq!(notification.body, "New project published");
    assert_eq!(notification.actions.len(), 2);
  }

  #[test]
  fn test_push_falls_back_to_default_body() {
    let worker = controller(MockNet::new());
    let default_body = worker.push(None).body;
    assert!(!default_body.is_empty());
    assert_eq!(worker.push(Some("  ")).body, default_body);
  }

  #[test]
  fn test_click_view_opens_shell() {
    let worker = controller(MockNet::new());
    assert_eq!(
      worker.notification_click(ACTION_VIEW),
      ClickOutcome::OpenWindow("/".to_string())
    );
  }

  #[test]
  fn test_click_dismiss_closes() {
    let worker = controller(MockNet::new());
    assert_eq!(
      worker.notification_click(ACTION_DISMISS),
      ClickOutcome::Dismissed
    );
    assert_eq!(worker.notification_click("other"), ClickOutcome::Dismissed);
  }
}
