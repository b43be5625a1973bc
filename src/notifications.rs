use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// NoticeKind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Approved,
    Rejected,
    Invalidated,
}

/// Notice
///
/// A message for an article's author about a moderation outcome. Notices are produced only
/// after the corresponding state change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub recipient_id: Uuid,
    pub article_id: i64,
    pub kind: NoticeKind,
    pub message: String,
}

// 1. NotificationDispatcher Contract
/// NotificationDispatcher
///
/// Hands notices to whatever delivers them. Implementations are swapped behind this trait:
/// a webhook in deployments, a log-only dispatcher when no webhook is configured, and a
/// recording mock in tests.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notice: Notice) -> Result<(), String>;
}

/// NotifierState
///
/// The concrete type used to share the dispatcher across the application state.
pub type NotifierState = Arc<dyn NotificationDispatcher>;

// 2. Webhook Implementation
/// WebhookDispatcher
///
/// POSTs each notice as JSON to a configured endpoint owned by the delivery service.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookDispatcher {
    pub fn new(endpoint: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, notice: Notice) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notice)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("webhook answered {}", response.status()))
        }
    }
}

// 3. Log-Only Implementation
/// LogDispatcher
///
/// Writes notices to the trace log. Used when `NOTIFY_WEBHOOK_URL` is unset.
#[derive(Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notice: Notice) -> Result<(), String> {
        tracing::info!(
            recipient = %notice.recipient_id,
            article_id = notice.article_id,
            kind = ?notice.kind,
            "notice: {}",
            notice.message
        );
        Ok(())
    }
}

// 4. The Mock Implementation (For Tests)
/// MockNotificationDispatcher
///
/// Records every notice it is given. When `should_fail` is set, dispatch fails after
/// recording, which lets tests check that a delivery failure never undoes a committed change.
#[derive(Default)]
pub struct MockNotificationDispatcher {
    pub should_fail: bool,
    sent: Mutex<Vec<Notice>>,
}

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    async fn dispatch(&self, notice: Notice) -> Result<(), String> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notice);
        }
        if self.should_fail {
            return Err("Mock Notification Error: Simulation requested".to_string());
        }
        Ok(())
    }
}
