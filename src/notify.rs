//! Notification seam and a sled-backed notification log
use std::fmt;
use std::sync::Arc;

use sled::{Db, Tree};
use tracing::debug;

use super::error::ExchangeError;
use super::types::TimeStamp;
use super::utils::{NOTIFICATION_HRP, new_uuid_to_bech32, sanitize_email};

pub const NOTIFICATIONS_TREE: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum EventKind {
    #[n(0)]
    RequestCreated,
    #[n(1)]
    RequestAccepted,
    #[n(2)]
    RequestRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub request_id: String,
    pub message: String,
}

/// One-way channel for exchange events. Callers never depend on delivery.
pub trait NotificationSink: Send + Sync {
    fn notify(
        &self,
        target_email: &str,
        kind: EventKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Notification {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_email: String,
    #[n(2)]
    pub kind: EventKind,
    #[n(3)]
    pub request_id: String,
    #[n(4)]
    pub message: String,
    #[n(5)]
    pub timestamp: TimeStamp,
}

/// Persists notifications under `<sanitized email>/<id>`.
pub struct NotificationLog {
    notifications: Tree,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RequestCreated => "request_created",
            EventKind::RequestAccepted => "request_accepted",
            EventKind::RequestRejected => "request_rejected",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NotificationLog {
    pub fn open(db: &Arc<Db>) -> anyhow::Result<Self> {
        Ok(Self {
            notifications: db.open_tree(NOTIFICATIONS_TREE)?,
        })
    }

    /// Notifications addressed to `email`, newest first.
    pub fn list_for(&self, email: &str) -> anyhow::Result<Vec<Notification>> {
        let prefix = format!("{}/", sanitize_email(email));
        let mut out = Vec::new();
        for entry in self.notifications.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            let notification: Notification =
                minicbor::decode(&bytes).map_err(ExchangeError::from)?;
            out.push(notification);
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }
}

impl NotificationSink for NotificationLog {
    fn notify(
        &self,
        target_email: &str,
        kind: EventKind,
        payload: &NotificationPayload,
    ) -> anyhow::Result<()> {
        let id = new_uuid_to_bech32(NOTIFICATION_HRP)?;
        let notification = Notification {
            id: id.clone(),
            user_email: target_email.to_string(),
            kind,
            request_id: payload.request_id.clone(),
            message: payload.message.clone(),
            timestamp: TimeStamp::new(),
        };
        let key = format!("{}/{}", sanitize_email(target_email), id);
        let bytes = minicbor::to_vec(&notification)?;
        self.notifications.insert(key.as_bytes(), bytes)?;

        debug!(
            notification_id = %id,
            recipient = %target_email,
            kind = %kind,
            "Notification recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn notifications_are_kept_per_recipient() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let db = Arc::new(sled::open(temp_dir.path().join("notify.db"))?);
        let log = NotificationLog::open(&db)?;

        let payload = NotificationPayload {
            request_id: "exchange_1abc".into(),
            message: "New exchange request".into(),
        };
        log.notify("b@x.com", EventKind::RequestCreated, &payload)?;
        log.notify("b@x.com", EventKind::RequestCreated, &payload)?;
        log.notify("c@x.com", EventKind::RequestAccepted, &payload)?;

        let for_b = log.list_for("b@x.com")?;
        assert_eq!(for_b.len(), 2);
        assert!(for_b.iter().all(|n| n.user_email == "b@x.com"));
        assert!(for_b[0].timestamp >= for_b[1].timestamp);

        let for_c = log.list_for("c@x.com")?;
        assert_eq!(for_c.len(), 1);
        assert_eq!(for_c[0].kind, EventKind::RequestAccepted);

        assert!(log.list_for("nobody@x.com")?.is_empty());
        Ok(())
    }
}
