pub mod telegram;

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

pub const SUCCESS_AUTO_DISMISS: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Success,
}

/// One-shot notice for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// `None` keeps the notice until it is dismissed.
    pub auto_dismiss: Option<Duration>,
}

impl NotificationEvent {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
            auto_dismiss: None,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
            auto_dismiss: Some(SUCCESS_AUTO_DISMISS),
        }
    }
}

pub trait NotificationSink {
    fn publish(&self, event: NotificationEvent);
}

impl NotificationSink for mpsc::UnboundedSender<NotificationEvent> {
    fn publish(&self, event: NotificationEvent) {
        // A closed receiver means the display is gone; nothing left to show.
        let _ = self.send(event);
    }
}

#[derive(Debug)]
pub struct VisibleNotification {
    pub id: u64,
    pub event: NotificationEvent,
    expires_at: Option<Instant>,
}

/// Notices currently on screen.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_id: u64,
    visible: Vec<VisibleNotification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, event: NotificationEvent, now: Instant) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let expires_at = event.auto_dismiss.map(|after| now + after);
        self.visible.push(VisibleNotification {
            id,
            event,
            expires_at,
        });
        id
    }

    /// Drops every auto-dismissing notice whose time is up.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.visible.len();
        self.visible
            .retain(|item| item.expires_at.is_none_or(|deadline| deadline > now));
        before - self.visible.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.visible.len();
        self.visible.retain(|item| item.id != id);
        before != self.visible.len()
    }

    pub fn dismiss_all(&mut self) {
        self.visible.clear();
    }

    pub fn visible(&self) -> &[VisibleNotification] {
        &self.visible
    }
}
