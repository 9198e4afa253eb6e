//! Transient user-visible notifications (script faults, reloads, warnings).

use std::collections::VecDeque;

/// Maximum notifications kept before the oldest are dropped.
const MAX_NOTIFICATIONS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// Engine time (seconds) the notification was raised
    pub created_at: f64,
}

/// Queue of recent notifications, expiring after `lifetime` seconds.
#[derive(Debug, Clone)]
pub struct Notifications {
    entries: VecDeque<Notification>,
    lifetime: f64,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl Notifications {
    pub fn new(lifetime: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            lifetime,
        }
    }

    /// Push a notification. Returns false when an identical one is still
    /// visible, in which case nothing is added.
    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>, now: f64) -> bool {
        let message = message.into();
        let duplicate = self.entries.iter().rev().any(|n| {
            n.level == level && n.message == message && now - n.created_at <= self.lifetime
        });
        if duplicate {
            return false;
        }
        if self.entries.len() == MAX_NOTIFICATIONS {
            self.entries.pop_front();
        }
        self.entries.push_back(Notification {
            level,
            message,
            created_at: now,
        });
        true
    }

    pub fn info(&mut self, message: impl Into<String>, now: f64) -> bool {
        self.push(NotificationLevel::Info, message, now)
    }

    pub fn warning(&mut self, message: impl Into<String>, now: f64) -> bool {
        self.push(NotificationLevel::Warning, message, now)
    }

    pub fn error(&mut self, message: impl Into<String>, now: f64) -> bool {
        self.push(NotificationLevel::Error, message, now)
    }

    /// Drop notifications older than the lifetime.
    pub fn prune(&mut self, now: f64) {
        let lifetime = self.lifetime;
        self.entries.retain(|n| now - n.created_at <= lifetime);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.entries.iter().filter(|n| n.level == level).count()
    }
}
