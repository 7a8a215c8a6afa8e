use crate::reminders::ReminderEvent;
use uuid::Uuid;

pub const MAX_NOTIFICATIONS: usize = 200;
pub const REMINDER_TITLE_PREFIX: &str = "It's time! ";
pub const REMINDER_MESSAGE: &str = "Your scheduled idea is due:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Reminder,
    Info,
    Error,
}

#[derive(Clone, Debug)]
pub struct NotificationItem {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub details: Option<String>,
    pub date_label: Option<String>,
    pub created_at_ms: i64,
    pub read: bool,
}

impl NotificationItem {
    fn build(kind: NotificationKind, title: String, message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title,
            message,
            details: None,
            date_label: None,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
            read: false,
        }
    }

    pub fn reminder(event: &ReminderEvent) -> Self {
        let details = if event.description.trim().is_empty() {
            None
        } else {
            Some(event.description.clone())
        };
        Self {
            details,
            date_label: Some(event.date_label.clone()),
            ..Self::build(
                NotificationKind::Reminder,
                format!("{REMINDER_TITLE_PREFIX}{}", event.title),
                REMINDER_MESSAGE.to_string(),
            )
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(NotificationKind::Info, title.into(), message.into())
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(NotificationKind::Error, title.into(), message.into())
    }
}

/// Where notifications go once raised. Delivery is best effort.
pub trait NotificationSink {
    fn deliver(&mut self, item: &NotificationItem);
}

impl<F> NotificationSink for F
where
    F: FnMut(&NotificationItem),
{
    fn deliver(&mut self, item: &NotificationItem) {
        self(item)
    }
}

pub fn unread_count(items: &[NotificationItem]) -> usize {
    items.iter().filter(|item| !item.read).count()
}

pub fn mark_all_read(items: &mut [NotificationItem]) {
    for item in items {
        item.read = true;
    }
}

/// Recent notifications, oldest first.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    items: Vec<NotificationItem>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: NotificationItem) {
        self.items.push(item);
        if self.items.len() > MAX_NOTIFICATIONS {
            let overflow = self.items.len() - MAX_NOTIFICATIONS;
            self.items.drain(0..overflow);
        }
    }

    /// Records the item and hands it to the sink.
    pub fn raise(&mut self, item: NotificationItem, sink: &mut dyn NotificationSink) {
        sink.deliver(&item);
        self.push(item);
    }

    pub fn raise_reminders(&mut self, events: &[ReminderEvent], sink: &mut dyn NotificationSink) {
        for event in events {
            self.raise(NotificationItem::reminder(event), sink);
        }
    }

    pub fn unread_count(&self) -> usize {
        unread_count(&self.items)
    }

    pub fn mark_all_read(&mut self) {
        mark_all_read(&mut self.items);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
