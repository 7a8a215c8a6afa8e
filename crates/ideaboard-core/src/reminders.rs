use crate::calendar::CalendarOccurrence;
use crate::ideas::{format_local_timestamp, Idea};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_SCAN_PERIOD_MS: u64 = 1_000;
pub const DEFAULT_LOOKBACK_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    ZeroPeriod,
    WindowTooNarrow { period_ms: u64, lookback_ms: u64 },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriod => f.write_str("scan period must be positive"),
            Self::WindowTooNarrow {
                period_ms,
                lookback_ms,
            } => write!(
                f,
                "lookback window ({lookback_ms} ms) must exceed the scan period ({period_ms} ms)"
            ),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Dedupe key. Sources are kept apart so ids cannot collide across them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReminderKey {
    Idea(String),
    Calendar(String),
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idea(id) => write!(f, "idea:{id}"),
            Self::Calendar(id) => write!(f, "calendar:{id}"),
        }
    }
}

/// Something with a due time that may deserve a notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Reminder {
    pub key: ReminderKey,
    pub title: String,
    pub description: String,
    pub due: DateTime<Utc>,
}

impl Reminder {
    /// Ideas qualify when they have a usable date and `notify == "true"`.
    pub fn from_idea(idea: &Idea) -> Option<Self> {
        if !idea.wants_notification() {
            return None;
        }
        let due = idea.due_at()?;
        Some(Self {
            key: ReminderKey::Idea(idea.id.clone()),
            title: idea.title.clone(),
            description: idea.description.clone(),
            due,
        })
    }

    pub fn from_occurrence(occurrence: &CalendarOccurrence) -> Self {
        Self {
            key: ReminderKey::Calendar(occurrence.id.clone()),
            title: occurrence.title.clone(),
            description: String::new(),
            due: occurrence.start,
        }
    }
}

pub fn reminders_from_ideas(ideas: &[Idea]) -> impl Iterator<Item = Reminder> + '_ {
    ideas.iter().filter_map(Reminder::from_idea)
}

pub fn reminders_from_calendar(
    occurrences: &[CalendarOccurrence],
) -> impl Iterator<Item = Reminder> + '_ {
    occurrences.iter().map(Reminder::from_occurrence)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReminderEvent {
    pub key: ReminderKey,
    pub title: String,
    pub description: String,
    pub due: DateTime<Utc>,
    pub date_label: String,
}

/// Scans reminders on every tick and fires each key at most once.
///
/// The fired set lives only as long as the scheduler; nothing is persisted,
/// so a restarted process may fire a still-current reminder again.
#[derive(Debug)]
pub struct ReminderScheduler {
    window: Duration,
    fired: HashSet<ReminderKey>,
}

impl ReminderScheduler {
    pub fn new(period_ms: u64, lookback_ms: u64) -> Result<Self, SchedulerError> {
        if period_ms == 0 {
            return Err(SchedulerError::ZeroPeriod);
        }
        if lookback_ms <= period_ms {
            return Err(SchedulerError::WindowTooNarrow {
                period_ms,
                lookback_ms,
            });
        }
        Ok(Self {
            window: millis(lookback_ms),
            fired: HashSet::new(),
        })
    }

    /// Scheduler whose lookback window is five scan periods.
    pub fn for_period(period_ms: u64) -> Result<Self, SchedulerError> {
        Self::new(period_ms, period_ms.saturating_mul(5))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn has_fired(&self, key: &ReminderKey) -> bool {
        self.fired.contains(key)
    }

    pub fn fired_count(&self) -> usize {
        self.fired.len()
    }

    /// Due when `now` is at or after `due` but less than one window past it.
    pub fn is_due(&self, due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let delta = due - now;
        delta <= Duration::zero() && delta > -self.window
    }

    pub fn tick<I>(&mut self, reminders: I, now: DateTime<Utc>) -> Vec<ReminderEvent>
    where
        I: IntoIterator<Item = Reminder>,
    {
        let mut events = Vec::new();
        for reminder in reminders {
            if !self.is_due(reminder.due, now) {
                continue;
            }
            if !self.fired.insert(reminder.key.clone()) {
                continue;
            }
            tracing::info!(key = %reminder.key, "reminder fired");
            events.push(ReminderEvent {
                date_label: format_local_timestamp(reminder.due),
                key: reminder.key,
                title: reminder.title,
                description: reminder.description,
                due: reminder.due,
            });
        }
        events
    }

    pub fn tick_ideas(&mut self, ideas: &[Idea], now: DateTime<Utc>) -> Vec<ReminderEvent> {
        self.tick(reminders_from_ideas(ideas), now)
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::{ReminderKey, ReminderScheduler, SchedulerError};
    use crate::calendar::CalendarOccurrence;
    use crate::ideas::{Idea, IdeaStatus};
    use crate::reminders::reminders_from_calendar;
    use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};

    fn event_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    fn dated_idea(id: &str, date: DateTime<Utc>, notify: &str) -> Idea {
        Idea {
            id: id.to_string(),
            title: format!("Idea {id}"),
            description: "bring snacks".to_string(),
            status: IdeaStatus::Progress,
            category: "General".to_string(),
            image: None,
            date: Some(date.to_rfc3339_opts(SecondsFormat::Secs, true)),
            notify: Some(notify.to_string()),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn scheduler() -> ReminderScheduler {
        ReminderScheduler::new(1_000, 5_000).expect("scheduler")
    }

    #[test]
    fn window_must_exceed_period() {
        assert_eq!(
            ReminderScheduler::new(1_000, 1_000).err(),
            Some(SchedulerError::WindowTooNarrow {
                period_ms: 1_000,
                lookback_ms: 1_000
            })
        );
        assert_eq!(
            ReminderScheduler::new(0, 5_000).err(),
            Some(SchedulerError::ZeroPeriod)
        );
        let scheduler = ReminderScheduler::for_period(60_000).expect("scheduler");
        assert_eq!(scheduler.window(), Duration::minutes(5));
    }

    #[test]
    fn scenario_fires_once_inside_window() {
        let t = event_time();
        let ideas = vec![dated_idea("1", t, "true")];
        let mut scheduler = scheduler();

        assert!(scheduler.tick_ideas(&ideas, t - Duration::seconds(1)).is_empty());

        let fired = scheduler.tick_ideas(&ideas, t + Duration::milliseconds(500));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].key, ReminderKey::Idea("1".into()));
        assert_eq!(fired[0].title, "Idea 1");
        assert_eq!(fired[0].description, "bring snacks");
        assert!(!fired[0].date_label.is_empty());

        assert!(scheduler.tick_ideas(&ideas, t + Duration::seconds(3)).is_empty());
        assert!(scheduler.tick_ideas(&ideas, t + Duration::seconds(6)).is_empty());
    }

    #[test]
    fn fires_exactly_at_due_time_and_dedupes_repeated_ticks() {
        let t = event_time();
        let ideas = vec![dated_idea("1", t, "true")];
        let mut scheduler = scheduler();

        let mut total = 0;
        for offset_ms in (0..5_000).step_by(250) {
            total += scheduler
                .tick_ideas(&ideas, t + Duration::milliseconds(offset_ms))
                .len();
        }
        assert_eq!(total, 1);
        assert!(scheduler.has_fired(&ReminderKey::Idea("1".into())));
    }

    #[test]
    fn window_edge_is_exclusive() {
        let t = event_time();
        let ideas = vec![dated_idea("1", t, "true")];
        let mut scheduler = scheduler();
        assert!(scheduler.tick_ideas(&ideas, t + Duration::seconds(5)).is_empty());
        assert_eq!(
            scheduler
                .tick_ideas(&ideas, t + Duration::milliseconds(4_999))
                .len(),
            1
        );
    }

    #[test]
    fn no_catch_up_for_old_events() {
        let now = event_time();
        let ideas = vec![dated_idea("1", now - Duration::seconds(50), "true")];
        let mut scheduler = scheduler();
        for step in 0..20 {
            assert!(scheduler
                .tick_ideas(&ideas, now + Duration::seconds(step))
                .is_empty());
        }
        assert_eq!(scheduler.fired_count(), 0);
    }

    #[test]
    fn ignores_ideas_without_notify_or_date() {
        let t = event_time();
        let mut undated = dated_idea("2", t, "true");
        undated.date = None;
        let mut blank = dated_idea("3", t, "true");
        blank.date = Some(String::new());
        let ideas = vec![dated_idea("1", t, "false"), undated, blank];

        let mut scheduler = scheduler();
        assert!(scheduler.tick_ideas(&ideas, t).is_empty());
    }

    #[test]
    fn notify_toggle_does_not_refire() {
        let t = event_time();
        let mut ideas = vec![dated_idea("1", t, "true")];
        let mut scheduler = scheduler();
        assert_eq!(scheduler.tick_ideas(&ideas, t).len(), 1);

        ideas[0].notify = Some("false".into());
        assert!(scheduler.tick_ideas(&ideas, t + Duration::seconds(1)).is_empty());
        ideas[0].notify = Some("true".into());
        assert!(scheduler.tick_ideas(&ideas, t + Duration::seconds(2)).is_empty());
    }

    #[test]
    fn several_ideas_fire_independently() {
        let t = event_time();
        let ideas = vec![
            dated_idea("1", t, "true"),
            dated_idea("2", t + Duration::seconds(2), "true"),
        ];
        let mut scheduler = scheduler();
        assert_eq!(scheduler.tick_ideas(&ideas, t).len(), 1);
        let later = scheduler.tick_ideas(&ideas, t + Duration::seconds(2));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].key, ReminderKey::Idea("2".into()));
    }

    #[test]
    fn calendar_occurrences_do_not_collide_with_idea_ids() {
        let t = event_time();
        let ideas = vec![dated_idea("1", t, "true")];
        let occurrences = vec![CalendarOccurrence {
            id: "1".into(),
            title: "Standup".into(),
            start: t,
        }];
        let mut scheduler = scheduler();

        assert_eq!(scheduler.tick_ideas(&ideas, t).len(), 1);
        let from_calendar = scheduler.tick(reminders_from_calendar(&occurrences), t);
        assert_eq!(from_calendar.len(), 1);
        assert_eq!(from_calendar[0].key, ReminderKey::Calendar("1".into()));
        assert_eq!(from_calendar[0].title, "Standup");
    }
}
