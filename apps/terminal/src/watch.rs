use crate::cli::WatchArgs;
use crate::files;
use chrono::{DateTime, Duration, Utc};
use ideaboard_core::calendar::CalendarOccurrence;
use ideaboard_core::config::AppConfig;
use ideaboard_core::db::Database;
use ideaboard_core::ideas::Idea;
use ideaboard_core::notifications::{NotificationCenter, NotificationItem, NotificationSink};
use ideaboard_core::reminders::{reminders_from_calendar, ReminderScheduler, SchedulerError};
use ideaboard_core::session::{LoadOutcome, Session};
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct WatchOptions {
    pub period_ms: u64,
    pub lookback_ms: u64,
    pub calendar_feed: Option<PathBuf>,
    pub calendar_poll_secs: u64,
    pub max_ticks: Option<u64>,
}

impl WatchOptions {
    /// Flags win over config. A period given without a lookback gets a
    /// window of five periods.
    pub fn resolve(config: &AppConfig, args: &WatchArgs) -> Self {
        let lookback_ms = match (args.lookback_ms, args.period_ms) {
            (Some(lookback), _) => lookback,
            (None, Some(period)) => period.saturating_mul(5),
            (None, None) => config.lookback_ms,
        };
        Self {
            period_ms: args.period_ms.unwrap_or(config.scan_period_ms),
            lookback_ms,
            calendar_feed: args
                .calendar_feed
                .clone()
                .or_else(|| config.calendar_feed.clone()),
            calendar_poll_secs: config.calendar_poll_secs,
            max_ticks: args.ticks,
        }
    }
}

/// Prints each notification as a short block on the terminal.
pub struct TerminalToasts<'a> {
    out: &'a mut dyn Write,
}

impl<'a> TerminalToasts<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }
}

impl NotificationSink for TerminalToasts<'_> {
    fn deliver(&mut self, item: &NotificationItem) {
        if let Err(err) = write_toast(self.out, item) {
            tracing::warn!(error = %err, "failed to print notification");
        }
    }
}

pub fn write_toast(out: &mut dyn Write, item: &NotificationItem) -> std::io::Result<()> {
    writeln!(out, "🔔 {}", item.title)?;
    match &item.date_label {
        Some(label) => writeln!(out, "   {} {label}", item.message)?,
        None => writeln!(out, "   {}", item.message)?,
    }
    if let Some(details) = &item.details {
        writeln!(out, "   {details}")?;
    }
    out.flush()
}

const MAX_POLL_SECS: i64 = 365 * 24 * 60 * 60;

const FEED_TITLE: &str = "Calendar feed";

/// Change in feed availability worth telling the user about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedChange {
    Failed(String),
    Recovered,
}

impl FeedChange {
    pub fn notification(&self) -> NotificationItem {
        match self {
            Self::Failed(reason) => {
                NotificationItem::error(FEED_TITLE, format!("unavailable: {reason}"))
            }
            Self::Recovered => NotificationItem::info(FEED_TITLE, "available again"),
        }
    }
}

/// Calendar occurrences re-read from a JSON file at most once per interval.
pub struct CalendarFeed {
    path: PathBuf,
    poll_every: Duration,
    last_polled: Option<DateTime<Utc>>,
    occurrences: Vec<CalendarOccurrence>,
    failing: bool,
}

impl CalendarFeed {
    pub fn new(path: PathBuf, poll_secs: u64) -> Self {
        Self {
            path,
            poll_every: Duration::seconds(
                i64::try_from(poll_secs).map_or(MAX_POLL_SECS, |secs| secs.min(MAX_POLL_SECS)),
            ),
            last_polled: None,
            occurrences: Vec::new(),
            failing: false,
        }
    }

    /// Keeps the last good list when the file cannot be read. Reports only
    /// the first failure and the first success after it.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Option<FeedChange> {
        if let Some(last) = self.last_polled {
            if now - last < self.poll_every {
                return None;
            }
        }
        self.last_polled = Some(now);
        match files::read_calendar_feed(&self.path) {
            Ok(occurrences) => {
                tracing::debug!(count = occurrences.len(), "calendar feed refreshed");
                self.occurrences = occurrences;
                std::mem::replace(&mut self.failing, false).then_some(FeedChange::Recovered)
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(error = %reason, "calendar feed unavailable");
                (!std::mem::replace(&mut self.failing, true)).then_some(FeedChange::Failed(reason))
            }
        }
    }

    pub fn occurrences(&self) -> &[CalendarOccurrence] {
        &self.occurrences
    }
}

pub struct Watcher {
    scheduler: ReminderScheduler,
    center: NotificationCenter,
    feed: Option<CalendarFeed>,
}

impl Watcher {
    pub fn new(options: &WatchOptions) -> Result<Self, SchedulerError> {
        Ok(Self {
            scheduler: ReminderScheduler::new(options.period_ms, options.lookback_ms)?,
            center: NotificationCenter::new(),
            feed: options
                .calendar_feed
                .clone()
                .map(|path| CalendarFeed::new(path, options.calendar_poll_secs)),
        })
    }

    /// One scan over ideas and the calendar feed. Returns how many fired.
    pub fn tick(
        &mut self,
        ideas: &[Idea],
        now: DateTime<Utc>,
        sink: &mut dyn NotificationSink,
    ) -> usize {
        let mut events = self.scheduler.tick_ideas(ideas, now);
        if let Some(feed) = self.feed.as_mut() {
            if let Some(change) = feed.refresh(now) {
                self.center.raise(change.notification(), sink);
            }
            events.extend(
                self.scheduler
                    .tick(reminders_from_calendar(feed.occurrences()), now),
            );
        }
        self.center.raise_reminders(&events, sink);
        events.len()
    }

    pub fn center(&self) -> &NotificationCenter {
        &self.center
    }
}

fn no_password(_message: &str) -> Option<String> {
    None
}

/// Picks up edits other commands made to a plain board.
fn refresh_plain(db: &Database, current: Session) -> Session {
    let (fresh, outcome) = Session::load(db, &mut no_password);
    match outcome {
        LoadOutcome::Fresh | LoadOutcome::Restored => fresh,
        _ => current,
    }
}

pub fn run(
    db: &Database,
    mut session: Session,
    options: WatchOptions,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut watcher = Watcher::new(&options)?;
    writeln!(
        out,
        "Watching {} idea(s) for reminders. Press Ctrl-C to stop.",
        session.ideas().len()
    )?;
    tracing::info!(
        period_ms = options.period_ms,
        lookback_ms = options.lookback_ms,
        "reminder watch started"
    );

    let period = std::time::Duration::from_millis(options.period_ms);
    let mut ticks = 0u64;
    loop {
        if !session.is_protected() {
            session = refresh_plain(db, session);
        }
        let mut toasts = TerminalToasts::new(&mut *out);
        watcher.tick(session.ideas(), Utc::now(), &mut toasts);
        ticks += 1;
        if options.max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(());
        }
        std::thread::sleep(period);
    }
}
