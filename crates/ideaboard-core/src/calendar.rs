use crate::ideas::Idea;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the external calendar feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarOccurrence {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
}

#[derive(Debug)]
pub enum FeedError {
    Malformed(serde_json::Error),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "calendar feed is not valid: {err}"),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err)
    }
}

/// Parses a feed document: a JSON array of `{id, title, start}`.
pub fn parse_feed(text: &str) -> Result<Vec<CalendarOccurrence>, FeedError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayGroup {
    Past,
    Today,
    Tomorrow,
    Upcoming,
}

impl DayGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Past => "Past",
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::Upcoming => "Upcoming",
        }
    }
}

pub fn day_group(day: NaiveDate, today: NaiveDate) -> DayGroup {
    if day < today {
        DayGroup::Past
    } else if day == today {
        DayGroup::Today
    } else if today.succ_opt() == Some(day) {
        DayGroup::Tomorrow
    } else {
        DayGroup::Upcoming
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalendarGroups {
    pub past: Vec<Idea>,
    pub today: Vec<Idea>,
    pub tomorrow: Vec<Idea>,
    pub upcoming: Vec<Idea>,
}

impl CalendarGroups {
    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
            && self.today.is_empty()
            && self.tomorrow.is_empty()
            && self.upcoming.is_empty()
    }

    /// Non-empty groups in display order.
    pub fn sections(&self) -> Vec<(DayGroup, &[Idea])> {
        [
            (DayGroup::Past, self.past.as_slice()),
            (DayGroup::Today, self.today.as_slice()),
            (DayGroup::Tomorrow, self.tomorrow.as_slice()),
            (DayGroup::Upcoming, self.upcoming.as_slice()),
        ]
        .into_iter()
        .filter(|(_, ideas)| !ideas.is_empty())
        .collect()
    }
}

pub fn group_dated_ideas(ideas: &[Idea]) -> CalendarGroups {
    let now = Local::now();
    group_dated_ideas_in(ideas, now.date_naive(), &Local)
}

/// Groups ideas with a parseable date by calendar day in `tz`, each group
/// sorted by due time. Ideas without a date are left out.
pub fn group_dated_ideas_in<Tz: TimeZone>(
    ideas: &[Idea],
    today: NaiveDate,
    tz: &Tz,
) -> CalendarGroups {
    let mut dated: Vec<(DateTime<Utc>, &Idea)> = ideas
        .iter()
        .filter_map(|idea| {
            let raw = idea.date.as_deref()?;
            crate::ideas::parse_idea_date_in(raw, tz).map(|due| (due, idea))
        })
        .collect();
    dated.sort_by_key(|(due, _)| *due);

    let mut groups = CalendarGroups::default();
    for (due, idea) in dated {
        let day = due.with_timezone(tz).date_naive();
        let bucket = match day_group(day, today) {
            DayGroup::Past => &mut groups.past,
            DayGroup::Today => &mut groups.today,
            DayGroup::Tomorrow => &mut groups.tomorrow,
            DayGroup::Upcoming => &mut groups.upcoming,
        };
        bucket.push(idea.clone());
    }
    groups
}
