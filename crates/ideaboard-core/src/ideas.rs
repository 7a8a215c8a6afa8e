use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Ideas in this category are the ones a share export carries.
pub const SHARED_CATEGORY: &str = "Grupales";
pub const DEFAULT_CATEGORY: &str = "General";
pub const NOTIFY_ON: &str = "true";

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    #[default]
    Progress,
    Paused,
}

impl IdeaStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Progress => Self::Paused,
            Self::Paused => Self::Progress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Paused => "paused",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Unknown values fall back to the default theme.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: IdeaStatus,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notify: Option<String>,
    pub created_at: String,
}

impl Idea {
    pub fn is_shared(&self) -> bool {
        self.category == SHARED_CATEGORY
    }

    pub fn wants_notification(&self) -> bool {
        self.notify.as_deref() == Some(NOTIFY_ON)
    }

    /// The scheduled time, if the idea has a non-empty, parseable date.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_idea_date)
    }
}

/// Parses an idea date: RFC 3339, or a naive `datetime-local` value read in
/// the local time zone.
pub fn parse_idea_date(raw: &str) -> Option<DateTime<Utc>> {
    parse_idea_date_in(raw, &Local)
}

pub fn parse_idea_date_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_DATE_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

/// Label shown next to a scheduled time, in local time.
pub fn format_local_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}
