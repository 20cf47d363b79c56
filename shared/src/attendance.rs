use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{csv::parse_csv_line, GithubHandle};

const NAIVE_DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("expected at least 3 columns, found {0}")]
    InsufficientColumns(usize),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// One validated row of the attendance sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub username: GithubHandle,
    pub date: NaiveDate,
    pub event_name: String,
}

impl AttendanceRecord {
    /// Columns are positional: username, date, event name. Extra columns are ignored.
    pub fn parse_row(fields: &[String]) -> Result<Self, RowError> {
        let [username, date, event_name, ..] = fields else {
            return Err(RowError::InsufficientColumns(fields.len()));
        };
        let (username, date, event_name) = (username.trim(), date.trim(), event_name.trim());

        if username.is_empty() {
            return Err(RowError::MissingField("username"));
        }
        if date.is_empty() {
            return Err(RowError::MissingField("date"));
        }
        if event_name.is_empty() {
            return Err(RowError::MissingField("event name"));
        }

        let date = parse_calendar_date(date).ok_or_else(|| RowError::InvalidDate(date.to_string()))?;

        Ok(Self {
            username: username.to_string(),
            date,
            event_name: event_name.to_string(),
        })
    }
}

/// Accepts the date shapes that show up in exported sheets.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.date_naive());
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.date_naive());
    }
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            NAIVE_DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub username: GithubHandle,
    pub events: Vec<String>,
}

/// Distinct events attended per user, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceMap {
    attendees: Vec<Attendee>,
    index: HashMap<GithubHandle, usize>,
}

impl AttendanceMap {
    /// Builds the map from a full CSV document.
    ///
    /// The first line is always treated as a header. Invalid rows are logged
    /// and skipped; this never fails.
    pub fn from_csv(text: &str) -> Self {
        let mut map = Self::default();
        if text.trim().is_empty() {
            warn!("Attendance CSV is empty");
            return map;
        }

        for (number, line) in text.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields = parse_csv_line(line);
            match AttendanceRecord::parse_row(&fields) {
                Ok(record) => map.insert(record),
                Err(e) => warn!("Skipping attendance line {}: {e}: {line}", number + 1),
            }
        }

        debug!("Parsed attendance data for {} users", map.len());
        map
    }

    fn insert(&mut self, record: AttendanceRecord) {
        let position = *self.index.entry(record.username.clone()).or_insert_with(|| {
            self.attendees.push(Attendee {
                username: record.username,
                events: Vec::new(),
            });
            self.attendees.len() - 1
        });

        let events = &mut self.attendees[position].events;
        if !events.contains(&record.event_name) {
            events.push(record.event_name);
        }
    }

    pub fn events_for(&self, username: &str) -> &[String] {
        self.index
            .get(username)
            .map(|&position| self.attendees[position].events.as_slice())
            .unwrap_or_default()
    }

    pub fn events_attended(&self, username: &str) -> u32 {
        self.events_for(username).len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attendee> {
        self.attendees.iter()
    }

    pub fn len(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attendees.is_empty()
    }
}

impl FromIterator<AttendanceRecord> for AttendanceMap {
    fn from_iter<I: IntoIterator<Item = AttendanceRecord>>(iter: I) -> Self {
        let mut map = Self::default();
        for record in iter {
            map.insert(record);
        }
        map
    }
}
