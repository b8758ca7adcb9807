//! Backlog filters and the view they produce.
//!
//! The view is a list of indices into the snapshot backlog, in backlog order.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};

use crate::warehouse::BacklogRecord;

/// A single filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(v) => v == value,
        }
    }

    /// `"all"` (any case) selects everything.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("all") {
            Selection::All
        } else {
            Selection::Only(input.to_string())
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("All"),
            Selection::Only(v) => f.write_str(v),
        }
    }
}

/// How far back the view reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    LastDay,
    LastWeek,
    LastTwoWeeks,
}

impl DateRange {
    pub const ALL: [DateRange; 3] = [
        DateRange::LastDay,
        DateRange::LastWeek,
        DateRange::LastTwoWeeks,
    ];

    fn span(self) -> Duration {
        match self {
            DateRange::LastDay => Duration::days(1),
            DateRange::LastWeek => Duration::weeks(1),
            DateRange::LastTwoWeeks => Duration::weeks(2),
        }
    }

    /// Midnight UTC of the day `span` before `now`.
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        (now - self.span())
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|n| n.and_utc())
            .unwrap_or(now)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateRange::LastDay => "Last Day",
            DateRange::LastWeek => "Last Week",
            DateRange::LastTwoWeeks => "Last Two Weeks",
        })
    }
}

impl FromStr for DateRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "day" | "lastday" | "1d" => Ok(DateRange::LastDay),
            "week" | "lastweek" | "1w" | "7d" => Ok(DateRange::LastWeek),
            "twoweeks" | "lasttwoweeks" | "2w" | "14d" => Ok(DateRange::LastTwoWeeks),
            _ => bail!("unknown date range: {s} (use day, week or twoweeks)"),
        }
    }
}

/// Which filter a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Client,
    Program,
    Touchpoint,
    Language,
    Dates,
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" => Ok(Field::Client),
            "program" => Ok(Field::Program),
            "touchpoint" | "tp" => Ok(Field::Touchpoint),
            "language" | "lang" => Ok(Field::Language),
            "dates" | "date" => Ok(Field::Dates),
            _ => bail!("unknown filter: {s} (client, program, touchpoint, language, dates)"),
        }
    }
}

/// Current filter selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub client: Selection,
    pub program: Selection,
    pub touchpoint: Selection,
    pub language: Selection,
    pub dates: DateRange,
}

impl FilterState {
    /// Whether `record` satisfies every active predicate.
    pub fn admits(&self, record: &BacklogRecord, cutoff: DateTime<Utc>) -> bool {
        self.client.matches(&record.client)
            && self.program.matches(&record.program)
            && self.touchpoint.matches(&record.touchpoint_name)
            && self.language.matches(&record.language)
            && record.created >= cutoff
    }

    /// Indices of admitted records, in backlog order.
    pub fn apply(&self, backlog: &[BacklogRecord], now: DateTime<Utc>) -> Vec<usize> {
        let cutoff = self.dates.cutoff(now);
        backlog
            .iter()
            .enumerate()
            .filter(|(_, r)| self.admits(r, cutoff))
            .map(|(i, _)| i)
            .collect()
    }

    /// Change one filter. Returns whether anything actually changed.
    /// A new client clears program and touchpoint; a new program clears
    /// touchpoint.
    pub fn set(&mut self, field: Field, value: &str) -> anyhow::Result<bool> {
        let before = self.clone();
        match field {
            Field::Client => {
                self.client = Selection::parse(value);
                if self.client != before.client {
                    self.program = Selection::All;
                    self.touchpoint = Selection::All;
                }
            }
            Field::Program => {
                self.program = Selection::parse(value);
                if self.program != before.program {
                    self.touchpoint = Selection::All;
                }
            }
            Field::Touchpoint => self.touchpoint = Selection::parse(value),
            Field::Language => self.language = Selection::parse(value),
            Field::Dates => self.dates = value.parse()?,
        }
        Ok(*self != before)
    }

    /// Program choices under the selected client.
    pub fn program_options<'a>(&self, backlog: &'a [BacklogRecord]) -> Vec<&'a str> {
        distinct(
            backlog
                .iter()
                .filter(|r| self.client.matches(&r.client))
                .map(|r| r.program.as_str()),
        )
    }

    /// Touchpoint choices under the selected client and program.
    pub fn touchpoint_options<'a>(&self, backlog: &'a [BacklogRecord]) -> Vec<&'a str> {
        distinct(
            backlog
                .iter()
                .filter(|r| self.client.matches(&r.client) && self.program.matches(&r.program))
                .map(|r| r.touchpoint_name.as_str()),
        )
    }
}

pub fn client_options(backlog: &[BacklogRecord]) -> Vec<&str> {
    distinct(backlog.iter().map(|r| r.client.as_str()))
}

pub fn language_options(backlog: &[BacklogRecord]) -> Vec<&str> {
    distinct(backlog.iter().map(|r| r.language.as_str()))
}

/// First-seen order, duplicates dropped.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}
