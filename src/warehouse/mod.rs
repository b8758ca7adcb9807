//! Read side: the backlog of inbound messages and its reference data.
//!
//! A [`Warehouse`] answers three queries. [`Snapshot::load`] runs all of them
//! once and holds the results for the rest of the session; nothing is written
//! back.

pub mod sqlite;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::reference;

/// One inbound message awaiting triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogRecord {
    pub touchpoint_history_id: String,
    pub case_id: String,
    pub account_id: String,
    pub phone: Option<String>,

    pub client: String,
    pub program: String,
    pub touchpoint_name: String,
    pub block_name: Option<String>,

    pub body: String,
    pub message_sent: Option<String>,
    pub content_code: Option<String>,
    pub language: String,
    pub language_written: Option<String>,
    pub created: DateTime<Utc>,
    pub acknowledged: bool,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub member_id: Option<String>,
    pub dob: Option<NaiveDate>,
    pub sex: Option<String>,
    pub gender: Option<String>,
    pub billing_address: String,
    pub county: Option<String>,
    pub do_not_contact: bool,
    pub do_not_text: bool,

    /// Set once the case is closed during this session.
    pub status: Option<String>,
    pub outcome_code: Option<String>,
    pub outcome_subcode: Option<String>,
    pub response_to_use: Option<String>,
}

impl BacklogRecord {
    pub fn created_local(&self) -> DateTime<Local> {
        self.created.with_timezone(&Local)
    }

    pub fn member_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }

    /// Age in whole years on `today`, or `None` without a birth date.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let dob = self.dob?;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        Some(age)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_none()
    }
}

/// One past interaction with a member, any modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub touchpoint_history_id: String,
    pub account_id: String,
    pub touchpoint_name: Option<String>,
    pub block_name: Option<String>,
    pub message: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub modality: Option<String>,
    pub touchpoint_type: Option<String>,
    pub outcome_code: Option<String>,
    pub outcome_subcode: Option<String>,
}

/// How often an outcome code/subcode pair has been used on SMS touchpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcodeRecord {
    pub outcome_code: String,
    pub outcome_subcode: Option<String>,
    pub count: u64,
}

/// The three read queries. Implementations are read-only.
pub trait Warehouse {
    /// Inbound messages created after `since` on an open case, oldest first.
    fn fetch_backlog(&self, since: DateTime<Utc>) -> Result<Vec<BacklogRecord>>;

    /// Non-error history for the given members, ordered by (member, time).
    fn fetch_history(&self, account_ids: &[String]) -> Result<Vec<HistoryRecord>>;

    /// SMS outcome pairs, most frequent first.
    fn fetch_subcodes(&self) -> Result<Vec<SubcodeRecord>>;
}

/// Everything the dashboard reads, cached for one session.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub backlog: Vec<BacklogRecord>,
    pub history: Vec<HistoryRecord>,
    pub subcodes: Vec<SubcodeRecord>,
    pub languages: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Run every query. Any failure aborts the whole load; there is no
    /// partial snapshot.
    pub fn load(
        warehouse: &dyn Warehouse,
        languages: Vec<String>,
        backlog_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let since = now - Duration::days(backlog_days);
        let mut backlog = warehouse
            .fetch_backlog(since)
            .context("backlog query failed")?;
        for record in &mut backlog {
            record.language = reference::language_name(&record.language).to_string();
        }

        let mut account_ids: Vec<String> = Vec::new();
        for record in &backlog {
            if !account_ids.contains(&record.account_id) {
                account_ids.push(record.account_id.clone());
            }
        }
        let history = warehouse
            .fetch_history(&account_ids)
            .context("history query failed")?;
        let subcodes = warehouse
            .fetch_subcodes()
            .context("subcode query failed")?;

        info!(
            backlog = backlog.len(),
            history = history.len(),
            subcodes = subcodes.len(),
            "warehouse snapshot loaded"
        );

        Ok(Self {
            backlog,
            history,
            subcodes,
            languages,
            loaded_at: now,
        })
    }

    /// History rows for one member in time order.
    pub fn history_for<'a>(&'a self, account_id: &'a str) -> impl Iterator<Item = &'a HistoryRecord> {
        self.history.iter().filter(move |h| h.account_id == account_id)
    }

    /// Distinct outcome codes, most frequent first.
    pub fn outcome_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for s in &self.subcodes {
            if !codes.contains(&s.outcome_code.as_str()) {
                codes.push(&s.outcome_code);
            }
        }
        codes
    }

    /// Distinct subcodes recorded for `code`, alphabetical.
    pub fn subcodes_for(&self, code: &str) -> Vec<&str> {
        let mut subs: Vec<&str> = self
            .subcodes
            .iter()
            .filter(|s| s.outcome_code == code)
            .filter_map(|s| s.outcome_subcode.as_deref())
            .collect();
        subs.sort_unstable();
        subs.dedup();
        subs
    }
}
