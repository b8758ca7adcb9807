#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use sms_queue::auth::Identity;
use sms_queue::config::Settings;
use sms_queue::session::Session;
use sms_queue::warehouse::{BacklogRecord, HistoryRecord, SubcodeRecord, Warehouse};

pub const AGENT: &str = "agent@example.com";

/// Answers every query with canned rows.
pub struct CannedWarehouse {
    pub backlog: Vec<BacklogRecord>,
    pub subcodes: Vec<SubcodeRecord>,
}

impl Warehouse for CannedWarehouse {
    fn fetch_backlog(&self, since: DateTime<Utc>) -> Result<Vec<BacklogRecord>> {
        Ok(self
            .backlog
            .iter()
            .filter(|r| r.created > since)
            .cloned()
            .collect())
    }

    fn fetch_history(&self, _account_ids: &[String]) -> Result<Vec<HistoryRecord>> {
        Ok(Vec::new())
    }

    fn fetch_subcodes(&self) -> Result<Vec<SubcodeRecord>> {
        Ok(self.subcodes.clone())
    }
}

/// Every query fails.
pub struct DownWarehouse;

impl Warehouse for DownWarehouse {
    fn fetch_backlog(&self, _since: DateTime<Utc>) -> Result<Vec<BacklogRecord>> {
        anyhow::bail!("warehouse unreachable")
    }

    fn fetch_history(&self, _account_ids: &[String]) -> Result<Vec<HistoryRecord>> {
        anyhow::bail!("warehouse unreachable")
    }

    fn fetch_subcodes(&self) -> Result<Vec<SubcodeRecord>> {
        anyhow::bail!("warehouse unreachable")
    }
}

pub fn subcode(code: &str, sub: Option<&str>, count: u64) -> SubcodeRecord {
    SubcodeRecord {
        outcome_code: code.to_string(),
        outcome_subcode: sub.map(str::to_string),
        count,
    }
}

pub fn message(id: &str, client: &str, program: &str, created: DateTime<Utc>) -> BacklogRecord {
    BacklogRecord {
        touchpoint_history_id: id.to_string(),
        case_id: format!("case-{id}"),
        account_id: format!("acct-{id}"),
        phone: Some("5550100".to_string()),
        client: client.to_string(),
        program: program.to_string(),
        touchpoint_name: "Welcome".to_string(),
        block_name: Some("Onboarding".to_string()),
        body: "can I reschedule?".to_string(),
        message_sent: Some("Your visit is Monday".to_string()),
        content_code: None,
        language: "en-US".to_string(),
        language_written: None,
        created,
        acknowledged: false,
        first_name: Some("Grace".to_string()),
        last_name: Some("Hopper".to_string()),
        member_id: Some("M-1".to_string()),
        dob: NaiveDate::from_ymd_opt(1975, 12, 9),
        sex: None,
        gender: None,
        billing_address: String::new(),
        county: None,
        do_not_contact: false,
        do_not_text: false,
        status: None,
        outcome_code: None,
        outcome_subcode: None,
        response_to_use: None,
    }
}

/// A signed-in session with its settings pointing inside `dir`.
pub fn session(dir: &tempfile::TempDir) -> Session {
    let languages = dir.path().join("languages.csv");
    std::fs::write(&languages, "Lang\nEnglish\nSpanish\nArabic\n").unwrap();
    let mut settings = Settings::default();
    settings.reference.languages = languages.to_string_lossy().into_owned();
    settings.authorization.allowed_users = vec![AGENT.to_string()];
    settings.state.db = dir.path().join("state.db").to_string_lossy().into_owned();
    Session::new(
        settings,
        Some(Identity {
            email: AGENT.to_string(),
            id_token: "tok".to_string(),
            expires: u64::MAX,
        }),
    )
}
