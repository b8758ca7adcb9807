//! Terminal output: banner, backlog table, record detail, history,
//! escalation dump and the session summary.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::consts::{
    AUTHOR, HISTORY_ROWS, HOMEPAGE, REPO, STATUS_CLOSED_NO_RESPONSE, STATUS_RESPONSE_SENT,
    format_number,
};
use crate::triage::{Action, Draft};
use crate::warehouse::{BacklogRecord, HistoryRecord};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub agent: &'a str,
    pub warehouse: &'a str,
    pub api: &'a str,
    pub log_file: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          S M S   Q U E U E            ║
   ║   two-way text triage for care teams  ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   agent     {}
   warehouse {}
   api       {}
   log       {}

   type /help for commands
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.agent,
        info.warehouse,
        info.api,
        info.log_file,
    );
}

/// Print how many records were handled, then say goodbye.
pub fn print_session_summary(backlog: &[BacklogRecord]) {
    let closed = count_status(backlog, STATUS_CLOSED_NO_RESPONSE);
    let sent = count_status(backlog, STATUS_RESPONSE_SENT);
    if closed + sent > 0 {
        println!(
            "session: {:>5} replied + {:>5} closed = {:>5} handled",
            format_number(sent),
            format_number(closed),
            format_number(sent + closed),
        );
    }
    println!("goodbye.");
}

fn count_status(backlog: &[BacklogRecord], status: &str) -> u64 {
    backlog
        .iter()
        .filter(|r| r.status.as_deref() == Some(status))
        .count() as u64
}

/// One line per visible record, oldest first.
pub fn backlog_table(records: &[&BacklogRecord]) -> String {
    if records.is_empty() {
        return "  no messages match the current filters\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>3}  {:<16}  {:<10}  {:<12}  {:<18}  {:<9}  {}",
        "#", "received", "client", "program", "touchpoint", "language", "status"
    );
    for (i, r) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}  {:<16}  {:<10}  {:<12}  {:<18}  {:<9}  {}",
            i + 1,
            r.created_local().format("%Y-%m-%d %H:%M"),
            clip(&r.client, 10),
            clip(&r.program, 12),
            clip(&r.touchpoint_name, 18),
            clip(&r.language, 9),
            r.status.as_deref().unwrap_or("-"),
        );
    }
    let open = records.iter().filter(|r| r.is_open()).count() as u64;
    let _ = writeln!(
        out,
        "\n  {} messages, {} awaiting a response",
        format_number(records.len() as u64),
        format_number(open)
    );
    out
}

/// The record on screen, as the agent reads it before deciding.
pub fn record_detail(record: &BacklogRecord, today: NaiveDate) -> String {
    let age = record
        .age_on(today)
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let mut out = String::new();
    let _ = writeln!(out, "  member    {}", record.member_name());
    let _ = writeln!(out, "  member id {}", record.member_id.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  age       {age}");
    let _ = writeln!(out, "  language  {}", record.language);
    let _ = writeln!(
        out,
        "  received  {} ({})",
        record.created.format("%Y-%m-%d %H:%M UTC"),
        record.created_local().format("%Y-%m-%d %H:%M %Z")
    );
    let _ = writeln!(out, "  client    {}", record.client);
    let _ = writeln!(out, "  program   {}", record.program);
    let _ = writeln!(out, "  block     {}", record.block_name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  touchpt   {}", record.touchpoint_name);
    if record.do_not_contact || record.do_not_text {
        let _ = writeln!(out, "  flags     do-not-contact={} do-not-text={}", record.do_not_contact, record.do_not_text);
    }
    let _ = writeln!(out, "\n  we sent:");
    let _ = writeln!(out, "    {}", record.message_sent.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "\n  they replied:");
    let _ = writeln!(out, "    {}", record.body);
    out
}

/// The member's earliest interactions, capped at [`HISTORY_ROWS`].
pub fn history_table(history: &[&HistoryRecord]) -> String {
    if history.is_empty() {
        return "  no prior interactions\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "  {:<16}  {:<10}  {}", "when", "type", "message");
    for h in history.iter().take(HISTORY_ROWS) {
        let when = h
            .at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let kind = h
            .touchpoint_type
            .as_deref()
            .or(h.modality.as_deref())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:<16}  {:<10}  {}",
            when,
            clip(kind, 10),
            h.message.as_deref().unwrap_or("")
        );
    }
    if history.len() > HISTORY_ROWS {
        let _ = writeln!(out, "  ... {} more", history.len() - HISTORY_ROWS);
    }
    out
}

/// Every field a supervisor needs to pick up the case, one per line.
pub fn escalation(record: &BacklogRecord) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let fields: Vec<(&str, String)> = vec![
        ("touchpoint_history_id", record.touchpoint_history_id.clone()),
        ("case_id", record.case_id.clone()),
        ("account_id", record.account_id.clone()),
        ("member_id", opt(&record.member_id)),
        ("first_name", opt(&record.first_name)),
        ("last_name", opt(&record.last_name)),
        ("dob", record.dob.map(|d| d.to_string()).unwrap_or_default()),
        ("sex", opt(&record.sex)),
        ("gender", opt(&record.gender)),
        ("phone", opt(&record.phone)),
        ("billing_address", record.billing_address.clone()),
        ("county", opt(&record.county)),
        ("client", record.client.clone()),
        ("program", record.program.clone()),
        ("block", opt(&record.block_name)),
        ("touchpoint", record.touchpoint_name.clone()),
        ("content_code", opt(&record.content_code)),
        ("language", record.language.clone()),
        ("language_written", opt(&record.language_written)),
        ("created_utc", record.created.to_rfc3339()),
        ("message_sent", opt(&record.message_sent)),
        ("body", record.body.clone()),
        ("do_not_contact", record.do_not_contact.to_string()),
        ("do_not_text", record.do_not_text.to_string()),
    ];
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (k, v) in &fields {
        let _ = writeln!(out, "  {k:<width$}  {v}");
    }
    out
}

/// A 1-based numbered list.
pub fn numbered<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {:>3}. {}", i + 1, item.as_ref());
    }
    out
}

/// Where the draft stands and what is still missing.
pub fn draft_summary(draft: &Draft) -> String {
    let action = match draft.action {
        None => "-",
        Some(Action::NoResponse) => "close without responding",
        Some(Action::Respond) => "respond",
    };
    let mut out = String::new();
    let _ = writeln!(out, "  action    {action}");
    if let Some(msg) = &draft.do_not_contact {
        let _ = writeln!(out, "  DO NOT CONTACT: {msg}");
    }
    if let Some(t) = draft.selected_template() {
        let edited = if draft.is_edited() { " (edited)" } else { "" };
        let _ = writeln!(out, "  template  {} / {}{edited}", t.subject, t.message.name);
    }
    if let Some(text) = &draft.response_text {
        let _ = writeln!(out, "  reply     {text}");
    }
    let _ = writeln!(out, "  outcome   {}", draft.outcome_code.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "  subcode   {}", draft.outcome_subcode.as_deref().unwrap_or("-"));
    if let Some(lang) = &draft.language_update {
        let _ = writeln!(out, "  language  {lang}");
    }
    if let Some(n) = &draft.other_notes {
        let _ = writeln!(out, "  other     {n}");
    }
    if let Some(n) = &draft.positive_notes {
        let _ = writeln!(out, "  positive  {n}");
    }
    out
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
