//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Backlog window when none is configured.
pub const DEFAULT_BACKLOG_DAYS: i64 = 14;

/// Outcome code that may close a case without a subcode.
pub const WRONG_NUMBER_CODE: &str = "Inbound SMS - Wrong Number";

/// Outcome code excluded from the subcode reference.
pub const WRONG_LANGUAGE_CODE: &str = "Inbound SMS - Wrong Language";

/// Subcode that enables the language correction list.
pub const WRONG_LANGUAGE_SUBCODE: &str = "Wrong Language";

/// Local status written when a case is closed without a reply.
pub const STATUS_CLOSED_NO_RESPONSE: &str = "Closed No Response";

/// Local status written when a reply went out.
pub const STATUS_RESPONSE_SENT: &str = "Response Sent";

/// Response column text for cases closed without a reply.
pub const NO_TEXT_SENT: &str = "Case closed, no text sent";

/// Number of history rows shown next to a record.
pub const HISTORY_ROWS: usize = 10;

pub const TEMPLATED_RESPONSES_PATH: &str = "/sender/sms_templated_responses";
pub const CLOSE_CASE_PATH: &str = "/sender/close_incoming_sms_case";

/// Warehouse language codes and their display names.
pub const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("en-US", "English"),
    ("ar-001", "Arabic"),
    ("es-419", "Spanish"),
];

/// Default local state database: `~/.smsq/smsq.db`.
/// Holds the signed-in agent identity.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".smsq")
        .join("smsq.db")
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
