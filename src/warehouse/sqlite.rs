//! [`Warehouse`] over a SQLite replica of the warehouse tables.
//!
//! Expected tables: `sms_history`, `account`, `member_block_touchpoint_history`,
//! `member_block`, `cases` and `touchpoint_history_best_result`. Timestamps are
//! UTC text (`YYYY-MM-DD HH:MM:SS`), flags are integers.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params_from_iter};
use tracing::debug;

use super::{BacklogRecord, HistoryRecord, SubcodeRecord, Warehouse};
use crate::consts::WRONG_LANGUAGE_CODE;

const BACKLOG_SQL: &str = "
    SELECT
        tph.id,
        c.id,
        c.mobile,
        sms.member_id,
        sms.client_code,
        sms.program_code,
        tph.touchpoint_name,
        mb.name,
        sms.body,
        sms.outbound_body,
        sms.content_code,
        sms.language,
        sms.language_written,
        sms.created_dt,
        sms.acknowledged,
        ac.firstname,
        ac.lastname,
        trim(coalesce(ac.billingstreet, '') || ' ' || coalesce(ac.billing_address_2, '') || ' ' ||
             coalesce(ac.billingcity, '') || ' ' || coalesce(ac.billingstate, '') || ' ' ||
             coalesce(ac.billingpostalcode, '')),
        ac.county,
        ac.personbirthdate,
        ac.member_id,
        coalesce(ac.cs_sex, ac.sex),
        coalesce(ac.cs_gender, ac.gender),
        ac.primary_do_not_contact,
        ac.primary_do_not_text
    FROM sms_history sms
    INNER JOIN account ac
        ON sms.member_id = ac.id
    LEFT JOIN member_block_touchpoint_history tph
        ON sms.salesforce_history_id = tph.ssh_internal_object_link_id
    LEFT JOIN member_block mb
        ON tph.member_block = mb.id
    LEFT JOIN cases c
        ON tph.id = c.touchpoint_history_id
    WHERE sms.execution = 'incoming'
      AND c.id IS NOT NULL
      AND c.status = 'New'
      AND ac.test_account = 0
      AND sms.created_dt > ?1
    ORDER BY sms.created_dt ASC";

const SUBCODE_SQL: &str = "
    SELECT outcome_code, outcome_subcode, COUNT(*) AS n
    FROM member_block_touchpoint_history
    WHERE modality = 'SMS'
      AND outcome_code NOT LIKE 'Outbound Call%'
      AND outcome_code != ?1
    GROUP BY 1, 2
    ORDER BY 3 DESC, 1, 2";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read-only connection to a warehouse replica. Open one per refresh.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open warehouse at {path}"))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection (tests build fixtures in memory).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Warehouse for SqliteWarehouse {
    fn fetch_backlog(&self, since: DateTime<Utc>) -> Result<Vec<BacklogRecord>> {
        let since = since.format("%Y-%m-%d").to_string();
        debug!(%since, "running backlog query");
        let mut stmt = self.conn.prepare(BACKLOG_SQL)?;
        let rows = stmt
            .query_map([&since], backlog_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_history(&self, account_ids: &[String]) -> Result<Vec<HistoryRecord>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; account_ids.len()].join(", ");
        let sql = format!(
            "SELECT tph.touchpoint_history_id, tph.account_casesafe_id, tph.touchpoint_name,
                    mb.name, tph.message, tph.touchpoint_datetime, tph.modality,
                    tph.touchpoint_type, tph.outcome_code, tph.outcome_subcode
             FROM touchpoint_history_best_result tph
             INNER JOIN member_block mb
                 ON tph.member_block = mb.id
             WHERE tph.account_casesafe_id IN ({placeholders})
               AND tph.error = 0
             ORDER BY tph.account_casesafe_id, tph.touchpoint_datetime"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(account_ids.iter()), |row| {
                let at: Option<String> = row.get(5)?;
                Ok(HistoryRecord {
                    touchpoint_history_id: row.get(0)?,
                    account_id: row.get(1)?,
                    touchpoint_name: row.get(2)?,
                    block_name: row.get(3)?,
                    message: row.get(4)?,
                    at: at.as_deref().and_then(parse_timestamp),
                    modality: row.get(6)?,
                    touchpoint_type: row.get(7)?,
                    outcome_code: row.get(8)?,
                    outcome_subcode: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_subcodes(&self) -> Result<Vec<SubcodeRecord>> {
        let mut stmt = self.conn.prepare(SUBCODE_SQL)?;
        let rows = stmt
            .query_map([WRONG_LANGUAGE_CODE], |row| {
                Ok(SubcodeRecord {
                    outcome_code: row.get(0)?,
                    outcome_subcode: row.get(1)?,
                    count: row.get::<_, i64>(2)?.max(0) as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn backlog_row(row: &Row<'_>) -> rusqlite::Result<BacklogRecord> {
    let created: String = row.get(13)?;
    let created = parse_timestamp(&created).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            13,
            rusqlite::types::Type::Text,
            format!("bad created_dt: {created}").into(),
        )
    })?;
    let dob: Option<String> = row.get(19)?;

    Ok(BacklogRecord {
        touchpoint_history_id: row.get(0)?,
        case_id: row.get(1)?,
        phone: row.get(2)?,
        account_id: row.get(3)?,
        client: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        program: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        touchpoint_name: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        block_name: row.get(7)?,
        body: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        message_sent: row.get(9)?,
        content_code: row.get(10)?,
        language: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        language_written: row.get(12)?,
        created,
        acknowledged: row.get::<_, Option<bool>>(14)?.unwrap_or(false),
        first_name: row.get(15)?,
        last_name: row.get(16)?,
        billing_address: row.get(17)?,
        county: row.get(18)?,
        dob: dob
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        member_id: row.get(20)?,
        sex: row.get(21)?,
        gender: row.get(22)?,
        do_not_contact: row.get::<_, Option<bool>>(23)?.unwrap_or(false),
        do_not_text: row.get::<_, Option<bool>>(24)?.unwrap_or(false),
        status: None,
        outcome_code: None,
        outcome_subcode: None,
        response_to_use: None,
    })
}

/// Accepts `YYYY-MM-DD HH:MM:SS` and RFC 3339.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|n| n.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}
