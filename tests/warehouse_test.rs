use chrono::{TimeZone, Utc};
use rusqlite::Connection;

use sms_queue::warehouse::sqlite::SqliteWarehouse;
use sms_queue::warehouse::{Snapshot, Warehouse};

const SCHEMA: &str = "
    CREATE TABLE account (
        id TEXT PRIMARY KEY, firstname TEXT, lastname TEXT,
        billingstreet TEXT, billing_address_2 TEXT, billingcity TEXT,
        billingstate TEXT, billingpostalcode TEXT, county TEXT,
        personbirthdate TEXT, member_id TEXT, sex TEXT, cs_sex TEXT,
        gender TEXT, cs_gender TEXT, primary_do_not_contact INTEGER,
        primary_do_not_text INTEGER, test_account INTEGER
    );
    CREATE TABLE sms_history (
        id INTEGER PRIMARY KEY, member_id TEXT, client_code TEXT, program_code TEXT,
        body TEXT, outbound_body TEXT, content_code TEXT, language TEXT,
        language_written TEXT, created_dt TEXT, acknowledged INTEGER,
        execution TEXT, salesforce_history_id TEXT
    );
    CREATE TABLE member_block (id TEXT PRIMARY KEY, name TEXT);
    CREATE TABLE member_block_touchpoint_history (
        id TEXT PRIMARY KEY, ssh_internal_object_link_id TEXT, touchpoint_name TEXT,
        member_block TEXT, modality TEXT, outcome_code TEXT, outcome_subcode TEXT
    );
    CREATE TABLE cases (
        id TEXT PRIMARY KEY, touchpoint_history_id TEXT, mobile TEXT, status TEXT
    );
    CREATE TABLE touchpoint_history_best_result (
        touchpoint_history_id TEXT, account_casesafe_id TEXT, touchpoint_name TEXT,
        member_block TEXT, message TEXT, touchpoint_datetime TEXT, modality TEXT,
        touchpoint_type TEXT, outcome_code TEXT, outcome_subcode TEXT, error INTEGER
    );
";

/// One inbound message on an open case.
fn insert_message(conn: &Connection, n: u32, account: &str, created: &str, execution: &str, case_status: &str) {
    let link = format!("link-{n}");
    let tph = format!("tph-{n}");
    conn.execute(
        "INSERT INTO sms_history (member_id, client_code, program_code, body, outbound_body,
             language, created_dt, acknowledged, execution, salesforce_history_id)
         VALUES (?1, 'ACME', 'Diabetes', 'yes please', 'Want a reminder?', 'es-419', ?2, 0, ?3, ?4)",
        rusqlite::params![account, created, execution, link],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO member_block_touchpoint_history (id, ssh_internal_object_link_id, touchpoint_name, member_block)
         VALUES (?1, ?2, 'Welcome', 'mb-1')",
        rusqlite::params![tph, link],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO cases (id, touchpoint_history_id, mobile, status) VALUES (?1, ?2, '5550100', ?3)",
        rusqlite::params![format!("case-{n}"), tph, case_status],
    )
    .unwrap();
}

fn fixture() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(
        "INSERT INTO member_block VALUES ('mb-1', 'Onboarding');
         INSERT INTO account VALUES ('acct-a', 'Ada', 'Lovelace', '1 Main St', NULL, 'Springfield', 'IL', '62701',
             'Sangamon', '1980-06-15', 'M-1', 'F', NULL, NULL, 'Woman', 0, 0, 0);
         INSERT INTO account VALUES ('acct-b', 'Bob', NULL, NULL, NULL, NULL, NULL, NULL,
             NULL, NULL, 'M-2', 'M', 'X', NULL, NULL, 1, 0, 0);
         INSERT INTO account VALUES ('acct-test', 'Test', 'Account', NULL, NULL, NULL, NULL, NULL,
             NULL, NULL, 'M-9', NULL, NULL, NULL, NULL, 0, 0, 1);",
    )
    .unwrap();

    insert_message(&conn, 1, "acct-b", "2024-03-01 10:00:00", "incoming", "New");
    insert_message(&conn, 2, "acct-a", "2024-02-29 09:00:00", "incoming", "New");
    // excluded: closed case, outbound, test account, too old
    insert_message(&conn, 3, "acct-a", "2024-03-01 11:00:00", "incoming", "Closed");
    insert_message(&conn, 4, "acct-a", "2024-03-01 12:00:00", "outgoing", "New");
    insert_message(&conn, 5, "acct-test", "2024-03-01 13:00:00", "incoming", "New");
    insert_message(&conn, 6, "acct-a", "2024-01-01 13:00:00", "incoming", "New");

    conn.execute_batch(
        "INSERT INTO touchpoint_history_best_result VALUES
            ('h1', 'acct-a', 'Welcome', 'mb-1', 'Hi Ada', '2024-02-01 09:00:00', 'SMS', 'Outbound', NULL, NULL, 0),
            ('h2', 'acct-a', 'Welcome', 'mb-1', 'oops', '2024-02-02 09:00:00', 'SMS', 'Outbound', NULL, NULL, 1),
            ('h3', 'acct-b', 'Welcome', 'mb-1', 'Hi Bob', '2024-01-15 09:00:00', 'Call', 'Outbound', NULL, NULL, 0),
            ('h0', 'acct-a', 'Welcome', 'mb-1', 'First', '2024-01-01 09:00:00', 'SMS', 'Outbound', NULL, NULL, 0),
            ('h4', 'acct-z', 'Welcome', 'mb-1', 'Other', '2024-01-01 09:00:00', 'SMS', 'Outbound', NULL, NULL, 0);

         INSERT INTO member_block_touchpoint_history (id, modality, outcome_code, outcome_subcode) VALUES
            ('s1', 'SMS', 'Inbound SMS', 'Question'),
            ('s2', 'SMS', 'Inbound SMS', 'Question'),
            ('s3', 'SMS', 'Inbound SMS', 'Appointment'),
            ('s4', 'SMS', 'Inbound SMS - Wrong Number', NULL),
            ('s5', 'SMS', 'Inbound SMS - Wrong Language', 'Spanish'),
            ('s6', 'SMS', 'Outbound Call - Reached', 'Spoke'),
            ('s7', 'Call', 'Inbound Call', 'Question');",
    )
    .unwrap();
    let path = path.to_string_lossy().into_owned();
    (dir, path)
}

fn since() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap()
}

#[test]
fn backlog_keeps_open_inbound_messages_oldest_first() {
    let (_dir, path) = fixture();
    let wh = SqliteWarehouse::open(&path).unwrap();
    let backlog = wh.fetch_backlog(since()).unwrap();
    let ids: Vec<&str> = backlog.iter().map(|r| r.touchpoint_history_id.as_str()).collect();
    assert_eq!(ids, vec!["tph-2", "tph-1"]);
}

#[test]
fn backlog_rows_are_fully_mapped() {
    let (_dir, path) = fixture();
    let wh = SqliteWarehouse::open(&path).unwrap();
    let backlog = wh.fetch_backlog(since()).unwrap();
    let ada = &backlog[0];
    assert_eq!(ada.case_id, "case-2");
    assert_eq!(ada.account_id, "acct-a");
    assert_eq!(ada.phone.as_deref(), Some("5550100"));
    assert_eq!(ada.block_name.as_deref(), Some("Onboarding"));
    assert_eq!(ada.message_sent.as_deref(), Some("Want a reminder?"));
    assert_eq!(ada.billing_address, "1 Main St  Springfield IL 62701");
    assert_eq!(ada.dob.map(|d| d.to_string()).as_deref(), Some("1980-06-15"));
    assert_eq!(ada.gender.as_deref(), Some("Woman"));
    assert_eq!(ada.created, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
    assert!(ada.status.is_none());

    let bob = &backlog[1];
    assert_eq!(bob.sex.as_deref(), Some("X"));
    assert!(bob.do_not_contact);
    assert_eq!(bob.billing_address, "");
    assert!(bob.dob.is_none());
}

#[test]
fn history_filters_errors_and_orders_by_member_then_time() {
    let (_dir, path) = fixture();
    let wh = SqliteWarehouse::open(&path).unwrap();
    let history = wh
        .fetch_history(&["acct-a".to_string(), "acct-b".to_string()])
        .unwrap();
    let ids: Vec<&str> = history
        .iter()
        .map(|h| h.touchpoint_history_id.as_str())
        .collect();
    assert_eq!(ids, vec!["h0", "h1", "h3"]);
}

#[test]
fn subcodes_exclude_calls_and_wrong_language() {
    let (_dir, path) = fixture();
    let wh = SqliteWarehouse::open(&path).unwrap();
    let subs = wh.fetch_subcodes().unwrap();
    assert_eq!(subs[0].outcome_code, "Inbound SMS");
    assert_eq!(subs[0].outcome_subcode.as_deref(), Some("Question"));
    assert_eq!(subs[0].count, 2);
    assert!(subs.iter().all(|s| !s.outcome_code.starts_with("Outbound Call")));
    assert!(subs.iter().all(|s| s.outcome_code != "Inbound SMS - Wrong Language"));
    assert!(subs.iter().all(|s| s.outcome_code != "Inbound Call"));
    assert_eq!(subs.len(), 3);
}

#[test]
fn snapshot_loads_everything_and_maps_languages() {
    let (_dir, path) = fixture();
    let wh = SqliteWarehouse::open(&path).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    let snap = Snapshot::load(&wh, vec!["English".into()], 14, now).unwrap();
    assert_eq!(snap.backlog.len(), 2);
    assert!(snap.backlog.iter().all(|r| r.language == "Spanish"));
    assert_eq!(snap.history_for("acct-a").count(), 2);
    assert_eq!(
        snap.outcome_codes(),
        vec!["Inbound SMS", "Inbound SMS - Wrong Number"]
    );
}

#[test]
fn opening_missing_replica_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");
    assert!(SqliteWarehouse::open(&path.to_string_lossy()).is_err());
}
