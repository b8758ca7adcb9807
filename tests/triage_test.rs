mod common;

use chrono::{Duration, Utc};

use sms_queue::consts::{STATUS_RESPONSE_SENT, WRONG_LANGUAGE_SUBCODE, WRONG_NUMBER_CODE};
use sms_queue::outbound::{ListOutcome, Subject, TemplateMessage};
use sms_queue::triage::{Action, Phase, Rejection, Workflow, check_outcome};

use common::message;

fn backlog(statuses: &[Option<&str>]) -> Vec<sms_queue::warehouse::BacklogRecord> {
    let at = Utc::now() - Duration::hours(1);
    statuses
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut r = message(&i.to_string(), "ACME", "Diabetes", at);
            r.status = s.map(str::to_string);
            r
        })
        .collect()
}

fn one_template() -> ListOutcome {
    ListOutcome::Templates(vec![Subject {
        name: "Scheduling".into(),
        messages: vec![TemplateMessage {
            id: serde_json::json!(12),
            touchpoint_code: None,
            name: "Confirm".into(),
            message_source: "Confirmed!".into(),
        }],
    }])
}

#[test]
fn advancing_skips_records_already_handled() {
    let b = backlog(&[None, Some(STATUS_RESPONSE_SENT), None]);
    let view = vec![0, 1, 2];
    let mut wf = Workflow::new();
    assert_eq!(wf.start(&b, &view), Phase::Showing);
    assert_eq!(wf.current_index(&view), Some(0));
    assert_eq!(wf.advance(&b, &view), Phase::Showing);
    assert_eq!(wf.current_index(&view), Some(2));
    assert_eq!(wf.advance(&b, &view), Phase::AllDone);
    assert_eq!(wf.current_index(&view), None);
}

#[test]
fn cursor_only_moves_forward() {
    let b = backlog(&[None, None, None, None]);
    let view = vec![0, 1, 2, 3];
    let mut wf = Workflow::new();
    wf.start(&b, &view);
    let mut seen = vec![wf.cursor()];
    while wf.advance(&b, &view) == Phase::Showing {
        assert!(wf.cursor() > *seen.last().unwrap());
        seen.push(wf.cursor());
    }
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[test]
fn empty_view_is_all_done() {
    let mut wf = Workflow::new();
    assert_eq!(wf.start(&[], &[]), Phase::AllDone);
    assert_eq!(wf.choose(Action::NoResponse), Err(Rejection::AllDone));
}

#[test]
fn subcode_is_optional_only_for_wrong_number() {
    assert_eq!(check_outcome(None, None), Err(Rejection::MissingOutcome));
    assert_eq!(
        check_outcome(Some("Inbound SMS"), None),
        Err(Rejection::MissingSubcode)
    );
    assert!(check_outcome(Some("Inbound SMS"), Some("Question")).is_ok());
    assert!(check_outcome(Some(WRONG_NUMBER_CODE), None).is_ok());
}

#[test]
fn respond_path_needs_a_picked_template() {
    let b = backlog(&[None]);
    let view = vec![0];
    let mut wf = Workflow::new();
    wf.start(&b, &view);
    wf.choose(Action::Respond).unwrap();
    wf.set_outcome(WRONG_NUMBER_CODE).unwrap();
    assert_eq!(wf.can_close(), Err(Rejection::TemplatesNotLoaded));
    wf.load_templates(one_template()).unwrap();
    assert_eq!(wf.can_close(), Err(Rejection::NoResponseSelected));
    assert_eq!(wf.pick(2).unwrap_err(), Rejection::NoSuchTemplate(2));
    wf.pick(1).unwrap();
    assert!(wf.can_close().is_ok());

    let plan = wf.plan_close(&b[0], "agent@example.com").unwrap();
    let send = plan.send.unwrap();
    assert_eq!(send.id, "12");
    assert!(send.message_source.is_none());
    assert_eq!(plan.status, STATUS_RESPONSE_SENT);
    assert_eq!(plan.close.modified_by, "agent@example.com");
}

#[test]
fn language_correction_follows_the_subcode() {
    let b = backlog(&[None]);
    let view = vec![0];
    let mut wf = Workflow::new();
    wf.start(&b, &view);
    wf.set_outcome("Inbound SMS").unwrap();
    assert_eq!(
        wf.set_language("Spanish"),
        Err(Rejection::LanguageNotApplicable)
    );
    wf.set_subcode(Some(WRONG_LANGUAGE_SUBCODE)).unwrap();
    wf.set_language("Spanish").unwrap();
    assert_eq!(wf.draft().language_update.as_deref(), Some("Spanish"));

    wf.set_subcode(Some("Question")).unwrap();
    assert!(wf.draft().language_update.is_none());
}

#[test]
fn switching_outcome_clears_subcode() {
    let b = backlog(&[None]);
    let view = vec![0];
    let mut wf = Workflow::new();
    wf.start(&b, &view);
    wf.set_outcome("Inbound SMS").unwrap();
    wf.set_subcode(Some("Question")).unwrap();
    wf.set_outcome(WRONG_NUMBER_CODE).unwrap();
    assert!(wf.draft().outcome_subcode.is_none());
}
