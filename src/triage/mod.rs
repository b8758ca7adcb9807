//! The per-record triage state machine.
//!
//! ```text
//! Idle -> Showing -> { ClosingNoResponse | ClosingWithResponse } -> (advance) -> Showing | AllDone
//! ```
//!
//! The workflow never talks to the network. It validates the agent's draft,
//! builds a [`ClosePlan`], and is told afterwards what happened so it can
//! annotate the record and move on. The cursor indexes the filtered view and
//! always rests on the first record whose status is unset.

use thiserror::Error;
use tracing::info;

use crate::consts::{
    NO_TEXT_SENT, STATUS_CLOSED_NO_RESPONSE, STATUS_RESPONSE_SENT, WRONG_LANGUAGE_SUBCODE,
    WRONG_NUMBER_CODE,
};
use crate::outbound::{
    AccountUpdate, CaseUpdate, CloseCaseRequest, ListOutcome, SendRequest, TemplateMessage,
};
use crate::warehouse::BacklogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoResponse,
    Respond,
}

impl std::str::FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "close" | "no-response" => Ok(Action::NoResponse),
            "respond" | "reply" => Ok(Action::Respond),
            _ => anyhow::bail!("unknown action: {s} (use none or respond)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Showing,
    ClosingNoResponse,
    ClosingWithResponse,
    AllDone,
}

impl Phase {
    fn on_record(self) -> bool {
        matches!(
            self,
            Phase::Showing | Phase::ClosingNoResponse | Phase::ClosingWithResponse
        )
    }
}

/// Why a triage step was refused. Shown to the agent as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("triage has not started; run /start")]
    NotStarted,
    #[error("you have responded to all the text messages")]
    AllDone,
    #[error("there is no record to close")]
    NothingToClose,
    #[error("choose what to do first: /action none | /action respond")]
    NoAction,
    #[error("this step only applies when responding")]
    NotResponding,
    #[error("member must not be contacted ({0}); close the case without responding")]
    DoNotContact(String),
    #[error("fetch the templated responses first (/templates)")]
    TemplatesNotLoaded,
    #[error("no templated response at position {0}")]
    NoSuchTemplate(usize),
    #[error("pick a response before sending (/pick)")]
    NoResponseSelected,
    #[error("select an outcome code")]
    MissingOutcome,
    #[error("please enter a subcode to close the case")]
    MissingSubcode,
    #[error("language can only be corrected with the `{}` subcode", WRONG_LANGUAGE_SUBCODE)]
    LanguageNotApplicable,
}

/// One offered reply, flattened out of its subject.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateChoice {
    pub subject: String,
    pub message: TemplateMessage,
}

/// Transient fields for the record on screen. Cleared on advance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub action: Option<Action>,
    /// `None` until `/templates` has run for this record.
    pub templates: Option<Vec<TemplateChoice>>,
    pub do_not_contact: Option<String>,
    pub selected: Option<usize>,
    pub response_text: Option<String>,
    pub outcome_code: Option<String>,
    pub outcome_subcode: Option<String>,
    pub language_update: Option<String>,
    pub other_notes: Option<String>,
    pub positive_notes: Option<String>,
}

impl Draft {
    pub fn selected_template(&self) -> Option<&TemplateChoice> {
        let i = self.selected?;
        self.templates.as_ref()?.get(i)
    }

    /// Whether the chosen text differs from the template source.
    pub fn is_edited(&self) -> bool {
        match (self.selected_template(), &self.response_text) {
            (Some(t), Some(text)) => *text != t.message.message_source,
            _ => false,
        }
    }
}

/// Everything needed to finish one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosePlan {
    pub touchpoint_history_id: String,
    pub send: Option<SendRequest>,
    pub close: CloseCaseRequest,
    pub status: &'static str,
    pub response_text: String,
}

#[derive(Debug, Clone)]
pub struct Workflow {
    phase: Phase,
    cursor: usize,
    draft: Draft,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            cursor: 0,
            draft: Draft::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Back to `Idle` at the top of the view. Used when filters change.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Begin at the first unhandled record.
    pub fn start(&mut self, backlog: &[BacklogRecord], view: &[usize]) -> Phase {
        self.draft = Draft::default();
        self.seek(backlog, view, 0)
    }

    /// Clear the draft and move past the current record.
    pub fn advance(&mut self, backlog: &[BacklogRecord], view: &[usize]) -> Phase {
        info!(from = self.cursor, "went to next sms");
        self.draft = Draft::default();
        self.seek(backlog, view, self.cursor + 1)
    }

    fn seek(&mut self, backlog: &[BacklogRecord], view: &[usize], from: usize) -> Phase {
        let next = view
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, i)| backlog.get(**i).is_some_and(BacklogRecord::is_open))
            .map(|(pos, _)| pos);
        match next {
            Some(pos) => {
                self.cursor = pos;
                self.phase = Phase::Showing;
            }
            None => {
                self.cursor = view.len();
                self.phase = Phase::AllDone;
            }
        }
        self.phase
    }

    /// Backlog index of the record on screen.
    pub fn current_index(&self, view: &[usize]) -> Option<usize> {
        if !self.phase.on_record() {
            return None;
        }
        view.get(self.cursor).copied()
    }

    pub fn current<'a>(&self, backlog: &'a [BacklogRecord], view: &[usize]) -> Option<&'a BacklogRecord> {
        self.current_index(view).and_then(|i| backlog.get(i))
    }

    fn require_record(&self) -> Result<(), Rejection> {
        match self.phase {
            Phase::Idle => Err(Rejection::NotStarted),
            Phase::AllDone => Err(Rejection::AllDone),
            _ => Ok(()),
        }
    }

    fn require_responding(&self) -> Result<(), Rejection> {
        self.require_record()?;
        if self.phase != Phase::ClosingWithResponse {
            return Err(Rejection::NotResponding);
        }
        Ok(())
    }

    /// Pick what to do with the record on screen.
    pub fn choose(&mut self, action: Action) -> Result<Phase, Rejection> {
        self.require_record()?;
        if action == Action::Respond
            && let Some(msg) = &self.draft.do_not_contact
        {
            return Err(Rejection::DoNotContact(msg.clone()));
        }
        if self.draft.action != Some(action) {
            self.draft.templates = None;
            self.draft.selected = None;
            self.draft.response_text = None;
        }
        self.draft.action = Some(action);
        self.phase = match action {
            Action::NoResponse => Phase::ClosingNoResponse,
            Action::Respond => Phase::ClosingWithResponse,
        };
        Ok(self.phase)
    }

    /// Take the result of a `list` call. A do-not-contact answer blocks the
    /// send path for this record and is returned as a rejection.
    pub fn load_templates(&mut self, outcome: ListOutcome) -> Result<&[TemplateChoice], Rejection> {
        self.require_responding()?;
        match outcome {
            ListOutcome::DoNotContact { message, .. } => {
                self.draft.do_not_contact = Some(message.clone());
                self.draft.templates = None;
                self.draft.selected = None;
                self.draft.response_text = None;
                Err(Rejection::DoNotContact(message))
            }
            ListOutcome::Templates(subjects) => {
                let choices = subjects
                    .into_iter()
                    .flat_map(|s| {
                        let subject = s.name;
                        s.messages.into_iter().map(move |message| TemplateChoice {
                            subject: subject.clone(),
                            message,
                        })
                    })
                    .collect();
                self.draft.selected = None;
                self.draft.response_text = None;
                Ok(self.draft.templates.insert(choices).as_slice())
            }
        }
    }

    /// Select a template by 1-based position.
    pub fn pick(&mut self, position: usize) -> Result<&TemplateChoice, Rejection> {
        self.require_responding()?;
        if let Some(msg) = &self.draft.do_not_contact {
            return Err(Rejection::DoNotContact(msg.clone()));
        }
        let templates = self
            .draft
            .templates
            .as_ref()
            .ok_or(Rejection::TemplatesNotLoaded)?;
        let index = position
            .checked_sub(1)
            .filter(|i| *i < templates.len())
            .ok_or(Rejection::NoSuchTemplate(position))?;
        self.draft.selected = Some(index);
        self.draft.response_text = Some(templates[index].message.message_source.clone());
        Ok(&templates[index])
    }

    /// Replace the text of the selected template.
    pub fn edit(&mut self, text: &str) -> Result<(), Rejection> {
        self.require_responding()?;
        if self.draft.selected.is_none() {
            return Err(Rejection::NoResponseSelected);
        }
        self.draft.response_text = Some(text.to_string());
        Ok(())
    }

    pub fn set_outcome(&mut self, code: &str) -> Result<(), Rejection> {
        self.require_record()?;
        if self.draft.outcome_code.as_deref() != Some(code) {
            self.draft.outcome_subcode = None;
            self.draft.language_update = None;
        }
        self.draft.outcome_code = Some(code.to_string());
        Ok(())
    }

    pub fn set_subcode(&mut self, subcode: Option<&str>) -> Result<(), Rejection> {
        self.require_record()?;
        if subcode != Some(WRONG_LANGUAGE_SUBCODE) {
            self.draft.language_update = None;
        }
        self.draft.outcome_subcode = subcode.map(str::to_string);
        Ok(())
    }

    pub fn set_language(&mut self, language: &str) -> Result<(), Rejection> {
        self.require_record()?;
        if self.draft.outcome_subcode.as_deref() != Some(WRONG_LANGUAGE_SUBCODE) {
            return Err(Rejection::LanguageNotApplicable);
        }
        self.draft.language_update = Some(language.to_string());
        Ok(())
    }

    pub fn set_other_notes(&mut self, notes: &str) -> Result<(), Rejection> {
        self.require_record()?;
        self.draft.other_notes = non_empty(notes);
        Ok(())
    }

    pub fn set_positive_notes(&mut self, notes: &str) -> Result<(), Rejection> {
        self.require_record()?;
        self.draft.positive_notes = non_empty(notes);
        Ok(())
    }

    /// Whether the close action is available. A subcode is required unless
    /// the outcome is the wrong-number code.
    pub fn can_close(&self) -> Result<(), Rejection> {
        self.require_record()?;
        let action = self.draft.action.ok_or(Rejection::NoAction)?;
        if action == Action::Respond {
            if let Some(msg) = &self.draft.do_not_contact {
                return Err(Rejection::DoNotContact(msg.clone()));
            }
            if self.draft.templates.is_none() {
                return Err(Rejection::TemplatesNotLoaded);
            }
            if self.draft.selected.is_none() || self.draft.response_text.is_none() {
                return Err(Rejection::NoResponseSelected);
            }
        }
        check_outcome(
            self.draft.outcome_code.as_deref(),
            self.draft.outcome_subcode.as_deref(),
        )
    }

    /// Build the requests for closing `record` as `agent`.
    pub fn plan_close(&self, record: &BacklogRecord, agent: &str) -> Result<ClosePlan, Rejection> {
        self.can_close()?;
        let draft = &self.draft;
        let outcome_code = draft.outcome_code.clone().ok_or(Rejection::MissingOutcome)?;

        let (send, status, response_text) = match draft.action {
            Some(Action::Respond) => {
                let template = draft
                    .selected_template()
                    .ok_or(Rejection::NoResponseSelected)?;
                let text = draft
                    .response_text
                    .clone()
                    .ok_or(Rejection::NoResponseSelected)?;
                let edited = draft.is_edited().then(|| text.clone());
                let send = SendRequest::new(&record.account_id, template.message.id_string(), edited);
                (Some(send), STATUS_RESPONSE_SENT, text)
            }
            _ => (None, STATUS_CLOSED_NO_RESPONSE, NO_TEXT_SENT.to_string()),
        };

        Ok(ClosePlan {
            touchpoint_history_id: record.touchpoint_history_id.clone(),
            send,
            close: CloseCaseRequest {
                phone: record.phone.clone(),
                modified_by: agent.to_string(),
                case: CaseUpdate {
                    id: record.case_id.clone(),
                    outcome_code,
                    outcome_subcode: draft.outcome_subcode.clone(),
                    positive_interaction_notes: draft.positive_notes.clone(),
                    other_outcome_notes: draft.other_notes.clone(),
                },
                account: AccountUpdate {
                    id: record.account_id.clone(),
                    language: draft.language_update.clone(),
                },
            },
            status,
            response_text,
        })
    }
}

/// Subcode is mandatory unless the outcome is the wrong-number code.
pub fn check_outcome(code: Option<&str>, subcode: Option<&str>) -> Result<(), Rejection> {
    let code = code.ok_or(Rejection::MissingOutcome)?;
    if subcode.is_none() && code != WRONG_NUMBER_CODE {
        return Err(Rejection::MissingSubcode);
    }
    Ok(())
}

/// Write the local status columns for a finished record.
pub fn annotate(record: &mut BacklogRecord, plan: &ClosePlan) {
    record.status = Some(plan.status.to_string());
    record.outcome_code = Some(plan.close.case.outcome_code.clone());
    record.outcome_subcode = plan.close.case.outcome_subcode.clone();
    record.response_to_use = Some(plan.response_text.clone());
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
