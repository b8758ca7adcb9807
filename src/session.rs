//! Everything one agent session holds: identity, cached snapshot, filters,
//! the filtered view and the triage workflow.
//!
//! [`Session::close`] is the only place that performs outbound writes.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::auth::{AccessDenied, AccessGate, Identity};
use crate::config::Settings;
use crate::filter::{Field, FilterState};
use crate::outbound::Outbound;
use crate::reference;
use crate::triage::{self, Phase, Rejection, TemplateChoice, Workflow};
use crate::warehouse::{BacklogRecord, HistoryRecord, Snapshot, Warehouse};

/// What happened on `/close`.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseReport {
    pub touchpoint_history_id: String,
    pub status: &'static str,
    /// Text that went out, when a reply was sent.
    pub sent: Option<String>,
    /// Set when the reply went out but the case close failed.
    pub close_error: Option<String>,
    /// Where the workflow landed after advancing.
    pub phase: Phase,
}

pub struct Session {
    settings: Settings,
    identity: Option<Identity>,
    snapshot: Option<Snapshot>,
    filters: FilterState,
    view: Vec<usize>,
    workflow: Workflow,
}

impl Session {
    pub fn new(settings: Settings, identity: Option<Identity>) -> Self {
        Self {
            settings,
            identity,
            snapshot: None,
            filters: FilterState::default(),
            view: Vec::new(),
            workflow: Workflow::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Re-check the identity against the allow-list. A failure drops the
    /// identity and everything loaded under it.
    pub fn authorize(&mut self) -> Result<&str, AccessDenied> {
        let verdict = AccessGate::new(&self.settings.authorization).check(self.identity.as_ref());
        if let Err(denied) = verdict {
            if self.identity.is_some() {
                warn!(reason = %denied, "identity cleared");
            }
            self.sign_out();
            return Err(denied);
        }
        Ok(self
            .identity
            .as_ref()
            .map(|i| i.email.as_str())
            .unwrap_or_default())
    }

    pub fn sign_in(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Forget the identity and invalidate the cached snapshot.
    pub fn sign_out(&mut self) {
        self.identity = None;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
        self.view.clear();
        self.workflow.reset();
    }

    /// Load a fresh snapshot. Nothing is kept from the previous one,
    /// including local status annotations. A failed load leaves no snapshot.
    pub fn refresh(&mut self, warehouse: &dyn Warehouse, now: DateTime<Utc>) -> Result<&Snapshot> {
        self.authorize()?;
        let loaded = reference::load_languages(Path::new(&self.settings.reference.languages))
            .and_then(|languages| {
                Snapshot::load(warehouse, languages, self.settings.warehouse.backlog_days, now)
                    .context("failed to load the backlog")
            });
        let snapshot = match loaded {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "refresh failed, cached backlog dropped");
                self.invalidate();
                return Err(e);
            }
        };
        self.view = self.filters.apply(&snapshot.backlog, now);
        self.workflow.reset();
        Ok(self.snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Backlog indices currently visible.
    pub fn view(&self) -> &[usize] {
        &self.view
    }

    /// Visible records in backlog order.
    pub fn visible(&self) -> Vec<&BacklogRecord> {
        match &self.snapshot {
            Some(s) => self.view.iter().filter_map(|i| s.backlog.get(*i)).collect(),
            None => Vec::new(),
        }
    }

    /// Change one filter. Any change sends the workflow back to idle.
    pub fn set_filter(&mut self, field: Field, value: &str, now: DateTime<Utc>) -> Result<bool> {
        let changed = self.filters.set(field, value)?;
        if changed {
            if let Some(s) = &self.snapshot {
                self.view = self.filters.apply(&s.backlog, now);
            }
            self.workflow.reset();
            info!(?field, value, visible = self.view.len(), "filter changed");
        }
        Ok(changed)
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }

    pub fn start(&mut self) -> Result<Phase> {
        self.authorize()?;
        let snapshot = self
            .snapshot
            .as_ref()
            .context("no backlog loaded; run /refresh")?;
        let phase = self.workflow.start(&snapshot.backlog, &self.view);
        self.log_current();
        Ok(phase)
    }

    pub fn stop(&mut self) {
        self.workflow.reset();
    }

    /// The record on screen.
    pub fn current(&self) -> Option<&BacklogRecord> {
        let snapshot = self.snapshot.as_ref()?;
        self.workflow.current(&snapshot.backlog, &self.view)
    }

    /// History for the member on screen.
    pub fn current_history(&self) -> Vec<&HistoryRecord> {
        match (self.snapshot.as_ref(), self.current()) {
            (Some(s), Some(r)) => s.history_for(&r.account_id).collect(),
            _ => Vec::new(),
        }
    }

    fn log_current(&self) {
        if let Some(record) = self.current() {
            info!(touchpoint_history_id = %record.touchpoint_history_id, "updating touchpoint");
        }
    }

    /// Ask the messaging service which replies may go to the member on screen.
    pub async fn fetch_templates(&mut self, outbound: &dyn Outbound) -> Result<&[TemplateChoice]> {
        self.authorize()?;
        if self.workflow.phase() != Phase::ClosingWithResponse {
            return Err(match self.workflow.phase() {
                Phase::Idle => Rejection::NotStarted,
                Phase::AllDone => Rejection::AllDone,
                _ => Rejection::NotResponding,
            }
            .into());
        }
        let member_id = self
            .current()
            .map(|r| r.account_id.clone())
            .ok_or(Rejection::NothingToClose)?;
        let outcome = outbound.list_templates(&member_id).await?;
        Ok(self.workflow.load_templates(outcome)?)
    }

    /// Send the reply (if any), close the case, annotate and advance.
    ///
    /// A failed send marks nothing. A failed close after a successful send
    /// keeps the `Response Sent` annotation and still advances. A failed
    /// close without a reply leaves the record on screen.
    pub async fn close(&mut self, outbound: &dyn Outbound) -> Result<CloseReport> {
        let agent = self.authorize()?.to_string();
        let index = self
            .workflow
            .current_index(&self.view)
            .ok_or(Rejection::NothingToClose);
        self.workflow.can_close()?;
        let index = index?;
        let snapshot = self
            .snapshot
            .as_mut()
            .context("no backlog loaded; run /refresh")?;
        let record = snapshot
            .backlog
            .get_mut(index)
            .ok_or(Rejection::NothingToClose)?;
        let plan = self.workflow.plan_close(record, &agent)?;
        info!(
            touchpoint_history_id = %plan.touchpoint_history_id,
            status = plan.status,
            "closing case"
        );

        let mut sent = None;
        if let Some(request) = &plan.send {
            outbound.send(request).await?;
            triage::annotate(record, &plan);
            sent = Some(plan.response_text.clone());
        }

        let close_error = match outbound.close_case(&plan.close).await {
            Ok(_) => {
                triage::annotate(record, &plan);
                None
            }
            Err(e) if sent.is_some() => {
                warn!(error = %e, "reply sent but case close failed");
                Some(e.to_string())
            }
            Err(e) => return Err(e),
        };

        let phase = self.workflow.advance(&snapshot.backlog, &self.view);
        self.log_current();
        Ok(CloseReport {
            touchpoint_history_id: plan.touchpoint_history_id,
            status: plan.status,
            sent,
            close_error,
            phase,
        })
    }
}
