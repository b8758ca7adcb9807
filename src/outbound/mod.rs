//! Calls to the templated-messaging service: list replies, send one, close a case.
//!
//! None of these calls retry. A duplicate `send` sends twice.

pub mod http;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that are shown to the agent exactly as the service returned them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status; `body` is the raw response text.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    /// The body carried an error `status` that is not a do-not-contact signal.
    #[error("service returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// A reply offered by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub id: serde_json::Value,
    #[serde(default)]
    pub touchpoint_code: Option<String>,
    pub name: String,
    pub message_source: String,
}

impl TemplateMessage {
    /// Ids come back as numbers or strings; requests always send strings.
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Replies grouped under one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<TemplateMessage>,
}

/// Result of a `list` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ListOutcome {
    Templates(Vec<Subject>),
    /// 404 or 422: the member must not be contacted.
    DoNotContact { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRequest {
    pub action: &'static str,
    pub member_id: String,
}

impl ListRequest {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            action: "list",
            member_id: member_id.into(),
        }
    }
}

/// `send` payload. `message_source` is present only when the text was edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendRequest {
    pub action: &'static str,
    pub member_id: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_source: Option<String>,
}

impl SendRequest {
    pub fn new(member_id: impl Into<String>, id: impl Into<String>, edited: Option<String>) -> Self {
        Self {
            action: "send",
            member_id: member_id.into(),
            id: id.into(),
            message_source: edited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseUpdate {
    pub id: String,
    pub outcome_code: String,
    pub outcome_subcode: Option<String>,
    pub positive_interaction_notes: Option<String>,
    pub other_outcome_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountUpdate {
    pub id: String,
    pub language: Option<String>,
}

/// `close_incoming_sms_case` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseCaseRequest {
    pub phone: Option<String>,
    pub modified_by: String,
    pub case: CaseUpdate,
    pub account: AccountUpdate,
}

/// Parsed close response. Only logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseCaseResponse {
    pub bulk_update: Option<serde_json::Value>,
    pub remove_two_way_sms: Option<serde_json::Value>,
    pub raw: serde_json::Value,
}

impl CloseCaseResponse {
    pub fn from_value(raw: serde_json::Value) -> Self {
        let case = raw.get("case");
        Self {
            bulk_update: case
                .and_then(|c| c.get("bulkupdate"))
                .and_then(|b| b.get("Body"))
                .cloned(),
            remove_two_way_sms: case.and_then(|c| c.get("remove_two_way_sms")).cloned(),
            raw,
        }
    }
}

/// The `status` carried inside a response body, if any.
pub fn body_status(body: &serde_json::Value) -> Result<Option<u16>, ApiError> {
    let Some(status) = body.get("status") else {
        return Ok(None);
    };
    status
        .as_u64()
        .or_else(|| status.as_str().and_then(|s| s.parse().ok()))
        .and_then(|n| u16::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ApiError::Malformed(body.to_string()))
}

fn body_message(body: &serde_json::Value) -> String {
    match body.get("message") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Fail when the body reports a non-2xx `status` of its own.
pub fn check_body(body: &serde_json::Value) -> Result<(), ApiError> {
    match body_status(body)? {
        Some(status) if !(200..300).contains(&status) => Err(ApiError::Rejected {
            status,
            message: body_message(body),
        }),
        _ => Ok(()),
    }
}

/// Interpret a `list` response body.
pub fn parse_list(body: &serde_json::Value) -> Result<ListOutcome, ApiError> {
    if let Some(status) = body_status(body)? {
        let message = body_message(body);
        return match status {
            404 | 422 => Ok(ListOutcome::DoNotContact { status, message }),
            _ => Err(ApiError::Rejected { status, message }),
        };
    }
    let collection = body
        .get("collection")
        .ok_or_else(|| ApiError::Malformed(body.to_string()))?;
    let subjects: Vec<Subject> = serde_json::from_value(collection.clone())
        .map_err(|e| ApiError::Malformed(format!("{e}: {collection}")))?;
    Ok(ListOutcome::Templates(subjects))
}

/// The messaging service as seen by the triage workflow.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn list_templates(&self, member_id: &str) -> Result<ListOutcome>;
    async fn send(&self, request: &SendRequest) -> Result<serde_json::Value>;
    async fn close_case(&self, request: &CloseCaseRequest) -> Result<CloseCaseResponse>;
}
