use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::{
    ApiError, CloseCaseRequest, CloseCaseResponse, ListOutcome, Outbound, SendRequest,
};

/// A scripted service for tests. Records every request it receives.
pub struct MockOutbound {
    list: ListOutcome,
    fail_send: Option<(u16, String)>,
    fail_close: Option<(u16, String)>,
    listed: Mutex<Vec<String>>,
    sent: Mutex<Vec<SendRequest>>,
    closed: Mutex<Vec<CloseCaseRequest>>,
}

impl MockOutbound {
    pub fn new(list: ListOutcome) -> Self {
        Self {
            list,
            fail_send: None,
            fail_close: None,
            listed: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
        }
    }

    /// Make every `send` fail with the given status and body.
    pub fn failing_send(mut self, status: u16, body: &str) -> Self {
        self.fail_send = Some((status, body.to_string()));
        self
    }

    /// Make every `close_case` fail with the given status and body.
    pub fn failing_close(mut self, status: u16, body: &str) -> Self {
        self.fail_close = Some((status, body.to_string()));
        self
    }

    pub fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn closed(&self) -> Vec<CloseCaseRequest> {
        self.closed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Outbound for MockOutbound {
    async fn list_templates(&self, member_id: &str) -> Result<ListOutcome> {
        self.listed.lock().unwrap_or_else(|e| e.into_inner()).push(member_id.to_string());
        Ok(self.list.clone())
    }

    async fn send(&self, request: &SendRequest) -> Result<serde_json::Value> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());
        if let Some((status, body)) = &self.fail_send {
            return Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }
            .into());
        }
        Ok(serde_json::json!({"sent": true}))
    }

    async fn close_case(&self, request: &CloseCaseRequest) -> Result<CloseCaseResponse> {
        self.closed.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());
        if let Some((status, body)) = &self.fail_close {
            return Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }
            .into());
        }
        Ok(CloseCaseResponse::from_value(serde_json::json!({
            "case": {"bulkupdate": {"Body": "ok"}, "remove_two_way_sms": false}
        })))
    }
}
