use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use super::{
    ApiError, CloseCaseRequest, CloseCaseResponse, ListOutcome, ListRequest, Outbound,
    SendRequest, check_body, parse_list,
};
use crate::consts::{CLOSE_CASE_PATH, TEMPLATED_RESPONSES_PATH};

/// The messaging service over HTTPS, authenticated with a static `x-api-key`.
pub struct HttpOutbound {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpOutbound {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if base_url.is_empty() {
            bail!("api.base_url is not configured");
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// POST `body` and return the HTTP status with the raw response text.
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read response from {path}"))?;
        Ok((status, text))
    }
}

/// A non-success status is an [`ApiError::Status`] carrying the raw text.
fn expect_success(status: StatusCode, text: String) -> Result<serde_json::Value, ApiError> {
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    let body: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(format!("{e}: {text}")))?;
    check_body(&body)?;
    Ok(body)
}

#[async_trait]
impl Outbound for HttpOutbound {
    async fn list_templates(&self, member_id: &str) -> Result<ListOutcome> {
        let request = ListRequest::new(member_id);
        info!(payload = ?request, "templated responses request");
        let (status, text) = self.post(TEMPLATED_RESPONSES_PATH, &request).await?;
        info!(status = status.as_u16(), response = %text, "templated responses response");
        // 404/422 arrive as JSON with their own `status`; parse_list reads them.
        let body = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(body) if status.is_success() || body.get("status").is_some() => body,
            Ok(_) => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: text,
                }
                .into());
            }
            Err(_) => return Ok(parse_list(&expect_success(status, text)?)?),
        };
        Ok(parse_list(&body)?)
    }

    async fn send(&self, request: &SendRequest) -> Result<serde_json::Value> {
        info!(payload = ?request, "send request");
        let (status, text) = self.post(TEMPLATED_RESPONSES_PATH, request).await?;
        info!(status = status.as_u16(), response = %text, "send response");
        Ok(expect_success(status, text)?)
    }

    async fn close_case(&self, request: &CloseCaseRequest) -> Result<CloseCaseResponse> {
        info!(payload = ?request, "case close request");
        let (status, text) = self.post(CLOSE_CASE_PATH, request).await?;
        let body = match expect_success(status, text) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "case close failed");
                return Err(e.into());
            }
        };
        let response = CloseCaseResponse::from_value(body);
        info!(
            bulk_update = ?response.bulk_update,
            remove_two_way_sms = ?response.remove_two_way_sms,
            "case close response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_base_url() {
        assert!(HttpOutbound::new("", "key").is_err());
    }

    #[test]
    fn trims_trailing_slash() {
        let out = HttpOutbound::new("https://api.example.test/v1/", "key").unwrap();
        assert_eq!(out.base_url, "https://api.example.test/v1");
    }
}
