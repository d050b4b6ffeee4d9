//! Outbound side of the gateway.
//!
//! Every third-party call goes through [`UpstreamTransport`], so request
//! shaping and response mapping can be exercised without a network. The
//! production implementation is [`HttpTransport`].

pub mod http;

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use http::HttpTransport;

const MAX_DETAIL_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        bytes: Vec<u8>,
        filename: String,
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// Transport-neutral description of one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: UpstreamBody,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: UpstreamBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = UpstreamBody::Json(body);
        self
    }

    pub fn text_part(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_part(FormPart {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn file_part(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        self.push_part(FormPart {
            name: name.into(),
            value: FormValue::File {
                bytes,
                filename: filename.into(),
                content_type,
            },
        });
        self
    }

    fn push_part(&mut self, part: FormPart) {
        match &mut self.body {
            UpstreamBody::Multipart(parts) => parts.push(part),
            body => *body = UpstreamBody::Multipart(vec![part]),
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            GatewayError::upstream(format!("Unexpected response from upstream: {}", e))
        })
    }

    /// Best human-readable detail from an error body, if any.
    pub fn error_detail(&self) -> Option<String> {
        if let Ok(value) = serde_json::from_slice::<Value>(&self.body) {
            if let Some(detail) = detail_from_json(&value) {
                return Some(detail);
            }
        }
        let text = self.text();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(truncate(text, MAX_DETAIL_CHARS))
        }
    }
}

fn detail_from_json(value: &Value) -> Option<String> {
    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let joined = errors
            .iter()
            .filter_map(|e| e.as_str().map(str::to_string).or_else(|| detail_from_json(e)))
            .collect::<Vec<_>>()
            .join("; ");
        if !joined.is_empty() {
            return Some(truncate(&joined, MAX_DETAIL_CHARS));
        }
    }
    for key in ["message", "error", "detail", "name"] {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => {
                return Some(truncate(s, MAX_DETAIL_CHARS));
            }
            Some(nested @ Value::Object(_)) => {
                if let Some(detail) = detail_from_json(nested) {
                    return Some(detail);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Performs the call. Transport-level failures (DNS, TLS, timeouts) are
    /// reported as `GatewayError::Upstream`; any HTTP status is returned as a
    /// response.
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// Sends `request` and maps the result into the gateway's error taxonomy.
///
/// Non-2xx statuses become `Upstream` errors carrying the upstream's detail;
/// `map` turns a successful body into the domain value and `is_empty`
/// flags a search that matched nothing, which becomes `NotFound`.
pub async fn call_upstream<T, M, E>(
    transport: &dyn UpstreamTransport,
    upstream: &str,
    request: UpstreamRequest,
    map: M,
    is_empty: E,
) -> Result<T>
where
    M: FnOnce(UpstreamResponse) -> Result<T>,
    E: FnOnce(&T) -> bool,
{
    log::debug!("Calling {} at {}", upstream, request.url);

    let response = transport.send(request).await.map_err(|e| {
        log::error!("{} transport failure: {}", upstream, e);
        e
    })?;

    if !response.is_success() {
        let err = status_error(upstream, &response);
        log::error!("{}", err);
        return Err(err);
    }

    let value = map(response)?;
    if is_empty(&value) {
        log::info!("{} returned no results", upstream);
        return Err(GatewayError::not_found("No results found for this prompt"));
    }
    Ok(value)
}

/// Builds the `Upstream` error for a response with an unexpected status.
pub fn status_error(upstream: &str, response: &UpstreamResponse) -> GatewayError {
    match response.error_detail() {
        Some(detail) => GatewayError::upstream(format!(
            "{} request failed with status {}: {}",
            upstream, response.status, detail
        )),
        None => GatewayError::upstream(format!(
            "{} request failed with status {}",
            upstream, response.status
        )),
    }
}

/// `is_empty` predicate for calls that are never searches.
pub fn never_empty<T>(_: &T) -> bool {
    false
}
