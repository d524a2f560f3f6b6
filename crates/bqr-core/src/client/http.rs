//! Blocking JSON requests over libcurl, with failures mapped to `RemoteError`.
//!
//! Runs in the current thread; the client calls it from `spawn_blocking`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::retry::{classify_curl_error, ErrorKind, RemoteError, SubError};

/// Longest slice of a non-JSON error body kept in the error message.
const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
}

/// Connect and whole-request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub token: Option<String>,
    pub if_match: Option<String>,
    pub body: Option<Vec<u8>>,
    pub timeouts: Timeouts,
}

#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub code: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Decodes a 2xx body, or turns any other status into a `RemoteError`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, RemoteError> {
        if !(200..300).contains(&self.code) {
            return Err(error_from_response(self.code, &self.body));
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            RemoteError::unstructured(ErrorKind::Decode, format!("invalid response body: {}", e))
        })
    }
}

fn transport_error(e: curl::Error) -> RemoteError {
    RemoteError::unstructured(classify_curl_error(&e), e.to_string())
}

/// Performs the request and returns status and body. Only transport failures
/// are errors here; HTTP statuses are left to [`HttpResponse::json`].
pub(crate) fn send(req: &HttpRequest) -> Result<HttpResponse, RemoteError> {
    let mut body = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url).map_err(transport_error)?;
    easy.connect_timeout(req.timeouts.connect).map_err(transport_error)?;
    easy.timeout(req.timeouts.request).map_err(transport_error)?;

    let mut headers = curl::easy::List::new();
    headers.append("Accept: application/json").map_err(transport_error)?;
    // No 100-continue round trip for small JSON bodies.
    headers.append("Expect:").map_err(transport_error)?;
    if let Some(token) = &req.token {
        headers
            .append(&format!("Authorization: Bearer {}", token))
            .map_err(transport_error)?;
    }
    if let Some(etag) = &req.if_match {
        headers
            .append(&format!("If-Match: {}", etag))
            .map_err(transport_error)?;
    }

    match req.method {
        Method::Get => easy.get(true).map_err(transport_error)?,
        Method::Patch => easy.custom_request("PATCH").map_err(transport_error)?,
    }
    if let Some(payload) = &req.body {
        headers
            .append("Content-Type: application/json")
            .map_err(transport_error)?;
        easy.post_fields_copy(payload).map_err(transport_error)?;
    }
    easy.http_headers(headers).map_err(transport_error)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport_error)?;
        transfer.perform().map_err(transport_error)?;
    }

    let code = easy.response_code().map_err(transport_error)?;
    Ok(HttpResponse { code, body })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

/// Entries are kept as raw JSON so one oddly typed field does not turn the
/// whole envelope into an unstructured error.
#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    errors: Vec<Value>,
}

fn str_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Sub-error from one raw `errors` entry. A `reason` that is absent or not a
/// string is left unset, which the classifier reports as a contract violation.
fn sub_error(entry: &Value) -> SubError {
    SubError {
        reason: str_field(entry, "reason"),
        message: str_field(entry, "message"),
        domain: str_field(entry, "domain"),
        location: str_field(entry, "location"),
    }
}

/// Builds the error for a non-2xx response. A Google API error envelope gives
/// a structured error; anything else (proxy or load balancer pages) gives an
/// unstructured one.
pub(crate) fn error_from_response(code: u32, body: &[u8]) -> RemoteError {
    let kind = u16::try_from(code)
        .map(ErrorKind::from_http_status)
        .unwrap_or(ErrorKind::Other);
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let message = error.message.as_str().unwrap_or_default().to_string();
            let errors = error.errors.iter().map(sub_error).collect();
            RemoteError::structured(kind, message, errors)
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let snippet: String = text.trim().chars().take(BODY_SNIPPET_CHARS).collect();
            RemoteError::unstructured(kind, snippet)
        }
    }
}
