use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Complete response descriptor handed back to the transport.
///
/// Produced exactly once per request by finalization; once built, no
/// engine code can touch the status, headers or body again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Per-request mutable response state exposed to filters and the handler.
///
/// Status defaults to 200, the header map starts empty, and the body is
/// unset until a handler return value or an explicit [`set_body`] write
/// fills it.
///
/// [`set_body`]: ResponseContext::set_body
pub struct ResponseContext {
    status: u16,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    body_written: bool,
}

impl ResponseContext {
    pub(crate) fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
            body_written: false,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Overwrite the response body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
        self.body_written = true;
    }

    /// Serialize `value` as the JSON response body and set the content type.
    ///
    /// # Errors
    ///
    /// Propagates serialization failure; the response is left untouched.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.set_header("Content-Type", "application/json");
        self.set_body(bytes);
        Ok(())
    }

    /// Respond with a 302 redirect to `location`.
    pub fn redirect(&mut self, location: impl Into<String>) {
        self.status = 302;
        self.set_header("Location", location.into());
    }

    /// Whether a body has been written since the last flag reset. Used by
    /// the dispatcher to decide if a handler's return value may fill the
    /// body.
    pub(crate) fn body_written(&self) -> bool {
        self.body_written
    }

    pub(crate) fn reset_body_written(&mut self) {
        self.body_written = false;
    }

    /// Serialize the accumulated state into the protocol-level response.
    ///
    /// Consuming `self` is the finality guarantee: after this, nothing can
    /// mutate the status, headers or body. A non-empty body without a
    /// declared content type defaults to `text/html`.
    pub(crate) fn finalize(self) -> HttpResponse {
        let mut headers = self.headers;
        let body = self.body.unwrap_or_default();
        if !body.is_empty() && !headers.contains_key("Content-Type") {
            headers.insert("Content-Type".to_string(), "text/html".to_string());
        }
        debug!(status = self.status, body_bytes = body.len(), "response finalized");
        HttpResponse {
            status: self.status,
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let res = ResponseContext::new();
        assert_eq!(res.status(), 200);
        assert!(res.body().is_none());
        let out = res.finalize();
        assert_eq!(out.status, 200);
        assert!(out.body.is_empty());
        // No default content type on an empty body.
        assert!(out.headers.get("Content-Type").is_none());
    }

    #[test]
    fn test_default_content_type_on_body() {
        let mut res = ResponseContext::new();
        res.set_body("<h1>hi</h1>");
        let out = res.finalize();
        assert_eq!(out.headers.get("Content-Type").map(String::as_str), Some("text/html"));
    }

    #[test]
    fn test_json_sets_content_type() {
        let mut res = ResponseContext::new();
        res.json(&serde_json::json!({ "ok": true })).unwrap();
        let out = res.finalize();
        assert_eq!(
            out.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(out.body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_redirect() {
        let mut res = ResponseContext::new();
        res.redirect("/login");
        let out = res.finalize();
        assert_eq!(out.status, 302);
        assert_eq!(out.headers.get("Location").map(String::as_str), Some("/login"));
    }
}
