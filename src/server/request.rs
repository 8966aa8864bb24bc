use http::Method;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

/// Parsed inbound request descriptor handed over by the transport.
///
/// The transport (embedded server or container adapter) parses the HTTP
/// framing and passes the engine this descriptor; the body stays an
/// unconsumed byte stream until a filter or handler asks for it.
pub struct HttpRequest {
    /// HTTP method token, e.g. `"GET"`.
    pub method: String,
    /// Request path, query string included.
    pub path: String,
    /// Raw header map.
    pub headers: HashMap<String, String>,
    /// Single-pass body stream.
    pub body: Box<dyn Read + Send>,
}

impl HttpRequest {
    /// A bodyless request descriptor, useful for tests and GET traffic.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Box::new(Cursor::new(Vec::new())),
        }
    }

    /// Attach a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach an in-memory body.
    pub fn body_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Box::new(Cursor::new(bytes.into()));
        self
    }

    /// Attach a streaming body.
    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Box::new(reader);
        self
    }
}

/// Parse cookies out of a lowercase header map.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` and URL-decodes names and values.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.find('?') {
        Some(pos) => url::form_urlencoded::parse(path[pos + 1..].as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Per-request mutable state seen by filters and the handler.
///
/// Path parameter bindings are per-execution: the dispatcher rebinds them
/// before each filter/handler runs, from that unit's own pattern alignment.
///
/// The body is materialized at most once. The first `body_bytes()` call
/// drains the transport stream into a cache; every later call, from any
/// filter or the handler on the same request, observes byte-identical
/// content even though the underlying source is read-once.
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    query_params: HashMap<String, String>,
    params: HashMap<String, String>,
    wildcard: Option<String>,
    body_source: Option<Box<dyn Read + Send>>,
    body_cache: Option<Vec<u8>>,
    body_limit: u64,
}

impl RequestContext {
    /// Build the per-request context from a transport descriptor.
    ///
    /// Header names are lowercased; cookies and query parameters are parsed
    /// eagerly, the body is not.
    ///
    /// # Errors
    ///
    /// Fails when the method token is not a valid HTTP method.
    pub(crate) fn new(
        descriptor: HttpRequest,
        body_limit: u64,
    ) -> Result<Self, http::method::InvalidMethod> {
        let method = Method::from_bytes(descriptor.method.as_bytes())?;
        let headers: HashMap<String, String> = descriptor
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let cookies = parse_cookies(&headers);
        let query_params = parse_query_params(&descriptor.path);
        let path = descriptor
            .path
            .split('?')
            .next()
            .unwrap_or("/")
            .to_string();
        debug!(
            method = %method,
            path = %path,
            header_count = headers.len(),
            query_count = query_params.len(),
            "request context built"
        );
        Ok(Self {
            method,
            path,
            headers,
            cookies,
            query_params,
            params: HashMap::new(),
            wildcard: None,
            body_source: Some(descriptor.body),
            body_cache: None,
            body_limit,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path with the query string stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// All headers, lowercase keys.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Path parameter bound by the currently executing unit's pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All path parameters bound for the currently executing unit.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Wildcard remainder captured by the currently executing unit's
    /// pattern, `None` when its pattern has no trailing `*`.
    pub fn splat(&self) -> Option<&str> {
        self.wildcard.as_deref()
    }

    /// Swap in the bindings for the unit about to execute.
    pub(crate) fn bind(&mut self, params: HashMap<String, String>, wildcard: Option<String>) {
        self.params = params;
        self.wildcard = wildcard;
    }

    /// The request body, materialized on first access and cached.
    pub fn body_bytes(&mut self) -> &[u8] {
        if self.body_cache.is_none() {
            let mut buf = Vec::new();
            if let Some(source) = self.body_source.take() {
                if let Err(err) = source.take(self.body_limit).read_to_end(&mut buf) {
                    warn!(error = %err, "request body read failed; caching partial body");
                }
            }
            debug!(body_size_bytes = buf.len(), "request body materialized");
            self.body_cache = Some(buf);
        }
        self.body_cache.as_deref().unwrap_or(&[])
    }

    /// The request body as text, lossily decoded from UTF-8.
    pub fn body(&mut self) -> String {
        String::from_utf8_lossy(self.body_bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let mut h = HashMap::new();
        h.insert("cookie".to_string(), "a=b; c=d".to_string());
        let cookies = parse_cookies(&h);
        assert_eq!(cookies.get("a"), Some(&"b".to_string()));
        assert_eq!(cookies.get("c"), Some(&"d".to_string()));
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=2");
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"2".to_string()));
    }

    #[test]
    fn test_context_lowercases_headers_and_strips_query() {
        let req = HttpRequest::new("GET", "/p?x=1").header("X-Token", "abc");
        let ctx = RequestContext::new(req, 1 << 20).unwrap();
        assert_eq!(ctx.path(), "/p");
        assert_eq!(ctx.header("x-token"), Some("abc"));
        assert_eq!(ctx.header("X-TOKEN"), Some("abc"));
        assert_eq!(ctx.query_param("x"), Some("1"));
    }

    #[test]
    fn test_body_is_read_once_and_cached() {
        struct CountingReader {
            data: Cursor<Vec<u8>>,
            reads: std::sync::Arc<std::sync::atomic::AtomicUsize>,
        }
        impl Read for CountingReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.reads
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.data.read(buf)
            }
        }

        let reads = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let reader = CountingReader {
            data: Cursor::new(b"the body content".to_vec()),
            reads: std::sync::Arc::clone(&reads),
        };
        let req = HttpRequest::new("POST", "/hello").body_reader(reader);
        let mut ctx = RequestContext::new(req, 1 << 20).unwrap();

        let first = ctx.body();
        let observed = reads.load(std::sync::atomic::Ordering::SeqCst);
        let second = ctx.body();
        assert_eq!(first, "the body content");
        assert_eq!(first, second);
        // No further source reads after the first materialization.
        assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), observed);
    }

    #[test]
    fn test_body_respects_read_limit() {
        let req = HttpRequest::new("POST", "/x").body_bytes(vec![b'a'; 64]);
        let mut ctx = RequestContext::new(req, 16).unwrap();
        assert_eq!(ctx.body_bytes().len(), 16);
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let req = HttpRequest::new("BAD METHOD", "/");
        assert!(RequestContext::new(req, 1024).is_err());
    }
}
