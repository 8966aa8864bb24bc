use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::accept::negotiates;
use super::pattern::RoutePattern;
use crate::registry::{RouteEntry, RouteKind};

/// One matched entry together with the bindings produced by aligning its
/// own pattern against the request path.
///
/// Bindings are per-entry on purpose: a filter registered on `/users/:id`
/// and a handler registered on `/users/:user_id` both match `/users/7`, and
/// each execution sees only the parameters its own pattern bound. Bindings
/// are never merged across entries.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    /// The registered entry that matched.
    pub entry: Arc<RouteEntry>,
    /// Parameter bindings from this entry's own pattern alignment.
    pub params: HashMap<String, String>,
    /// Wildcard capture from this entry's pattern, if it has one.
    pub wildcard: Option<String>,
}

/// Everything matching one inbound request triple, transient per request.
///
/// An absent `handler` signals 404.
#[derive(Debug, Default)]
pub struct MatchResult {
    /// Qualifying before-filters, in table order.
    pub before: Vec<MatchedRoute>,
    /// The first qualifying handler entry, in table order.
    pub handler: Option<MatchedRoute>,
    /// Qualifying after-filters, in table order.
    pub after: Vec<MatchedRoute>,
}

/// Matches inbound (method, path, Accept) triples against one immutable
/// snapshot of the registration table.
///
/// The table is scanned once, in registration order. An entry qualifies
/// when its method rule accepts the request method, its pattern aligns
/// against the normalized path segments, and its declared content type
/// negotiates against the `Accept` header.
pub struct Router {
    snapshot: Arc<Vec<Arc<RouteEntry>>>,
}

impl Router {
    pub fn new(snapshot: Arc<Vec<Arc<RouteEntry>>>) -> Self {
        Self { snapshot }
    }

    /// Resolve the filter chain and handler for one request.
    pub fn match_request(
        &self,
        method: &Method,
        path: &str,
        accept_header: Option<&str>,
    ) -> MatchResult {
        let segments = RoutePattern::split_path(path);
        let mut result = MatchResult::default();

        for entry in self.snapshot.iter() {
            if !entry.method.accepts(method) {
                continue;
            }
            // First-registered handler wins; later handler entries are not
            // even aligned once one is selected.
            if entry.kind == RouteKind::Handler && result.handler.is_some() {
                continue;
            }
            let Some(bindings) = entry.pattern.matches(&segments) else {
                continue;
            };
            if !negotiates(&entry.accept, accept_header) {
                continue;
            }
            let matched = MatchedRoute {
                entry: Arc::clone(entry),
                params: bindings.params,
                wildcard: bindings.wildcard,
            };
            match entry.kind {
                RouteKind::Before => result.before.push(matched),
                RouteKind::Handler => result.handler = Some(matched),
                RouteKind::After => result.after.push(matched),
            }
        }

        debug!(
            method = %method,
            path = %path,
            before = result.before.len(),
            after = result.after.len(),
            matched = result.handler.is_some(),
            "route table scanned"
        );
        result
    }
}
