//! # Registration Table
//!
//! Append-mostly store of registered routes and filters. Insertion order is
//! preserved and semantically significant: filters of the same kind execute
//! in registration order, and the first-registered handler for a matching
//! method, path and accept type wins.
//!
//! The table is the only cross-request shared mutable resource in the
//! engine. Request threads read it through [`RouteRegistry::snapshot`], a
//! single atomic load of an immutable `Arc<Vec<_>>`, so a concurrent
//! `add`/`clear` can never corrupt an in-flight request's view: one
//! request's matching decision is always made against one consistent table
//! state, and registrations during live traffic become visible to new
//! requests only.

use arc_swap::ArcSwap;
use http::Method;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::dispatcher::Handler;
use crate::router::pattern::RoutePattern;

/// What a registered entry is: a before-filter, the route handler itself,
/// or an after-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Runs before the handler, may mutate the response or halt.
    Before,
    /// Produces the primary response body.
    Handler,
    /// Runs after a successful handler dispatch.
    After,
}

/// Method constraint on a registered entry.
///
/// Routes register with an exact method; filters register with [`MethodRule::Any`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodRule {
    /// Matches every request method (the filter sentinel).
    Any,
    /// Matches one method exactly.
    Exact(Method),
}

impl MethodRule {
    /// Whether a request with `method` satisfies this rule.
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            MethodRule::Any => true,
            MethodRule::Exact(m) => m == method,
        }
    }
}

/// One registered unit: method rule, compiled pattern, accepted content
/// type, kind and the handler itself. Created by a registration call,
/// appended to the table, never mutated.
pub struct RouteEntry {
    /// Method constraint (`Any` for filters).
    pub method: MethodRule,
    /// Compiled path pattern.
    pub pattern: RoutePattern,
    /// Declared content type this entry produces/applies to, default `*/*`.
    pub accept: String,
    /// Before-filter, handler, or after-filter.
    pub kind: RouteKind,
    /// The callable run by the dispatcher.
    pub handler: Handler,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.raw())
            .field("accept", &self.accept)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered route table with lock-free snapshot reads.
///
/// Writers (`add`/`clear`) serialize through a mutex and publish a fresh
/// immutable vector; readers never block beyond the snapshot load.
pub struct RouteRegistry {
    entries: ArcSwap<Vec<Arc<RouteEntry>>>,
    write_lock: Mutex<()>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Append an entry. Never reorders or deduplicates: duplicate
    /// registrations are legal and both remain reachable.
    pub fn add(&self, entry: RouteEntry) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.entries.load();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().map(Arc::clone));
        debug!(
            pattern = entry.pattern.raw(),
            kind = ?entry.kind,
            accept = %entry.accept,
            table_len = next.len() + 1,
            "route entry registered"
        );
        next.push(Arc::new(entry));
        self.entries.store(Arc::new(next));
    }

    /// Remove every entry. Idempotent, safe to call on an empty table;
    /// in-flight requests keep matching against the snapshot they took.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.entries.store(Arc::new(Vec::new()));
        debug!("route table cleared");
    }

    /// An immutable view of the table for one request's matching decision.
    pub fn snapshot(&self) -> Arc<Vec<Arc<RouteEntry>>> {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_entry(spec: &str, kind: RouteKind) -> RouteEntry {
        RouteEntry {
            method: MethodRule::Exact(Method::GET),
            pattern: RoutePattern::compile(spec).unwrap(),
            accept: "*/*".to_string(),
            kind,
            handler: Arc::new(|_req, _res| Ok(None)),
        }
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let registry = RouteRegistry::new();
        registry.add(noop_entry("/a", RouteKind::Handler));
        registry.add(noop_entry("/b", RouteKind::Handler));
        registry.add(noop_entry("/a", RouteKind::Handler));
        let snap = registry.snapshot();
        let specs: Vec<&str> = snap.iter().map(|e| e.pattern.raw()).collect();
        assert_eq!(specs, vec!["/a", "/b", "/a"]);
    }

    #[test]
    fn test_clear_is_idempotent_and_isolated_from_snapshots() {
        let registry = RouteRegistry::new();
        registry.clear();
        registry.add(noop_entry("/a", RouteKind::Handler));
        let before_clear = registry.snapshot();
        registry.clear();
        registry.clear();
        assert!(registry.is_empty());
        // The in-flight view is untouched by the clear.
        assert_eq!(before_clear.len(), 1);
    }

    #[test]
    fn test_method_rule_sentinel() {
        assert!(MethodRule::Any.accepts(&Method::DELETE));
        assert!(MethodRule::Exact(Method::GET).accepts(&Method::GET));
        assert!(!MethodRule::Exact(Method::GET).accepts(&Method::POST));
    }
}
