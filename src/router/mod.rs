//! # Router Module
//!
//! Path matching and route resolution for the dispatch engine.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling registered path specifications into matchable patterns
//! - Matching incoming requests to the registered handler and filter chain
//! - Extracting path parameters and the wildcard capture from matched routes
//! - Negotiating a route's declared content type against the `Accept` header
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: At registration time, path specs (e.g. `/pets/:id`,
//!    `/files/*`) are compiled into segment lists (literals, named
//!    parameters, and an optional trailing wildcard). Malformed specs are
//!    rejected with a [`PatternError`] before they ever reach the table.
//!
//! 2. **Matching**: For each incoming request, the matcher scans one
//!    immutable snapshot of the registration table in order, aligning each
//!    candidate pattern against the normalized request segments and
//!    filtering by method rule and accept negotiation.
//!
//! ## Example
//!
//! ```rust
//! use flint::router::pattern::RoutePattern;
//!
//! let pattern = RoutePattern::compile("/pets/:id")?;
//! let segments = RoutePattern::split_path("/pets/123");
//! let bindings = pattern.matches(&segments).unwrap();
//! assert_eq!(bindings.params.get("id").map(String::as_str), Some("123"));
//! # Ok::<(), flint::PatternError>(())
//! ```
//!
//! ## Performance
//!
//! Matching is a single O(n) scan over the table snapshot with no regex
//! machinery and no allocation beyond the bound parameter values.

pub mod accept;
mod matcher;
pub mod pattern;

pub use matcher::{MatchResult, MatchedRoute, Router};
pub use pattern::{PathBindings, PatternError, RoutePattern, Segment};
