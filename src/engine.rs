//! # Engine
//!
//! The public facade: an explicit engine instance owning one registration
//! table and the dispatch configuration. Multiple independent engines can
//! coexist in one process; nothing here is process-global.
//!
//! Registration calls are pure table mutations; they never start a server.
//! Binding a listener is a separate, explicit step (see
//! [`HttpServer`](crate::server::HttpServer)), taken once after all
//! registrations.

use http::Method;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dispatcher::{Dispatcher, Handler, HandlerResult};
use crate::registry::{MethodRule, RouteEntry, RouteKind, RouteRegistry};
use crate::router::accept::WILDCARD_TYPE;
use crate::router::{PatternError, RoutePattern, Router};
use crate::runtime_config::EngineConfig;
use crate::server::request::{HttpRequest, RequestContext};
use crate::server::response::{HttpResponse, ResponseContext};

/// An embeddable routing and dispatch engine.
///
/// Client code registers handlers and filters against method/path/accept
/// triples, then feeds parsed requests through [`Engine::dispatch`], which
/// always returns a complete response descriptor: not-found, halts, and
/// handler faults are all resolved internally.
///
/// ```rust
/// use flint::{Engine, HttpRequest};
///
/// let engine = Engine::new();
/// engine.get("/hello/:name", |req, _res| {
///     Ok(Some(format!("Hello {}!", req.param("name").unwrap_or("world"))))
/// })?;
///
/// let response = engine.dispatch(HttpRequest::new("GET", "/hello/flint"));
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, b"Hello flint!");
/// # Ok::<(), flint::PatternError>(())
/// ```
pub struct Engine {
    registry: RouteRegistry,
    config: EngineConfig,
}

impl Engine {
    /// An engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// An engine with explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            registry: RouteRegistry::new(),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a handler for `method` and `path_spec`, producing
    /// `accept_type`.
    ///
    /// # Errors
    ///
    /// Fails with [`PatternError`] when `path_spec` is malformed; nothing is
    /// registered in that case.
    pub fn route<F>(
        &self,
        method: Method,
        path_spec: &str,
        accept_type: &str,
        handler: F,
    ) -> Result<(), PatternError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_entry(
            MethodRule::Exact(method),
            path_spec,
            accept_type,
            RouteKind::Handler,
            Arc::new(handler),
        )
    }

    /// Register a filter of `kind` for `path_spec`, applying to requests
    /// whose `Accept` header negotiates against `accept_type`. Filters match
    /// every HTTP method.
    pub fn filter<F>(
        &self,
        kind: RouteKind,
        path_spec: &str,
        accept_type: &str,
        filter: F,
    ) -> Result<(), PatternError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.add_entry(MethodRule::Any, path_spec, accept_type, kind, Arc::new(filter))
    }

    fn add_entry(
        &self,
        method: MethodRule,
        path_spec: &str,
        accept_type: &str,
        kind: RouteKind,
        handler: Handler,
    ) -> Result<(), PatternError> {
        let pattern = RoutePattern::compile(path_spec)?;
        let accept = if accept_type.trim().is_empty() {
            WILDCARD_TYPE.to_string()
        } else {
            accept_type.to_string()
        };
        self.registry.add(RouteEntry {
            method,
            pattern,
            accept,
            kind,
            handler,
        });
        Ok(())
    }

    /// Register a before-filter on `path_spec`.
    pub fn before<F>(&self, path_spec: &str, filter: F) -> Result<(), PatternError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.filter(RouteKind::Before, path_spec, WILDCARD_TYPE, filter)
    }

    /// Register an after-filter on `path_spec`.
    pub fn after<F>(&self, path_spec: &str, filter: F) -> Result<(), PatternError>
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.filter(RouteKind::After, path_spec, WILDCARD_TYPE, filter)
    }

    /// Register a before-filter that runs on every request.
    pub fn before_all<F>(&self, filter: F)
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        // "/*" always compiles.
        if let Err(err) = self.before("/*", filter) {
            warn!(error = %err, "pathless before-filter registration failed");
        }
    }

    /// Register an after-filter that runs on every request.
    pub fn after_all<F>(&self, filter: F)
    where
        F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync + 'static,
    {
        if let Err(err) = self.after("/*", filter) {
            warn!(error = %err, "pathless after-filter registration failed");
        }
    }

    /// Remove every registered route and filter. Idempotent; used on
    /// shutdown and test teardown.
    pub fn clear_routes(&self) {
        self.registry.clear();
    }

    /// Number of registered entries.
    pub fn route_count(&self) -> usize {
        self.registry.len()
    }

    /// Dispatch one parsed request through the matched filter/handler chain.
    ///
    /// This is the single per-request entry point. It never fails outward:
    /// unmatched requests become 404, halts carry exactly the caller's
    /// status and body, and unhandled faults become a generic 500.
    pub fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let mut res = ResponseContext::new();
        let mut req = match RequestContext::new(request, self.config.body_limit) {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!(error = %err, "rejecting request with invalid method token");
                res.set_status(400);
                res.set_body("Bad request");
                return res.finalize();
            }
        };

        let accept = req.header("accept").map(str::to_string);
        let router = Router::new(self.registry.snapshot());
        let matched = router.match_request(req.method(), req.path(), accept.as_deref());

        let method = req.method().clone();
        let path = req.path().to_string();
        Dispatcher::new(self.config.run_after_on_not_found).dispatch(matched, &mut req, &mut res);

        let response = res.finalize();
        info!(method = %method, path = %path, status = response.status, "request dispatched");
        response
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! verb_registrar {
    ($(#[$doc:meta] $name:ident => $method:ident),* $(,)?) => {
        impl Engine {
            $(
                #[$doc]
                ///
                /// # Errors
                ///
                /// Fails with [`PatternError`] when `path_spec` is malformed.
                pub fn $name<F>(&self, path_spec: &str, handler: F) -> Result<(), PatternError>
                where
                    F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult
                        + Send
                        + Sync
                        + 'static,
                {
                    self.route(Method::$method, path_spec, WILDCARD_TYPE, handler)
                }
            )*
        }
    };
}

verb_registrar! {
    /// Register a GET handler.
    get => GET,
    /// Register a POST handler.
    post => POST,
    /// Register a PUT handler.
    put => PUT,
    /// Register a DELETE handler.
    delete => DELETE,
    /// Register a PATCH handler.
    patch => PATCH,
    /// Register a HEAD handler.
    head => HEAD,
    /// Register an OPTIONS handler.
    options => OPTIONS,
    /// Register a TRACE handler.
    trace => TRACE,
    /// Register a CONNECT handler.
    connect => CONNECT,
}
