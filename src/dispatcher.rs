//! # Dispatcher
//!
//! Per-request execution protocol around a matched route:
//!
//! ```text
//! START → RUN_BEFORE* → RUN_HANDLER → RUN_AFTER* → FINALIZE
//!            │               │            │
//!            └──── halt ─────┴── error ───┴──→ FINALIZE
//! ```
//!
//! Before-filters run in registration order and may mutate the response or
//! halt. An absent handler produces a 404 (after-filters are skipped by
//! default, see [`EngineConfig`](crate::runtime_config::EngineConfig)).
//! After-filters run only following a normal handler completion. Any
//! unhandled error or panic inside a filter or handler becomes a generic
//! 500; the detail is logged, never leaked to the client body. Finalization
//! itself lives with the engine and runs exactly once per request on every
//! path.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::router::{MatchResult, MatchedRoute};
use crate::server::request::RequestContext;
use crate::server::response::ResponseContext;

/// Body sent on 404 responses.
pub(crate) const NOT_FOUND_BODY: &str = "Not found";
/// Body sent on 500 responses. Fault detail is logged, never sent.
pub(crate) const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// Control signal raised from inside a filter or handler execution.
///
/// `Halt` is not a failure: it terminates the remaining chain early with
/// exactly the status and body the caller supplied. `Fault` is an unhandled
/// error and resolves to a generic 500. Constructing either value outside
/// an active dispatch is inert; the signal only takes effect when returned
/// to the dispatcher.
pub enum Interrupt {
    /// Explicit early termination with caller-chosen status and body.
    Halt {
        /// Response status to send.
        status: u16,
        /// Response body, sent verbatim.
        body: String,
    },
    /// Unhandled error raised by a filter or handler.
    Fault(anyhow::Error),
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Halt { status, .. } => f.debug_struct("Halt").field("status", status).finish(),
            Interrupt::Fault(e) => f.debug_tuple("Fault").field(e).finish(),
        }
    }
}

impl From<anyhow::Error> for Interrupt {
    fn from(err: anyhow::Error) -> Self {
        Interrupt::Fault(err)
    }
}

/// Immediately stop request processing with the given status and body.
///
/// Return this from a before-filter, handler, or after-filter:
///
/// ```rust,ignore
/// engine.before("/protected/*", |req, _res| {
///     if req.header("authorization").is_none() {
///         return Err(halt(401, "Go away!"));
///     }
///     Ok(None)
/// })?;
/// ```
pub fn halt(status: u16, body: impl Into<String>) -> Interrupt {
    Interrupt::Halt {
        status,
        body: body.into(),
    }
}

/// What a filter or handler execution produces: an optional body value
/// (used only for handlers) or an [`Interrupt`].
pub type HandlerResult = Result<Option<String>, Interrupt>;

/// A registered callable: `(request, response) -> value-or-interrupt`.
pub type Handler =
    Arc<dyn Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync>;

enum Step {
    Continue(Option<String>),
    Halted,
    Errored,
}

/// Runs the matched filter/handler chain for one request.
pub struct Dispatcher {
    run_after_on_not_found: bool,
}

impl Dispatcher {
    pub fn new(run_after_on_not_found: bool) -> Self {
        Self {
            run_after_on_not_found,
        }
    }

    /// Execute the protocol over one match result. Terminal on the first
    /// halt or error; never panics outward.
    pub fn dispatch(
        &self,
        matched: MatchResult,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) {
        for filter in matched.before {
            match self.run_unit(filter, req, res) {
                Step::Continue(_) => {}
                Step::Halted | Step::Errored => return,
            }
        }

        let Some(handler) = matched.handler else {
            debug!(path = req.path(), "no handler matched");
            res.set_status(404);
            res.set_body(NOT_FOUND_BODY);
            if self.run_after_on_not_found {
                for filter in matched.after {
                    match self.run_unit(filter, req, res) {
                        Step::Continue(_) => {}
                        Step::Halted | Step::Errored => return,
                    }
                }
            }
            return;
        };

        // A handler's return value becomes the body only when the handler
        // did not itself write one through the response context.
        res.reset_body_written();
        match self.run_unit(handler, req, res) {
            Step::Continue(Some(value)) => {
                if !res.body_written() {
                    res.set_body(value);
                }
            }
            Step::Continue(None) => {}
            Step::Halted | Step::Errored => return,
        }

        for filter in matched.after {
            match self.run_unit(filter, req, res) {
                Step::Continue(_) => {}
                Step::Halted | Step::Errored => return,
            }
        }
    }

    fn run_unit(
        &self,
        unit: MatchedRoute,
        req: &mut RequestContext,
        res: &mut ResponseContext,
    ) -> Step {
        let pattern = unit.entry.pattern.raw().to_string();
        req.bind(unit.params, unit.wildcard);
        let handler = Arc::clone(&unit.entry.handler);
        match catch_unwind(AssertUnwindSafe(|| handler(&mut *req, &mut *res))) {
            Ok(Ok(value)) => Step::Continue(value),
            Ok(Err(Interrupt::Halt { status, body })) => {
                debug!(pattern = %pattern, status, "dispatch halted");
                res.set_status(status);
                res.set_body(body);
                Step::Halted
            }
            Ok(Err(Interrupt::Fault(err))) => {
                error!(pattern = %pattern, error = %format!("{err:#}"), "handler fault");
                self.errored(res);
                Step::Errored
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(pattern = %pattern, error = %detail, "handler panicked");
                self.errored(res);
                Step::Errored
            }
        }
    }

    fn errored(&self, res: &mut ResponseContext) {
        res.set_status(500);
        res.set_body(INTERNAL_ERROR_BODY);
    }
}
