//! Lifecycle hooks fired around each dispatched request.
//!
//! # Design
//! Each event has an ordered list of callbacks. Callbacks receive a typed
//! `HookPayload` instead of loose arguments, so the shape of what a
//! `Response` hook sees differs statically from a `Request` hook.
//!
//! Hooks observe; they never steer the request. A callback that returns
//! `Err` or panics is logged and skipped, and the rest of the list still
//! runs.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::error::HookError;
use crate::http::{HttpMethod, HttpResponse};
use crate::request::RequestOptions;

/// Points in the request lifecycle a callback can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// Before the network call, with the full request options.
    Request,
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    /// After the body was read and parsed.
    Response,
    /// Status in `200..300`.
    Ok,
    /// Any other status.
    Error,
}

impl HookEvent {
    /// The verb-specific event for `method`.
    pub fn for_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => HookEvent::Get,
            HttpMethod::Post => HookEvent::Post,
            HttpMethod::Put => HookEvent::Put,
            HttpMethod::Delete => HookEvent::Delete,
            HttpMethod::Patch => HookEvent::Patch,
            HttpMethod::Head => HookEvent::Head,
            HttpMethod::Options => HookEvent::Options,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::Request => "request",
            HookEvent::Get => "get",
            HookEvent::Post => "post",
            HookEvent::Put => "put",
            HookEvent::Delete => "delete",
            HookEvent::Patch => "patch",
            HookEvent::Head => "head",
            HookEvent::Options => "options",
            HookEvent::Response => "response",
            HookEvent::Ok => "ok",
            HookEvent::Error => "error",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific arguments handed to a callback.
#[derive(Debug, Clone, Copy)]
pub enum HookPayload<'a> {
    Request(&'a RequestOptions),
    /// Verb events. `url` is the path as the caller passed it; base URL and
    /// auth query parameters are applied afterwards.
    Verb {
        method: HttpMethod,
        url: &'a str,
        body: Option<&'a Value>,
    },
    Response(&'a HttpResponse),
    /// `Ok` and `Error` events.
    Outcome(&'a ResponseEnvelope),
}

pub type Callback = Arc<dyn Fn(&HookPayload<'_>) -> Result<(), HookError> + Send + Sync>;

/// Ordered callback lists keyed by event. Registration is additive only.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<HookEvent, Vec<Callback>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: HookEvent, callback: F)
    where
        F: Fn(&HookPayload<'_>) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.entry(event).or_default().push(Arc::new(callback));
    }

    /// Callbacks for `event`, cloned out so they can run without a borrow of
    /// the registry.
    pub fn callbacks(&self, event: HookEvent) -> Vec<Callback> {
        self.hooks.get(&event).cloned().unwrap_or_default()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, callbacks) in &self.hooks {
            map.entry(&event.as_str(), &callbacks.len());
        }
        map.finish()
    }
}

/// Run `callbacks` in order, swallowing errors and panics.
pub fn fire(callbacks: &[Callback], event: HookEvent, payload: &HookPayload<'_>) {
    for (index, callback) in callbacks.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(event = %event, index, error = %err, "hook callback failed");
            }
            Err(_) => {
                tracing::warn!(event = %event, index, "hook callback panicked");
            }
        }
    }
}
