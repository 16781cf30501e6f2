//! Navigation arbitration: which location does a request drive?
//!
//! Each push/replace picks one of two strategies from the target
//! application's classification, re-evaluated on every call:
//!
//! | Application | Strategy | Compares against | Mutates |
//! |-------------|----------|------------------|---------|
//! | active (mounted, visible) | [`VirtualStrategy`] | virtual location | virtual history + location-change notification |
//! | inactive (unmounted or kept alive hidden) | [`HostStrategy`] | path decoded from host URL | real history with encoded host URL |
//!
//! Both strategies share one contract: resolve the requested path, report the
//! current full path, apply a navigation. A request whose resolved full path
//! equals the current one is a no-op on either channel.
//!
//! `go`/`back`/`forward` are not arbitrated; they move the host's single
//! combined timeline and the resulting real URL change reaches applications
//! through their sandboxes.

use crate::error::{NavigationChannel, NavigationError, NavigationResult};
use crate::host::{HistoryBridge, HistoryMethod, LocationCodec, SandboxRegistry, VirtualContext};
use crate::location::LocationSnapshot;
use crate::router::NavigationRequest;
use crate::{debug_log, error_log, info_log};
use serde_json::Value;
use std::rc::Rc;

// ============================================================================
// NavigateOp
// ============================================================================

/// Which public operation issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateOp {
    Push,
    Replace,
}

impl NavigateOp {
    /// Operation name used in reported errors.
    pub fn as_str(self) -> &'static str {
        match self {
            NavigateOp::Push => "push",
            NavigateOp::Replace => "replace",
        }
    }

    /// History method for this operation given the request's `replace` flag.
    ///
    /// `push` replaces only when asked to (`Some(true)`); `replace` replaces
    /// unless explicitly told not to (`Some(false)`).
    pub fn method(self, replace: Option<bool>) -> HistoryMethod {
        let replace = match self {
            NavigateOp::Push => replace == Some(true),
            NavigateOp::Replace => replace != Some(false),
        };
        if replace {
            HistoryMethod::Replace
        } else {
            HistoryMethod::Push
        }
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// One channel a navigation can be applied to.
pub trait NavigationStrategy {
    /// Which channel this strategy drives.
    fn channel(&self) -> NavigationChannel;

    /// Resolve a requested path into the target location.
    fn resolve(&self, path: &str) -> Result<LocationSnapshot, url::ParseError>;

    /// Full path the application is currently at on this channel.
    fn current_full_path(&self) -> Option<String>;

    /// Apply the navigation and return the full path written.
    fn apply(
        &self,
        method: HistoryMethod,
        target: &LocationSnapshot,
        state: Option<&Value>,
    ) -> String;
}

/// Drives an active application's sandboxed history.
pub struct VirtualStrategy<'a> {
    app_name: &'a str,
    context: Rc<dyn VirtualContext>,
    sandbox: &'a dyn SandboxRegistry,
}

impl<'a> VirtualStrategy<'a> {
    pub fn new(
        app_name: &'a str,
        context: Rc<dyn VirtualContext>,
        sandbox: &'a dyn SandboxRegistry,
    ) -> Self {
        Self {
            app_name,
            context,
            sandbox,
        }
    }
}

impl NavigationStrategy for VirtualStrategy<'_> {
    fn channel(&self) -> NavigationChannel {
        NavigationChannel::Virtual
    }

    fn resolve(&self, path: &str) -> Result<LocationSnapshot, url::ParseError> {
        LocationSnapshot::resolve(&self.context.base_url(), path)
    }

    fn current_full_path(&self) -> Option<String> {
        Some(self.context.location().full_path())
    }

    fn apply(
        &self,
        method: HistoryMethod,
        target: &LocationSnapshot,
        state: Option<&Value>,
    ) -> String {
        let full_path = target.full_path();
        self.context.navigate(method, &full_path, state);
        self.sandbox
            .notify_location_change(self.app_name, self.context.as_ref(), state);
        full_path
    }
}

/// Encodes an inactive application's location into the host URL.
pub struct HostStrategy<'a> {
    app_name: &'a str,
    codec: &'a dyn LocationCodec,
    history: &'a dyn HistoryBridge,
    origin: String,
}

impl<'a> HostStrategy<'a> {
    pub fn new(
        app_name: &'a str,
        codec: &'a dyn LocationCodec,
        history: &'a dyn HistoryBridge,
    ) -> Self {
        Self {
            app_name,
            codec,
            history,
            origin: history.origin(),
        }
    }
}

impl NavigationStrategy for HostStrategy<'_> {
    fn channel(&self) -> NavigationChannel {
        NavigationChannel::Host
    }

    fn resolve(&self, path: &str) -> Result<LocationSnapshot, url::ParseError> {
        LocationSnapshot::resolve(&self.origin, path)
    }

    fn current_full_path(&self) -> Option<String> {
        self.codec.decode(self.app_name)
    }

    fn apply(
        &self,
        method: HistoryMethod,
        target: &LocationSnapshot,
        state: Option<&Value>,
    ) -> String {
        let encoded = self.codec.encode(self.app_name, target);
        let state = self.history.compose_state(
            self.app_name,
            &self.history.state(),
            state,
            &self.origin,
            &encoded.search_hash,
        );
        self.history.navigate(method, &encoded.full_path, state);
        encoded.full_path
    }
}

// ============================================================================
// Arbitrator
// ============================================================================

/// Chooses a strategy per request and applies it.
#[derive(Clone)]
pub struct Arbitrator {
    codec: Rc<dyn LocationCodec>,
    history: Rc<dyn HistoryBridge>,
    sandbox: Rc<dyn SandboxRegistry>,
}

impl Arbitrator {
    pub fn new(
        codec: Rc<dyn LocationCodec>,
        history: Rc<dyn HistoryBridge>,
        sandbox: Rc<dyn SandboxRegistry>,
    ) -> Self {
        Self {
            codec,
            history,
            sandbox,
        }
    }

    pub fn codec(&self) -> &dyn LocationCodec {
        self.codec.as_ref()
    }

    /// Run a push or replace request.
    pub fn navigate(&self, op: NavigateOp, request: &NavigationRequest) -> NavigationResult {
        let operation = op.as_str();
        let strategy = match self
            .validate(operation, &request.name)
            .and_then(|()| self.strategy(operation, &request.name))
        {
            Ok(strategy) => strategy,
            Err(error) => return report(error),
        };

        let target = match strategy.resolve(&request.path) {
            Ok(target) => target,
            Err(err) => {
                return report(NavigationError::InvalidPath {
                    operation,
                    path: request.path.clone(),
                    message: err.to_string(),
                })
            }
        };

        let method = op.method(request.replace);
        apply(
            strategy.as_ref(),
            &request.name,
            method,
            &target,
            request.state.as_ref(),
        )
    }

    /// Encode an active application's virtual location into the host URL
    /// without adding a history entry.
    pub fn attach_to_url(&self, app_name: &str) -> NavigationResult {
        const OPERATION: &str = "attach_to_url";

        if let Err(error) = self.validate(OPERATION, app_name) {
            return report(error);
        }
        if !self.sandbox.is_active(app_name) {
            return report(NavigationError::InvalidRequest {
                operation: OPERATION,
                message: format!("application '{}' is not active", app_name),
            });
        }
        let Some(context) = self.sandbox.virtual_context(app_name) else {
            return report(NavigationError::SandboxClosed {
                operation: OPERATION,
                name: app_name.to_string(),
            });
        };

        let target = context.location();
        let strategy = HostStrategy::new(app_name, self.codec.as_ref(), self.history.as_ref());
        apply(&strategy, app_name, HistoryMethod::Replace, &target, None)
    }

    /// [`attach_to_url`](Self::attach_to_url) for every active application.
    pub fn attach_all_to_url(&self) -> Vec<NavigationResult> {
        self.sandbox
            .active_apps()
            .iter()
            .map(|app_name| self.attach_to_url(app_name))
            .collect()
    }

    pub fn go(&self, delta: i32) {
        debug_log!("Delegating go({}) to host history", delta);
        self.history.go(delta);
    }

    pub fn back(&self) {
        debug_log!("Delegating back() to host history");
        self.history.back();
    }

    pub fn forward(&self) {
        debug_log!("Delegating forward() to host history");
        self.history.forward();
    }

    fn validate(&self, operation: &'static str, app_name: &str) -> Result<(), NavigationError> {
        if app_name.trim().is_empty() {
            return Err(NavigationError::InvalidRequest {
                operation,
                message: "application name is empty".to_string(),
            });
        }
        if !self.sandbox.contains(app_name) {
            return Err(NavigationError::UnknownApplication {
                operation,
                name: app_name.to_string(),
            });
        }
        Ok(())
    }

    fn strategy<'a>(
        &'a self,
        operation: &'static str,
        app_name: &'a str,
    ) -> Result<Box<dyn NavigationStrategy + 'a>, NavigationError> {
        if !self.sandbox.is_active(app_name) {
            return Ok(Box::new(HostStrategy::new(
                app_name,
                self.codec.as_ref(),
                self.history.as_ref(),
            )));
        }
        match self.sandbox.virtual_context(app_name) {
            Some(context) => Ok(Box::new(VirtualStrategy::new(
                app_name,
                context,
                self.sandbox.as_ref(),
            ))),
            None => Err(NavigationError::SandboxClosed {
                operation,
                name: app_name.to_string(),
            }),
        }
    }
}

fn apply(
    strategy: &dyn NavigationStrategy,
    app_name: &str,
    method: HistoryMethod,
    target: &LocationSnapshot,
    state: Option<&Value>,
) -> NavigationResult {
    let full_path = target.full_path();
    if strategy.current_full_path().as_deref() == Some(full_path.as_str()) {
        debug_log!("Navigation for '{}' unchanged at '{}'", app_name, full_path);
        return NavigationResult::Unchanged {
            app: app_name.to_string(),
            full_path,
        };
    }

    let channel = strategy.channel();
    let written = strategy.apply(method, target, state);
    info_log!(
        "{:?} navigation of '{}' via {} to '{}'",
        channel,
        app_name,
        method,
        written
    );
    NavigationResult::Navigated {
        app: app_name.to_string(),
        full_path: written,
        method,
        channel,
    }
}

fn report(error: NavigationError) -> NavigationResult {
    error_log!("{}", error);
    NavigationResult::Failed(error)
}
