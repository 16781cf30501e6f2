//! The public router surface.
//!
//! [`MicroRouter`] composes the [`GuardPipeline`], the [`Arbitrator`] and the
//! [`DefaultPages`] store behind one object. It adds no logic of its own.
//!
//! # Construction
//!
//! ```
//! use micro_navigator::memory::MemoryHost;
//! use micro_navigator::{IdleQueue, MicroRouter, NavigationRequest};
//! use std::rc::Rc;
//!
//! let queue = IdleQueue::new();
//! let host = MemoryHost::new("http://localhost:3000", Rc::new(queue.clone()));
//! let router = MicroRouter::builder()
//!     .pipeline(host.pipeline())
//!     .codec(host.clone())
//!     .history(host.clone())
//!     .sandbox(host.clone())
//!     .default_pages(host.default_pages())
//!     .try_build()
//!     .expect("all collaborators set");
//!
//! host.register_app("orders", "http://localhost:3000/orders/");
//! let result = router.replace(NavigationRequest::new("orders", "/orders/list"));
//! assert!(result.is_navigated());
//! assert_eq!(router.decode("orders").as_deref(), Some("/orders/list"));
//! ```

use crate::arbitrator::{Arbitrator, NavigateOp};
use crate::default_page::{DefaultPageRegistration, DefaultPages};
use crate::error::NavigationResult;
use crate::guards::{GuardRef, GuardRegistration};
use crate::host::{EncodedLocation, HistoryBridge, LocationCodec, SandboxRegistry};
use crate::ledger::CurrentView;
use crate::location::LocationSnapshot;
use crate::pipeline::GuardPipeline;
use crate::scheduler::TaskScheduler;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// NavigationRequest
// ============================================================================

/// A push/replace request for one application.
///
/// `path` resolves against the application's base URL when it is active and
/// against the host origin otherwise. An origin inside `path` is accepted but
/// only its path, search and hash are used.
///
/// ```
/// use micro_navigator::NavigationRequest;
/// use serde_json::json;
///
/// let request = NavigationRequest::new("orders", "/orders/42")
///     .with_replace(false)
///     .with_state(json!({ "from": "dashboard" }));
/// assert_eq!(request.replace, Some(false));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationRequest {
    /// Target application name.
    pub name: String,
    /// Path to navigate to.
    pub path: String,
    /// Override the operation's default history method.
    pub replace: Option<bool>,
    /// Caller state merged into the real history state (inactive apps) or
    /// handed to the virtual history (active apps).
    pub state: Option<Value>,
}

impl NavigationRequest {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            replace: None,
            state: None,
        }
    }

    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = Some(replace);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

// ============================================================================
// MicroRouter
// ============================================================================

/// Navigation synchronization for the sub-applications of one host page.
#[derive(Clone)]
pub struct MicroRouter {
    pipeline: GuardPipeline,
    arbitrator: Arbitrator,
    default_pages: DefaultPages,
}

impl MicroRouter {
    /// Create a router from its parts.
    ///
    /// `pipeline` and `default_pages` must be the ones the sandbox side
    /// reports to and reads at mount time.
    pub fn new(
        pipeline: GuardPipeline,
        default_pages: DefaultPages,
        codec: Rc<dyn LocationCodec>,
        history: Rc<dyn HistoryBridge>,
        sandbox: Rc<dyn SandboxRegistry>,
    ) -> Self {
        Self {
            pipeline,
            arbitrator: Arbitrator::new(codec, history, sandbox),
            default_pages,
        }
    }

    /// Start building a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Last recorded location of every application.
    pub fn current(&self) -> CurrentView {
        self.pipeline.current()
    }

    /// The pipeline sandboxes report navigations to.
    pub fn pipeline(&self) -> &GuardPipeline {
        &self.pipeline
    }

    pub fn encode(&self, app_name: &str, target: &LocationSnapshot) -> EncodedLocation {
        self.arbitrator.codec().encode(app_name, target)
    }

    pub fn decode(&self, app_name: &str) -> Option<String> {
        self.arbitrator.codec().decode(app_name)
    }

    /// Navigate with push semantics unless `request.replace == Some(true)`.
    pub fn push(&self, request: NavigationRequest) -> NavigationResult {
        self.arbitrator.navigate(NavigateOp::Push, &request)
    }

    /// Navigate with replace semantics unless `request.replace == Some(false)`.
    pub fn replace(&self, request: NavigationRequest) -> NavigationResult {
        self.arbitrator.navigate(NavigateOp::Replace, &request)
    }

    pub fn go(&self, delta: i32) {
        self.arbitrator.go(delta);
    }

    pub fn back(&self) {
        self.arbitrator.back();
    }

    pub fn forward(&self) {
        self.arbitrator.forward();
    }

    pub fn before_each(&self, guard: GuardRef) -> GuardRegistration {
        self.pipeline.before_each(guard)
    }

    pub fn after_each(&self, guard: GuardRef) -> GuardRegistration {
        self.pipeline.after_each(guard)
    }

    /// See [`GuardPipeline::execute_navigation_guard`].
    pub fn execute_navigation_guard(
        &self,
        app_name: &str,
        to: LocationSnapshot,
        from: Option<LocationSnapshot>,
    ) {
        self.pipeline.execute_navigation_guard(app_name, to, from);
    }

    /// See [`GuardPipeline::clear_current_when_unmount`].
    pub fn clear_current_when_unmount(&self, app_name: &str) {
        self.pipeline.clear_current_when_unmount(app_name);
    }

    pub fn set_default_page(
        &self,
        app_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Option<DefaultPageRegistration> {
        self.default_pages.set(app_name, path)
    }

    pub fn remove_default_page(&self, app_name: &str) -> Option<String> {
        self.default_pages.remove(app_name)
    }

    pub fn default_page(&self, app_name: &str) -> Option<String> {
        self.default_pages.get(app_name)
    }

    /// Write an active application's virtual location into the host URL.
    pub fn attach_to_url(&self, app_name: &str) -> NavigationResult {
        self.arbitrator.attach_to_url(app_name)
    }

    /// [`attach_to_url`](Self::attach_to_url) for every active application.
    pub fn attach_all_to_url(&self) -> Vec<NavigationResult> {
        self.arbitrator.attach_all_to_url()
    }
}

impl fmt::Debug for MicroRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicroRouter")
            .field("pipeline", &self.pipeline)
            .field("default_pages", &self.default_pages)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouterBuilder
// ============================================================================

/// Builder for [`MicroRouter`].
///
/// Codec, history, sandbox and the default page store are required. The
/// pipeline is either given directly (to share it with the sandbox side) or
/// created from a scheduler.
#[must_use]
#[derive(Default)]
pub struct RouterBuilder {
    codec: Option<Rc<dyn LocationCodec>>,
    history: Option<Rc<dyn HistoryBridge>>,
    sandbox: Option<Rc<dyn SandboxRegistry>>,
    scheduler: Option<Rc<dyn TaskScheduler>>,
    pipeline: Option<GuardPipeline>,
    default_pages: Option<DefaultPages>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codec(mut self, codec: Rc<dyn LocationCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn history(mut self, history: Rc<dyn HistoryBridge>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn sandbox(mut self, sandbox: Rc<dyn SandboxRegistry>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Scheduler for after-guards; ignored when a pipeline is given.
    pub fn scheduler(mut self, scheduler: Rc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Use an existing pipeline.
    pub fn pipeline(mut self, pipeline: GuardPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Default page store shared with the sandbox side.
    pub fn default_pages(mut self, default_pages: DefaultPages) -> Self {
        self.default_pages = Some(default_pages);
        self
    }

    /// Build the router, or `None` if a required collaborator is missing.
    #[must_use]
    pub fn try_build(self) -> Option<MicroRouter> {
        let pipeline = match (self.pipeline, self.scheduler) {
            (Some(pipeline), _) => pipeline,
            (None, Some(scheduler)) => GuardPipeline::new(scheduler),
            (None, None) => return None,
        };
        Some(MicroRouter::new(
            pipeline,
            self.default_pages?,
            self.codec?,
            self.history?,
            self.sandbox?,
        ))
    }
}
