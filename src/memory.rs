//! In-memory host.
//!
//! [`MemoryHost`] implements [`LocationCodec`], [`HistoryBridge`] and
//! [`SandboxRegistry`] without a browser:
//!
//! - the **real history** is a stack of `(full path, state)` entries; push
//!   truncates forward entries, `go` moves a cursor and then syncs active
//!   sandboxes with the new host URL (the popstate a browser would fire);
//! - the **codec** stores each application's full path as a form-encoded
//!   query parameter named after the application
//!   (`/?orders=%2Forders%2Flist&billing=%2F`);
//! - each **sandbox** ([`MemorySandbox`]) owns a virtual history stack of
//!   the same shape, carrying the caller state, and reports every location
//!   change to the shared [`GuardPipeline`], as a real sandbox would.
//!
//! Mount state is `Unmounted`, `Active` or `Hidden` (kept alive but not
//! rendered). Only `Active` applications count as active.

use crate::default_page::DefaultPages;
use crate::host::{
    EncodedLocation, HistoryBridge, HistoryMethod, LocationCodec, SandboxRegistry, VirtualContext,
};
use crate::location::LocationSnapshot;
use crate::pipeline::GuardPipeline;
use crate::scheduler::TaskScheduler;
use crate::{debug_log, trace_log};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use url::form_urlencoded;

// ============================================================================
// Real history
// ============================================================================

/// One entry of the in-memory real history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub full_path: String,
    pub state: Value,
}

#[derive(Debug)]
struct RealHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl RealHistory {
    fn new(full_path: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                full_path: full_path.to_string(),
                state: Value::Null,
            }],
            cursor: 0,
        }
    }

    fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    fn apply(&mut self, method: HistoryMethod, entry: HistoryEntry) {
        match method {
            HistoryMethod::Push => {
                self.entries.truncate(self.cursor + 1);
                self.entries.push(entry);
                self.cursor = self.entries.len() - 1;
            }
            HistoryMethod::Replace => self.entries[self.cursor] = entry,
        }
    }

    /// Move by `delta`; out-of-range moves are ignored.
    fn go(&mut self, delta: i32) -> bool {
        let Some(target) = self.cursor.checked_add_signed(delta as isize) else {
            return false;
        };
        if delta == 0 || target >= self.entries.len() {
            return false;
        }
        self.cursor = target;
        true
    }
}

// ============================================================================
// MemorySandbox
// ============================================================================

/// Mount state of an in-memory application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Unmounted,
    Active,
    /// Kept alive but not rendered.
    Hidden,
}

/// A location-change notification delivered into a sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationChange {
    pub app_name: String,
    pub full_path: String,
    pub payload: Option<Value>,
}

/// An application's virtual browsing context.
pub struct MemorySandbox {
    name: String,
    base_url: String,
    status: Cell<AppStatus>,
    closed: Cell<bool>,
    location: RefCell<LocationSnapshot>,
    history: RefCell<RealHistory>,
    calls: RefCell<Vec<(HistoryMethod, String)>>,
    pipeline: GuardPipeline,
}

impl MemorySandbox {
    fn new(name: &str, base_url: &str, pipeline: GuardPipeline) -> Self {
        let location = LocationSnapshot::resolve(base_url, "").unwrap_or_default();
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            status: Cell::new(AppStatus::Unmounted),
            closed: Cell::new(false),
            history: RefCell::new(RealHistory::new(&location.full_path())),
            location: RefCell::new(location),
            calls: RefCell::new(Vec::new()),
            pipeline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AppStatus {
        self.status.get()
    }

    /// Every method/path applied to the virtual history, in order.
    pub fn calls(&self) -> Vec<(HistoryMethod, String)> {
        self.calls.borrow().clone()
    }

    /// Number of entries in the virtual history.
    pub fn history_len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    /// State stored with the current virtual history entry.
    pub fn state(&self) -> Value {
        self.history.borrow().current().state.clone()
    }

    // Start over with a single entry, as a fresh mount does.
    fn reset_history(&self, location: &LocationSnapshot) {
        *self.history.borrow_mut() = RealHistory::new(&location.full_path());
    }

    // The sandbox observed a location change not made through its history,
    // e.g. a host popstate. The current entry follows it.
    fn sync_location(&self, location: LocationSnapshot) {
        self.history.borrow_mut().apply(
            HistoryMethod::Replace,
            HistoryEntry {
                full_path: location.full_path(),
                state: Value::Null,
            },
        );
        self.record(location);
    }

    fn record(&self, location: LocationSnapshot) {
        *self.location.borrow_mut() = location.clone();
        self.pipeline.record_navigation(&self.name, location);
    }
}

impl VirtualContext for MemorySandbox {
    fn location(&self) -> LocationSnapshot {
        self.location.borrow().clone()
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn navigate(&self, method: HistoryMethod, full_path: &str, state: Option<&Value>) {
        trace_log!("Virtual {} of '{}' to '{}'", method, self.name, full_path);
        self.calls
            .borrow_mut()
            .push((method, full_path.to_string()));
        self.history.borrow_mut().apply(
            method,
            HistoryEntry {
                full_path: full_path.to_string(),
                state: state.cloned().unwrap_or(Value::Null),
            },
        );
        self.record(LocationSnapshot::parse_full_path(full_path));
    }
}

impl fmt::Debug for MemorySandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySandbox")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("status", &self.status.get())
            .field("closed", &self.closed.get())
            .field("location", &self.location.borrow())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MemoryHost
// ============================================================================

/// Headless host document with sandboxed applications.
pub struct MemoryHost {
    origin: String,
    history: RefCell<RealHistory>,
    history_calls: RefCell<Vec<(HistoryMethod, String)>>,
    apps: RefCell<BTreeMap<String, Rc<MemorySandbox>>>,
    notifications: RefCell<Vec<LocationChange>>,
    pipeline: GuardPipeline,
    default_pages: DefaultPages,
}

impl MemoryHost {
    /// Host at `origin` with URL `/`.
    pub fn new(origin: &str, scheduler: Rc<dyn TaskScheduler>) -> Rc<Self> {
        Self::with_url(origin, "/", scheduler)
    }

    /// Host at `origin` with the given initial full path.
    pub fn with_url(origin: &str, full_path: &str, scheduler: Rc<dyn TaskScheduler>) -> Rc<Self> {
        Rc::new(Self {
            origin: origin.trim_end_matches('/').to_string(),
            history: RefCell::new(RealHistory::new(full_path)),
            history_calls: RefCell::new(Vec::new()),
            apps: RefCell::new(BTreeMap::new()),
            notifications: RefCell::new(Vec::new()),
            pipeline: GuardPipeline::new(scheduler),
            default_pages: DefaultPages::new(),
        })
    }

    /// The pipeline every sandbox of this host reports to.
    pub fn pipeline(&self) -> GuardPipeline {
        self.pipeline.clone()
    }

    /// Default pages consulted by [`mount`](Self::mount).
    pub fn default_pages(&self) -> DefaultPages {
        self.default_pages.clone()
    }

    /// Create an unmounted application whose paths resolve against `base_url`.
    pub fn register_app(&self, name: &str, base_url: &str) -> Rc<MemorySandbox> {
        let sandbox = Rc::new(MemorySandbox::new(name, base_url, self.pipeline.clone()));
        self.apps
            .borrow_mut()
            .insert(name.to_string(), sandbox.clone());
        sandbox
    }

    pub fn sandbox(&self, name: &str) -> Option<Rc<MemorySandbox>> {
        self.apps.borrow().get(name).cloned()
    }

    /// Mount (or re-mount) an application and record its initial location.
    ///
    /// The initial path is the one encoded in the host URL, else the default
    /// page, else the base URL itself.
    pub fn mount(&self, name: &str) -> Option<LocationSnapshot> {
        let sandbox = self.sandbox(name)?;
        let path = self
            .decode(name)
            .or_else(|| self.default_pages.get(name))
            .unwrap_or_default();
        let location = LocationSnapshot::resolve(&sandbox.base_url, &path).ok()?;

        debug_log!("Mounting '{}' at '{}'", name, location);
        sandbox.closed.set(false);
        sandbox.status.set(AppStatus::Active);
        sandbox.reset_history(&location);
        sandbox.record(location.clone());
        Some(location)
    }

    /// Keep the application alive but stop rendering it.
    pub fn hide(&self, name: &str) {
        if let Some(sandbox) = self.sandbox(name) {
            sandbox.status.set(AppStatus::Hidden);
        }
    }

    /// Render a hidden application again.
    pub fn show(&self, name: &str) {
        if let Some(sandbox) = self.sandbox(name) {
            if sandbox.status.get() == AppStatus::Hidden {
                sandbox.status.set(AppStatus::Active);
            }
        }
    }

    /// Unmount and clear the application's recorded location.
    pub fn unmount(&self, name: &str) {
        if let Some(sandbox) = self.sandbox(name) {
            debug_log!("Unmounting '{}'", name);
            sandbox.status.set(AppStatus::Unmounted);
            self.pipeline.clear_current_when_unmount(name);
        }
    }

    /// Tear down the virtual context while the app still counts as mounted.
    pub fn close_sandbox(&self, name: &str) {
        if let Some(sandbox) = self.sandbox(name) {
            sandbox.closed.set(true);
        }
    }

    /// Current host full path.
    pub fn url(&self) -> String {
        self.history.borrow().current().full_path.clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    /// Every navigation applied to the real history, in order.
    pub fn history_calls(&self) -> Vec<(HistoryMethod, String)> {
        self.history_calls.borrow().clone()
    }

    /// Every location-change notification delivered, in order.
    pub fn notifications(&self) -> Vec<LocationChange> {
        self.notifications.borrow().clone()
    }

    fn host_location(&self) -> LocationSnapshot {
        LocationSnapshot::parse_full_path(&self.url())
    }

    // Active sandboxes follow the host URL after a traversal.
    fn dispatch_popstate(&self) {
        let active: Vec<_> = self
            .apps
            .borrow()
            .values()
            .filter(|sandbox| sandbox.status.get() == AppStatus::Active)
            .cloned()
            .collect();
        for sandbox in active {
            let Some(path) = self.decode(&sandbox.name) else {
                continue;
            };
            let Ok(location) = LocationSnapshot::resolve(&sandbox.base_url, &path) else {
                continue;
            };
            if location != sandbox.location() {
                sandbox.sync_location(location);
            }
        }
    }
}

impl LocationCodec for MemoryHost {
    fn encode(&self, app_name: &str, target: &LocationSnapshot) -> EncodedLocation {
        let host = self.host_location();
        let own = form_urlencoded::Serializer::new(String::new())
            .append_pair(app_name, &target.full_path())
            .finish();

        // Other parameters are kept byte for byte; only this app's key changes.
        let mut segments: Vec<&str> = host
            .search
            .trim_start_matches('?')
            .split('&')
            .filter(|segment| !segment.is_empty())
            .collect();
        match segments.iter().position(|segment| query_key(segment) == app_name) {
            Some(idx) => segments[idx] = own.as_str(),
            None => segments.push(own.as_str()),
        }

        let search = format!("?{}", segments.join("&"));
        let encoded = LocationSnapshot::new(host.pathname, search, host.hash);
        EncodedLocation {
            full_path: encoded.full_path(),
            search_hash: encoded.search_hash(),
        }
    }

    fn decode(&self, app_name: &str) -> Option<String> {
        let host = self.host_location();
        form_urlencoded::parse(host.search.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == app_name)
            .map(|(_, value)| value.into_owned())
    }
}

// Decoded key of one `key=value` query segment.
fn query_key(segment: &str) -> String {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

impl HistoryBridge for MemoryHost {
    fn navigate(&self, method: HistoryMethod, full_path: &str, state: Value) {
        trace_log!("Host {} to '{}'", method, full_path);
        self.history_calls
            .borrow_mut()
            .push((method, full_path.to_string()));
        self.history.borrow_mut().apply(
            method,
            HistoryEntry {
                full_path: full_path.to_string(),
                state,
            },
        );
    }

    fn state(&self) -> Value {
        self.history.borrow().current().state.clone()
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn go(&self, delta: i32) {
        let moved = self.history.borrow_mut().go(delta);
        if moved {
            self.dispatch_popstate();
        }
    }
}

impl SandboxRegistry for MemoryHost {
    fn contains(&self, app_name: &str) -> bool {
        self.apps.borrow().contains_key(app_name)
    }

    fn is_active(&self, app_name: &str) -> bool {
        self.sandbox(app_name)
            .is_some_and(|sandbox| sandbox.status.get() == AppStatus::Active)
    }

    fn virtual_context(&self, app_name: &str) -> Option<Rc<dyn VirtualContext>> {
        let sandbox = self.sandbox(app_name)?;
        if sandbox.closed.get() {
            return None;
        }
        Some(sandbox)
    }

    fn notify_location_change(
        &self,
        app_name: &str,
        context: &dyn VirtualContext,
        payload: Option<&Value>,
    ) {
        self.notifications.borrow_mut().push(LocationChange {
            app_name: app_name.to_string(),
            full_path: context.location().full_path(),
            payload: payload.cloned(),
        });
    }

    fn active_apps(&self) -> Vec<String> {
        self.apps
            .borrow()
            .values()
            .filter(|sandbox| sandbox.status.get() == AppStatus::Active)
            .map(|sandbox| sandbox.name.clone())
            .collect()
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("origin", &self.origin)
            .field("history", &self.history.borrow())
            .field("apps", &self.apps.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::IdleQueue;
    use serde_json::json;

    fn host() -> Rc<MemoryHost> {
        MemoryHost::new("http://localhost:3000", Rc::new(IdleQueue::new()))
    }

    #[test]
    fn test_real_history_push_truncates_forward() {
        let mut history = RealHistory::new("/");
        let entry = |path: &str| HistoryEntry {
            full_path: path.to_string(),
            state: Value::Null,
        };
        history.apply(HistoryMethod::Push, entry("/a"));
        history.apply(HistoryMethod::Push, entry("/b"));
        assert!(history.go(-2));
        history.apply(HistoryMethod::Push, entry("/c"));

        assert_eq!(history.entries.len(), 2);
        assert_eq!(history.current().full_path, "/c");
        assert!(!history.go(1));
        assert!(!history.go(-5));
        assert!(!history.go(0));
    }

    #[test]
    fn test_codec_roundtrip_keeps_other_params() {
        let host = MemoryHost::with_url(
            "http://localhost:3000",
            "/shell?lang=en#top",
            Rc::new(IdleQueue::new()),
        );
        let encoded = host.encode("orders", &LocationSnapshot::parse_full_path("/list?page=2"));
        assert_eq!(
            encoded.full_path,
            "/shell?lang=en&orders=%2Flist%3Fpage%3D2#top"
        );
        assert_eq!(encoded.search_hash, "?lang=en&orders=%2Flist%3Fpage%3D2#top");

        host.navigate(HistoryMethod::Replace, &encoded.full_path, Value::Null);
        assert_eq!(host.decode("orders").as_deref(), Some("/list?page=2"));
        assert_eq!(host.decode("lang").as_deref(), Some("en"));
        assert!(host.decode("billing").is_none());
    }

    #[test]
    fn test_codec_leaves_foreign_params_untouched() {
        let host = MemoryHost::with_url(
            "http://localhost:3000",
            "/shell?flag&q=a%20b&orders=%2Fold&x=1",
            Rc::new(IdleQueue::new()),
        );
        let encoded = host.encode("orders", &LocationSnapshot::parse_full_path("/new"));
        assert_eq!(encoded.full_path, "/shell?flag&q=a%20b&orders=%2Fnew&x=1");

        let appended = host.encode("billing", &LocationSnapshot::parse_full_path("/"));
        assert_eq!(
            appended.search_hash,
            "?flag&q=a%20b&orders=%2Fold&x=1&billing=%2F"
        );
    }

    #[test]
    fn test_sandbox_virtual_history_keeps_entries_and_state() {
        let host = host();
        let sandbox = host.register_app("a", "http://localhost:3000/a/");
        host.mount("a");
        assert_eq!(sandbox.history_len(), 1);

        sandbox.navigate(HistoryMethod::Push, "/a/1", Some(&json!({ "n": 1 })));
        sandbox.navigate(HistoryMethod::Push, "/a/2", None);
        sandbox.navigate(HistoryMethod::Replace, "/a/3", Some(&json!({ "n": 3 })));

        assert_eq!(sandbox.history_len(), 3);
        assert_eq!(sandbox.location().full_path(), "/a/3");
        assert_eq!(sandbox.state(), json!({ "n": 3 }));
        assert_eq!(host.pipeline().current().get("a").unwrap().pathname, "/a/3");

        host.unmount("a");
        host.mount("a");
        assert_eq!(sandbox.history_len(), 1);
        assert_eq!(sandbox.state(), Value::Null);
    }

    #[test]
    fn test_codec_overwrites_existing_entry() {
        let host = host();
        let first = host.encode("a", &LocationSnapshot::parse_full_path("/1"));
        host.navigate(HistoryMethod::Push, &first.full_path, Value::Null);
        let second = host.encode("a", &LocationSnapshot::parse_full_path("/2"));
        assert_eq!(second.full_path, "/?a=%2F2");
    }

    #[test]
    fn test_bridge_state_and_origin() {
        let host = MemoryHost::new("http://localhost:3000/", Rc::new(IdleQueue::new()));
        assert_eq!(host.origin(), "http://localhost:3000");
        host.navigate(HistoryMethod::Push, "/x", json!({ "k": 1 }));
        assert_eq!(host.state()["k"], 1);
        assert_eq!(host.history_len(), 2);
        host.back();
        assert_eq!(host.url(), "/");
        host.forward();
        assert_eq!(host.url(), "/x");
    }

    #[test]
    fn test_mount_uses_url_then_default_page() {
        let host = host();
        host.register_app("a", "http://localhost:3000/a/");
        host.register_app("b", "http://localhost:3000/b/");
        host.default_pages().set("b", "/b/welcome");

        let encoded = host.encode("a", &LocationSnapshot::parse_full_path("/a/deep"));
        host.navigate(HistoryMethod::Replace, &encoded.full_path, Value::Null);

        assert_eq!(host.mount("a").unwrap().full_path(), "/a/deep");
        assert_eq!(host.mount("b").unwrap().full_path(), "/b/welcome");
        assert_eq!(host.pipeline().current().get("a").unwrap().pathname, "/a/deep");
        assert!(host.mount("missing").is_none());
    }

    #[test]
    fn test_status_transitions() {
        let host = host();
        host.register_app("a", "http://localhost:3000/");
        assert!(host.contains("a"));
        assert!(!host.is_active("a"));

        host.mount("a");
        assert!(host.is_active("a"));
        assert_eq!(host.active_apps(), vec!["a".to_string()]);

        host.hide("a");
        assert!(!host.is_active("a"));
        host.show("a");
        assert!(host.is_active("a"));

        host.unmount("a");
        assert_eq!(host.sandbox("a").unwrap().status(), AppStatus::Unmounted);
        assert!(!host.pipeline().current().has("a"));
    }

    #[test]
    fn test_closed_sandbox_has_no_context() {
        let host = host();
        host.register_app("a", "http://localhost:3000/");
        host.mount("a");
        host.close_sandbox("a");
        assert!(host.is_active("a"));
        assert!(host.virtual_context("a").is_none());
    }
}
