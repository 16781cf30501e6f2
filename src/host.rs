//! Collaborator contracts between the router and its host.
//!
//! The router never touches a browser directly. It talks to three
//! collaborators supplied by the host:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`LocationCodec`] | Embeds / extracts an application's full path in the host URL |
//! | [`HistoryBridge`] | The real history stack: push/replace with a composed state, go/back/forward |
//! | [`SandboxRegistry`] | Active/inactive classification and each app's [`VirtualContext`] |
//!
//! All collaborators are single-threaded (`Rc`, no `Send`/`Sync`): the host
//! runs one cooperative event loop.
//!
//! [`crate::memory::MemoryHost`] implements all of them in-process.

use crate::location::LocationSnapshot;
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// Key under which [`compose_history_state`] stores per-application entries.
pub const MICRO_STATE_KEY: &str = "microState";

/// History mutation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryMethod {
    /// `pushState`: add a new entry.
    Push,
    /// `replaceState`: overwrite the current entry.
    Replace,
}

impl HistoryMethod {
    /// The browser method name.
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryMethod::Push => "pushState",
            HistoryMethod::Replace => "replaceState",
        }
    }
}

impl fmt::Display for HistoryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host URL fragment produced by [`LocationCodec::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLocation {
    /// Full host path (`pathname + search + hash`) with the application's
    /// path embedded.
    pub full_path: String,
    /// `search + hash` of that host path, carrying the encoded paths of every
    /// co-resident application.
    pub search_hash: String,
}

/// Bidirectional mapping between an application's path and the host URL.
pub trait LocationCodec {
    /// Produce the host URL that results from embedding `target` for
    /// `app_name` into the current host URL.
    fn encode(&self, app_name: &str, target: &LocationSnapshot) -> EncodedLocation;

    /// Extract the full path currently embedded for `app_name`, if any.
    fn decode(&self, app_name: &str) -> Option<String>;
}

/// The host document's real history stack.
pub trait HistoryBridge {
    /// Apply a navigation to the real URL.
    fn navigate(&self, method: HistoryMethod, full_path: &str, state: Value);

    /// Current real history state.
    fn state(&self) -> Value;

    /// Origin of the host document, e.g. `http://localhost:3000`.
    fn origin(&self) -> String;

    /// Move `delta` entries through the real history.
    fn go(&self, delta: i32);

    /// Equivalent to `go(-1)`.
    fn back(&self) {
        self.go(-1);
    }

    /// Equivalent to `go(1)`.
    fn forward(&self) {
        self.go(1);
    }

    /// Merge the existing real state with the caller's state for `app_name`.
    ///
    /// The default delegates to [`compose_history_state`].
    fn compose_state(
        &self,
        app_name: &str,
        existing: &Value,
        caller_state: Option<&Value>,
        origin: &str,
        sibling_search_hash: &str,
    ) -> Value {
        compose_history_state(app_name, existing, caller_state, origin, sibling_search_hash)
    }
}

/// An application's sandboxed location and history.
pub trait VirtualContext {
    /// The application's virtual current location.
    fn location(&self) -> LocationSnapshot;

    /// Base URL the application's relative paths resolve against.
    fn base_url(&self) -> String;

    /// Apply a navigation to the virtual history. Must not touch the host URL.
    ///
    /// The router does not update the current-location ledger itself. The
    /// implementation reports the new location through
    /// [`GuardPipeline::record_navigation`](crate::pipeline::GuardPipeline::record_navigation)
    /// (or `execute_navigation_guard`), the same way it reports navigations
    /// the application makes on its own.
    fn navigate(&self, method: HistoryMethod, full_path: &str, state: Option<&Value>);
}

/// Lookup of sandboxed applications.
pub trait SandboxRegistry {
    /// Whether an application with this name exists (mounted or not).
    fn contains(&self, app_name: &str) -> bool;

    /// Mounted and rendered; kept-alive-but-hidden apps are not active.
    fn is_active(&self, app_name: &str) -> bool;

    /// The app's virtual browsing context, `None` once torn down.
    fn virtual_context(&self, app_name: &str) -> Option<Rc<dyn VirtualContext>>;

    /// Deliver a synthetic location-change event into the app's sandbox.
    fn notify_location_change(
        &self,
        app_name: &str,
        context: &dyn VirtualContext,
        payload: Option<&Value>,
    );

    /// Names of all currently active applications.
    fn active_apps(&self) -> Vec<String>;
}

/// Default history state composition.
///
/// Keeps every field of `existing` (when it is an object) and records, under
/// [`MICRO_STATE_KEY`], an entry for `app_name`:
///
/// ```json
/// { "microState": { "<app>": { "state": ..., "origin": ..., "searchHash": ... } } }
/// ```
///
/// Entries of other applications already present are preserved.
pub fn compose_history_state(
    app_name: &str,
    existing: &Value,
    caller_state: Option<&Value>,
    origin: &str,
    sibling_search_hash: &str,
) -> Value {
    let mut root = match existing {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let mut apps = match root.remove(MICRO_STATE_KEY) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut entry = Map::new();
    entry.insert(
        "state".to_string(),
        caller_state.cloned().unwrap_or(Value::Null),
    );
    entry.insert("origin".to_string(), Value::String(origin.to_string()));
    entry.insert(
        "searchHash".to_string(),
        Value::String(sibling_search_hash.to_string()),
    );
    apps.insert(app_name.to_string(), Value::Object(entry));

    root.insert(MICRO_STATE_KEY.to_string(), Value::Object(apps));
    Value::Object(root)
}
