//! Navigation guards.
//!
//! Guards are **notifications**, not interceptors: they observe every
//! navigation the router records but cannot veto or redirect it, and their
//! return value is ignored.
//!
//! # Guard kinds
//!
//! | Kind | Invoked for | Receives |
//! |------|-------------|----------|
//! | [`guard_fn`] / custom [`NavigationGuard`] | every application | `(app_name, to, from)` |
//! | [`KeyedGuard`] | only applications it has a handler for | `(to, from)` |
//!
//! # Registration
//!
//! Guards live in a [`GuardSet`]: insertion ordered, unique by `Rc` identity.
//! Registering the same [`GuardRef`] twice is a no-op, and every registration
//! hands back a [`GuardRegistration`] that removes the guard again.
//!
//! # Example
//!
//! ```
//! use micro_navigator::{guard_fn, GuardRef, GuardSet, KeyedGuard};
//! use std::rc::Rc;
//!
//! let global: GuardRef = Rc::new(guard_fn(|app, to, _from| {
//!     println!("{app} -> {to}");
//! }));
//! let keyed: GuardRef = Rc::new(KeyedGuard::new().on("orders", |to, _from| {
//!     println!("orders -> {to}");
//! }));
//!
//! let mut set = GuardSet::new();
//! assert!(set.insert(global.clone()));
//! assert!(!set.insert(global));
//! assert!(set.insert(keyed));
//! assert_eq!(set.len(), 2);
//! ```

use crate::location::LocationSnapshot;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

// ============================================================================
// NavigationGuard trait
// ============================================================================

/// Observer of recorded navigations.
///
/// `from` is `None` for the first navigation an application records after it
/// was created or unmounted.
///
/// # Example
///
/// ```
/// use micro_navigator::{LocationSnapshot, NavigationGuard};
///
/// struct PageViews;
///
/// impl NavigationGuard for PageViews {
///     fn call(&self, app_name: &str, to: &LocationSnapshot, _from: Option<&LocationSnapshot>) {
///         println!("page view {app_name}{to}");
///     }
///
///     fn name(&self) -> &'static str {
///         "PageViews"
///     }
/// }
/// ```
pub trait NavigationGuard: 'static {
    /// Observe a navigation of `app_name`.
    fn call(&self, app_name: &str, to: &LocationSnapshot, from: Option<&LocationSnapshot>);

    /// Guard name for debugging.
    fn name(&self) -> &'static str {
        "NavigationGuard"
    }
}

/// Shared guard handle. Identity of the `Rc` is the identity of the guard.
pub type GuardRef = Rc<dyn NavigationGuard>;

// ============================================================================
// guard_fn helper
// ============================================================================

/// Create a global guard from a closure.
///
/// ```
/// use micro_navigator::guard_fn;
///
/// let guard = guard_fn(|app, to, from| {
///     println!("{app}: {:?} -> {to}", from.map(|f| f.full_path()));
/// });
/// ```
pub const fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&str, &LocationSnapshot, Option<&LocationSnapshot>) + 'static,
{
    FnGuard { f }
}

/// Guard created from a closure.
pub struct FnGuard<F> {
    f: F,
}

impl<F> NavigationGuard for FnGuard<F>
where
    F: Fn(&str, &LocationSnapshot, Option<&LocationSnapshot>) + 'static,
{
    fn call(&self, app_name: &str, to: &LocationSnapshot, from: Option<&LocationSnapshot>) {
        (self.f)(app_name, to, from);
    }

    fn name(&self) -> &'static str {
        "FnGuard"
    }
}

// ============================================================================
// KeyedGuard
// ============================================================================

/// Per-application handler inside a [`KeyedGuard`].
pub type AppGuardFn = Box<dyn Fn(&LocationSnapshot, Option<&LocationSnapshot>)>;

/// Guard keyed by application name.
///
/// Only navigations of applications it has a handler for reach it; other
/// applications pass by silently.
#[derive(Default)]
pub struct KeyedGuard {
    handlers: HashMap<String, AppGuardFn>,
}

impl KeyedGuard {
    /// Create an empty keyed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the handler for `app_name`.
    #[must_use]
    pub fn on<F>(mut self, app_name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&LocationSnapshot, Option<&LocationSnapshot>) + 'static,
    {
        self.handlers.insert(app_name.into(), Box::new(handler));
        self
    }

    /// Whether a handler exists for `app_name`.
    pub fn handles(&self, app_name: &str) -> bool {
        self.handlers.contains_key(app_name)
    }
}

impl NavigationGuard for KeyedGuard {
    fn call(&self, app_name: &str, to: &LocationSnapshot, from: Option<&LocationSnapshot>) {
        if let Some(handler) = self.handlers.get(app_name) {
            handler(to, from);
        }
    }

    fn name(&self) -> &'static str {
        "KeyedGuard"
    }
}

impl fmt::Debug for KeyedGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut apps: Vec<_> = self.handlers.keys().collect();
        apps.sort();
        f.debug_struct("KeyedGuard").field("apps", &apps).finish()
    }
}

// ============================================================================
// GuardSet
// ============================================================================

/// Insertion-ordered set of guards, de-duplicated by `Rc` identity.
#[derive(Clone, Default)]
pub struct GuardSet {
    guards: Vec<GuardRef>,
}

impl GuardSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `guard` at the end. Returns `false` if it was already present.
    pub fn insert(&mut self, guard: GuardRef) -> bool {
        if self.contains(&guard) {
            return false;
        }
        self.guards.push(guard);
        true
    }

    /// Remove `guard`. Returns `false` if it was not present.
    pub fn remove(&mut self, guard: &GuardRef) -> bool {
        let before = self.guards.len();
        self.guards.retain(|g| !same_guard(g, guard));
        self.guards.len() != before
    }

    /// Whether this exact guard is registered.
    pub fn contains(&self, guard: &GuardRef) -> bool {
        self.guards.iter().any(|g| same_guard(g, guard))
    }

    /// Number of registered guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether no guard is registered.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &GuardRef> {
        self.guards.iter()
    }
}

impl fmt::Debug for GuardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.guards.iter().map(|g| g.name()))
            .finish()
    }
}

// Compare data pointers only; vtable pointers may differ across codegen units.
fn same_guard(a: &GuardRef, b: &GuardRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

// ============================================================================
// GuardRegistration
// ============================================================================

/// Handle returned by guard registration.
///
/// Dropping it keeps the guard registered; call
/// [`unregister`](Self::unregister) to remove it.
pub struct GuardRegistration {
    set: Weak<RefCell<GuardSet>>,
    guard: GuardRef,
}

impl GuardRegistration {
    pub(crate) fn new(set: &Rc<RefCell<GuardSet>>, guard: GuardRef) -> Self {
        Self {
            set: Rc::downgrade(set),
            guard,
        }
    }

    /// Remove the guard. Returns `false` if it was already gone.
    pub fn unregister(self) -> bool {
        let Some(set) = self.set.upgrade() else {
            return false;
        };
        let removed = set.borrow_mut().remove(&self.guard);
        removed
    }
}

impl fmt::Debug for GuardRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardRegistration")
            .field("guard", &self.guard.name())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
