//! The guard pipeline: the single choke point for recorded navigations.
//!
//! Every navigation that completes, whether the router started it or the
//! sandbox observed the application navigating on its own, must end in
//! [`GuardPipeline::execute_navigation_guard`]. For one navigation the order is
//! strict:
//!
//! 1. the ledger records `to` for the application,
//! 2. before-guards run synchronously in registration order,
//! 3. after-guards are handed to the [`TaskScheduler`] and run later, on an
//!    idle slice of the same thread, in registration order.
//!
//! After-guard batches are never cancelled. If the application unmounts
//! before its batch runs, the batch still runs with the `to`/`from` captured
//! at scheduling time, and a warning is logged.
//!
//! [`GuardPipeline`] is a cheap-to-clone handle. The router and the sandbox
//! side share one instance; tests build isolated ones.

use crate::guards::{GuardRef, GuardRegistration, GuardSet};
use crate::ledger::{CurrentView, LocationLedger};
use crate::location::LocationSnapshot;
use crate::scheduler::TaskScheduler;
use crate::{debug_log, trace_log, warn_log};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Ledger plus before/after guard sets plus the scheduler for after-guards.
#[derive(Clone)]
pub struct GuardPipeline {
    ledger: Rc<RefCell<LocationLedger>>,
    before: Rc<RefCell<GuardSet>>,
    after: Rc<RefCell<GuardSet>>,
    scheduler: Rc<dyn TaskScheduler>,
}

impl GuardPipeline {
    /// Create an empty pipeline that defers after-guards to `scheduler`.
    pub fn new(scheduler: Rc<dyn TaskScheduler>) -> Self {
        Self {
            ledger: Rc::new(RefCell::new(LocationLedger::new())),
            before: Rc::new(RefCell::new(GuardSet::new())),
            after: Rc::new(RefCell::new(GuardSet::new())),
            scheduler,
        }
    }

    /// Register a guard that runs synchronously inside every recorded
    /// navigation. Registering the same guard twice is a no-op.
    pub fn before_each(&self, guard: GuardRef) -> GuardRegistration {
        Self::register(&self.before, guard, "before")
    }

    /// Register a guard that runs on the idle queue after every recorded
    /// navigation. Registering the same guard twice is a no-op.
    pub fn after_each(&self, guard: GuardRef) -> GuardRegistration {
        Self::register(&self.after, guard, "after")
    }

    fn register(set: &Rc<RefCell<GuardSet>>, guard: GuardRef, hook: &str) -> GuardRegistration {
        if set.borrow_mut().insert(guard.clone()) {
            debug_log!("Registered {} guard '{}'", hook, guard.name());
        } else {
            debug_log!("{} guard '{}' already registered", hook, guard.name());
        }
        GuardRegistration::new(set, guard)
    }

    /// Read-only view of the ledger.
    pub fn current(&self) -> CurrentView {
        CurrentView::new(self.ledger.clone())
    }

    /// Number of registered before-guards.
    pub fn before_count(&self) -> usize {
        self.before.borrow().len()
    }

    /// Number of registered after-guards.
    pub fn after_count(&self) -> usize {
        self.after.borrow().len()
    }

    /// Record a completed navigation and notify guards.
    ///
    /// When this returns, the ledger holds `to` for `app_name` and every
    /// before-guard has run. After-guards are scheduled, not run.
    pub fn execute_navigation_guard(
        &self,
        app_name: &str,
        to: LocationSnapshot,
        from: Option<LocationSnapshot>,
    ) {
        self.ledger.borrow_mut().record(app_name, to.clone());

        let before = snapshot(&self.before);
        run_guards(&before, "before", app_name, &to, from.as_ref());

        if self.after.borrow().is_empty() {
            return;
        }
        let after = self.after.clone();
        let ledger = self.ledger.clone();
        let app_name = app_name.to_string();
        self.scheduler.schedule_idle(Box::new(move || {
            if !ledger.borrow().contains(&app_name) {
                warn_log!(
                    "Running after-guards for '{}' which unmounted since '{}' was recorded",
                    app_name,
                    to
                );
            }
            let guards = snapshot(&after);
            run_guards(&guards, "after", &app_name, &to, from.as_ref());
        }));
    }

    /// Record a navigation using the ledger's current entry as `from`.
    ///
    /// This is the entry point for sandboxes that do not track the previous
    /// location themselves.
    pub fn record_navigation(&self, app_name: &str, to: LocationSnapshot) {
        let from = self.ledger.borrow().get(app_name).cloned();
        self.execute_navigation_guard(app_name, to, from);
    }

    /// Forget `app_name`'s location. Call exactly once per unmount.
    pub fn clear_current_when_unmount(&self, app_name: &str) {
        if self.ledger.borrow_mut().remove(app_name).is_some() {
            debug_log!("Cleared current location of '{}'", app_name);
        }
    }
}

impl fmt::Debug for GuardPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardPipeline")
            .field("ledger", &self.ledger.borrow())
            .field("before", &self.before.borrow())
            .field("after", &self.after.borrow())
            .finish_non_exhaustive()
    }
}

// Guards may (un)register guards while running, so iterate over a copy.
fn snapshot(set: &RefCell<GuardSet>) -> Vec<GuardRef> {
    set.borrow().iter().cloned().collect()
}

fn run_guards(
    guards: &[GuardRef],
    hook: &str,
    app_name: &str,
    to: &LocationSnapshot,
    from: Option<&LocationSnapshot>,
) {
    for guard in guards {
        trace_log!("{} guard '{}' for '{}' -> '{}'", hook, guard.name(), app_name, to);
        guard.call(app_name, to, from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::{guard_fn, KeyedGuard};
    use crate::scheduler::IdleQueue;

    type Log = Rc<RefCell<Vec<String>>>;

    fn pipeline() -> (GuardPipeline, IdleQueue) {
        let queue = IdleQueue::new();
        (GuardPipeline::new(Rc::new(queue.clone())), queue)
    }

    fn recording(log: &Log, tag: &'static str) -> GuardRef {
        let log = log.clone();
        Rc::new(guard_fn(move |app, to, from| {
            log.borrow_mut().push(format!(
                "{tag}:{app}:{}:{}",
                to.full_path(),
                from.map_or_else(|| "-".to_string(), LocationSnapshot::full_path)
            ));
        }))
    }

    fn loc(path: &str) -> LocationSnapshot {
        LocationSnapshot::parse_full_path(path)
    }

    #[test]
    fn test_ledger_updated_before_guards() {
        let (pipeline, _queue) = pipeline();
        let current = pipeline.current();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        pipeline.before_each(Rc::new(guard_fn(move |app, _, _| {
            *sink.borrow_mut() = current.get(app);
        })));

        pipeline.execute_navigation_guard("a", loc("/x"), None);
        assert_eq!(seen.borrow().clone(), Some(loc("/x")));
        assert_eq!(pipeline.current().get("a"), Some(loc("/x")));
    }

    #[test]
    fn test_before_guards_in_registration_order() {
        let (pipeline, _queue) = pipeline();
        let log: Log = Rc::default();
        pipeline.before_each(recording(&log, "g1"));
        pipeline.before_each(recording(&log, "g2"));

        pipeline.execute_navigation_guard("a", loc("/b"), Some(loc("/a")));
        assert_eq!(*log.borrow(), vec!["g1:a:/b:/a", "g2:a:/b:/a"]);
    }

    #[test]
    fn test_after_guards_are_deferred() {
        let (pipeline, queue) = pipeline();
        let log: Log = Rc::default();
        pipeline.before_each(recording(&log, "before"));
        pipeline.after_each(recording(&log, "after"));

        pipeline.execute_navigation_guard("a", loc("/b"), None);
        assert_eq!(*log.borrow(), vec!["before:a:/b:-"]);
        assert_eq!(queue.pending(), 1);

        queue.run_until_idle();
        assert_eq!(*log.borrow(), vec!["before:a:/b:-", "after:a:/b:-"]);
    }

    #[test]
    fn test_no_task_without_after_guards() {
        let (pipeline, queue) = pipeline();
        pipeline.execute_navigation_guard("a", loc("/b"), None);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_duplicate_registration_runs_once() {
        let (pipeline, _queue) = pipeline();
        let log: Log = Rc::default();
        let guard = recording(&log, "g");
        pipeline.before_each(guard.clone());
        pipeline.before_each(guard);
        assert_eq!(pipeline.before_count(), 1);

        pipeline.execute_navigation_guard("a", loc("/b"), None);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let (pipeline, queue) = pipeline();
        let log: Log = Rc::default();
        let registration = pipeline.after_each(recording(&log, "g"));
        assert!(registration.unregister());
        assert_eq!(pipeline.after_count(), 0);

        pipeline.execute_navigation_guard("a", loc("/b"), None);
        queue.run_until_idle();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_keyed_guard_dispatch() {
        let (pipeline, _queue) = pipeline();
        let log: Log = Rc::default();
        let sink = log.clone();
        pipeline.before_each(Rc::new(KeyedGuard::new().on("a", move |to, from| {
            sink.borrow_mut()
                .push(format!("{}:{}", to.full_path(), from.is_some()));
        })));

        pipeline.execute_navigation_guard("b", loc("/ignored"), None);
        pipeline.execute_navigation_guard("a", loc("/seen"), Some(loc("/")));
        assert_eq!(*log.borrow(), vec!["/seen:true"]);
    }

    #[test]
    fn test_record_navigation_uses_ledger_as_from() {
        let (pipeline, _queue) = pipeline();
        let log: Log = Rc::default();
        pipeline.before_each(recording(&log, "g"));

        pipeline.record_navigation("a", loc("/1"));
        pipeline.record_navigation("a", loc("/2"));
        pipeline.clear_current_when_unmount("a");
        pipeline.record_navigation("a", loc("/3"));

        assert_eq!(*log.borrow(), vec!["g:a:/1:-", "g:a:/2:/1", "g:a:/3:-"]);
    }

    #[test]
    fn test_clear_current_when_unmount() {
        let (pipeline, _queue) = pipeline();
        pipeline.execute_navigation_guard("a", loc("/x"), None);
        pipeline.clear_current_when_unmount("a");
        assert!(!pipeline.current().has("a"));
        // Clearing an absent entry is harmless.
        pipeline.clear_current_when_unmount("a");
    }

    #[test]
    fn test_after_guards_still_run_after_unmount() {
        let (pipeline, queue) = pipeline();
        let log: Log = Rc::default();
        pipeline.after_each(recording(&log, "after"));

        pipeline.execute_navigation_guard("a", loc("/x"), None);
        pipeline.clear_current_when_unmount("a");
        queue.run_until_idle();

        assert_eq!(*log.borrow(), vec!["after:a:/x:-"]);
        assert!(!pipeline.current().has("a"));
    }

    #[test]
    fn test_guard_may_unregister_itself() {
        let (pipeline, _queue) = pipeline();
        let slot: Rc<RefCell<Option<GuardRegistration>>> = Rc::default();
        let hits = Rc::new(RefCell::new(0));

        let own = slot.clone();
        let counter = hits.clone();
        let registration = pipeline.before_each(Rc::new(guard_fn(move |_, _, _| {
            *counter.borrow_mut() += 1;
            if let Some(registration) = own.borrow_mut().take() {
                registration.unregister();
            }
        })));
        *slot.borrow_mut() = Some(registration);

        pipeline.execute_navigation_guard("a", loc("/1"), None);
        pipeline.execute_navigation_guard("a", loc("/2"), None);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(pipeline.before_count(), 0);
    }
}
