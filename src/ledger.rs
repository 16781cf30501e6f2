//! Current-location ledger.
//!
//! Maps application name to the last location the router recorded for it.
//! An entry exists iff the application has recorded a navigation since it was
//! (re)created, and it is removed when the application unmounts.
//!
//! The ledger is written only through
//! [`GuardPipeline::execute_navigation_guard`](crate::GuardPipeline::execute_navigation_guard)
//! and [`GuardPipeline::clear_current_when_unmount`](crate::GuardPipeline::clear_current_when_unmount).
//! Everyone else gets a [`CurrentView`].

use crate::location::LocationSnapshot;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Application name to last recorded location.
#[derive(Debug, Clone, Default)]
pub struct LocationLedger {
    entries: HashMap<String, LocationSnapshot>,
}

impl LocationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `to` for `app_name`, returning the replaced snapshot.
    pub fn record(&mut self, app_name: &str, to: LocationSnapshot) -> Option<LocationSnapshot> {
        self.entries.insert(app_name.to_string(), to)
    }

    /// Drop the entry of `app_name`.
    pub fn remove(&mut self, app_name: &str) -> Option<LocationSnapshot> {
        self.entries.remove(app_name)
    }

    pub fn get(&self, app_name: &str) -> Option<&LocationSnapshot> {
        self.entries.get(app_name)
    }

    pub fn contains(&self, app_name: &str) -> bool {
        self.entries.contains_key(app_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only handle onto a shared ledger.
///
/// Reads always reflect the latest recorded navigation.
#[derive(Debug, Clone)]
pub struct CurrentView {
    ledger: Rc<RefCell<LocationLedger>>,
}

impl CurrentView {
    pub(crate) fn new(ledger: Rc<RefCell<LocationLedger>>) -> Self {
        Self { ledger }
    }

    /// Last recorded location of `app_name`.
    pub fn get(&self, app_name: &str) -> Option<LocationSnapshot> {
        self.ledger.borrow().get(app_name).cloned()
    }

    /// Whether `app_name` has a recorded location.
    pub fn has(&self, app_name: &str) -> bool {
        self.ledger.borrow().contains(app_name)
    }

    pub fn len(&self) -> usize {
        self.ledger.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.borrow().is_empty()
    }

    /// Names with a recorded location, sorted.
    pub fn app_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.ledger.borrow().entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of the whole ledger.
    pub fn to_map(&self) -> HashMap<String, LocationSnapshot> {
        self.ledger.borrow().entries.clone()
    }
}
