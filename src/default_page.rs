//! Default pages.
//!
//! The path an application opens on when it mounts and the host URL carries
//! nothing for it. The router only stores these; the sandbox side reads them
//! at mount time (see [`MemoryHost::mount`](crate::memory::MemoryHost::mount)).

use crate::{debug_log, error_log};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared map of application name to default path.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct DefaultPages {
    pages: Rc<RefCell<HashMap<String, String>>>,
}

impl DefaultPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default page of `app_name`.
    ///
    /// Empty names or paths are reported and ignored, in which case `None`
    /// is returned.
    pub fn set(
        &self,
        app_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Option<DefaultPageRegistration> {
        let (app_name, path) = (app_name.into(), path.into());
        if app_name.trim().is_empty() || path.is_empty() {
            error_log!(
                "set_default_page: invalid request: name '{}' / path '{}' must not be empty",
                app_name,
                path
            );
            return None;
        }
        debug_log!("Default page of '{}' set to '{}'", app_name, path);
        self.pages.borrow_mut().insert(app_name.clone(), path);
        Some(DefaultPageRegistration {
            pages: Rc::downgrade(&self.pages),
            app_name,
        })
    }

    /// Remove the default page of `app_name`, returning it.
    pub fn remove(&self, app_name: &str) -> Option<String> {
        let removed = self.pages.borrow_mut().remove(app_name);
        if removed.is_some() {
            debug_log!("Default page of '{}' removed", app_name);
        }
        removed
    }

    /// Default page of `app_name`, if set.
    pub fn get(&self, app_name: &str) -> Option<String> {
        self.pages.borrow().get(app_name).cloned()
    }
}

/// Handle returned by [`DefaultPages::set`].
pub struct DefaultPageRegistration {
    pages: Weak<RefCell<HashMap<String, String>>>,
    app_name: String,
}

impl DefaultPageRegistration {
    /// Remove the default page this registration set, whatever it is now.
    pub fn unregister(self) -> bool {
        let Some(pages) = self.pages.upgrade() else {
            return false;
        };
        let removed = pages.borrow_mut().remove(&self.app_name);
        removed.is_some()
    }
}

impl fmt::Debug for DefaultPageRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultPageRegistration")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let pages = DefaultPages::new();
        assert!(pages.set("orders", "/list").is_some());
        assert_eq!(pages.get("orders").as_deref(), Some("/list"));
        assert_eq!(pages.remove("orders").as_deref(), Some("/list"));
        assert!(pages.get("orders").is_none());
    }

    #[test]
    fn test_invalid_input_ignored() {
        let pages = DefaultPages::new();
        assert!(pages.set("", "/list").is_none());
        assert!(pages.set("orders", "").is_none());
        assert!(pages.get("orders").is_none());
    }

    #[test]
    fn test_registration_unregisters() {
        let pages = DefaultPages::new();
        let registration = pages.set("orders", "/list").unwrap();
        assert!(registration.unregister());
        assert!(pages.get("orders").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let pages = DefaultPages::new();
        let shared = pages.clone();
        pages.set("a", "/x");
        assert_eq!(shared.get("a").as_deref(), Some("/x"));
    }
}
