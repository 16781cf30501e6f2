//! # micro-navigator
//!
//! Navigation synchronization for micro-frontend hosts. Several
//! independently routed sub-applications share one address bar and one
//! history stack; this crate decides, per request, which location to drive.
//!
//! - **Active** applications (mounted and visible) navigate inside their own
//!   sandboxed virtual history, and their router sees a location-change event.
//! - **Inactive** applications (unmounted, or kept alive but hidden) get their
//!   path encoded into the host URL, so a remount or reload restores it.
//!
//! Every recorded navigation flows through one choke point,
//! [`GuardPipeline::execute_navigation_guard`], which updates the
//! current-location ledger, runs before-guards synchronously and defers
//! after-guards to an idle queue.
//!
//! # Quick start
//!
//! ```
//! use micro_navigator::memory::MemoryHost;
//! use micro_navigator::{guard_fn, IdleQueue, MicroRouter, NavigationRequest};
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
//!     .unwrap();
//!
//! router.before_each(Rc::new(guard_fn(|app, to, from| {
//!     println!("{app}: {:?} -> {to}", from.map(|f| f.full_path()));
//! })));
//!
//! host.register_app("shop", "http://localhost:3000/shop/");
//! router.set_default_page("shop", "/shop/welcome");
//! host.mount("shop");
//! assert_eq!(router.current().get("shop").unwrap().pathname, "/shop/welcome");
//!
//! let result = router.push(NavigationRequest::new("shop", "cart"));
//! assert!(result.is_navigated());
//! assert_eq!(router.current().get("shop").unwrap().pathname, "/shop/cart");
//!
//! queue.run_until_idle();
//! ```
//!
//! # Feature flags
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `log` | yes | log through the `log` crate |
//! | `tracing` | no | log through the `tracing` crate |

pub mod arbitrator;
pub mod default_page;
pub mod error;
pub mod guards;
pub mod host;
pub mod ledger;
pub mod location;
pub mod logging;
pub mod memory;
pub mod pipeline;
pub mod router;
pub mod scheduler;

pub use arbitrator::{Arbitrator, HostStrategy, NavigateOp, NavigationStrategy, VirtualStrategy};
pub use default_page::{DefaultPageRegistration, DefaultPages};
pub use error::{NavigationChannel, NavigationError, NavigationResult};
pub use guards::{
    guard_fn, AppGuardFn, FnGuard, GuardRef, GuardRegistration, GuardSet, KeyedGuard,
    NavigationGuard,
};
pub use host::{
    compose_history_state, EncodedLocation, HistoryBridge, HistoryMethod, LocationCodec,
    SandboxRegistry, VirtualContext,
};
pub use ledger::{CurrentView, LocationLedger};
pub use location::LocationSnapshot;
pub use pipeline::GuardPipeline;
pub use router::{MicroRouter, NavigationRequest, RouterBuilder};
pub use scheduler::{IdleQueue, IdleTask, TaskScheduler};
