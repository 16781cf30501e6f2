//! Test utilities for router integration tests
//!
//! Builds a router on top of the in-memory host and provides recording guards.

#![allow(dead_code)]

use micro_navigator::memory::{MemoryHost, MemorySandbox};
use micro_navigator::*;
use std::cell::RefCell;
use std::rc::Rc;

pub const ORIGIN: &str = "http://localhost:3000";

pub type Log = Rc<RefCell<Vec<String>>>;

/// Router, host and the idle queue after-guards run on.
pub struct Harness {
    pub queue: IdleQueue,
    pub host: Rc<MemoryHost>,
    pub router: MicroRouter,
}

impl Harness {
    /// Register `name` with base URL `ORIGIN/<name>/` without mounting it.
    pub fn register(&self, name: &str) -> Rc<MemorySandbox> {
        self.host.register_app(name, &format!("{ORIGIN}/{name}/"))
    }

    /// Register `name` at the host root (`ORIGIN/`) and mount it.
    pub fn mounted_at_root(&self, name: &str) -> Rc<MemorySandbox> {
        let sandbox = self.host.register_app(name, &format!("{ORIGIN}/"));
        self.host.mount(name);
        sandbox
    }

    /// Register `name` with base URL `ORIGIN/<name>/` and mount it.
    pub fn mounted(&self, name: &str) -> Rc<MemorySandbox> {
        let sandbox = self.register(name);
        self.host.mount(name);
        sandbox
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn harness() -> Harness {
    init_logging();
    let queue = IdleQueue::new();
    let host = MemoryHost::new(ORIGIN, Rc::new(queue.clone()));
    let router = MicroRouter::builder()
        .pipeline(host.pipeline())
        .codec(host.clone())
        .history(host.clone())
        .sandbox(host.clone())
        .default_pages(host.default_pages())
        .try_build()
        .expect("harness router");
    Harness {
        queue,
        host,
        router,
    }
}

/// Global guard that appends `tag:app:to:from` (`-` for no `from`) to `log`.
pub fn recorder(log: &Log, tag: &'static str) -> GuardRef {
    let log = log.clone();
    Rc::new(guard_fn(move |app, to, from| {
        let from = from.map_or_else(|| "-".to_string(), LocationSnapshot::full_path);
        log.borrow_mut()
            .push(format!("{tag}:{app}:{}:{from}", to.full_path()));
    }))
}

pub fn loc(full_path: &str) -> LocationSnapshot {
    LocationSnapshot::parse_full_path(full_path)
}

/// Methods applied to a sandbox's virtual history.
pub fn virtual_methods(sandbox: &MemorySandbox) -> Vec<HistoryMethod> {
    sandbox.calls().into_iter().map(|(method, _)| method).collect()
}

/// Methods applied to the host's real history.
pub fn host_methods(host: &MemoryHost) -> Vec<HistoryMethod> {
    host.history_calls()
        .into_iter()
        .map(|(method, _)| method)
        .collect()
}
