//! Cooperative idle-time scheduling.
//!
//! After-guards do not run inside the navigation call. They are handed to a
//! [`TaskScheduler`] which runs them later, on the same thread, once the host
//! loop has nothing more urgent to do. There is no delay and no cancellation:
//! a scheduled task always runs exactly once.
//!
//! [`IdleQueue`] is a FIFO implementation the host drains from its event loop
//! (e.g. from a `requestIdleCallback` shim or at the end of a frame).
//!
//! ```
//! use micro_navigator::{IdleQueue, TaskScheduler};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let queue = IdleQueue::new();
//! let hits = Rc::new(Cell::new(0));
//! let counter = hits.clone();
//! queue.schedule_idle(Box::new(move || counter.set(counter.get() + 1)));
//!
//! assert_eq!(hits.get(), 0);
//! assert_eq!(queue.run_until_idle(), 1);
//! assert_eq!(hits.get(), 1);
//! ```

use crate::trace_log;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work.
pub type IdleTask = Box<dyn FnOnce()>;

/// Low-priority scheduling on the host's single thread.
pub trait TaskScheduler {
    /// Run `task` once the current task has completed and the loop is idle.
    fn schedule_idle(&self, task: IdleTask);
}

/// FIFO idle queue drained explicitly by the host.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct IdleQueue {
    tasks: Rc<RefCell<VecDeque<IdleTask>>>,
}

impl IdleQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run the tasks that were queued when this call started.
    ///
    /// Tasks scheduled by those tasks wait for the next drain. Returns the
    /// number of tasks run.
    pub fn run_pending(&self) -> usize {
        let batch = self.pending();
        for _ in 0..batch {
            // The borrow ends before the task runs so it may schedule more work.
            let task = self.tasks.borrow_mut().pop_front();
            if let Some(task) = task {
                task();
            }
        }
        batch
    }

    /// Drain until no task is left. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl TaskScheduler for IdleQueue {
    fn schedule_idle(&self, task: IdleTask) {
        let mut tasks = self.tasks.borrow_mut();
        tasks.push_back(task);
        trace_log!("Idle task scheduled ({} pending)", tasks.len());
    }
}

impl fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
