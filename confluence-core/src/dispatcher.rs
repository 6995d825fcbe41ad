// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Task dispatch substrate.
//!
//! Signals that cross from one producer into the merge machinery are run as
//! tasks on a [`Dispatcher`]. Two implementations ship with the crate:
//!
//! - [`SynchronousDispatcher`] runs every task inline on the calling thread.
//!   Concurrent callers therefore really do race, which is what the terminal
//!   transition of a merge has to survive.
//! - [`SerialDispatcher`] (feature `runtime-tokio`) runs tasks one at a time,
//!   in submission order, on a single tokio task.

use crate::{MergeError, Result};
use core::fmt;

/// Unit of work accepted by a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes tasks on behalf of publishers and subscribers.
///
/// Implementations must run tasks submitted from one thread in submission
/// order. They may run tasks submitted from different threads concurrently.
pub trait Dispatcher: Send + Sync + fmt::Debug {
    /// Schedules `task` for execution.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Dispatch`] if the dispatcher can no longer run
    /// tasks. The task is dropped in that case.
    fn dispatch(&self, task: Task) -> Result<()>;

    /// Short name used in log output.
    fn name(&self) -> &str;
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynchronousDispatcher;

impl Dispatcher for SynchronousDispatcher {
    fn dispatch(&self, task: Task) -> Result<()> {
        task();
        Ok(())
    }

    fn name(&self) -> &str {
        "synchronous"
    }
}

/// Runs tasks in FIFO order on a dedicated tokio task.
#[cfg(feature = "runtime-tokio")]
pub struct SerialDispatcher {
    name: String,
    queue: tokio::sync::mpsc::UnboundedSender<Task>,
}

#[cfg(feature = "runtime-tokio")]
impl SerialDispatcher {
    /// Starts a dispatcher on the tokio runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Dispatch`] when called outside a tokio runtime.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| MergeError::dispatch(format!("{name}: {e}")))?;
        Ok(Self::with_handle(name, &handle))
    }

    /// Starts a dispatcher on the given runtime.
    pub fn with_handle(name: impl Into<String>, handle: &tokio::runtime::Handle) -> Self {
        let (queue, mut tasks) = tokio::sync::mpsc::unbounded_channel::<Task>();
        handle.spawn(async move {
            while let Some(task) = tasks.recv().await {
                task();
            }
        });

        Self {
            name: name.into(),
            queue,
        }
    }
}

#[cfg(feature = "runtime-tokio")]
impl Dispatcher for SerialDispatcher {
    fn dispatch(&self, task: Task) -> Result<()> {
        self.queue
            .send(task)
            .map_err(|_| MergeError::dispatch(format!("{}: runtime has shut down", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(feature = "runtime-tokio")]
impl fmt::Debug for SerialDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDispatcher")
            .field("name", &self.name)
            .field("closed", &self.queue.is_closed())
            .finish()
    }
}
