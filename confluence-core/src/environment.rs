// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Execution environment shared by the pieces of a merge.
//!
//! An [`Environment`] bundles the dispatcher that runs callbacks with the
//! default capacity (maximum in-flight demand) new operators start with.
//! It is a plain value: cloning it is cheap and clones compare equal.
//!
//! ```
//! use confluence_core::{Environment, SynchronousDispatcher};
//! use std::sync::Arc;
//!
//! let env = Environment::new(Arc::new(SynchronousDispatcher))
//!     .with_name("ingest")
//!     .with_capacity(64);
//!
//! assert_eq!(env.name(), "ingest");
//! assert_eq!(env.capacity(), 64);
//! assert_eq!(env.clone(), env);
//! ```

use crate::demand::UNBOUNDED;
use crate::dispatcher::{Dispatcher, SynchronousDispatcher};
use std::sync::Arc;

/// Dispatcher and defaults used by merge operators.
#[derive(Clone, Debug)]
pub struct Environment {
    name: Arc<str>,
    dispatcher: Arc<dyn Dispatcher>,
    capacity: u64,
}

impl Environment {
    /// Creates an environment around `dispatcher` with unbounded capacity.
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            name: Arc::from("default"),
            dispatcher,
            capacity: UNBOUNDED,
        }
    }

    /// Creates an environment backed by a [`SerialDispatcher`](crate::SerialDispatcher)
    /// on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Dispatch`](crate::MergeError::Dispatch) when no
    /// tokio runtime is running on this thread.
    #[cfg(feature = "runtime-tokio")]
    pub fn tokio() -> crate::Result<Self> {
        let dispatcher = crate::SerialDispatcher::new("tokio")?;
        Ok(Self::new(Arc::new(dispatcher)).with_name("tokio"))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// Default maximum in-flight demand, [`UNBOUNDED`] unless configured.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Arc::new(SynchronousDispatcher))
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.capacity == other.capacity
            && Arc::ptr_eq(&self.dispatcher, &other.dispatcher)
    }
}
