// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Coordinator that flattens a publisher of publishers.
//!
//! [`DynamicMerge`] subscribes to an outer publisher whose elements are
//! themselves publishers and registers each one with a [`FanIn`] engine as it
//! arrives. It produces no output itself: downstream subscribers are handed
//! straight to the engine, and the only state the coordinator owns is the
//! flag recording that the outer publisher finished.
//!
//! ```
//! use confluence_core::SynchronousDispatcher;
//! use confluence_merge::DynamicMerge;
//! use std::sync::Arc;
//!
//! let merge = DynamicMerge::<u32>::new(Arc::new(SynchronousDispatcher), None);
//! assert!(!merge.has_no_more_publishers());
//!
//! merge.set_capacity(32);
//! assert_eq!(merge.capacity(), 32);
//! ```
//!
//! Output subscriptions only come from the engine; the coordinator has no way
//! to create one of its own:
//!
//! ```compile_fail
//! use confluence_core::SynchronousDispatcher;
//! use confluence_merge::DynamicMerge;
//! use std::sync::Arc;
//!
//! let merge = DynamicMerge::<u32>::new(Arc::new(SynchronousDispatcher), None);
//! let _subscription = merge.create_subscription();
//! ```

use crate::engine::MergeEngine;
use crate::fan_in::{FanIn, MergeDriver};
use confluence_core::{
    BoxPublisher, Demand, Dispatcher, Environment, MergeError, Publisher, Subscriber,
    Subscription, Task,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

enum Upstream {
    Waiting,
    Active(Arc<dyn Subscription>),
    Cancelled,
}

/// Dynamic merge operator: RUNNING until the outer publisher completes or
/// fails, FINISHING afterwards.
///
/// Exactly one completion or error signal from the outer publisher is acted
/// upon, whichever wins the transition; every later terminal signal is
/// ignored. Publishers arriving after the transition are dropped.
pub struct DynamicMerge<T> {
    me: Weak<Self>,
    dispatcher: Arc<dyn Dispatcher>,
    engine: Arc<dyn FanIn<T>>,
    finishing: AtomicBool,
    upstream: Mutex<Upstream>,
    pending: Demand,
    capacity: AtomicU64,
    environment: Mutex<Environment>,
}

impl<T: Send + 'static> DynamicMerge<T> {
    /// Creates a coordinator driving `engine`, or a fresh [`MergeEngine`]
    /// running on `dispatcher` when none is given, and registers itself as
    /// the engine's driver.
    pub fn new(dispatcher: Arc<dyn Dispatcher>, engine: Option<Arc<dyn FanIn<T>>>) -> Arc<Self> {
        let environment = Environment::new(Arc::clone(&dispatcher));
        let engine = engine.unwrap_or_else(|| {
            let engine: Arc<dyn FanIn<T>> = MergeEngine::new(environment.clone());
            engine
        });

        let merge = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            dispatcher,
            engine,
            finishing: AtomicBool::new(false),
            upstream: Mutex::new(Upstream::Waiting),
            pending: Demand::new(),
            capacity: AtomicU64::new(environment.capacity()),
            environment: Mutex::new(environment),
        });

        let driver: Weak<dyn MergeDriver> = Arc::downgrade(&merge) as Weak<dyn MergeDriver>;
        merge.engine.attach_driver(driver);
        merge
    }

    /// The engine producing the merged output.
    pub fn merged(&self) -> Arc<dyn FanIn<T>> {
        Arc::clone(&self.engine)
    }

    /// `true` once the outer publisher completed or failed.
    pub fn has_no_more_publishers(&self) -> bool {
        self.finishing.load(Ordering::Acquire)
    }

    pub fn reset_child_requests(&self) -> u64 {
        self.engine.reset_child_requests()
    }

    pub fn replay_child_requests(&self, amount: u64) {
        self.engine.replay_child_requests(amount);
    }

    /// Sets the maximum in-flight demand, on the engine first.
    pub fn set_capacity(&self, elements: u64) -> &Self {
        self.engine.set_capacity(elements);
        self.capacity.store(elements, Ordering::Release);
        self
    }

    /// Sets the execution environment, on the engine first.
    pub fn set_env(&self, environment: Environment) -> &Self {
        self.engine.set_environment(environment.clone());
        *self.environment.lock() = environment;
        self
    }

    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }

    pub fn env(&self) -> Environment {
        self.environment.lock().clone()
    }

    /// Stops accepting inner publishers and cancels the outer subscription.
    ///
    /// Inner publishers already registered keep draining into the engine. The
    /// merge stays RUNNING: a completion or error the outer publisher still
    /// delivers is acted upon as usual.
    pub fn cancel(&self) {
        if self.cancel_upstream_subscription() {
            debug!("dynamic merge released its outer subscription");
        }
    }

    fn try_finish(&self) -> bool {
        self.finishing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn upstream_cancelled(&self) -> bool {
        matches!(*self.upstream.lock(), Upstream::Cancelled)
    }

    fn do_next(&self, publisher: BoxPublisher<T>) {
        if self.has_no_more_publishers() || self.upstream_cancelled() {
            debug!("outer subscription released, dropping late inner publisher");
            return;
        }
        self.engine.add_publisher(publisher);
    }

    fn do_complete(&self) {
        if self.try_finish() {
            debug!("outer publisher completed, scheduling merge completion");
            self.cancel_upstream_subscription();
            self.engine.schedule_completion();
        } else {
            trace!("ignoring outer completion after termination");
        }
    }

    fn do_error(&self, error: MergeError) {
        if self.try_finish() {
            debug!("outer publisher failed: {error}");
            self.cancel_upstream_subscription();
            self.engine.do_error(error);
        } else {
            trace!("ignoring outer error after termination: {error}");
        }
    }

    /// Returns `false` when the outer subscription was already released.
    fn cancel_upstream_subscription(&self) -> bool {
        let previous = std::mem::replace(&mut *self.upstream.lock(), Upstream::Cancelled);
        match previous {
            Upstream::Active(subscription) => {
                subscription.cancel();
                true
            }
            Upstream::Waiting => true,
            Upstream::Cancelled => false,
        }
    }

    /// Runs `task` on the dispatcher; if it refuses, fails the merge inline.
    fn dispatch(&self, task: Task) {
        if let Err(error) = self.dispatcher.dispatch(task) {
            warn!("dispatcher {} rejected a merge signal: {error}", self.dispatcher.name());
            self.do_error(error);
        }
    }
}

impl<T: Send + 'static> Publisher<T> for DynamicMerge<T> {
    /// Hands `subscriber` to the engine; all output flows through the
    /// engine's own subscription.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.engine.subscribe(subscriber);
    }
}

impl<T: Send + 'static> Subscriber<BoxPublisher<T>> for DynamicMerge<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let replay = {
            let mut upstream = self.upstream.lock();
            if matches!(*upstream, Upstream::Waiting) && !self.has_no_more_publishers() {
                *upstream = Upstream::Active(Arc::clone(&subscription));
                Some(self.pending.reset())
            } else {
                None
            }
        };

        match replay {
            Some(amount) => {
                if amount > 0 {
                    subscription.request(amount);
                }
            }
            None => subscription.cancel(),
        }
    }

    fn on_next(&self, publisher: BoxPublisher<T>) {
        let Some(this) = self.me.upgrade() else {
            return;
        };
        self.dispatch(Box::new(move || this.do_next(publisher)));
    }

    fn on_error(&self, error: MergeError) {
        let Some(this) = self.me.upgrade() else {
            return;
        };
        self.dispatch(Box::new(move || this.do_error(error)));
    }

    fn on_complete(&self) {
        let Some(this) = self.me.upgrade() else {
            return;
        };
        self.dispatch(Box::new(move || this.do_complete()));
    }
}

impl<T: Send + 'static> MergeDriver for DynamicMerge<T> {
    fn has_no_more_publishers(&self) -> bool {
        self.finishing.load(Ordering::Acquire)
    }

    fn request_publishers(&self, n: u64) {
        if n == 0 || self.has_no_more_publishers() {
            return;
        }

        let n = n.min(self.capacity().max(1));
        let active = {
            let upstream = self.upstream.lock();
            match &*upstream {
                Upstream::Active(subscription) => Some(Arc::clone(subscription)),
                Upstream::Waiting => {
                    self.pending.request(n);
                    None
                }
                Upstream::Cancelled => None,
            }
        };

        if let Some(subscription) = active {
            subscription.request(n);
        }
    }

    fn cancel_upstream(&self) {
        self.cancel();
    }
}
