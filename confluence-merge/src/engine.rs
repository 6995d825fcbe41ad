// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Default fan-in engine.
//!
//! [`MergeEngine`] subscribes to every publisher handed to it and forwards
//! their elements to a single downstream subscriber in arrival order,
//! holding them back until the downstream has demand for them.
//!
//! Delivery is serialized by a work-in-progress counter: whichever thread
//! increments it from zero drains the queue, and threads arriving meanwhile
//! only record that another pass is needed. No lock is held while calling
//! into a subscriber, publisher or subscription.

use crate::fan_in::{FanIn, MergeDriver};
use crate::inner::InnerSubscriber;
use confluence_core::{
    BoxPublisher, Demand, Environment, MergeError, NoopSubscription, Publisher, Subscriber,
    Subscription,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Merges a growing set of inner publishers into one output.
///
/// The engine accepts exactly one downstream subscriber. Completion is
/// emitted once [`FanIn::schedule_completion`] was called, every inner
/// publisher completed, every queued element was delivered and, when a
/// driver is attached, the driver reports that no more publishers will
/// arrive. Errors skip the queue.
///
/// ```
/// use confluence_core::Environment;
/// use confluence_merge::{FanIn, MergeEngine};
///
/// let engine = MergeEngine::<u32>::new(Environment::default().with_capacity(8));
/// assert_eq!(engine.capacity(), 8);
///
/// engine.set_capacity(16);
/// assert_eq!(engine.capacity(), 16);
/// ```
pub struct MergeEngine<T> {
    me: Weak<Self>,
    state: Mutex<EngineState<T>>,
    requested: Demand,
    wip: AtomicUsize,
    capacity: AtomicU64,
    environment: Mutex<Environment>,
    driver: Mutex<Option<Weak<dyn MergeDriver>>>,
}

struct EngineState<T> {
    subscribed: bool,
    downstream: Option<Arc<dyn Subscriber<T>>>,
    inners: HashMap<u64, Arc<InnerSubscriber<T>>>,
    queue: VecDeque<(u64, T)>,
    pending_error: Option<MergeError>,
    completion_scheduled: bool,
    terminated: bool,
    next_id: u64,
    registered: usize,
}

enum Step<T> {
    Idle,
    Emit {
        downstream: Arc<dyn Subscriber<T>>,
        item: T,
        inner: Option<Arc<InnerSubscriber<T>>>,
    },
    Fail {
        downstream: Arc<dyn Subscriber<T>>,
        error: MergeError,
        inners: Vec<Arc<InnerSubscriber<T>>>,
    },
    Complete(Arc<dyn Subscriber<T>>),
}

impl<T: Send + 'static> MergeEngine<T> {
    /// Creates an engine whose capacity starts at `environment.capacity()`.
    pub fn new(environment: Environment) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            state: Mutex::new(EngineState {
                subscribed: false,
                downstream: None,
                inners: HashMap::new(),
                queue: VecDeque::new(),
                pending_error: None,
                completion_scheduled: false,
                terminated: false,
                next_id: 0,
                registered: 0,
            }),
            requested: Demand::new(),
            wip: AtomicUsize::new(0),
            capacity: AtomicU64::new(environment.capacity()),
            environment: Mutex::new(environment),
            driver: Mutex::new(None),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity.load(Ordering::Acquire)
    }

    pub fn environment(&self) -> Environment {
        self.environment.lock().clone()
    }

    /// Downstream demand not yet satisfied.
    pub fn outstanding_demand(&self) -> u64 {
        self.requested.outstanding()
    }

    /// Inner publishers subscribed and not yet completed.
    pub fn active_count(&self) -> usize {
        self.state.lock().inners.len()
    }

    /// Inner publishers ever accepted by [`FanIn::add_publisher`].
    pub fn publisher_count(&self) -> usize {
        self.state.lock().registered
    }

    /// Elements received from inner publishers and waiting for demand.
    pub fn queued_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_completion_scheduled(&self) -> bool {
        self.state.lock().completion_scheduled
    }

    /// `true` once a terminal signal was delivered or the downstream cancelled.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    pub(crate) fn inner_next(&self, id: u64, item: T) {
        {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.queue.push_back((id, item));
        }
        self.drain();
    }

    pub(crate) fn inner_error(&self, id: u64, error: MergeError) {
        self.fail(Some(id), error);
    }

    pub(crate) fn inner_complete(&self, id: u64) {
        let removed = self.state.lock().inners.remove(&id).is_some();
        if removed {
            trace!("inner publisher {id} completed");
            // A drained source makes room for the next one
            if let Some(driver) = self.driver() {
                driver.request_publishers(1);
            }
        }
        self.drain();
    }

    fn fail(&self, source: Option<u64>, error: MergeError) {
        {
            let mut state = self.state.lock();
            if state.terminated || state.pending_error.is_some() {
                debug!("merge output already failing or terminated, dropping error: {error}");
                return;
            }
            if let Some(id) = source {
                state.inners.remove(&id);
            }
            state.pending_error = Some(error);
        }
        self.drain();
    }

    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.requested.request(n);
        if let Some(driver) = self.driver() {
            driver.request_publishers(n);
        }
        self.drain();
    }

    fn cancel(&self) {
        let inners: Vec<_> = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.terminated = true;
            state.downstream = None;
            state.queue.clear();
            state.inners.drain().map(|(_, inner)| inner).collect()
        };

        debug!(
            "merge output cancelled downstream, abandoning {} inner publishers",
            inners.len()
        );
        for inner in inners {
            inner.cancel();
        }
        if let Some(driver) = self.driver() {
            driver.cancel_upstream();
        }
    }

    fn driver(&self) -> Option<Arc<dyn MergeDriver>> {
        self.driver.lock().as_ref().and_then(Weak::upgrade)
    }

    /// A missing or dropped driver can no longer deliver publishers.
    fn driver_finished(&self) -> bool {
        match self.driver.lock().as_ref() {
            None => true,
            Some(driver) => driver
                .upgrade()
                .map_or(true, |driver| driver.has_no_more_publishers()),
        }
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }

        let mut missed = 1;
        loop {
            loop {
                match self.next_step() {
                    Step::Idle => break,
                    Step::Emit {
                        downstream,
                        item,
                        inner,
                    } => {
                        downstream.on_next(item);
                        if let Some(inner) = inner {
                            inner.replenish();
                        }
                    }
                    Step::Fail {
                        downstream,
                        error,
                        inners,
                    } => {
                        debug!("merge output failed: {error}");
                        for inner in inners {
                            inner.cancel();
                        }
                        if let Some(driver) = self.driver() {
                            driver.cancel_upstream();
                        }
                        downstream.on_error(error);
                    }
                    Step::Complete(downstream) => {
                        debug!("merge output completed");
                        downstream.on_complete();
                    }
                }
            }

            let remaining = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if remaining == 0 {
                break;
            }
            missed = remaining;
        }
    }

    fn next_step(&self) -> Step<T> {
        let mut state = self.state.lock();
        if state.terminated {
            return Step::Idle;
        }
        let Some(downstream) = state.downstream.clone() else {
            return Step::Idle;
        };

        if let Some(error) = state.pending_error.take() {
            state.terminated = true;
            state.downstream = None;
            state.queue.clear();
            let inners = state.inners.drain().map(|(_, inner)| inner).collect();
            return Step::Fail {
                downstream,
                error,
                inners,
            };
        }

        if !state.queue.is_empty() {
            if !self.requested.try_take() {
                return Step::Idle;
            }
            if let Some((id, item)) = state.queue.pop_front() {
                let inner = state.inners.get(&id).cloned();
                return Step::Emit {
                    downstream,
                    item,
                    inner,
                };
            }
        }

        if state.completion_scheduled && state.inners.is_empty() && self.driver_finished() {
            state.terminated = true;
            state.downstream = None;
            return Step::Complete(downstream);
        }

        Step::Idle
    }
}

impl<T: Send + 'static> Publisher<T> for MergeEngine<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let first = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.subscribed, true)
        };

        if !first {
            subscriber.on_subscribe(Arc::new(NoopSubscription));
            subscriber.on_error(MergeError::AlreadySubscribed);
            return;
        }

        let Some(engine) = self.me.upgrade() else {
            return;
        };
        subscriber.on_subscribe(Arc::new(EngineSubscription { engine }));

        {
            let mut state = self.state.lock();
            if !state.terminated {
                state.downstream = Some(subscriber);
            }
        }
        self.drain();
    }
}

impl<T: Send + 'static> FanIn<T> for MergeEngine<T> {
    fn add_publisher(&self, publisher: BoxPublisher<T>) {
        let prefetch = self.capacity().max(1);
        let inner = {
            let mut state = self.state.lock();
            if state.terminated {
                debug!("merge output terminated, dropping late inner publisher");
                return;
            }
            let id = state.next_id;
            state.next_id += 1;
            state.registered += 1;

            let inner = Arc::new(InnerSubscriber::new(id, self.me.clone(), prefetch));
            state.inners.insert(id, Arc::clone(&inner));
            inner
        };

        let id = inner.id();
        trace!("subscribing inner publisher {id} with prefetch {prefetch}");
        let dispatcher = Arc::clone(self.environment.lock().dispatcher());
        let subscriber: Arc<dyn Subscriber<T>> = inner;
        if let Err(error) = dispatcher.dispatch(Box::new(move || publisher.subscribe(subscriber))) {
            warn!("could not subscribe inner publisher {id}: {error}");
            self.fail(Some(id), error);
        }
    }

    fn reset_child_requests(&self) -> u64 {
        self.requested.reset()
    }

    fn replay_child_requests(&self, amount: u64) {
        self.requested.replay(amount);
        self.drain();
    }

    fn schedule_completion(&self) {
        self.state.lock().completion_scheduled = true;
        self.drain();
    }

    fn do_error(&self, error: MergeError) {
        self.fail(None, error);
    }

    fn set_capacity(&self, elements: u64) {
        self.capacity.store(elements, Ordering::Release);
    }

    fn set_environment(&self, environment: Environment) {
        *self.environment.lock() = environment;
    }

    fn attach_driver(&self, driver: Weak<dyn MergeDriver>) {
        *self.driver.lock() = Some(driver);
    }
}

/// Downstream handle onto a [`MergeEngine`].
///
/// Keeps the engine alive for as long as the downstream holds on to it; the
/// engine drops its downstream reference once it terminates.
struct EngineSubscription<T> {
    engine: Arc<MergeEngine<T>>,
}

impl<T: Send + 'static> Subscription for EngineSubscription<T> {
    fn request(&self, n: u64) {
        self.engine.request(n);
    }

    fn cancel(&self) {
        self.engine.cancel();
    }
}
