// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fan-in engine double that records what its driver asks of it.

use confluence_core::{
    BoxPublisher, Demand, Environment, MergeError, NoopSubscription, Publisher, Subscriber,
    Subscription,
};
use confluence_merge::{FanIn, MergeDriver};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// [`FanIn`] implementation that subscribes to nothing and remembers every call.
///
/// Publishers handed to [`FanIn::add_publisher`] are stored in arrival order.
/// [`RecordingEngine::request_from_driver`] and
/// [`RecordingEngine::cancel_driver`] play the downstream side of the driver
/// back-reference.
pub struct RecordingEngine<T> {
    publishers: Mutex<Vec<BoxPublisher<T>>>,
    completions: Mutex<usize>,
    errors: Mutex<Vec<MergeError>>,
    requested: Demand,
    replays: Mutex<Vec<u64>>,
    capacity: Mutex<Option<u64>>,
    environment: Mutex<Option<Environment>>,
    driver: Mutex<Option<Weak<dyn MergeDriver>>>,
    subscribers: Mutex<Vec<Arc<dyn Subscriber<T>>>>,
}

impl<T: Send + 'static> RecordingEngine<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            publishers: Mutex::new(Vec::new()),
            completions: Mutex::new(0),
            errors: Mutex::new(Vec::new()),
            requested: Demand::new(),
            replays: Mutex::new(Vec::new()),
            capacity: Mutex::new(None),
            environment: Mutex::new(None),
            driver: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Type-erased handle, ready for `DynamicMerge::new`.
    pub fn as_fan_in(self: &Arc<Self>) -> Arc<dyn FanIn<T>> {
        Arc::clone(self) as Arc<dyn FanIn<T>>
    }

    pub fn publishers(&self) -> Vec<BoxPublisher<T>> {
        self.publishers.lock().clone()
    }

    pub fn publisher_count(&self) -> usize {
        self.publishers.lock().len()
    }

    /// How often `schedule_completion` was called.
    pub fn completion_count(&self) -> usize {
        *self.completions.lock()
    }

    pub fn errors(&self) -> Vec<MergeError> {
        self.errors.lock().clone()
    }

    /// Terminal actions received: completions scheduled plus errors.
    pub fn terminal_count(&self) -> usize {
        self.completion_count() + self.errors.lock().len()
    }

    pub fn replays(&self) -> Vec<u64> {
        self.replays.lock().clone()
    }

    /// Demand currently held as child requests.
    pub fn outstanding(&self) -> u64 {
        self.requested.outstanding()
    }

    /// Seeds the child request counter, as downstream demand would.
    pub fn add_child_requests(&self, n: u64) {
        self.requested.request(n);
    }

    pub fn capacity(&self) -> Option<u64> {
        *self.capacity.lock()
    }

    pub fn environment(&self) -> Option<Environment> {
        self.environment.lock().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// The attached driver, if it is still alive.
    pub fn driver(&self) -> Option<Arc<dyn MergeDriver>> {
        self.driver.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_driver(&self) -> bool {
        self.driver.lock().is_some()
    }

    /// Forwards downstream demand to the driver, as a real engine would.
    pub fn request_from_driver(&self, n: u64) {
        if let Some(driver) = self.driver() {
            driver.request_publishers(n);
        }
    }

    /// Propagates a downstream cancel to the driver.
    pub fn cancel_driver(&self) {
        if let Some(driver) = self.driver() {
            driver.cancel_upstream();
        }
    }

    /// `true` when the attached driver reports that the outer publisher is done.
    pub fn driver_finished(&self) -> bool {
        self.driver()
            .map_or(true, |driver| driver.has_no_more_publishers())
    }
}

impl<T: Send + 'static> Publisher<T> for RecordingEngine<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.subscribers.lock().push(Arc::clone(&subscriber));
        subscriber.on_subscribe(Arc::new(NoopSubscription) as Arc<dyn Subscription>);
    }
}

impl<T: Send + 'static> FanIn<T> for RecordingEngine<T> {
    fn add_publisher(&self, publisher: BoxPublisher<T>) {
        self.publishers.lock().push(publisher);
    }

    fn reset_child_requests(&self) -> u64 {
        self.requested.reset()
    }

    fn replay_child_requests(&self, amount: u64) {
        self.replays.lock().push(amount);
        self.requested.replay(amount);
    }

    fn schedule_completion(&self) {
        *self.completions.lock() += 1;
    }

    fn do_error(&self, error: MergeError) {
        self.errors.lock().push(error);
    }

    fn set_capacity(&self, elements: u64) {
        *self.capacity.lock() = Some(elements);
    }

    fn set_environment(&self, environment: Environment) {
        *self.environment.lock() = Some(environment);
    }

    fn attach_driver(&self, driver: Weak<dyn MergeDriver>) {
        *self.driver.lock() = Some(driver);
    }
}
