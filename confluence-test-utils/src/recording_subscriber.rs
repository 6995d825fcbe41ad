// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Subscriber that records every signal it receives.

use confluence_core::{MergeError, Publisher, Subscriber, Subscription, UNBOUNDED};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records values, errors and completions in arrival order.
///
/// Requests `initial` elements as soon as it is subscribed. Further demand is
/// issued by the test through [`RecordingSubscriber::request`].
pub struct RecordingSubscriber<T> {
    initial: u64,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    state: Mutex<Recorded<T>>,
}

struct Recorded<T> {
    subscribed: usize,
    values: Vec<T>,
    errors: Vec<MergeError>,
    completions: usize,
}

impl<T: Send + 'static> RecordingSubscriber<T> {
    pub fn new(initial: u64) -> Arc<Self> {
        Arc::new(Self {
            initial,
            subscription: Mutex::new(None),
            state: Mutex::new(Recorded {
                subscribed: 0,
                values: Vec::new(),
                errors: Vec::new(),
                completions: 0,
            }),
        })
    }

    pub fn unbounded() -> Arc<Self> {
        Self::new(UNBOUNDED)
    }

    /// Subscribes this recorder to `publisher`.
    pub fn subscribe_to(self: &Arc<Self>, publisher: &(impl Publisher<T> + ?Sized)) {
        publisher.subscribe(Arc::clone(self) as Arc<dyn Subscriber<T>>);
    }

    /// Issues `n` more demand on the recorded subscription.
    pub fn request(&self, n: u64) {
        if let Some(subscription) = self.subscription() {
            subscription.request(n);
        }
    }

    pub fn cancel(&self) {
        if let Some(subscription) = self.subscription() {
            subscription.cancel();
        }
    }

    pub fn subscription(&self) -> Option<Arc<dyn Subscription>> {
        self.subscription.lock().clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.lock().subscribed
    }

    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.state.lock().values.clone()
    }

    pub fn value_count(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn errors(&self) -> Vec<MergeError> {
        self.state.lock().errors.clone()
    }

    pub fn completions(&self) -> usize {
        self.state.lock().completions
    }

    /// Number of terminal signals received; more than one is a protocol violation.
    pub fn terminal_count(&self) -> usize {
        let state = self.state.lock();
        state.errors.len() + state.completions
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal_count() > 0
    }
}

impl<T: Send + 'static> Subscriber<T> for RecordingSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.state.lock().subscribed += 1;
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        if self.initial > 0 {
            subscription.request(self.initial);
        }
    }

    fn on_next(&self, item: T) {
        self.state.lock().values.push(item);
    }

    fn on_error(&self, error: MergeError) {
        self.state.lock().errors.push(error);
    }

    fn on_complete(&self) {
        self.state.lock().completions += 1;
    }
}
