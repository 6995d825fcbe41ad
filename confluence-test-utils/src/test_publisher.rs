// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Manually driven publisher.

use confluence_core::{BoxPublisher, MergeError, Publisher, Subscriber, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Publisher whose signals are pushed by the test.
///
/// Every call to [`TestPublisher::next`], [`TestPublisher::complete`] or
/// [`TestPublisher::error`] is forwarded, on the calling thread, to all
/// current subscribers. Demand is recorded but not enforced, so a test can
/// push exactly the interleaving it wants to observe.
///
/// ```
/// use confluence_test_utils::{RecordingSubscriber, TestPublisher};
///
/// let publisher = TestPublisher::<u32>::new();
/// let subscriber = RecordingSubscriber::unbounded();
/// publisher.subscribe_with(&subscriber);
///
/// publisher.next(7);
/// publisher.complete();
///
/// assert_eq!(subscriber.values(), vec![7]);
/// assert_eq!(subscriber.completions(), 1);
/// assert_eq!(publisher.requested(), u64::MAX);
/// ```
pub struct TestPublisher<T> {
    subscribers: Mutex<Vec<Arc<dyn Subscriber<T>>>>,
    requested: Arc<AtomicU64>,
    cancels: Arc<AtomicUsize>,
    subscriptions: AtomicUsize,
}

impl<T: Send + 'static> TestPublisher<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            requested: Arc::new(AtomicU64::new(0)),
            cancels: Arc::new(AtomicUsize::new(0)),
            subscriptions: AtomicUsize::new(0),
        })
    }

    /// Type-erased handle sharing this publisher.
    pub fn boxed(self: &Arc<Self>) -> BoxPublisher<T> {
        Arc::clone(self) as BoxPublisher<T>
    }

    pub fn subscribe_with<S>(&self, subscriber: &Arc<S>)
    where
        S: Subscriber<T> + 'static,
    {
        self.subscribe(Arc::clone(subscriber) as Arc<dyn Subscriber<T>>);
    }

    pub fn next(&self, item: T)
    where
        T: Clone,
    {
        for subscriber in self.snapshot() {
            subscriber.on_next(item.clone());
        }
    }

    pub fn error(&self, error: MergeError) {
        for subscriber in self.snapshot() {
            subscriber.on_error(error.clone());
        }
    }

    pub fn complete(&self) {
        for subscriber in self.snapshot() {
            subscriber.on_complete();
        }
    }

    /// Total demand requested by all subscribers, saturating at `u64::MAX`.
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    /// Number of `cancel` calls received, repeated calls included.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::Acquire)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Vec<Arc<dyn Subscriber<T>>> {
        self.subscribers.lock().clone()
    }
}

impl<T: Send + 'static> Publisher<T> for TestPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.subscriptions.fetch_add(1, Ordering::AcqRel);
        self.subscribers.lock().push(Arc::clone(&subscriber));
        subscriber.on_subscribe(Arc::new(TestSubscription {
            requested: Arc::clone(&self.requested),
            cancels: Arc::clone(&self.cancels),
        }));
    }
}

struct TestSubscription {
    requested: Arc<AtomicU64>,
    cancels: Arc<AtomicUsize>,
}

impl Subscription for TestSubscription {
    fn request(&self, n: u64) {
        let _ = self
            .requested
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(n))
            });
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::AcqRel);
    }
}
