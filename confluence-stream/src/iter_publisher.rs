// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cold publisher over an iterator source.

use confluence_core::{
    Demand, MergeError, NoopSubscription, Publisher, Subscriber, Subscription,
};
use parking_lot::Mutex;
use std::iter::Peekable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Publisher that replays a cloneable source to every subscriber.
///
/// Each subscription gets its own iterator and emits one element per unit of
/// demand. An exhausted source completes without waiting for demand, so an
/// empty source completes right after `on_subscribe`.
///
/// Calling [`Subscription::request`] from inside `on_next` is safe: the
/// nested call only records the demand and the outer emission loop picks it
/// up.
///
/// ```
/// use confluence_stream::IterPublisher;
///
/// let publisher = IterPublisher::new(vec![1, 2, 3]);
/// assert_eq!(publisher.source(), &vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct IterPublisher<I> {
    source: I,
}

impl<I> IterPublisher<I> {
    pub fn new(source: I) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &I {
        &self.source
    }
}

/// Shorthand for [`IterPublisher::new`].
pub fn from_iter<I>(source: I) -> IterPublisher<I> {
    IterPublisher::new(source)
}

impl<I> Publisher<I::Item> for IterPublisher<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<I::Item>>) {
        let subscription = Arc::new(IterSubscription {
            iter: Mutex::new(Some(self.source.clone().into_iter().peekable())),
            subscriber: Mutex::new(Some(Arc::clone(&subscriber))),
            requested: Demand::new(),
            wip: AtomicUsize::new(0),
        });

        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        subscription.drain();
    }
}

struct IterSubscription<It: Iterator> {
    iter: Mutex<Option<Peekable<It>>>,
    subscriber: Mutex<Option<Arc<dyn Subscriber<It::Item>>>>,
    requested: Demand,
    wip: AtomicUsize,
}

enum Step<T> {
    Idle,
    Next(Arc<dyn Subscriber<T>>, T),
    Complete(Arc<dyn Subscriber<T>>),
}

impl<It> IterSubscription<It>
where
    It: Iterator + Send,
    It::Item: Send,
{
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }

        let mut missed = 1;
        loop {
            loop {
                match self.next_step() {
                    Step::Idle => break,
                    Step::Next(subscriber, item) => subscriber.on_next(item),
                    Step::Complete(subscriber) => subscriber.on_complete(),
                }
            }

            let remaining = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if remaining == 0 {
                break;
            }
            missed = remaining;
        }
    }

    fn next_step(&self) -> Step<It::Item> {
        let mut iter = self.iter.lock();
        let Some(source) = iter.as_mut() else {
            return Step::Idle;
        };
        let Some(subscriber) = self.subscriber.lock().clone() else {
            return Step::Idle;
        };

        if source.peek().is_none() {
            *iter = None;
            self.subscriber.lock().take();
            return Step::Complete(subscriber);
        }

        if !self.requested.try_take() {
            return Step::Idle;
        }
        match source.next() {
            Some(item) => Step::Next(subscriber, item),
            None => Step::Idle,
        }
    }
}

impl<It> Subscription for IterSubscription<It>
where
    It: Iterator + Send,
    It::Item: Send,
{
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.requested.request(n);
        self.drain();
    }

    fn cancel(&self) {
        self.iter.lock().take();
        self.subscriber.lock().take();
    }
}

/// Publisher that fails every subscriber right after `on_subscribe`.
#[derive(Debug, Clone)]
pub struct ErrorPublisher {
    error: MergeError,
}

impl ErrorPublisher {
    pub fn new(error: MergeError) -> Self {
        Self { error }
    }
}

impl<T> Publisher<T> for ErrorPublisher {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        subscriber.on_subscribe(Arc::new(NoopSubscription));
        subscriber.on_error(self.error.clone());
    }
}
