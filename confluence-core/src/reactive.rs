// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Push-based producer/consumer contract with explicit demand.
//!
//! A [`Publisher`] hands each [`Subscriber`] a [`Subscription`] through
//! `on_subscribe`. The subscriber then authorizes delivery with
//! [`Subscription::request`]; the publisher never calls `on_next` more times
//! than requested and signals at most one terminal event (`on_error` or
//! `on_complete`).
//!
//! All three traits are object safe and `Send + Sync`, so publishers of
//! publishers ([`BoxPublisher<BoxPublisher<T>>`]) can be passed around freely
//! between threads.

use crate::MergeError;
use std::sync::Arc;

/// Handle a subscriber uses to control the flow of a publisher.
pub trait Subscription: Send + Sync {
    /// Authorizes the publisher to send `n` more elements.
    ///
    /// Requests accumulate; `u64::MAX` means unbounded. A request of zero is
    /// ignored.
    fn request(&self, n: u64);

    /// Stops delivery. Idempotent.
    fn cancel(&self);
}

/// Receiving end of a publisher.
pub trait Subscriber<T>: Send + Sync {
    /// Called once, before any other signal.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called for each element, never more often than requested.
    fn on_next(&self, item: T);

    /// Terminal failure.
    fn on_error(&self, error: MergeError);

    /// Terminal success.
    fn on_complete(&self);
}

/// Source of elements.
pub trait Publisher<T>: Send + Sync {
    /// Attaches `subscriber`, which will receive `on_subscribe` first.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

/// Shared, type-erased publisher.
pub type BoxPublisher<T> = Arc<dyn Publisher<T>>;

/// Shared, type-erased subscriber.
pub type BoxSubscriber<T> = Arc<dyn Subscriber<T>>;

/// Subscription that ignores every call.
///
/// Handed to subscribers that are rejected before any real subscription
/// exists, so that the "`on_subscribe` first" rule still holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubscription;

impl Subscription for NoopSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}
