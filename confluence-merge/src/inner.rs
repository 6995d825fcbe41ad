// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::engine::MergeEngine;
use confluence_core::{MergeError, Subscriber, Subscription, UNBOUNDED};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Per-publisher subscriber owned by a [`MergeEngine`].
///
/// Requests `prefetch` elements up front and one more every time the engine
/// hands one of its elements downstream, so each inner publisher keeps at
/// most `prefetch` elements in flight.
pub(crate) struct InnerSubscriber<T> {
    id: u64,
    engine: Weak<MergeEngine<T>>,
    prefetch: u64,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    cancelled: AtomicBool,
}

impl<T: Send + 'static> InnerSubscriber<T> {
    pub(crate) fn new(id: u64, engine: Weak<MergeEngine<T>>, prefetch: u64) -> Self {
        Self {
            id,
            engine,
            prefetch,
            subscription: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Grants one more element after the engine delivered one from this publisher.
    pub(crate) fn replenish(&self) {
        if self.prefetch == UNBOUNDED {
            return;
        }

        let subscription = self.subscription.lock().clone();
        if let Some(subscription) = subscription {
            subscription.request(1);
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for InnerSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        {
            let mut slot = self.subscription.lock();
            if self.cancelled.load(Ordering::Acquire) || slot.is_some() {
                drop(slot);
                subscription.cancel();
                return;
            }
            *slot = Some(Arc::clone(&subscription));
        }

        subscription.request(self.prefetch);
    }

    fn on_next(&self, item: T) {
        if let Some(engine) = self.engine.upgrade() {
            engine.inner_next(self.id, item);
        }
    }

    fn on_error(&self, error: MergeError) {
        if let Some(engine) = self.engine.upgrade() {
            engine.inner_error(self.id, error);
        }
    }

    fn on_complete(&self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.inner_complete(self.id);
        }
    }
}
