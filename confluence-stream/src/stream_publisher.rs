// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Publisher over a `futures::Stream`.
//!
//! The stream is polled on a tokio task spawned when the single subscriber
//! arrives. One element is read ahead of demand so that an exhausted stream
//! completes without waiting for a request; it is delivered only once the
//! subscriber asks for it.

use confluence_core::{
    CancellationToken, Demand, MergeError, NoopSubscription, Publisher, Subscriber, Subscription,
};
use event_listener::Event;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Single-subscriber publisher fed by a stream.
///
/// A second subscriber is rejected with [`MergeError::AlreadySubscribed`].
/// Cancelling the subscription stops the polling task and drops the stream.
pub struct StreamPublisher<S> {
    stream: Mutex<Option<S>>,
    handle: Option<Handle>,
}

impl<S> StreamPublisher<S>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    /// Polls `stream` on the runtime current at subscription time.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
            handle: None,
        }
    }

    /// Polls `stream` on the runtime behind `handle`.
    pub fn with_handle(stream: S, handle: Handle) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
            handle: Some(handle),
        }
    }

    fn runtime(&self) -> confluence_core::Result<Handle> {
        match &self.handle {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|e| MergeError::dispatch(e.to_string())),
        }
    }
}

impl<S> Publisher<S::Item> for StreamPublisher<S>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<S::Item>>) {
        let Some(stream) = self.stream.lock().take() else {
            subscriber.on_subscribe(Arc::new(NoopSubscription));
            subscriber.on_error(MergeError::AlreadySubscribed);
            return;
        };

        let subscription = Arc::new(StreamSubscription {
            requested: Demand::new(),
            demand_added: Event::new(),
            cancel: CancellationToken::new(),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        if subscription.cancel.is_cancelled() {
            return;
        }

        match self.runtime() {
            Ok(handle) => {
                handle.spawn(pump(stream, subscriber, subscription));
            }
            Err(error) => {
                warn!("no runtime to poll stream publisher: {error}");
                subscriber.on_error(error);
            }
        }
    }
}

struct StreamSubscription {
    requested: Demand,
    demand_added: Event,
    cancel: CancellationToken,
}

impl StreamSubscription {
    /// Waits for one unit of demand; `false` if cancelled first.
    async fn acquire(&self) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if self.requested.try_take() {
                return true;
            }

            let listener = self.demand_added.listen();
            // Demand may have arrived before the listener was registered
            if self.requested.outstanding() > 0 || self.cancel.is_cancelled() {
                continue;
            }

            tokio::select! {
                () = listener => {}
                () = self.cancel.cancelled() => return false,
            }
        }
    }
}

impl Subscription for StreamSubscription {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.requested.request(n);
        self.demand_added.notify(1);
    }

    fn cancel(&self) {
        if self.cancel.cancel() {
            trace!("stream publisher subscription cancelled");
        }
    }
}

async fn pump<S>(
    stream: S,
    subscriber: Arc<dyn Subscriber<S::Item>>,
    subscription: Arc<StreamSubscription>,
) where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    let mut stream = Box::pin(stream);
    loop {
        let next = tokio::select! {
            () = subscription.cancel.cancelled() => return,
            next = stream.next() => next,
        };

        let Some(item) = next else {
            trace!("stream publisher source exhausted");
            subscriber.on_complete();
            return;
        };

        if !subscription.acquire().await {
            return;
        }
        subscriber.on_next(item);
    }
}
