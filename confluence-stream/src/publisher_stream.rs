// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Consuming a publisher as a `futures::Stream`.

use confluence_core::{MergeError, Publisher, StreamItem, Subscriber, Subscription, UNBOUNDED};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Stream of the signals a publisher delivers.
///
/// Values arrive as [`StreamItem::Value`]; a publisher error arrives as one
/// [`StreamItem::Error`] followed by the end of the stream. Demand is
/// requested `prefetch` elements up front and one more for each value taken
/// from the stream, so at most `prefetch` values are buffered. Dropping the
/// stream cancels the subscription.
pub struct PublisherStream<T> {
    receiver: UnboundedReceiver<StreamItem<T>>,
    bridge: Arc<Bridge<T>>,
}

/// Subscribes to `publisher` and returns its signals as a stream.
///
/// A `prefetch` of zero is treated as one.
///
/// ```
/// use confluence_stream::{into_stream, IterPublisher};
/// use confluence_core::StreamItem;
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let publisher = IterPublisher::new(vec![1, 2, 3]);
/// let values: Vec<_> = into_stream(&publisher, 2).collect().await;
/// assert_eq!(
///     values,
///     vec![StreamItem::Value(1), StreamItem::Value(2), StreamItem::Value(3)]
/// );
/// # }
/// ```
pub fn into_stream<T: Send + 'static>(
    publisher: &(impl Publisher<T> + ?Sized),
    prefetch: u64,
) -> PublisherStream<T> {
    let (sender, receiver) = mpsc::unbounded();
    let bridge = Arc::new(Bridge {
        sender,
        subscription: Mutex::new(None),
        prefetch: prefetch.max(1),
    });

    publisher.subscribe(Arc::clone(&bridge) as Arc<dyn Subscriber<T>>);
    PublisherStream { receiver, bridge }
}

/// Extension for turning any publisher into a [`PublisherStream`].
pub trait PublisherStreamExt<T> {
    /// See [`into_stream`].
    fn to_stream(&self, prefetch: u64) -> PublisherStream<T>;
}

impl<T, P> PublisherStreamExt<T> for P
where
    T: Send + 'static,
    P: Publisher<T> + ?Sized,
{
    fn to_stream(&self, prefetch: u64) -> PublisherStream<T> {
        into_stream(self, prefetch)
    }
}

impl<T> PublisherStream<T> {
    /// Cancels the subscription.
    ///
    /// Values already buffered are still yielded, followed by a final
    /// [`MergeError::Cancelled`]. Has no effect once the publisher terminated.
    pub fn cancel(&self) {
        self.bridge.cancel();
    }
}

impl<T> Stream for PublisherStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.receiver).poll_next(cx);
        if let Poll::Ready(Some(StreamItem::Value(_))) = &polled {
            self.bridge.replenish();
        }
        polled
    }
}

impl<T> Drop for PublisherStream<T> {
    fn drop(&mut self) {
        self.bridge.cancel();
    }
}

struct Bridge<T> {
    sender: UnboundedSender<StreamItem<T>>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    prefetch: u64,
}

impl<T> Bridge<T> {
    fn replenish(&self) {
        if self.prefetch == UNBOUNDED {
            return;
        }
        let subscription = self.subscription.lock().clone();
        if let Some(subscription) = subscription {
            subscription.request(1);
        }
    }

    fn cancel(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
            let _ = self.sender.unbounded_send(StreamItem::Error(MergeError::Cancelled));
            self.sender.close_channel();
        }
    }
}

impl<T: Send + 'static> Subscriber<T> for Bridge<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(Arc::clone(&subscription));
        subscription.request(self.prefetch);
    }

    fn on_next(&self, item: T) {
        // A closed channel means the stream was dropped
        let _ = self.sender.unbounded_send(StreamItem::Value(item));
    }

    fn on_error(&self, error: MergeError) {
        self.subscription.lock().take();
        let _ = self.sender.unbounded_send(StreamItem::Error(error));
        self.sender.close_channel();
    }

    fn on_complete(&self) {
        self.subscription.lock().take();
        self.sender.close_channel();
    }
}
