// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_stream::stream;
use confluence_core::MergeError;
use confluence_stream::StreamPublisher;
use confluence_test_utils::{assert_never, eventually, RecordingSubscriber};
use futures::stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

#[tokio::test]
async fn test_emits_stream_items_against_demand() -> anyhow::Result<()> {
    // Arrange
    let publisher = StreamPublisher::new(stream::iter(vec![1, 2, 3, 4]));
    let subscriber = RecordingSubscriber::<i32>::new(2);

    // Act
    subscriber.subscribe_to(&publisher);

    // Assert
    assert!(eventually(1_000, || subscriber.value_count() == 2).await);
    assert_never(20, || subscriber.value_count() > 2).await;

    // Act
    subscriber.request(2);

    // Assert
    assert!(eventually(1_000, || subscriber.completions() == 1).await);
    assert_eq!(subscriber.values(), vec![1, 2, 3, 4]);

    Ok(())
}

#[tokio::test]
async fn test_exhausted_stream_completes_without_demand() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = mpsc::unbounded_channel::<i32>();
    let publisher = StreamPublisher::new(UnboundedReceiverStream::new(rx));
    let subscriber = RecordingSubscriber::<i32>::new(0);
    subscriber.subscribe_to(&publisher);

    // Act
    drop(tx);

    // Assert
    assert!(eventually(1_000, || subscriber.completions() == 1).await);
    assert!(subscriber.values().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_values_pushed_after_subscription_arrive() -> anyhow::Result<()> {
    // Arrange
    let (tx, rx) = mpsc::unbounded_channel::<i32>();
    let publisher = StreamPublisher::new(UnboundedReceiverStream::new(rx));
    let subscriber = RecordingSubscriber::<i32>::unbounded();
    subscriber.subscribe_to(&publisher);

    // Act
    tx.send(10)?;
    tx.send(20)?;

    // Assert
    assert!(eventually(1_000, || subscriber.value_count() == 2).await);
    assert_eq!(subscriber.values(), vec![10, 20]);
    assert_eq!(subscriber.completions(), 0);

    Ok(())
}

#[tokio::test]
async fn test_cancel_stops_polling_and_drops_stream() -> anyhow::Result<()> {
    // Arrange
    let dropped = Arc::new(AtomicBool::new(false));
    let guard = DropFlag(Arc::clone(&dropped));
    let source = stream! {
        let _guard = guard;
        let mut n = 0;
        loop {
            n += 1;
            yield n;
            tokio::task::yield_now().await;
        }
    };
    let publisher = StreamPublisher::new(source);
    let subscriber = RecordingSubscriber::<i32>::new(3);
    subscriber.subscribe_to(&publisher);
    assert!(eventually(1_000, || subscriber.value_count() == 3).await);

    // Act
    subscriber.cancel();
    subscriber.request(10);

    // Assert
    assert!(eventually(1_000, || dropped.load(Ordering::Acquire)).await);
    assert_eq!(subscriber.values(), vec![1, 2, 3]);
    assert_eq!(subscriber.terminal_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_second_subscriber_is_rejected() -> anyhow::Result<()> {
    // Arrange
    let publisher = StreamPublisher::new(stream::iter(vec![1]));
    let first = RecordingSubscriber::<i32>::unbounded();
    let second = RecordingSubscriber::<i32>::unbounded();
    first.subscribe_to(&publisher);

    // Act
    second.subscribe_to(&publisher);

    // Assert
    assert!(matches!(second.errors()[..], [MergeError::AlreadySubscribed]));
    assert!(eventually(1_000, || first.completions() == 1).await);

    Ok(())
}

#[test]
fn test_subscription_outside_runtime_fails() -> anyhow::Result<()> {
    // Arrange
    let publisher = StreamPublisher::new(stream::iter(vec![1]));
    let subscriber = RecordingSubscriber::<i32>::unbounded();

    // Act
    subscriber.subscribe_to(&publisher);

    // Assert
    assert!(matches!(subscriber.errors()[..], [MergeError::Dispatch { .. }]));
    assert!(subscriber.values().is_empty());

    Ok(())
}

#[test]
fn test_explicit_handle_is_used_outside_runtime() -> anyhow::Result<()> {
    // Arrange
    let runtime = tokio::runtime::Runtime::new()?;
    let publisher =
        StreamPublisher::with_handle(stream::iter(vec![5, 6]), runtime.handle().clone());
    let subscriber = RecordingSubscriber::<i32>::unbounded();

    // Act
    subscriber.subscribe_to(&publisher);

    // Assert
    let completed = runtime.block_on(eventually(1_000, || subscriber.completions() == 1));
    assert!(completed);
    assert_eq!(subscriber.values(), vec![5, 6]);

    Ok(())
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}
