// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use confluence_core::{MergeError, StreamItem, UNBOUNDED};
use confluence_stream::{
    into_stream, ErrorPublisher, IterPublisher, PublisherStreamExt, StreamPublisher,
};
use confluence_test_utils::{test_error, TestPublisher};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_collects_all_values_then_ends() -> anyhow::Result<()> {
    // Arrange
    let publisher = IterPublisher::new(vec![1, 2, 3, 4, 5]);

    // Act
    let items: Vec<StreamItem<i32>> = into_stream(&publisher, 2).collect().await;

    // Assert
    let values: Vec<i32> = items.into_iter().filter_map(StreamItem::ok).collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);

    Ok(())
}

#[tokio::test]
async fn test_prefetch_bounds_upstream_demand() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();

    // Act
    let mut stream = publisher.to_stream(3);

    // Assert
    assert_eq!(publisher.requested(), 3);

    // Act
    publisher.next(1);
    publisher.next(2);
    let first = stream.next().await;

    // Assert
    assert_eq!(first, Some(StreamItem::Value(1)));
    assert_eq!(publisher.requested(), 4);

    Ok(())
}

#[tokio::test]
async fn test_zero_prefetch_requests_one() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();

    // Act
    let _stream = publisher.to_stream(0);

    // Assert
    assert_eq!(publisher.requested(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unbounded_prefetch_never_replenishes() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();
    let mut stream = publisher.to_stream(UNBOUNDED);

    // Act
    publisher.next(1);
    let _ = stream.next().await;

    // Assert
    assert_eq!(publisher.requested(), UNBOUNDED);

    Ok(())
}

#[tokio::test]
async fn test_error_is_last_item() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();
    let mut stream = publisher.to_stream(8);

    // Act
    publisher.next(1);
    publisher.error(test_error("inner failed"));
    publisher.next(2);

    // Assert
    assert_eq!(stream.next().await, Some(StreamItem::Value(1)));
    assert!(matches!(stream.next().await, Some(StreamItem::Error(_))));
    assert!(stream.next().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_error_publisher_yields_single_error() -> anyhow::Result<()> {
    // Arrange
    let publisher = ErrorPublisher::new(test_error("nothing to read"));

    // Act
    let items: Vec<StreamItem<u32>> = into_stream(&publisher, 1).collect().await;

    // Assert
    assert_eq!(items.len(), 1);
    assert!(items[0].is_error());

    Ok(())
}

#[tokio::test]
async fn test_dropping_stream_cancels_subscription() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();
    let stream = publisher.to_stream(4);

    // Act
    drop(stream);

    // Assert
    assert_eq!(publisher.cancel_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_round_trip_through_stream_publisher() -> anyhow::Result<()> {
    // Arrange
    let source = futures::stream::iter(0..100u32);
    let publisher = StreamPublisher::new(source);

    // Act
    let items: Vec<StreamItem<u32>> =
        timeout(Duration::from_secs(5), publisher.to_stream(4).collect()).await?;

    // Assert
    let values: Vec<u32> = items.into_iter().filter_map(StreamItem::ok).collect();
    assert_eq!(values, (0..100).collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn test_explicit_cancel_ends_stream_with_cancelled() -> anyhow::Result<()> {
    // Arrange
    let publisher = TestPublisher::<u32>::new();
    let mut stream = publisher.to_stream(8);
    publisher.next(1);

    // Act
    stream.cancel();
    publisher.next(2);

    // Assert
    assert_eq!(stream.next().await, Some(StreamItem::Value(1)));
    assert!(matches!(
        stream.next().await,
        Some(StreamItem::Error(MergeError::Cancelled))
    ));
    assert!(stream.next().await.is_none());
    assert_eq!(publisher.cancel_count(), 1);

    Ok(())
}
