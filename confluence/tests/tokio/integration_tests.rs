// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_stream::stream;
use confluence::prelude::*;
use confluence::ErrorPublisher;
use confluence_test_utils::{eventually, test_error, RecordingSubscriber};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn slow_inner(index: u32) -> BoxPublisher<u32> {
    Arc::new(StreamPublisher::new(stream! {
        for offset in 0..3u32 {
            sleep(Duration::from_millis(1)).await;
            yield index * 10 + offset;
        }
    }))
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

#[tokio::test]
async fn test_flattens_async_inner_streams() -> anyhow::Result<()> {
    // Arrange
    let env = Environment::tokio()?.with_capacity(2);
    let outer = StreamPublisher::new(stream! {
        for index in 0..5u32 {
            yield slow_inner(index);
        }
    });

    // Act
    let merged = merge_dynamic::<u32>(&outer, &env);
    let items: Vec<StreamItem<u32>> =
        timeout(Duration::from_secs(5), merged.to_stream(4).collect()).await?;

    // Assert
    let values: Vec<u32> = items.into_iter().filter_map(StreamItem::ok).collect();
    assert_eq!(values.len(), 15);
    for index in 0..5u32 {
        let own: Vec<u32> = values
            .iter()
            .copied()
            .filter(|value| value / 10 == index)
            .collect();
        assert_eq!(own, vec![index * 10, index * 10 + 1, index * 10 + 2]);
    }
    assert!(merged.has_no_more_publishers());

    Ok(())
}

#[tokio::test]
async fn test_inner_error_ends_output() -> anyhow::Result<()> {
    // Arrange
    let env = Environment::tokio()?;
    let outer = IterPublisher::new(vec![
        Arc::new(IterPublisher::new(vec![1u32, 2])) as BoxPublisher<u32>,
        Arc::new(ErrorPublisher::new(test_error("inner failed"))) as BoxPublisher<u32>,
        Arc::new(IterPublisher::new(vec![3u32])) as BoxPublisher<u32>,
    ]);

    // Act
    let merged = merge_dynamic::<u32>(&outer, &env);
    let items: Vec<StreamItem<u32>> =
        timeout(Duration::from_secs(5), merged.to_stream(8).collect()).await?;

    // Assert
    let errors = items.iter().filter(|item| item.is_error()).count();
    assert_eq!(errors, 1);
    assert!(items.last().is_some_and(StreamItem::is_error));
    assert!(items.len() <= 3);

    Ok(())
}

#[tokio::test]
async fn test_dropping_output_cancels_outer_source() -> anyhow::Result<()> {
    // Arrange
    let env = Environment::tokio()?.with_capacity(2);
    let outer_dropped = Arc::new(AtomicBool::new(false));
    let guard = DropFlag(Arc::clone(&outer_dropped));
    let outer = StreamPublisher::new(stream! {
        let _guard = guard;
        loop {
            sleep(Duration::from_millis(2)).await;
            yield Arc::new(IterPublisher::new(0u32..)) as BoxPublisher<u32>;
        }
    });
    let merged = merge_dynamic::<u32>(&outer, &env);
    let mut output = merged.to_stream(4);

    // Act
    let first: Vec<StreamItem<u32>> =
        timeout(Duration::from_secs(5), output.by_ref().take(3).collect()).await?;
    drop(output);

    // Assert
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(StreamItem::is_value));
    assert!(eventually(1_000, || outer_dropped.load(Ordering::Acquire)).await);
    assert!(!merged.has_no_more_publishers());

    Ok(())
}

#[tokio::test]
async fn test_synchronous_pipeline_with_recording_subscriber() -> anyhow::Result<()> {
    // Arrange
    let env = Environment::default().with_capacity(1);
    let outer = IterPublisher::new(
        (0..4u32)
            .map(|index| Arc::new(IterPublisher::new(vec![index; 2])) as BoxPublisher<u32>)
            .collect::<Vec<_>>(),
    );
    let downstream = RecordingSubscriber::<u32>::unbounded();

    // Act
    let merged = merge_dynamic::<u32>(&outer, &env);
    downstream.subscribe_to(&*merged);

    // Assert
    assert_eq!(downstream.values(), vec![0, 0, 1, 1, 2, 2, 3, 3]);
    assert_eq!(downstream.completions(), 1);

    Ok(())
}

#[tokio::test]
async fn test_static_merge_through_prelude() -> anyhow::Result<()> {
    // Arrange
    let publishers: Vec<BoxPublisher<u32>> = (0..3u32)
        .map(|index| Arc::new(IterPublisher::new(vec![index])) as BoxPublisher<u32>)
        .collect();

    // Act
    let merged = merge(publishers, &Environment::default());
    let items: Vec<StreamItem<u32>> = merged.to_stream(1).collect().await;

    // Assert
    assert_eq!(
        items,
        vec![StreamItem::Value(0), StreamItem::Value(1), StreamItem::Value(2)]
    );

    Ok(())
}
