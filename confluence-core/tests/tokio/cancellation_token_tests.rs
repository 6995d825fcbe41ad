// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use confluence_core::CancellationToken;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_new_token_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn test_clone_shares_state() {
    let token1 = CancellationToken::new();
    let token2 = token1.clone();

    token2.cancel();

    assert!(token1.is_cancelled());
    assert!(token2.is_cancelled());
}

#[test]
fn test_only_first_cancel_wins_across_threads() {
    let token = CancellationToken::new();
    let winners = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let token = token.clone();
            let winners = Arc::clone(&winners);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if token.cancel() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("cancel thread panicked");
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_resolves_immediately_when_already_cancelled() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    token.cancel();

    // Act
    tokio::time::timeout(Duration::from_millis(100), token.cancelled()).await?;

    // Assert
    assert!(token.is_cancelled());

    Ok(())
}

#[tokio::test]
async fn test_cancelled_wakes_all_waiters() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();
    let woken = Arc::new(AtomicUsize::new(0));
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let token = token.clone();
            let woken = Arc::clone(&woken);
            tokio::spawn(async move {
                token.cancelled().await;
                woken.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Act
    token.cancel();

    // Assert
    for waiter in waiters {
        tokio::time::timeout(Duration::from_secs(1), waiter).await??;
    }
    assert_eq!(woken.load(Ordering::SeqCst), 4);

    Ok(())
}

#[tokio::test]
async fn test_cancelled_stays_pending_until_cancel() -> anyhow::Result<()> {
    // Arrange
    let token = CancellationToken::new();

    // Act
    let result = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;

    // Assert
    assert!(result.is_err());
    assert!(!token.is_cancelled());

    Ok(())
}
