// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use confluence_core::{BoxPublisher, MergeError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Identity comparison of two type-erased publishers.
pub fn same_publisher<T>(a: &BoxPublisher<T>, b: &BoxPublisher<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

pub fn test_error(context: &str) -> MergeError {
    MergeError::upstream(context)
}

/// Polls `condition` every millisecond until it holds or `timeout_ms` elapses.
///
/// Returns the final evaluation of `condition`.
pub async fn eventually<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(1)).await;
    }
    condition()
}

/// Panics if `condition` becomes true within `window_ms`.
pub async fn assert_never<F>(window_ms: u64, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(window_ms);
    while Instant::now() < deadline {
        assert!(!condition(), "condition became true within {window_ms}ms");
        sleep(Duration::from_millis(1)).await;
    }
}
