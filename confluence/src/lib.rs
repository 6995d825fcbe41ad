// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Confluence
//!
//! Flattens a publisher of publishers into one output while sharing a single
//! pool of downstream demand across every inner source.
//!
//! ## Overview
//!
//! - [`merge_dynamic`] subscribes a [`DynamicMerge`] to an outer publisher
//!   whose elements are themselves publishers. Inner publishers are
//!   registered with a [`MergeEngine`] as they arrive.
//! - The output completes once the outer publisher completed and every inner
//!   publisher drained. The first error from any source fails it.
//! - Downstream demand travels back up: requesting output also requests more
//!   inner publishers, bounded by the configured capacity.
//!
//! ## Quick Start
//!
//! ```rust
//! use confluence::prelude::*;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> confluence::Result<()> {
//!     let env = Environment::tokio()?.with_capacity(8);
//!
//!     let outer = IterPublisher::new(vec![
//!         Arc::new(IterPublisher::new(vec![1u32, 2])) as BoxPublisher<u32>,
//!         Arc::new(IterPublisher::new(vec![3u32])) as BoxPublisher<u32>,
//!     ]);
//!
//!     let merged = merge_dynamic::<u32>(&outer, &env);
//!     let mut values: Vec<u32> = merged
//!         .to_stream(16)
//!         .filter_map(|item| async move { item.ok() })
//!         .collect()
//!         .await;
//!
//!     values.sort_unstable();
//!     assert_eq!(values, vec![1, 2, 3]);
//!     Ok(())
//! }
//! ```

pub use confluence_core::{
    BoxPublisher, BoxSubscriber, CancellationToken, Demand, Dispatcher, Environment,
    IntoMergeError, MergeError, NoopSubscription, Publisher, Result, StreamItem, Subscriber,
    Subscription, SynchronousDispatcher, UNBOUNDED,
};
#[cfg(feature = "runtime-tokio")]
pub use confluence_core::SerialDispatcher;
pub use confluence_merge::{merge, merge_dynamic, DynamicMerge, FanIn, MergeDriver, MergeEngine};
pub use confluence_stream::{
    from_iter, into_stream, ErrorPublisher, IterPublisher, PublisherStream, PublisherStreamExt,
    StreamPublisher,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        merge, merge_dynamic, BoxPublisher, DynamicMerge, Environment, IterPublisher, MergeError,
        Publisher, PublisherStreamExt, StreamItem, StreamPublisher, Subscriber, Subscription,
    };
}
