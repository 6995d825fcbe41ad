// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Fan-in of many publishers into one, with shared backpressure.
//!
//! - [`merge_dynamic`] flattens a publisher *of* publishers: inner sources
//!   keep arriving for as long as the outer publisher runs.
//! - [`merge`] combines a fixed list of publishers.
//!
//! Both deliver into a [`MergeEngine`], which serializes emissions to a single
//! downstream subscriber and only sends what that subscriber requested.

#[macro_use]
mod logging;

pub mod dynamic_merge;
pub mod engine;
pub mod fan_in;
mod inner;

pub use dynamic_merge::DynamicMerge;
pub use engine::MergeEngine;
pub use fan_in::{FanIn, MergeDriver};

use confluence_core::{BoxPublisher, Environment, Publisher, Subscriber};
use std::sync::Arc;

/// Subscribes a [`DynamicMerge`] to `outer` and returns it.
///
/// The merge runs on `environment`'s dispatcher and starts with its capacity.
/// Subscribe to the returned coordinator to receive the flattened output.
pub fn merge_dynamic<T: Send + 'static>(
    outer: &dyn Publisher<BoxPublisher<T>>,
    environment: &Environment,
) -> Arc<DynamicMerge<T>> {
    let merge = DynamicMerge::new(Arc::clone(environment.dispatcher()), None);
    merge
        .set_env(environment.clone())
        .set_capacity(environment.capacity());
    let subscriber: Arc<dyn Subscriber<BoxPublisher<T>>> = merge.clone();
    outer.subscribe(subscriber);
    merge
}

/// Merges a fixed set of publishers.
///
/// The output completes once every publisher completed.
pub fn merge<T, I>(publishers: I, environment: &Environment) -> Arc<MergeEngine<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = BoxPublisher<T>>,
{
    let engine = MergeEngine::new(environment.clone());
    for publisher in publishers {
        engine.add_publisher(publisher);
    }
    engine.schedule_completion();
    engine
}
