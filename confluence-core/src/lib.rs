// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core building blocks for confluence: the reactive publisher/subscriber
//! contract, demand accounting, dispatchers and the execution environment.

pub mod cancellation_token;
pub mod demand;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod reactive;
pub mod stream_item;

pub use self::cancellation_token::CancellationToken;
pub use self::demand::{Demand, UNBOUNDED};
#[cfg(feature = "runtime-tokio")]
pub use self::dispatcher::SerialDispatcher;
pub use self::dispatcher::{Dispatcher, SynchronousDispatcher, Task};
pub use self::environment::Environment;
pub use self::error::{IntoMergeError, MergeError, Result};
pub use self::reactive::{
    BoxPublisher, BoxSubscriber, NoopSubscription, Publisher, Subscriber, Subscription,
};
pub use self::stream_item::StreamItem;
