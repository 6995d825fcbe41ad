// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Bridges between `futures` streams and confluence publishers.
//!
//! - [`IterPublisher`] and [`StreamPublisher`] turn plain data and async
//!   streams into demand-driven publishers.
//! - [`into_stream`] and [`PublisherStreamExt::to_stream`] consume any
//!   publisher as a `Stream<Item = StreamItem<T>>`.

#[macro_use]
mod logging;

pub mod iter_publisher;
pub mod publisher_stream;
pub mod stream_publisher;

pub use iter_publisher::{from_iter, ErrorPublisher, IterPublisher};
pub use publisher_stream::{into_stream, PublisherStream, PublisherStreamExt};
pub use stream_publisher::StreamPublisher;
