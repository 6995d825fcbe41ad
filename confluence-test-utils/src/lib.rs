// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the confluence workspace.
//!
//! Development and testing only:
//!
//! - [`TestPublisher`] pushes signals on demand of the test, from any thread.
//! - [`RecordingSubscriber`] records everything a publisher delivers.
//! - [`RecordingEngine`] stands in for the fan-in engine behind a
//!   `DynamicMerge` and records every call the coordinator makes.

pub mod helpers;
pub mod recording_engine;
pub mod recording_subscriber;
pub mod test_publisher;

pub use helpers::{assert_never, eventually, same_publisher, test_error};
pub use recording_engine::RecordingEngine;
pub use recording_subscriber::RecordingSubscriber;
pub use test_publisher::TestPublisher;
