// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Contract between a merge driver and the engine that performs the fan-in.

use confluence_core::{BoxPublisher, Environment, MergeError, Publisher};
use std::sync::Weak;

/// Engine that subscribes to many inner publishers and merges their elements
/// into the single downstream subscriber attached through [`Publisher::subscribe`].
///
/// Implementations must be safe to call from any thread; in particular
/// [`FanIn::add_publisher`] may run concurrently with demand replay and with
/// other registrations.
pub trait FanIn<T>: Publisher<T> {
    /// Registers a new inner publisher and starts draining it.
    ///
    /// Publishers added after the output reached a terminal state are dropped
    /// without being subscribed.
    fn add_publisher(&self, publisher: BoxPublisher<T>);

    /// Clears the outstanding downstream demand and returns the cleared amount.
    fn reset_child_requests(&self) -> u64;

    /// Re-issues demand previously returned by [`FanIn::reset_child_requests`].
    fn replay_child_requests(&self, amount: u64);

    /// Completes the output once every registered inner publisher has drained.
    fn schedule_completion(&self);

    /// Fails the output immediately, abandoning in-flight inner publishers.
    fn do_error(&self, error: MergeError);

    /// Maximum in-flight demand requested from each inner publisher.
    fn set_capacity(&self, elements: u64);

    fn set_environment(&self, environment: Environment);

    /// Installs the non-owning back-reference to the driver feeding this engine.
    fn attach_driver(&self, driver: Weak<dyn MergeDriver>);
}

/// View of the driver that the engine is allowed to use.
///
/// The engine never owns its driver: it holds a `Weak` and treats a dropped
/// driver as one that will send no more publishers.
pub trait MergeDriver: Send + Sync {
    /// `true` once the outer producer completed or failed.
    fn has_no_more_publishers(&self) -> bool;

    /// Asks the outer producer for `n` more inner publishers.
    fn request_publishers(&self, n: u64);

    /// Stops accepting inner publishers; called when the downstream goes away.
    fn cancel_upstream(&self);
}
