// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Lock-free demand accounting between a producer and a consumer.
//!
//! A [`Demand`] counts how many elements a consumer has authorized a producer
//! to send. Requests accumulate with saturating arithmetic, and once the
//! counter reaches [`UNBOUNDED`] it stays there: consuming from an unbounded
//! demand never decrements it.
//!
//! ```
//! use confluence_core::demand::{Demand, UNBOUNDED};
//!
//! let demand = Demand::new();
//! demand.request(2);
//! assert!(demand.try_take());
//! assert!(demand.try_take());
//! assert!(!demand.try_take());
//!
//! demand.request(UNBOUNDED);
//! assert!(demand.try_take());
//! assert!(demand.is_unbounded());
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

/// Demand value meaning "send everything you have".
pub const UNBOUNDED: u64 = u64::MAX;

/// Outstanding demand counter shared between threads.
#[derive(Debug, Default)]
pub struct Demand {
    outstanding: AtomicU64,
}

impl Demand {
    /// Creates a counter with no outstanding demand.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outstanding: AtomicU64::new(0),
        }
    }

    /// Creates a counter that starts with `initial` outstanding demand.
    #[must_use]
    pub const fn with_initial(initial: u64) -> Self {
        Self {
            outstanding: AtomicU64::new(initial),
        }
    }

    /// Adds `n` to the outstanding demand and returns the previous value.
    ///
    /// Saturates at [`UNBOUNDED`]. A request of zero is ignored.
    pub fn request(&self, n: u64) -> u64 {
        if n == 0 {
            return self.outstanding();
        }

        match self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != UNBOUNDED).then(|| current.saturating_add(n))
            }) {
            Ok(previous) | Err(previous) => previous,
        }
    }

    /// Consumes one unit of demand, returning `false` if none is outstanding.
    pub fn try_take(&self) -> bool {
        self.outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
                0 => None,
                UNBOUNDED => Some(UNBOUNDED),
                n => Some(n - 1),
            })
            .is_ok()
    }

    /// Current outstanding demand.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Returns `true` if the consumer asked for an unbounded amount.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.outstanding() == UNBOUNDED
    }

    /// Clears the outstanding demand and returns what was cleared.
    ///
    /// Pair with [`Demand::replay`] to restart accounting without losing
    /// authorization the consumer already granted.
    pub fn reset(&self) -> u64 {
        self.outstanding.swap(0, Ordering::AcqRel)
    }

    /// Re-issues demand previously returned by [`Demand::reset`].
    pub fn replay(&self, amount: u64) {
        self.request(amount);
    }
}
