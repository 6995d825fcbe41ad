// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for the confluence merge pipeline
//!
//! A single root [`MergeError`] travels through `Subscriber::on_error` from any
//! producer to the downstream consumer. Operations that can fail synchronously
//! (building a dispatcher, for instance) return [`Result`].
//!
//! # Examples
//!
//! ```
//! use confluence_core::{MergeError, Result};
//!
//! fn open_source() -> Result<()> {
//!     Err(MergeError::upstream("source not ready"))
//! }
//!
//! assert!(open_source().is_err());
//! ```

/// Root error type for all confluence operations
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A producer reported a failure
    ///
    /// This is the error the outer producer or one of the inner producers
    /// forwards through `on_error`.
    #[error("Upstream error: {context}")]
    Upstream {
        /// Description of what went wrong upstream
        context: String,
    },

    /// Custom error from user code
    #[error("User error: {0}")]
    User(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A second downstream subscriber tried to attach to a single-subscriber publisher
    #[error("Publisher already has a subscriber")]
    AlreadySubscribed,

    /// A dispatcher could not accept a task
    ///
    /// Raised when no async runtime is available or the runtime backing the
    /// dispatcher has shut down.
    #[error("Dispatch error: {context}")]
    Dispatch {
        /// Which dispatcher failed and why
        context: String,
    },

    /// The subscription was cancelled before the publisher terminated
    #[error("Subscription cancelled")]
    Cancelled,
}

impl MergeError {
    /// Create an upstream error with the given context
    pub fn upstream(context: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
        }
    }

    /// Create a dispatch error with the given context
    pub fn dispatch(context: impl Into<String>) -> Self {
        Self::Dispatch {
            context: context.into(),
        }
    }

    /// Wrap a user error
    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::User(Box::new(error))
    }

    /// Returns `true` when the error came from a producer rather than from
    /// the merge machinery itself.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::User(_))
    }
}

/// Specialized Result type for confluence operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Extension trait for converting foreign errors into `MergeError`
///
/// Blanket-implemented for every `std::error::Error + Send + Sync + 'static`.
///
/// ```
/// use confluence_core::{IntoMergeError, MergeError};
///
/// let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
/// assert!(matches!(io.into_merge_error(), MergeError::User(_)));
/// ```
pub trait IntoMergeError {
    /// Convert this error into a `MergeError`
    fn into_merge_error(self) -> MergeError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoMergeError for E {
    fn into_merge_error(self) -> MergeError {
        MergeError::user(self)
    }
}

impl Clone for MergeError {
    fn clone(&self) -> Self {
        match self {
            Self::Upstream { context } => Self::Upstream {
                context: context.clone(),
            },
            // The boxed source is not cloneable, keep its rendering
            Self::User(e) => Self::Upstream {
                context: format!("User error: {e}"),
            },
            Self::AlreadySubscribed => Self::AlreadySubscribed,
            Self::Dispatch { context } => Self::Dispatch {
                context: context.clone(),
            },
            Self::Cancelled => Self::Cancelled,
        }
    }
}
