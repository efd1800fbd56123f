// src/error.rs
//! Error handling for the entire crate.
//!
//! - Enum discriminant (cheap match), allocations only on error paths.
//! - Every failure here is recoverable by design: body/sensor allocation
//!   aborts the specific spawn, gesture errors cancel the gesture, nothing
//!   propagates out of the frame loop.

use thiserror::Error;

/// Main error type — lightweight, Send + Sync + 'static.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The physics engine could not allocate a rigid body or its shape.
    #[error("body creation failed: {0}")]
    BodyCreation(String),

    /// The physics engine could not allocate a portal sensor.
    #[error("sensor creation failed: {0}")]
    SensorCreation(String),

    /// A drag gesture targeted something that cannot be dragged.
    #[error("drag rejected: {0}")]
    DragRejected(&'static str),

    /// Configuration (de)serialization.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Simple custom message (allocation only when the error happens).
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Create a custom error message.
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    #[inline]
    pub fn is_drag_rejected(&self) -> bool {
        matches!(self, Error::DragRejected(_))
    }

    #[inline]
    pub fn is_allocation(&self) -> bool {
        matches!(self, Error::BodyCreation(_) | Error::SensorCreation(_))
    }
}

/// Convenient `Result` alias — use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;
