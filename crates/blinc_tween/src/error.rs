//! Tween error types

use thiserror::Error;

/// Configuration errors raised while binding a tween to its target.
///
/// Lifecycle events such as losing the target mid-flight or cancelling
/// twice are state transitions, not errors, and never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TweenError {
    /// Ease selected by a name that is not one of the known tags
    #[error("Unknown easing: {0:?}")]
    UnknownEasing(String),

    /// Keyed custom curve without any keys
    #[error("Custom curve has no keys")]
    EmptyCurve,

    /// Keyed custom curve with a NaN or infinite time/value
    #[error("Custom curve key {index} is not finite")]
    NonFiniteCurveKey { index: usize },

    /// Target was dropped before the tween could sample it
    #[error("Tween target is no longer available")]
    TargetUnavailable,
}

/// Result type for tween operations
pub type Result<T> = std::result::Result<T, TweenError>;
