//! Blinc Tween Engine
//!
//! Eased interpolation of arbitrary properties, driven by the host's frame
//! loop.
//!
//! # Features
//!
//! - **Easing Library**: 31 named curves plus cubic-bezier, keyed and custom curves
//! - **Bindings**: any property as a `{current, lerp, apply}` capability record
//! - **Lifecycle**: delays, ping-pong, finite or infinite loops and four fill modes
//! - **Registry**: one `update` per frame, safe against callbacks that add or
//!   cancel tweens mid-tick
//!
//! # Example
//!
//! ```ignore
//! use blinc_tween::{Easing, Property, Tween, TweenRegistry};
//!
//! let x = Property::new(|n: &Node| n.x, |n: &mut Node, v: &f32| n.x = *v);
//! let registry = TweenRegistry::new();
//! registry.add(&node, Tween::new(x, 0.4).to(120.0).ease(Easing::EaseOutBack))?;
//!
//! loop {
//!     registry.update(clock.tick());
//! }
//! ```

pub mod binding;
pub mod config;
pub mod easing;
pub mod error;
pub mod fill;
pub mod instance;
pub mod registry;
pub mod tween;
pub mod value;

pub use binding::{Binding, Property, TargetKey};
pub use config::{DeltaTime, EngineConfig, FrameClock};
pub use easing::{Curve, CurveKey, Ease, Easing};
pub use error::{Result, TweenError};
pub use fill::FillMode;
pub use instance::{LoopBudget, TweenInstance};
pub use registry::{TweenHandle, TweenId, TweenRegistry, TweenStatus};
pub use tween::{EaseSelector, Tween, TweenCallback, UpdateCallback};
pub use value::{Color, Lerp, Quat, Rect, Vec2, Vec3, Vec4};
