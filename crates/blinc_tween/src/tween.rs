//! Tween descriptors
//!
//! A [`Tween`] is the immutable configuration handed to the registry. It is
//! consumed when bound to a target; anything left unset (`from`, `to`) is
//! sampled from the live target at that moment.

use std::fmt;

use crate::binding::Binding;
use crate::easing::{Curve, Ease, Easing};
use crate::error::Result;
use crate::fill::FillMode;
use crate::instance::TweenInstance;

/// Lifecycle callback receiving the running instance
pub type TweenCallback<B> = Box<dyn FnMut(&mut TweenInstance<B>)>;

/// Update callback receiving the running instance and the value just written
pub type UpdateCallback<B> = Box<dyn FnMut(&mut TweenInstance<B>, &<B as Binding>::Value)>;

/// The six optional lifecycle slots
pub(crate) struct Callbacks<B: Binding> {
    pub(crate) on_add: Option<TweenCallback<B>>,
    pub(crate) on_start: Option<TweenCallback<B>>,
    pub(crate) on_update: Option<UpdateCallback<B>>,
    pub(crate) on_end: Option<TweenCallback<B>>,
    pub(crate) on_cancel: Option<TweenCallback<B>>,
    pub(crate) on_finally: Option<TweenCallback<B>>,
}

impl<B: Binding> Callbacks<B> {
    /// Drop every remaining callback and whatever it captured
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

impl<B: Binding> Default for Callbacks<B> {
    fn default() -> Self {
        Self {
            on_add: None,
            on_start: None,
            on_update: None,
            on_end: None,
            on_cancel: None,
            on_finally: None,
        }
    }
}

/// Named easing, either already typed or still a string from config
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EaseSelector {
    Easing(Easing),
    Name(String),
}

impl EaseSelector {
    /// Resolve to a tag; unknown names are a configuration error
    pub fn resolve(&self) -> Result<Easing> {
        match self {
            EaseSelector::Easing(easing) => Ok(*easing),
            EaseSelector::Name(name) => name.parse(),
        }
    }
}

impl Default for EaseSelector {
    fn default() -> Self {
        EaseSelector::Easing(Easing::Linear)
    }
}

/// Configuration of a single tween over one property
///
/// # Example
///
/// ```ignore
/// let tween = Tween::new(OPACITY, 0.3)
///     .to(1.0)
///     .delay(0.1)
///     .ease(Easing::EaseOutCubic)
///     .ping_pong()
///     .loops(3)
///     .on_end(|_| tracing::debug!("faded"));
/// ```
pub struct Tween<B: Binding> {
    pub(crate) binding: B,
    pub(crate) duration: f32,
    pub(crate) delay: Option<f32>,
    pub(crate) ping_pong_interval: Option<f32>,
    pub(crate) repeat_interval: Option<f32>,
    pub(crate) use_unscaled_time: bool,
    pub(crate) use_ping_pong: bool,
    pub(crate) is_infinite: bool,
    pub(crate) loops: Option<u32>,
    pub(crate) offset: Option<f32>,
    pub(crate) easing: EaseSelector,
    pub(crate) curve: Option<Curve>,
    pub(crate) fill_mode: FillMode,
    pub(crate) from: Option<B::Value>,
    pub(crate) to: Option<B::Value>,
    pub(crate) callbacks: Callbacks<B>,
}

impl<B: Binding> Tween<B> {
    /// Create a tween over `binding` lasting `duration` seconds
    pub fn new(binding: B, duration: f32) -> Self {
        Self {
            binding,
            duration,
            delay: None,
            ping_pong_interval: None,
            repeat_interval: None,
            use_unscaled_time: false,
            use_ping_pong: false,
            is_infinite: false,
            loops: None,
            offset: None,
            easing: EaseSelector::default(),
            curve: None,
            fill_mode: FillMode::default(),
            from: None,
            to: None,
            callbacks: Callbacks::default(),
        }
    }

    /// Set the start value (defaults to the live value at bind time)
    pub fn from(mut self, value: B::Value) -> Self {
        self.from = Some(value);
        self
    }

    /// Set the end value (defaults to the live value at bind time)
    pub fn to(mut self, value: B::Value) -> Self {
        self.to = Some(value);
        self
    }

    /// Set the duration in seconds
    pub fn duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    /// Wait before the first step
    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = Some(seconds);
        self
    }

    /// Play backwards after each forward pass.
    ///
    /// A forward plus backward pass counts as a single loop.
    pub fn ping_pong(mut self) -> Self {
        self.use_ping_pong = true;
        self
    }

    /// Pause between the forward and backward pass.
    ///
    /// Only takes effect together with [`ping_pong`](Self::ping_pong).
    pub fn ping_pong_interval(mut self, seconds: f32) -> Self {
        self.ping_pong_interval = Some(seconds);
        self
    }

    /// Pause before each repeat
    pub fn repeat_interval(mut self, seconds: f32) -> Self {
        self.repeat_interval = Some(seconds);
        self
    }

    /// Drive this tween with unscaled frame time
    pub fn unscaled_time(mut self) -> Self {
        self.use_unscaled_time = true;
        self
    }

    /// Loop forever; the loop count is ignored
    pub fn infinite(mut self) -> Self {
        self.is_infinite = true;
        self
    }

    /// Total number of passes to play
    pub fn loops(mut self, count: u32) -> Self {
        self.loops = Some(count);
        self
    }

    /// Start the timeline at `time` instead of zero
    pub fn offset(mut self, time: f32) -> Self {
        self.offset = Some(time);
        self
    }

    /// Use a named easing tag
    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = EaseSelector::Easing(easing);
        self
    }

    /// Use an easing tag by name, validated when the tween is bound
    pub fn ease_named(mut self, name: impl Into<String>) -> Self {
        self.easing = EaseSelector::Name(name.into());
        self
    }

    /// Use a custom curve; it takes precedence over any named easing
    pub fn curve(mut self, curve: Curve) -> Self {
        self.curve = Some(curve);
        self
    }

    /// Set what the target shows before start and after the end
    pub fn fill(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    /// Called once when bound to a target
    pub fn on_add(mut self, f: impl FnMut(&mut TweenInstance<B>) + 'static) -> Self {
        self.callbacks.on_add = Some(Box::new(f));
        self
    }

    /// Called once, on the first step after any delay
    pub fn on_start(mut self, f: impl FnMut(&mut TweenInstance<B>) + 'static) -> Self {
        self.callbacks.on_start = Some(Box::new(f));
        self
    }

    /// Called after every value written to the target
    pub fn on_update(mut self, f: impl FnMut(&mut TweenInstance<B>, &B::Value) + 'static) -> Self {
        self.callbacks.on_update = Some(Box::new(f));
        self
    }

    /// Called once on natural completion
    pub fn on_end(mut self, f: impl FnMut(&mut TweenInstance<B>) + 'static) -> Self {
        self.callbacks.on_end = Some(Box::new(f));
        self
    }

    /// Called once when cancelled, explicitly or by losing the target
    pub fn on_cancel(mut self, f: impl FnMut(&mut TweenInstance<B>) + 'static) -> Self {
        self.callbacks.on_cancel = Some(Box::new(f));
        self
    }

    /// Called once after either `on_end` or `on_cancel`
    pub fn on_finally(mut self, f: impl FnMut(&mut TweenInstance<B>) + 'static) -> Self {
        self.callbacks.on_finally = Some(Box::new(f));
        self
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration
    }

    pub fn delay_secs(&self) -> Option<f32> {
        self.delay
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    pub fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    pub fn uses_ping_pong(&self) -> bool {
        self.use_ping_pong
    }

    /// Resolve the effective easing source: the curve if set, the tag otherwise
    pub fn resolve_ease(&self) -> Result<Ease> {
        match &self.curve {
            Some(curve) => {
                curve.validate()?;
                Ok(Ease::Curve(curve.clone()))
            }
            None => self.easing.resolve().map(Ease::Named),
        }
    }
}

impl<B: Binding + fmt::Debug> fmt::Debug for Tween<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("binding", &self.binding)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("ping_pong", &self.use_ping_pong)
            .field("infinite", &self.is_infinite)
            .field("loops", &self.loops)
            .field("easing", &self.easing)
            .field("curve", &self.curve)
            .field("fill_mode", &self.fill_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Property;
    use crate::error::TweenError;

    struct Node {
        x: f32,
    }

    fn x() -> Property<Node, f32> {
        Property::new(|n: &Node| n.x, |n: &mut Node, v: &f32| n.x = *v)
    }

    #[test]
    fn test_defaults() {
        let tween = Tween::new(x(), 1.0);
        assert_eq!(tween.fill_mode(), FillMode::Backwards);
        assert_eq!(tween.delay_secs(), None);
        assert!(!tween.is_infinite());
        assert!(!tween.uses_ping_pong());
        assert!(matches!(tween.resolve_ease(), Ok(Ease::Named(Easing::Linear))));
    }

    #[test]
    fn test_ping_pong_interval_leaves_ping_pong_off() {
        let tween = Tween::new(x(), 1.0).ping_pong_interval(0.25);
        assert!(!tween.uses_ping_pong());
        assert_eq!(tween.ping_pong_interval, Some(0.25));
        assert!(tween.ping_pong().uses_ping_pong());
    }

    #[test]
    fn test_curve_wins_over_easing() {
        let tween = Tween::new(x(), 1.0)
            .ease(Easing::EaseInQuad)
            .curve(Curve::custom(|_| 0.5));
        assert!(matches!(tween.resolve_ease(), Ok(Ease::Curve(_))));
    }

    #[test]
    fn test_named_easing_resolves_or_fails() {
        let ok = Tween::new(x(), 1.0).ease_named("bounce-out");
        assert!(matches!(ok.resolve_ease(), Ok(Ease::Named(Easing::EaseOutBounce))));

        let bad = Tween::new(x(), 1.0).ease_named("wiggle");
        assert_eq!(
            bad.resolve_ease().err(),
            Some(TweenError::UnknownEasing("wiggle".to_string()))
        );
    }

    #[test]
    fn test_invalid_curve_fails_resolution() {
        let tween = Tween::new(x(), 1.0).curve(Curve::keys([]));
        assert_eq!(tween.resolve_ease().err(), Some(TweenError::EmptyCurve));
    }
}
