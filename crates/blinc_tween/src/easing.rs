//! Easing functions for tweens
//!
//! The named tags follow the Penner equations as published on easings.net,
//! evaluated in `f32`. A [`Curve`] replaces the named tag when a tween needs
//! a shape the tags don't cover.

use std::f32::consts::PI;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{Result, TweenError};

const BACK_C1: f32 = 1.70158;
const BACK_C2: f32 = BACK_C1 * 1.525;
const BACK_C3: f32 = BACK_C1 + 1.0;
const ELASTIC_C4: f32 = 2.0 * PI / 3.0;
const ELASTIC_C5: f32 = 2.0 * PI / 4.5;
const BOUNCE_N1: f32 = 7.5625;
const BOUNCE_D1: f32 = 2.75;

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

impl Easing {
    /// Every tag, `Linear` first, then each family as in/out/in-out
    pub const ALL: [Easing; 31] = [
        Easing::Linear,
        Easing::EaseInSine,
        Easing::EaseOutSine,
        Easing::EaseInOutSine,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::EaseInQuint,
        Easing::EaseOutQuint,
        Easing::EaseInOutQuint,
        Easing::EaseInExpo,
        Easing::EaseOutExpo,
        Easing::EaseInOutExpo,
        Easing::EaseInCirc,
        Easing::EaseOutCirc,
        Easing::EaseInOutCirc,
        Easing::EaseInBack,
        Easing::EaseOutBack,
        Easing::EaseInOutBack,
        Easing::EaseInElastic,
        Easing::EaseOutElastic,
        Easing::EaseInOutElastic,
        Easing::EaseInBounce,
        Easing::EaseOutBounce,
        Easing::EaseInOutBounce,
    ];

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInQuint => t * t * t * t * t,
            Easing::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::EaseInOutQuint => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::EaseInExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * t - 10.0)
                }
            }
            Easing::EaseOutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::EaseInOutExpo => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Easing::EaseInCirc => 1.0 - (1.0 - t.powi(2)).sqrt(),
            Easing::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Easing::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Easing::EaseInBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Easing::EaseOutBack => {
                1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2)
            }
            Easing::EaseInOutBack => {
                if t < 0.5 {
                    (2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Easing::EaseInElastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    -2f32.powf(10.0 * t - 10.0) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Easing::EaseOutElastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Easing::EaseInOutElastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin() / 2.0
                        + 1.0
                }
            }
            Easing::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::EaseInOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }

    /// The easings.net name of this tag, e.g. `easeInOutBack`
    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInSine => "easeInSine",
            Easing::EaseOutSine => "easeOutSine",
            Easing::EaseInOutSine => "easeInOutSine",
            Easing::EaseInQuad => "easeInQuad",
            Easing::EaseOutQuad => "easeOutQuad",
            Easing::EaseInOutQuad => "easeInOutQuad",
            Easing::EaseInCubic => "easeInCubic",
            Easing::EaseOutCubic => "easeOutCubic",
            Easing::EaseInOutCubic => "easeInOutCubic",
            Easing::EaseInQuart => "easeInQuart",
            Easing::EaseOutQuart => "easeOutQuart",
            Easing::EaseInOutQuart => "easeInOutQuart",
            Easing::EaseInQuint => "easeInQuint",
            Easing::EaseOutQuint => "easeOutQuint",
            Easing::EaseInOutQuint => "easeInOutQuint",
            Easing::EaseInExpo => "easeInExpo",
            Easing::EaseOutExpo => "easeOutExpo",
            Easing::EaseInOutExpo => "easeInOutExpo",
            Easing::EaseInCirc => "easeInCirc",
            Easing::EaseOutCirc => "easeOutCirc",
            Easing::EaseInOutCirc => "easeInOutCirc",
            Easing::EaseInBack => "easeInBack",
            Easing::EaseOutBack => "easeOutBack",
            Easing::EaseInOutBack => "easeInOutBack",
            Easing::EaseInElastic => "easeInElastic",
            Easing::EaseOutElastic => "easeOutElastic",
            Easing::EaseInOutElastic => "easeInOutElastic",
            Easing::EaseInBounce => "easeInBounce",
            Easing::EaseOutBounce => "easeOutBounce",
            Easing::EaseInOutBounce => "easeInOutBounce",
        }
    }

    /// Family-first spelling, e.g. `back-in-out`
    fn family_name(&self) -> String {
        let name = self.name();
        let (mode, family) = if let Some(family) = name.strip_prefix("easeInOut") {
            ("in-out", family)
        } else if let Some(family) = name.strip_prefix("easeIn") {
            ("in", family)
        } else if let Some(family) = name.strip_prefix("easeOut") {
            ("out", family)
        } else {
            return name.to_string();
        };
        format!("{}-{}", family.to_ascii_lowercase(), mode)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = TweenError;

    /// Parse a tag name, ignoring case and `-`/`_`/space separators.
    ///
    /// Both `easeInOutBack` / `ease-in-out-back` and the family-first
    /// `BackInOut` / `back-in-out` spellings are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_name(s);
        Easing::ALL
            .iter()
            .copied()
            .find(|easing| {
                normalize_name(easing.name()) == wanted
                    || normalize_name(&easing.family_name()) == wanted
            })
            .ok_or_else(|| TweenError::UnknownEasing(s.to_string()))
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

// ============================================================================
// Custom curves
// ============================================================================

/// A key of a [`Curve::Keys`] curve
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurveKey {
    /// Normalized progress position of the key
    pub time: f32,
    /// Shaped progress at this key
    pub value: f32,
    /// Easing used when transitioning TO this key
    #[cfg_attr(feature = "serde", serde(default))]
    pub easing: Easing,
}

impl CurveKey {
    /// Key reached linearly from the previous one
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    /// Key reached through `easing` from the previous one
    pub fn eased(time: f32, value: f32, easing: Easing) -> Self {
        Self {
            time,
            value,
            easing,
        }
    }
}

/// A custom easing curve that replaces the named [`Easing`] tag
#[derive(Clone)]
pub enum Curve {
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`
    CubicBezier(f32, f32, f32, f32),
    /// Piecewise curve through keys sorted by time
    Keys(SmallVec<[CurveKey; 4]>),
    /// Arbitrary sampling function
    Custom(Rc<dyn Fn(f32) -> f32>),
}

impl Curve {
    /// Build a keyed curve; keys are sorted by time
    pub fn keys(keys: impl IntoIterator<Item = CurveKey>) -> Self {
        let mut keys: SmallVec<[CurveKey; 4]> = keys.into_iter().collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Curve::Keys(keys)
    }

    /// Wrap an arbitrary sampling function
    pub fn custom(f: impl Fn(f32) -> f32 + 'static) -> Self {
        Curve::Custom(Rc::new(f))
    }

    /// Check the curve can be sampled
    pub fn validate(&self) -> Result<()> {
        match self {
            Curve::Keys(keys) if keys.is_empty() => Err(TweenError::EmptyCurve),
            Curve::Keys(keys) => match keys
                .iter()
                .position(|k| !k.time.is_finite() || !k.value.is_finite())
            {
                Some(index) => Err(TweenError::NonFiniteCurveKey { index }),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Evaluate the curve at normalized progress `t`
    pub fn sample(&self, t: f32) -> f32 {
        match self {
            Curve::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Curve::Keys(keys) => sample_keys(keys, t),
            Curve::Custom(f) => f(t),
        }
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::CubicBezier(x1, y1, x2, y2) => f
                .debug_tuple("CubicBezier")
                .field(x1)
                .field(y1)
                .field(x2)
                .field(y2)
                .finish(),
            Curve::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Curve::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn sample_keys(keys: &[CurveKey], t: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return t;
    };
    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }

    // Find surrounding keys
    let mut prev = first;
    let mut next = first;
    for key in keys {
        if key.time <= t {
            prev = key;
        }
        if key.time >= t {
            next = key;
            break;
        }
    }

    if (next.time - prev.time).abs() < f32::EPSILON {
        return prev.value;
    }

    let local = (t - prev.time) / (next.time - prev.time);
    prev.value + (next.value - prev.value) * next.easing.apply(local)
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

// ============================================================================
// Resolved ease
// ============================================================================

/// The effective easing source of a running tween.
///
/// Exactly one of the named tag or the custom curve drives an instance.
#[derive(Clone, Debug)]
pub enum Ease {
    Named(Easing),
    Curve(Curve),
}

impl Ease {
    #[inline]
    pub fn sample(&self, t: f32) -> f32 {
        match self {
            Ease::Named(easing) => easing.apply(t),
            Ease::Curve(curve) => curve.sample(t),
        }
    }
}

impl Default for Ease {
    fn default() -> Self {
        Ease::Named(Easing::Linear)
    }
}

impl From<Easing> for Ease {
    fn from(easing: Easing) -> Self {
        Ease::Named(easing)
    }
}

impl From<Curve> for Ease {
    fn from(curve: Curve) -> Self {
        Ease::Curve(curve)
    }
}
