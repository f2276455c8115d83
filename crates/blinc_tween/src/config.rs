//! Engine configuration and frame timing

use std::time::{Duration, Instant};

/// Engine-wide tuning shared by every tween a registry binds
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Duration non-positive tween durations are clamped to (seconds)
    pub min_duration: f32,
    /// Multiplier from unscaled to scaled frame time
    pub time_scale: f32,
    /// Registry slots reserved up front so steady frames never allocate
    pub initial_capacity: usize,
}

impl EngineConfig {
    pub fn new(min_duration: f32, time_scale: f32, initial_capacity: usize) -> Self {
        Self {
            min_duration,
            time_scale,
            initial_capacity,
        }
    }

    /// Interactive UI defaults
    pub fn realtime() -> Self {
        Self::new(0.001, 1.0, 64)
    }

    /// Half-speed scaled time, for inspecting motion
    pub fn slow_motion() -> Self {
        Self::new(0.001, 0.5, 64)
    }

    /// Builder: set the minimum duration
    pub fn with_min_duration(mut self, min_duration: f32) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Builder: set the time scale
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Builder: set the initial registry capacity
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Clamp a configured duration to something that can be divided by
    pub(crate) fn clamp_duration(&self, duration: f32) -> f32 {
        let floor = if self.min_duration > 0.0 {
            self.min_duration
        } else {
            f32::EPSILON
        };
        if duration > 0.0 {
            duration
        } else {
            floor
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::realtime()
    }
}

/// Frame time handed to each tween, in seconds.
///
/// Tweens pick `unscaled` when configured with `unscaled_time`, `scaled`
/// otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaTime {
    pub scaled: f32,
    pub unscaled: f32,
}

impl DeltaTime {
    pub fn new(scaled: f32, unscaled: f32) -> Self {
        Self { scaled, unscaled }
    }

    /// Same step for scaled and unscaled time
    pub fn uniform(dt: f32) -> Self {
        Self::new(dt, dt)
    }

    #[inline]
    pub fn select(&self, unscaled: bool) -> f32 {
        if unscaled {
            self.unscaled
        } else {
            self.scaled
        }
    }
}

impl From<f32> for DeltaTime {
    fn from(dt: f32) -> Self {
        Self::uniform(dt)
    }
}

/// Host-side frame clock producing [`DeltaTime`]s
#[derive(Clone, Debug)]
pub struct FrameClock {
    last_frame: Instant,
    time_scale: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            last_frame: Instant::now(),
            time_scale: config.time_scale,
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    /// Measure the wall time since the previous frame
    pub fn tick(&mut self) -> DeltaTime {
        let now = Instant::now();
        let elapsed = now - self.last_frame;
        self.last_frame = now;
        self.delta(elapsed)
    }

    /// Step by a fixed amount instead of wall time
    pub fn advance(&mut self, elapsed: Duration) -> DeltaTime {
        self.last_frame += elapsed;
        self.delta(elapsed)
    }

    fn delta(&self, elapsed: Duration) -> DeltaTime {
        let unscaled = elapsed.as_secs_f32();
        DeltaTime::new(unscaled * self.time_scale, unscaled)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
