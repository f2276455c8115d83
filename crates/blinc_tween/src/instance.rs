//! Running tweens
//!
//! A [`TweenInstance`] is a [`Tween`] bound to one target. Each update it
//! counts down any halt (delay, ping-pong or repeat interval), advances its
//! time cursor, eases, interpolates and writes the value through the
//! binding. Instances end in the decommissioned state, either naturally or
//! by cancellation, and are inert from then on.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::binding::{Binding, TargetKey};
use crate::config::{DeltaTime, EngineConfig};
use crate::easing::Ease;
use crate::error::{Result, TweenError};
use crate::fill::FillMode;
use crate::tween::{Callbacks, Tween};

/// Passes left to play
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopBudget {
    Infinite,
    /// Includes the pass currently playing
    Remaining(u32),
}

impl LoopBudget {
    fn new(is_infinite: bool, loops: Option<u32>) -> Self {
        if is_infinite {
            LoopBudget::Infinite
        } else {
            LoopBudget::Remaining(loops.unwrap_or(1).max(1))
        }
    }

    /// Consume a finished pass; returns whether another one follows
    fn next_pass(&mut self) -> bool {
        match self {
            LoopBudget::Infinite => true,
            LoopBudget::Remaining(n) if *n > 1 => {
                *n -= 1;
                true
            }
            LoopBudget::Remaining(_) => false,
        }
    }
}

/// A tween bound to a target
pub struct TweenInstance<B: Binding> {
    binding: B,
    target: Weak<RefCell<B::Target>>,
    initial: B::Value,
    from: B::Value,
    to: B::Value,
    ease: Ease,
    duration: f32,
    ping_pong_interval: Option<f32>,
    repeat_interval: Option<f32>,
    use_unscaled_time: bool,
    use_ping_pong: bool,
    fill_mode: FillMode,
    halt_time: Option<f32>,
    loops: LoopBudget,
    time: f32,
    is_forwards: bool,
    did_reach_end: bool,
    is_paused: bool,
    is_decommissioned: bool,
    /// Raised by a registry handle, or by the instance itself on decommission
    stop_requested: Rc<Cell<bool>>,
    callbacks: Callbacks<B>,
}

impl<B: Binding> TweenInstance<B> {
    /// Bind `tween` to `target` with the default engine configuration
    pub fn new(target: &Rc<RefCell<B::Target>>, tween: Tween<B>) -> Result<Self> {
        Self::bind(&Rc::downgrade(target), tween, &EngineConfig::default())
    }

    /// Bind `tween` to a weakly held target.
    ///
    /// Resolves the easing, samples `initial` (and `from`/`to` when unset)
    /// from the target, fires `on_add`, and writes `from` right away when a
    /// delay is configured and the fill mode applies before start.
    pub fn bind(
        target: &Weak<RefCell<B::Target>>,
        tween: Tween<B>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let ease = tween.resolve_ease()?;
        let live = target.upgrade().ok_or(TweenError::TargetUnavailable)?;

        let Tween {
            binding,
            duration,
            delay,
            ping_pong_interval,
            repeat_interval,
            use_unscaled_time,
            use_ping_pong,
            is_infinite,
            loops,
            offset,
            fill_mode,
            from,
            to,
            callbacks,
            ..
        } = tween;

        let initial = binding.current(&live.borrow());
        let from = from.unwrap_or_else(|| initial.clone());
        let to = to.unwrap_or_else(|| initial.clone());
        let duration = config.clamp_duration(duration);

        let mut instance = Self {
            binding,
            target: target.clone(),
            initial,
            from,
            to,
            ease,
            duration,
            ping_pong_interval,
            repeat_interval,
            use_unscaled_time,
            use_ping_pong,
            fill_mode,
            halt_time: delay,
            loops: LoopBudget::new(is_infinite, loops),
            // NaN offsets fall back to zero through max()
            time: offset.unwrap_or(0.0).max(0.0).min(duration),
            is_forwards: true,
            did_reach_end: false,
            is_paused: false,
            is_decommissioned: false,
            stop_requested: Rc::new(Cell::new(false)),
            callbacks,
        };

        debug!(
            binding = type_name::<B>(),
            duration,
            delay = ?instance.halt_time,
            loops = ?instance.loops,
            ping_pong = use_ping_pong,
            "tween bound"
        );

        if let Some(mut on_add) = instance.callbacks.on_add.take() {
            on_add(&mut instance);
        }

        let delayed = instance.halt_time.is_some_and(|halt| halt > 0.0);
        if delayed && fill_mode.applies_before_start() && !instance.is_decommissioned {
            let from = instance.from.clone();
            instance.write(&live, &from);
            instance.emit_update(&from);
        }

        Ok(instance)
    }

    /// Advance by one frame
    pub fn update(&mut self, delta: DeltaTime) {
        if self.is_decommissioned {
            return;
        }
        let Some(target) = self.target.upgrade() else {
            debug!(binding = type_name::<B>(), "tween target dropped, cancelling");
            self.cancel();
            return;
        };
        if self.is_paused {
            return;
        }

        let delta_time = delta.select(self.use_unscaled_time);
        // NaN, infinite and negative steps would push time out of range
        let delta_time = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time
        } else {
            0.0
        };
        if let Some(halt) = self.halt_time {
            let remaining = halt - delta_time;
            if remaining >= 0.0 {
                self.halt_time = Some(remaining);
                return;
            }
            self.halt_time = None;
        }

        if let Some(mut on_start) = self.callbacks.on_start.take() {
            on_start(self);
            self.honour_stop_request();
            if self.is_decommissioned {
                return;
            }
        }

        let step = delta_time / self.duration;
        self.time += if self.is_forwards { step } else { -step };

        if self.time >= self.duration {
            self.time = self.duration;
            if self.use_ping_pong {
                self.is_forwards = false;
                self.halt_time = self.ping_pong_interval;
            } else {
                self.did_reach_end = true;
                self.halt_time = self.repeat_interval;
            }
        } else if self.use_ping_pong && self.time < 0.0 {
            self.time = 0.0;
            self.is_forwards = true;
            self.did_reach_end = true;
            self.halt_time = self.repeat_interval;
        }

        let eased = self.ease.sample(self.time / self.duration);
        let value = self.binding.lerp(&self.from, &self.to, eased);
        self.write(&target, &value);
        self.emit_update(&value);
        if self.is_decommissioned {
            return;
        }

        if self.did_reach_end {
            self.did_reach_end = false;
            if self.loops.next_pass() {
                self.time = 0.0;
            } else {
                self.complete(&target);
            }
        }
    }

    /// Stop immediately, firing `on_cancel` then `on_finally`.
    ///
    /// The target keeps whatever value was last written, regardless of the
    /// fill mode. Cancelling a decommissioned instance does nothing.
    pub fn cancel(&mut self) {
        if self.is_decommissioned {
            return;
        }
        self.is_decommissioned = true;
        self.stop_requested.set(true);
        trace!(binding = type_name::<B>(), time = self.time, "tween cancelled");

        if let Some(mut on_cancel) = self.callbacks.on_cancel.take() {
            on_cancel(self);
        }
        if let Some(mut on_finally) = self.callbacks.on_finally.take() {
            on_finally(self);
        }
        self.callbacks.clear();
    }

    fn complete(&mut self, target: &Rc<RefCell<B::Target>>) {
        self.is_decommissioned = true;
        self.stop_requested.set(true);
        if self.fill_mode.restores_after_end() {
            let initial = self.initial.clone();
            self.write(target, &initial);
            self.emit_update(&initial);
        }
        trace!(binding = type_name::<B>(), "tween completed");

        if let Some(mut on_end) = self.callbacks.on_end.take() {
            on_end(self);
        }
        if let Some(mut on_finally) = self.callbacks.on_finally.take() {
            on_finally(self);
        }
        self.callbacks.clear();
    }

    fn write(&self, target: &Rc<RefCell<B::Target>>, value: &B::Value) {
        self.binding.apply(&mut target.borrow_mut(), value);
    }

    fn emit_update(&mut self, value: &B::Value) {
        if let Some(mut on_update) = self.callbacks.on_update.take() {
            on_update(self, value);
            if !self.is_decommissioned {
                self.callbacks.on_update = Some(on_update);
            }
        }
        self.honour_stop_request();
    }

    /// Cancel now if a handle asked for it from inside one of our callbacks
    fn honour_stop_request(&mut self) {
        if self.stop_requested.get() && !self.is_decommissioned {
            self.cancel();
        }
    }

    /// Flag shared with the registry slot; raising it cancels the instance
    /// at its next callback boundary
    pub(crate) fn stop_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.stop_requested)
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_paused = false;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.is_paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Finished or cancelled; never updated again
    pub fn is_decommissioned(&self) -> bool {
        self.is_decommissioned
    }

    /// Waiting out a delay or interval
    pub fn is_halted(&self) -> bool {
        self.halt_time.is_some()
    }

    /// Remaining halt countdown in seconds
    pub fn halt_time(&self) -> Option<f32> {
        self.halt_time
    }

    /// Time cursor, in `0.0..=duration`
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Un-eased progress of the current pass
    pub fn progress(&self) -> f32 {
        self.time / self.duration
    }

    /// Playing the forward leg (always true without ping-pong)
    pub fn is_forwards(&self) -> bool {
        self.is_forwards
    }

    pub fn loops(&self) -> LoopBudget {
        self.loops
    }

    /// Passes left including the current one; `None` when infinite
    pub fn loops_remaining(&self) -> Option<u32> {
        match self.loops {
            LoopBudget::Infinite => None,
            LoopBudget::Remaining(n) => Some(n),
        }
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    /// Value sampled from the target when the tween was bound
    pub fn initial(&self) -> &B::Value {
        &self.initial
    }

    pub fn from_value(&self) -> &B::Value {
        &self.from
    }

    pub fn to_value(&self) -> &B::Value {
        &self.to
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    /// The target, if it is still alive
    pub fn target(&self) -> Option<Rc<RefCell<B::Target>>> {
        self.target.upgrade()
    }

    pub fn target_key(&self) -> TargetKey {
        TargetKey::from_ptr(self.target.as_ptr())
    }
}
