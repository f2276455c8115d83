//! Tween registry
//!
//! Owns every live tween and ticks them once per frame. The registry is a
//! cheap-to-clone shared handle so that callbacks can add or cancel tweens
//! while a tick is in progress.
//!
//! Each tick walks a snapshot of the live list. Tweens added during the
//! tick join the list but are first updated on the next tick; tweens
//! cancelled during the tick are skipped if not yet reached. Decommissioned
//! tweens are pruned once the sweep has finished.
//!
//! Lookups by [`TargetKey`] only match tweens whose target is still alive.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace, warn};

use crate::binding::{Binding, TargetKey};
use crate::config::{DeltaTime, EngineConfig};
use crate::error::Result;
use crate::instance::TweenInstance;
use crate::tween::Tween;

new_key_type! {
    pub struct TweenId;
}

/// Guard against cycles in a caller-supplied parent relation
const MAX_HIERARCHY_DEPTH: usize = 256;

/// Point-in-time view of one registered tween
#[derive(Clone, Debug, PartialEq)]
pub struct TweenStatus {
    pub id: TweenId,
    pub target: TargetKey,
    /// Type name of the binding driving the tween
    pub label: &'static str,
    pub paused: bool,
    pub decommissioned: bool,
    pub halted: bool,
    pub time: f32,
    pub progress: f32,
    pub forwards: bool,
    /// `None` for infinite tweens
    pub loops_remaining: Option<u32>,
}

/// Type-erased view of a [`TweenInstance`]
trait ErasedTween {
    fn update(&mut self, delta: DeltaTime);
    fn cancel(&mut self);
    fn set_paused(&mut self, paused: bool);
    fn is_paused(&self) -> bool;
    fn is_decommissioned(&self) -> bool;
    fn has_target(&self) -> bool;
    fn stop_flag(&self) -> Rc<Cell<bool>>;
    fn status(&self, id: TweenId, target: TargetKey) -> TweenStatus;
}

impl<B: Binding> ErasedTween for TweenInstance<B> {
    fn update(&mut self, delta: DeltaTime) {
        TweenInstance::update(self, delta);
    }

    fn cancel(&mut self) {
        TweenInstance::cancel(self);
    }

    fn set_paused(&mut self, paused: bool) {
        TweenInstance::set_paused(self, paused);
    }

    fn is_paused(&self) -> bool {
        TweenInstance::is_paused(self)
    }

    fn is_decommissioned(&self) -> bool {
        TweenInstance::is_decommissioned(self)
    }

    fn has_target(&self) -> bool {
        self.target().is_some()
    }

    fn stop_flag(&self) -> Rc<Cell<bool>> {
        TweenInstance::stop_flag(self)
    }

    fn status(&self, id: TweenId, target: TargetKey) -> TweenStatus {
        TweenStatus {
            id,
            target,
            label: type_name::<B>(),
            paused: self.is_paused(),
            decommissioned: self.is_decommissioned(),
            halted: self.is_halted(),
            time: self.time(),
            progress: self.progress(),
            forwards: self.is_forwards(),
            loops_remaining: self.loops_remaining(),
        }
    }
}

/// One registry entry.
///
/// The instance sits behind a `RefCell` that is borrowed for the duration
/// of its own update. A cancel arriving while it is borrowed (from inside
/// its own callbacks) raises the shared stop flag, which the instance
/// honours as soon as that callback returns. Pause requests are parked and
/// applied once the borrow ends.
struct TweenSlot {
    id: TweenId,
    target: TargetKey,
    tween: RefCell<Box<dyn ErasedTween>>,
    retired: Cell<bool>,
    stop: Rc<Cell<bool>>,
    deferred_pause: Cell<Option<bool>>,
}

impl TweenSlot {
    fn new(id: TweenId, target: TargetKey, tween: Box<dyn ErasedTween>) -> Self {
        let retired = tween.is_decommissioned();
        let stop = tween.stop_flag();
        Self {
            id,
            target,
            tween: RefCell::new(tween),
            retired: Cell::new(retired),
            stop,
            deferred_pause: Cell::new(None),
        }
    }

    fn is_active(&self) -> bool {
        !self.retired.get() && !self.stop.get()
    }

    /// Whether this slot drives the still-living target behind `key`.
    ///
    /// Keys are addresses, so a slot whose target was dropped may share its
    /// key with an unrelated value allocated since.
    fn targets(&self, key: TargetKey) -> bool {
        self.target == key && self.has_live_target()
    }

    /// A borrowed tween is mid-update, so its target is alive
    fn has_live_target(&self) -> bool {
        self.tween
            .try_borrow()
            .map_or(true, |tween| tween.has_target())
    }

    fn tick(&self, delta: DeltaTime) {
        if self.retired.get() {
            return;
        }
        match self.tween.try_borrow_mut() {
            Ok(mut tween) => tween.update(delta),
            Err(_) => return,
        }
        self.settle();
    }

    /// Apply parked requests, then retire the slot if the tween is done
    fn settle(&self) {
        let Ok(mut tween) = self.tween.try_borrow_mut() else {
            return;
        };
        if let Some(paused) = self.deferred_pause.take() {
            tween.set_paused(paused);
        }
        if self.stop.get() && !tween.is_decommissioned() {
            tween.cancel();
        }
        if tween.is_decommissioned() {
            self.retired.set(true);
        }
    }

    /// Returns whether a cancellation was performed or scheduled
    fn cancel(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.tween.try_borrow_mut() {
            Ok(mut tween) => tween.cancel(),
            Err(_) => {
                self.stop.set(true);
                return true;
            }
        }
        self.settle();
        true
    }

    fn set_paused(&self, paused: bool) -> bool {
        if !self.is_active() {
            return false;
        }
        match self.tween.try_borrow_mut() {
            Ok(mut tween) => tween.set_paused(paused),
            Err(_) => self.deferred_pause.set(Some(paused)),
        }
        true
    }

    fn is_paused(&self) -> bool {
        match self.tween.try_borrow() {
            Ok(tween) => tween.is_paused(),
            Err(_) => self.deferred_pause.get().unwrap_or(false),
        }
    }

    /// `None` while the tween is inside one of its own callbacks
    fn status(&self) -> Option<TweenStatus> {
        let tween = self.tween.try_borrow().ok()?;
        Some(tween.status(self.id, self.target))
    }
}

struct RegistryState {
    slots: SlotMap<TweenId, Rc<TweenSlot>>,
    /// Live slots in insertion order
    order: Vec<Rc<TweenSlot>>,
    /// Reused snapshot buffer for the sweep
    sweep: Vec<Rc<TweenSlot>>,
    config: EngineConfig,
    sweeping: bool,
}

impl RegistryState {
    fn new(config: EngineConfig) -> Self {
        let capacity = config.initial_capacity;
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            order: Vec::with_capacity(capacity),
            sweep: Vec::with_capacity(capacity),
            config,
            sweeping: false,
        }
    }
}

/// Registry of live tweens, ticked by the host's frame loop
///
/// # Example
///
/// ```ignore
/// let registry = TweenRegistry::new();
/// let handle = registry.add(&node, Tween::new(OPACITY, 0.3).to(1.0))?;
///
/// // every frame
/// registry.update(clock.tick());
/// ```
#[derive(Clone)]
pub struct TweenRegistry {
    state: Rc<RefCell<RegistryState>>,
}

impl TweenRegistry {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        debug!(?config, "tween registry initialised");
        Self {
            state: Rc::new(RefCell::new(RegistryState::new(config))),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.state.borrow().config.clone()
    }

    /// Bind `tween` to `target` and register it.
    ///
    /// `on_add` fires before this returns. The new tween is first updated
    /// by the next call to [`update`](Self::update) that starts after it
    /// was added.
    pub fn add<B: Binding>(
        &self,
        target: &Rc<RefCell<B::Target>>,
        tween: Tween<B>,
    ) -> Result<TweenHandle> {
        let config = self.config();
        let instance = TweenInstance::bind(&Rc::downgrade(target), tween, &config)?;
        let key = TargetKey::of(target);

        let slot = {
            let mut state = self.state.borrow_mut();
            let id = state
                .slots
                .insert_with_key(|id| Rc::new(TweenSlot::new(id, key, Box::new(instance))));
            let slot = Rc::clone(&state.slots[id]);
            state.order.push(Rc::clone(&slot));
            slot
        };
        trace!(id = ?slot.id, binding = type_name::<B>(), "tween registered");

        if slot.retired.get() {
            self.prune();
        }
        Ok(TweenHandle {
            id: slot.id,
            slot: Rc::downgrade(&slot),
        })
    }

    /// Advance every live tween by one frame, then prune finished ones.
    ///
    /// Calling this from inside a tween callback is ignored.
    pub fn update(&self, delta: impl Into<DeltaTime>) {
        let delta = delta.into();
        let mut sweep = {
            let mut state = self.state.borrow_mut();
            if state.sweeping {
                warn!("TweenRegistry::update called during a sweep, ignoring");
                return;
            }
            state.sweeping = true;
            let mut sweep = std::mem::take(&mut state.sweep);
            sweep.extend(state.order.iter().cloned());
            sweep
        };

        for slot in &sweep {
            slot.tick(delta);
        }
        sweep.clear();

        {
            let mut state = self.state.borrow_mut();
            state.sweep = sweep;
            state.sweeping = false;
        }
        self.prune();
    }

    /// Drop every tween without firing any callback.
    ///
    /// Targets keep whatever value was last written.
    pub fn shutdown(&self) {
        let (slots, order) = {
            let mut state = self.state.borrow_mut();
            let capacity = state.config.initial_capacity;
            let slots =
                std::mem::replace(&mut state.slots, SlotMap::with_capacity_and_key(capacity));
            let order = std::mem::replace(&mut state.order, Vec::with_capacity(capacity));
            (slots, order)
        };
        for slot in &order {
            slot.retired.set(true);
        }
        debug!(dropped = order.len(), "tween registry shut down");
        drop(order);
        drop(slots);
    }

    /// Remove retired slots unless a sweep is in progress
    fn prune(&self) {
        let removed = {
            let mut state = self.state.borrow_mut();
            if state.sweeping {
                return;
            }
            let before = state.order.len();
            state.order.retain(|slot| !slot.retired.get());
            state.slots.retain(|_, slot| !slot.retired.get());
            before - state.order.len()
        };
        if removed > 0 {
            trace!(removed, "pruned tweens");
        }
    }

    /// Live slots, cloned so no borrow is held while calling into them
    fn live_slots(&self) -> Vec<Rc<TweenSlot>> {
        self.state
            .borrow()
            .order
            .iter()
            .filter(|slot| slot.is_active())
            .cloned()
            .collect()
    }

    /// Number of tweens that are neither finished nor cancelled
    pub fn len(&self) -> usize {
        self.state
            .borrow()
            .order
            .iter()
            .filter(|slot| slot.is_active())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.state
            .borrow()
            .slots
            .get(id)
            .is_some_and(|slot| slot.is_active())
    }

    pub fn handle(&self, id: TweenId) -> Option<TweenHandle> {
        let state = self.state.borrow();
        let slot = state.slots.get(id).filter(|slot| slot.is_active())?;
        Some(TweenHandle {
            id,
            slot: Rc::downgrade(slot),
        })
    }

    /// Snapshot of every live tween, in update order.
    ///
    /// A tween currently running one of its own callbacks is left out.
    pub fn statuses(&self) -> Vec<TweenStatus> {
        self.live_slots()
            .iter()
            .filter_map(|slot| slot.status())
            .collect()
    }

    /// Handles to every live tween driving `target`
    pub fn handles_for(&self, target: impl Into<TargetKey>) -> Vec<TweenHandle> {
        let target = target.into();
        self.live_slots()
            .iter()
            .filter(|slot| slot.targets(target))
            .map(|slot| TweenHandle {
                id: slot.id,
                slot: Rc::downgrade(slot),
            })
            .collect()
    }

    /// Cancel one tween; returns whether it was live
    pub fn cancel(&self, id: TweenId) -> bool {
        let slot = self.state.borrow().slots.get(id).cloned();
        let cancelled = slot.is_some_and(|slot| slot.cancel());
        self.prune();
        cancelled
    }

    /// Cancel every live tween matching `predicate`
    fn cancel_matching(&self, mut predicate: impl FnMut(&TweenSlot) -> bool) -> usize {
        let mut cancelled = 0;
        for slot in self.live_slots() {
            if predicate(&*slot) && slot.cancel() {
                cancelled += 1;
            }
        }
        self.prune();
        cancelled
    }

    pub fn cancel_all(&self) -> usize {
        let cancelled = self.cancel_matching(|_| true);
        debug!(cancelled, "cancelled all tweens");
        cancelled
    }

    /// Cancel every tween driving `target`
    pub fn cancel_target(&self, target: impl Into<TargetKey>) -> usize {
        let target = target.into();
        self.cancel_matching(|slot| slot.targets(target))
    }

    /// Cancel every tween driving `root` or any of its descendants.
    ///
    /// `parent_of` describes the host's hierarchy; a target is a descendant
    /// of `root` if following it reaches `root`.
    pub fn cancel_target_tree(
        &self,
        root: impl Into<TargetKey>,
        parent_of: impl Fn(TargetKey) -> Option<TargetKey>,
    ) -> usize {
        let root = root.into();
        self.cancel_matching(|slot| {
            if !slot.has_live_target() {
                return false;
            }
            let mut key = Some(slot.target);
            for _ in 0..MAX_HIERARCHY_DEPTH {
                match key {
                    Some(k) if k == root => return true,
                    Some(k) => key = parent_of(k),
                    None => return false,
                }
            }
            false
        })
    }

    /// Cancel every live tween whose status matches `predicate`
    pub fn cancel_where(&self, mut predicate: impl FnMut(&TweenStatus) -> bool) -> usize {
        self.cancel_matching(|slot| slot.status().is_some_and(|status| predicate(&status)))
    }

    pub fn pause_all(&self) -> usize {
        self.set_all_paused(true)
    }

    pub fn resume_all(&self) -> usize {
        self.set_all_paused(false)
    }

    fn set_all_paused(&self, paused: bool) -> usize {
        self.live_slots()
            .iter()
            .filter(|slot| slot.set_paused(paused))
            .count()
    }
}

impl Default for TweenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TweenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TweenRegistry")
            .field("tweens", &state.order.len())
            .field("config", &state.config)
            .field("sweeping", &state.sweeping)
            .finish()
    }
}

/// Weak handle to a registered tween.
///
/// Every operation is a no-op once the tween has finished, been cancelled,
/// or the registry has dropped it.
#[derive(Clone)]
pub struct TweenHandle {
    id: TweenId,
    slot: Weak<TweenSlot>,
}

impl TweenHandle {
    pub fn id(&self) -> TweenId {
        self.id
    }

    /// Cancel the tween; returns whether it was live.
    ///
    /// From inside the tween's own callbacks the cancellation takes effect
    /// as soon as that callback returns: nothing more is written and
    /// `on_end` never fires.
    pub fn cancel(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| slot.cancel())
    }

    pub fn pause(&self) -> bool {
        self.set_paused(true)
    }

    pub fn resume(&self) -> bool {
        self.set_paused(false)
    }

    pub fn set_paused(&self, paused: bool) -> bool {
        self.slot
            .upgrade()
            .is_some_and(|slot| slot.set_paused(paused))
    }

    pub fn is_paused(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| slot.is_paused())
    }

    /// Neither finished nor cancelled
    pub fn is_active(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| slot.is_active())
    }

    pub fn status(&self) -> Option<TweenStatus> {
        self.slot.upgrade()?.status()
    }
}

impl fmt::Debug for TweenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl PartialEq for TweenHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TweenHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Property;
    use crate::error::TweenError;
    use crate::fill::FillMode;

    #[derive(Default)]
    struct Node {
        x: f32,
    }

    fn x() -> Property<Node, f32> {
        Property::new(|n: &Node| n.x, |n: &mut Node, v: &f32| n.x = *v)
    }

    fn node() -> Rc<RefCell<Node>> {
        Rc::new(RefCell::new(Node::default()))
    }

    /// Counts `on_update` calls
    fn counted(
        tween: Tween<Property<Node, f32>>,
        counter: &Rc<Cell<u32>>,
    ) -> Tween<Property<Node, f32>> {
        let counter = counter.clone();
        tween.on_update(move |_, _| counter.set(counter.get() + 1))
    }

    #[test]
    fn test_update_drives_and_prunes() {
        let registry = TweenRegistry::new();
        let target = node();
        let handle = registry
            .add(&target, Tween::new(x(), 1.0).to(10.0))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(handle.id()));

        registry.update(0.5);
        assert_eq!(target.borrow().x, 5.0);
        registry.update(0.5);
        assert_eq!(target.borrow().x, 10.0);

        assert!(registry.is_empty());
        assert!(!registry.contains(handle.id()));
        assert!(!handle.is_active());
        assert_eq!(registry.state.borrow().slots.len(), 0);
    }

    #[test]
    fn test_update_order_follows_insertion() {
        let registry = TweenRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let targets: Vec<_> = (0..4).map(|_| node()).collect();
        for (i, target) in targets.iter().enumerate() {
            let log = log.clone();
            registry
                .add(
                    target,
                    Tween::new(x(), 1.0)
                        .to(1.0)
                        .on_update(move |_, _| log.borrow_mut().push(i)),
                )
                .unwrap();
        }
        registry.update(0.1);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cancelling_a_later_tween_mid_sweep_skips_it() {
        let registry = TweenRegistry::new();
        let (a, b, c) = (node(), node(), node());
        let victim: Rc<RefCell<Option<TweenHandle>>> = Rc::default();
        let (count_a, count_b, count_c) = (Rc::default(), Rc::default(), Rc::default());
        let cancels = Rc::new(Cell::new(0));

        let victim_ref = victim.clone();
        let tween_a = counted(Tween::new(x(), 1.0).to(10.0), &count_a).on_start(move |_| {
            if let Some(handle) = victim_ref.borrow().as_ref() {
                handle.cancel();
            }
        });
        registry.add(&a, tween_a).unwrap();

        let cancels_b = cancels.clone();
        let tween_b = counted(Tween::new(x(), 1.0).to(10.0), &count_b)
            .on_cancel(move |_| cancels_b.set(cancels_b.get() + 1));
        *victim.borrow_mut() = Some(registry.add(&b, tween_b).unwrap());

        registry
            .add(&c, counted(Tween::new(x(), 1.0).to(10.0), &count_c))
            .unwrap();

        registry.update(0.5);
        assert_eq!(count_a.get(), 1);
        assert_eq!(count_b.get(), 0);
        assert_eq!(count_c.get(), 1);
        assert_eq!(cancels.get(), 1);
        assert_eq!(b.borrow().x, 0.0);
        assert_eq!(c.borrow().x, 5.0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cancelling_an_earlier_tween_mid_sweep() {
        let registry = TweenRegistry::new();
        let (a, b, c) = (node(), node(), node());
        let (count_a, count_b, count_c) = (Rc::default(), Rc::default(), Rc::default());

        let first = registry
            .add(&a, counted(Tween::new(x(), 1.0).to(10.0), &count_a))
            .unwrap();
        let tween_b = counted(Tween::new(x(), 1.0).to(10.0), &count_b).on_update(move |_, _| {
            first.cancel();
        });
        registry.add(&b, tween_b).unwrap();
        registry
            .add(&c, counted(Tween::new(x(), 1.0).to(10.0), &count_c))
            .unwrap();

        registry.update(0.5);
        registry.update(0.25);
        assert_eq!(count_a.get(), 1);
        // on_update of b was replaced by the cancelling closure
        assert_eq!(count_b.get(), 0);
        assert_eq!(count_c.get(), 2);
        assert_eq!(a.borrow().x, 5.0);
        assert_eq!(c.borrow().x, 7.5);
    }

    #[test]
    fn test_tween_added_mid_sweep_waits_for_next_tick() {
        let registry = TweenRegistry::new();
        let (a, b) = (node(), node());
        let spawned = Rc::new(Cell::new(false));

        let inner = registry.clone();
        let b_ref = b.clone();
        let flag = spawned.clone();
        let tween = Tween::new(x(), 1.0).to(1.0).on_start(move |_| {
            inner
                .add(&b_ref, Tween::new(x(), 1.0).to(10.0))
                .unwrap();
            flag.set(true);
        });
        registry.add(&a, tween).unwrap();

        registry.update(0.5);
        assert!(spawned.get());
        assert_eq!(registry.len(), 2);
        assert_eq!(b.borrow().x, 0.0);

        registry.update(0.5);
        assert_eq!(b.borrow().x, 5.0);
    }

    #[test]
    fn test_reentrant_update_is_ignored() {
        let registry = TweenRegistry::new();
        let target = node();
        let inner = registry.clone();
        let tween = Tween::new(x(), 1.0)
            .to(10.0)
            .on_update(move |_, _| inner.update(0.5));
        registry.add(&target, tween).unwrap();

        registry.update(0.25);
        assert_eq!(target.borrow().x, 2.5);
    }

    #[test]
    fn test_handle_cancel_inside_own_on_update_stops_at_once() {
        let registry = TweenRegistry::new();
        let target = node();
        let me: Rc<RefCell<Option<TweenHandle>>> = Rc::default();
        let events = Rc::new(RefCell::new(Vec::new()));

        let me_ref = me.clone();
        let log = events.clone();
        let log_cancel = events.clone();
        let tween = Tween::new(x(), 1.0)
            .to(10.0)
            .on_update(move |_, v| {
                log.borrow_mut().push(format!("update:{v}"));
                if let Some(handle) = me_ref.borrow().as_ref() {
                    assert!(handle.cancel());
                    assert!(!handle.is_active());
                }
            })
            .on_cancel(move |_| log_cancel.borrow_mut().push("cancel".to_string()));
        *me.borrow_mut() = Some(registry.add(&target, tween).unwrap());

        registry.update(0.5);
        assert_eq!(*events.borrow(), vec!["update:5", "cancel"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_cancel_on_final_tick_prevents_completion() {
        let registry = TweenRegistry::new();
        let target = node();
        let me: Rc<RefCell<Option<TweenHandle>>> = Rc::default();
        let events = Rc::new(RefCell::new(Vec::new()));

        let me_ref = me.clone();
        let (log_end, log_cancel, log_finally) = (events.clone(), events.clone(), events.clone());
        let tween = Tween::new(x(), 1.0)
            .from(3.0)
            .to(10.0)
            .fill(FillMode::Forwards)
            .on_update(move |_, v| {
                if *v == 10.0 {
                    if let Some(handle) = me_ref.borrow().as_ref() {
                        handle.cancel();
                    }
                }
            })
            .on_end(move |_| log_end.borrow_mut().push("end"))
            .on_cancel(move |_| log_cancel.borrow_mut().push("cancel"))
            .on_finally(move |_| log_finally.borrow_mut().push("finally"));
        *me.borrow_mut() = Some(registry.add(&target, tween).unwrap());

        registry.update(0.5);
        registry.update(0.5);
        assert_eq!(*events.borrow(), vec!["cancel", "finally"]);
        // cancellation never restores the initial value
        assert_eq!(target.borrow().x, 10.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_cancel_in_on_start_writes_nothing() {
        let registry = TweenRegistry::new();
        let target = node();
        let updates = Rc::new(Cell::new(0));
        let me: Rc<RefCell<Option<TweenHandle>>> = Rc::default();

        let me_ref = me.clone();
        let tween = counted(Tween::new(x(), 1.0).to(10.0), &updates).on_start(move |_| {
            if let Some(handle) = me_ref.borrow().as_ref() {
                assert!(handle.cancel());
            }
        });
        *me.borrow_mut() = Some(registry.add(&target, tween).unwrap());

        registry.update(0.5);
        assert_eq!(updates.get(), 0);
        assert_eq!(target.borrow().x, 0.0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_pause_and_resume() {
        let registry = TweenRegistry::new();
        let target = node();
        let handle = registry
            .add(&target, Tween::new(x(), 1.0).to(10.0))
            .unwrap();

        assert!(handle.pause());
        assert!(handle.is_paused());
        registry.update(0.5);
        assert_eq!(target.borrow().x, 0.0);

        assert!(handle.resume());
        registry.update(0.5);
        assert_eq!(target.borrow().x, 5.0);
        assert_eq!(handle.status().map(|s| s.progress), Some(0.5));
    }

    #[test]
    fn test_pause_all_and_resume_all() {
        let registry = TweenRegistry::new();
        let (a, b) = (node(), node());
        registry.add(&a, Tween::new(x(), 1.0).to(10.0)).unwrap();
        registry.add(&b, Tween::new(x(), 1.0).to(10.0)).unwrap();

        assert_eq!(registry.pause_all(), 2);
        registry.update(0.5);
        assert!(registry.statuses().iter().all(|s| s.paused && s.time == 0.0));

        assert_eq!(registry.resume_all(), 2);
        registry.update(0.5);
        assert_eq!(a.borrow().x, 5.0);
        assert_eq!(b.borrow().x, 5.0);
    }

    #[test]
    fn test_cancel_target_and_handles_for() {
        let registry = TweenRegistry::new();
        let (a, b) = (node(), node());
        registry.add(&a, Tween::new(x(), 1.0).to(10.0)).unwrap();
        registry.add(&a, Tween::new(x(), 2.0).to(10.0)).unwrap();
        let keep = registry.add(&b, Tween::new(x(), 1.0).to(10.0)).unwrap();

        assert_eq!(registry.handles_for(&a).len(), 2);
        assert_eq!(registry.cancel_target(&a), 2);
        assert_eq!(registry.cancel_target(&a), 0);
        assert_eq!(registry.handles_for(&b), vec![keep]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dropped_target_key_matches_nothing() {
        let registry = TweenRegistry::new();
        let target = node();
        registry
            .add(&target, Tween::new(x(), 1.0).to(10.0).infinite())
            .unwrap();
        let key = TargetKey::of(&target);
        drop(target);

        // the address may be handed out again before the next update
        assert!(registry.handles_for(key).is_empty());
        assert_eq!(registry.cancel_target(key), 0);
        assert_eq!(registry.cancel_target_tree(key, |_| None), 0);

        registry.update(0.1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_target_tree_follows_parent_relation() {
        let registry = TweenRegistry::new();
        let (root, child, grandchild, stranger) = (node(), node(), node(), node());
        for target in [&root, &child, &grandchild, &stranger] {
            registry.add(target, Tween::new(x(), 1.0).to(1.0)).unwrap();
        }

        let (root_key, child_key, grandchild_key) = (
            TargetKey::of(&root),
            TargetKey::of(&child),
            TargetKey::of(&grandchild),
        );
        let parent_of = |key: TargetKey| {
            if key == grandchild_key {
                Some(child_key)
            } else if key == child_key {
                Some(root_key)
            } else {
                None
            }
        };

        assert_eq!(registry.cancel_target_tree(&child, parent_of), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.cancel_target_tree(&root, parent_of), 1);
        assert_eq!(registry.handles_for(&stranger).len(), 1);
    }

    #[test]
    fn test_cancel_target_tree_survives_cycles() {
        let registry = TweenRegistry::new();
        let (a, b) = (node(), node());
        registry.add(&a, Tween::new(x(), 1.0)).unwrap();
        let key = TargetKey::of(&a);
        // a is its own parent
        assert_eq!(registry.cancel_target_tree(&b, |_| Some(key)), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_where_filters_on_status() {
        let registry = TweenRegistry::new();
        let target = node();
        registry
            .add(&target, Tween::new(x(), 1.0).to(1.0).infinite())
            .unwrap();
        registry
            .add(&target, Tween::new(x(), 1.0).to(1.0).loops(3))
            .unwrap();

        assert_eq!(registry.cancel_where(|s| s.loops_remaining.is_none()), 1);
        let remaining = registry.statuses();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].loops_remaining, Some(3));
        assert!(remaining[0].label.contains("Property"));
    }

    #[test]
    fn test_cancel_fires_callbacks_once() {
        let registry = TweenRegistry::new();
        let target = node();
        let cancels = Rc::new(Cell::new(0));
        let finals = Rc::new(Cell::new(0));
        let (c, f) = (cancels.clone(), finals.clone());
        let handle = registry
            .add(
                &target,
                Tween::new(x(), 1.0)
                    .on_cancel(move |_| c.set(c.get() + 1))
                    .on_finally(move |_| f.set(f.get() + 1)),
            )
            .unwrap();

        assert!(registry.cancel(handle.id()));
        assert!(!registry.cancel(handle.id()));
        assert!(!handle.cancel());
        assert_eq!((cancels.get(), finals.get()), (1, 1));
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn test_shutdown_drops_without_callbacks() {
        let registry = TweenRegistry::new();
        let target = node();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let handle = registry
            .add(
                &target,
                Tween::new(x(), 1.0)
                    .to(10.0)
                    .on_finally(move |_| flag.set(true)),
            )
            .unwrap();
        registry.update(0.5);

        registry.shutdown();
        assert!(registry.is_empty());
        assert!(!handle.is_active());
        assert!(!fired.get());
        assert_eq!(target.borrow().x, 5.0);
    }

    #[test]
    fn test_dropped_target_is_cancelled_and_pruned() {
        let registry = TweenRegistry::new();
        let target = node();
        let cancelled = Rc::new(Cell::new(false));
        let flag = cancelled.clone();
        registry
            .add(
                &target,
                Tween::new(x(), 1.0).on_cancel(move |_| flag.set(true)),
            )
            .unwrap();
        drop(target);

        registry.update(0.1);
        assert!(cancelled.get());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_add_leaves_registry_untouched() {
        let registry = TweenRegistry::new();
        let target = node();
        let result = registry.add(&target, Tween::new(x(), 1.0).ease_named("nope"));
        assert!(matches!(result, Err(TweenError::UnknownEasing(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_in_on_add_never_registers() {
        let registry = TweenRegistry::new();
        let target = node();
        let handle = registry
            .add(&target, Tween::new(x(), 1.0).on_add(|instance| instance.cancel()))
            .unwrap();
        assert!(!handle.is_active());
        assert!(registry.is_empty());
        assert_eq!(registry.state.borrow().order.len(), 0);
    }

    #[test]
    fn test_config_clamps_durations() {
        let registry = TweenRegistry::with_config(EngineConfig::default().with_min_duration(0.5));
        let target = node();
        let handle = registry.add(&target, Tween::new(x(), 0.0).to(10.0)).unwrap();
        assert_eq!(handle.status().map(|s| s.time), Some(0.0));

        registry.update(0.1);
        assert!((target.borrow().x - 4.0).abs() < 1e-5);
        assert!(handle.is_active());
    }
}
