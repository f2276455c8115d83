//! Capability bindings
//!
//! A binding couples the engine to one animatable property of one target
//! type: it can read the live value, blend two values, and write a value
//! back. The engine never owns targets; it only holds them weakly.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::Lerp;

/// The `{current, lerp, apply}` contract for one property
pub trait Binding: 'static {
    /// Object the property lives on
    type Target: 'static;
    /// Value type that gets interpolated
    type Value: Clone + 'static;

    /// Sample the live value from the target
    fn current(&self, target: &Self::Target) -> Self::Value;

    /// Blend `from` towards `to` by eased progress `t` (unclamped)
    fn lerp(&self, from: &Self::Value, to: &Self::Value, t: f32) -> Self::Value;

    /// Write a value to the target
    fn apply(&self, target: &mut Self::Target, value: &Self::Value);
}

/// A plain capability record of three function pointers.
///
/// Built-in property tables are usually a handful of these `const`s:
///
/// ```ignore
/// const OPACITY: Property<Node, f32> =
///     Property::with_lerp(|n| n.opacity, |a, b, t| a + (b - a) * t, |n, v| n.opacity = *v);
/// ```
pub struct Property<T, V> {
    current: fn(&T) -> V,
    lerp: fn(&V, &V, f32) -> V,
    apply: fn(&mut T, &V),
}

impl<T, V: Lerp> Property<T, V> {
    /// Property whose values blend with [`Lerp`]
    pub fn new(current: fn(&T) -> V, apply: fn(&mut T, &V)) -> Self {
        Self {
            current,
            lerp: V::lerp,
            apply,
        }
    }
}

impl<T, V> Property<T, V> {
    /// Property with a custom blend function
    pub const fn with_lerp(
        current: fn(&T) -> V,
        lerp: fn(&V, &V, f32) -> V,
        apply: fn(&mut T, &V),
    ) -> Self {
        Self {
            current,
            lerp,
            apply,
        }
    }
}

impl<T, V> Clone for Property<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Property<T, V> {}

impl<T, V> fmt::Debug for Property<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("target", &std::any::type_name::<T>())
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

impl<T: 'static, V: Clone + 'static> Binding for Property<T, V> {
    type Target = T;
    type Value = V;

    #[inline]
    fn current(&self, target: &T) -> V {
        (self.current)(target)
    }

    #[inline]
    fn lerp(&self, from: &V, to: &V, t: f32) -> V {
        (self.lerp)(from, to, t)
    }

    #[inline]
    fn apply(&self, target: &mut T, value: &V) {
        (self.apply)(target, value)
    }
}

/// Identity of a target allocation, used to filter tweens by target.
///
/// Keys compare equal only while both refer to the same live allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(usize);

impl TargetKey {
    pub fn of<T: ?Sized>(target: &Rc<RefCell<T>>) -> Self {
        Self(Rc::as_ptr(target) as *const () as usize)
    }

    pub(crate) fn from_ptr<T: ?Sized>(ptr: *const RefCell<T>) -> Self {
        Self(ptr as *const () as usize)
    }
}

impl<T: ?Sized> From<&Rc<RefCell<T>>> for TargetKey {
    fn from(target: &Rc<RefCell<T>>) -> Self {
        Self::of(target)
    }
}
