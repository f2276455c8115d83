//! Interpolatable value kinds
//!
//! All interpolation is unclamped: eases such as back or elastic push `t`
//! outside `0..=1` and the value is expected to overshoot with it.

/// Unclamped linear interpolation towards `to`
pub trait Lerp: Sized {
    fn lerp(&self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for f64 {
    #[inline]
    fn lerp(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t as f64
    }
}

impl<const N: usize> Lerp for [f32; N] {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        std::array::from_fn(|i| self[i].lerp(&to[i], t))
    }
}

/// 2D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Lerp for Vec2 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self::new(self.x.lerp(&to.x, t), self.y.lerp(&to.y, t))
    }
}

/// 3D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self::new(
            self.x.lerp(&to.x, t),
            self.y.lerp(&to.y, t),
            self.z.lerp(&to.z, t),
        )
    }
}

/// 4D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Lerp for Vec4 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self::new(
            self.x.lerp(&to.x, t),
            self.y.lerp(&to.y, t),
            self.z.lerp(&to.z, t),
            self.w.lerp(&to.w, t),
        )
    }
}

/// Rotation quaternion (x, y, z, w)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around the Z axis
    pub fn from_rotation_z(angle: f32) -> Self {
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::new(0.0, 0.0, sin, cos)
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; a zero quaternion normalizes to identity
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Lerp for Quat {
    /// Normalized linear blend along the shortest arc
    fn lerp(&self, to: &Self, t: f32) -> Self {
        let sign = if self.dot(to) < 0.0 { -1.0 } else { 1.0 };
        Self::new(
            self.x.lerp(&(to.x * sign), t),
            self.y.lerp(&(to.y * sign), t),
            self.z.lerp(&(to.z * sign), t),
            self.w.lerp(&(to.w * sign), t),
        )
        .normalize()
    }
}

/// RGBA color with components in 0.0..=1.0
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Lerp for Color {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self::rgba(
            self.r.lerp(&to.r, t),
            self.g.lerp(&to.g, t),
            self.b.lerp(&to.b, t),
            self.a.lerp(&to.a, t),
        )
    }
}

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Lerp for Rect {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Self::new(
            self.x.lerp(&to.x, t),
            self.y.lerp(&to.y, t),
            self.width.lerp(&to.width, t),
            self.height.lerp(&to.height, t),
        )
    }
}
