use glam::{Vec2, Vec3};

/// A planar floor/ceiling/FOF surface: `z = origin.z + gradient · (p − origin.xy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slope {
    pub origin: Vec3,
    /// Height change per map unit along x and y.
    pub gradient: Vec2,
}

impl Slope {
    pub fn new(origin: Vec3, gradient: Vec2) -> Self {
        Self { origin, gradient }
    }

    #[inline]
    pub fn z(&self, p: Vec2) -> f32 {
        self.origin.z + self.gradient.dot(p - self.origin.truncate())
    }

    /// Height of an optionally sloped surface; flat surfaces return `flat`.
    #[inline]
    pub fn z_at(slope: Option<&Slope>, p: Vec2, flat: f32) -> f32 {
        match slope {
            Some(s) => s.z(p),
            None => flat,
        }
    }
}
