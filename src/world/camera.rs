use glam::{Vec2, Vec3, vec2};

/// Eye point of one view in world space.
///
/// * `z` is the absolute eye altitude.
/// * `aiming` tilts the view up (+) / down (−); `roll` spins it about the
///   view axis. Both are radians.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec3,
    pub yaw: f32, // radians (0 = east, counter-clockwise)
    pub fov: f32, // horizontal FoV (radians, typical 90–110°)
    pub aiming: f32,
    pub roll: f32,
    /// Chase-cam view; shearing may apply only to these.
    pub third_person: bool,
}

impl Camera {
    /// Create a new camera at `pos`, facing `yaw`, with horizontal FoV `fov`.
    pub fn new(pos: Vec3, yaw: f32, fov: f32) -> Self {
        Self {
            pos,
            yaw,
            fov,
            aiming: 0.0,
            roll: 0.0,
            third_person: false,
        }
    }

    /// Transform an X–Y point `p` into camera‐local coords:
    ///  .x = lateral offset (+ right)
    ///  .y = depth along forward axis
    #[inline]
    pub fn to_cam(&self, p: Vec2) -> Vec2 {
        let dx = p.x - self.pos.x;
        let dy = p.y - self.pos.y;
        let (s, c) = self.yaw.sin_cos();
        // Rotate by -yaw: align world so camera forward is +X
        let x_cam = dx * c + dy * s;
        let y_cam = dx * s - dy * c;
        vec2(y_cam, x_cam)
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks on the X-Y plane.
    #[inline(always)]
    pub fn forward(self) -> Vec2 {
        let (s, c) = self.yaw.sin_cos();
        Vec2::new(c, s) // 0 rad = +X (east), CCW positive
    }

    /// Unit vector pointing to the camera's right on the X-Y plane.
    #[inline(always)]
    pub fn right(self) -> Vec2 {
        self.forward().perp()
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe), preserving altitude.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = self.forward();
        let r = self.right();
        self.pos.x += f.x * forward + r.x * side;
        self.pos.y += f.y * forward + r.y * side;
    }

    /// Rotate around Z-axis (positive = turn left).
    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }

    /// Look up/down, limited to straight up / straight down.
    pub fn look(&mut self, delta: f32) {
        use std::f32::consts::FRAC_PI_2;
        self.aiming = (self.aiming + delta).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /*──────────────────────── transform helpers ─────────────────────*/

    #[inline]
    pub fn yaw_degrees(&self) -> f32 {
        self.yaw.to_degrees()
    }

    /// Vertical shear offset equivalent to `aiming`, in projected units.
    #[inline]
    pub fn aiming_dy(&self) -> f32 {
        self.aiming.tan() * 160.0
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn forward_and_right_are_orthonormal() {
        let cam = Camera::new(Vec3::ZERO, 0.3, 1.57);
        let f = cam.forward();
        let r = cam.right();
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((f.dot(r)).abs() < 1e-5);
    }

    #[test]
    fn to_cam_axes_align() {
        let cam = Camera::new(Vec3::ZERO, 0.0, FRAC_PI_2);
        // Point straight ahead at (10, 0) → (lateral=0, forward=10)
        assert!((cam.to_cam(vec2(10.0, 0.0)) - vec2(0.0, 10.0)).length() < 1e-5);
        // Point to the right at (0, 5) → (lateral=5, forward=0)
        assert!((cam.to_cam(vec2(0.0, 5.0)) - vec2(5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn to_cam_rotated_yaw() {
        let cam = Camera::new(Vec3::ZERO, FRAC_PI_2, FRAC_PI_2);
        // Yaw = 90°: forward is +Y; (0,10) → (lateral=0, forward=10)
        assert!((cam.to_cam(vec2(0.0, 10.0)) - vec2(0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn look_is_clamped() {
        let mut cam = Camera::new(Vec3::ZERO, 0.0, FRAC_PI_2);
        cam.look(10.0);
        assert_eq!(cam.aiming, FRAC_PI_2);
        assert_eq!(cam.aiming_dy().signum(), 1.0);
    }
}
