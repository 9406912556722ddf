use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 2D vector in arena units (x right, y down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians.
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len < 1e-6 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    /// Perpendicular vector (rotated +90°).
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Heading of this vector in radians.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Scale down so the length never exceeds `max`.
    pub fn clamp_length(self, max: f32) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            self * (max / len)
        } else {
            self
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Square bounding box of a circle.
    pub fn around(center: Vec2, radius: f32) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            radius * 2.0,
            radius * 2.0,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Closest point inside the rectangle to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.x, self.right()),
            p.y.clamp(self.y, self.bottom()),
        )
    }
}

/// Wrap an angle into (-π, π].
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = rect.closest_point(center);
    (center - closest).length_squared() < radius * radius
}

pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    (b - a).length_squared() < r * r
}

/// Minimum push that moves the box `moving` out of `fixed`, along the axis
/// of least penetration. `None` if the boxes do not overlap.
pub fn min_penetration(moving: &Rect, fixed: &Rect) -> Option<Vec2> {
    if !rects_overlap(moving, fixed) {
        return None;
    }
    let push_left = moving.right() - fixed.x;
    let push_right = fixed.right() - moving.x;
    let push_up = moving.bottom() - fixed.y;
    let push_down = fixed.bottom() - moving.y;

    let dx = if push_left < push_right {
        -push_left
    } else {
        push_right
    };
    let dy = if push_up < push_down {
        -push_up
    } else {
        push_down
    };

    if dx.abs() < dy.abs() {
        Some(Vec2::new(dx, 0.0))
    } else {
        Some(Vec2::new(0.0, dy))
    }
}

/// Whether segment `a`-`b` crosses `rect` (slab test).
pub fn segment_intersects_rect(a: Vec2, b: Vec2, rect: &Rect) -> bool {
    let d = b - a;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for (origin, dir, lo, hi) in [
        (a.x, d.x, rect.x, rect.right()),
        (a.y, d.y, rect.y, rect.bottom()),
    ] {
        if dir.abs() < 1e-8 {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let t1 = (lo - origin) / dir;
        let t2 = (hi - origin) / dir;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        t_min = t_min.max(near);
        t_max = t_max.min(far);
        if t_min > t_max {
            return false;
        }
    }
    true
}

/// Uniformly pick one element, or `None` for an empty slice.
pub fn pick_random<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.random_range(0..items.len())])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn normalize_angle_range() {
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-5);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((normalize_angle(-0.5 - TAU) + 0.5).abs() < 1e-5);
    }

    #[test]
    fn rect_overlap_edges_do_not_touch() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!rects_overlap(&a, &b));
        let c = Rect::new(9.0, 9.0, 5.0, 5.0);
        assert!(rects_overlap(&a, &c));
    }

    #[test]
    fn circle_rect_corner() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(circle_rect_overlap(Vec2::new(12.0, 5.0), 3.0, &r));
        // Diagonal distance from corner is ~4.24
        assert!(!circle_rect_overlap(Vec2::new(13.0, 13.0), 4.0, &r));
    }

    #[test]
    fn circles_overlap_uses_radius_sum() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
    }

    #[test]
    fn min_penetration_picks_shallow_axis() {
        let fixed = Rect::new(0.0, 0.0, 100.0, 20.0);
        let moving = Rect::new(40.0, 15.0, 10.0, 10.0);
        let push = min_penetration(&moving, &fixed).unwrap();
        assert_eq!(push, Vec2::new(0.0, 5.0));
    }

    #[test]
    fn segment_rect_slab() {
        let r = Rect::new(10.0, -5.0, 5.0, 10.0);
        assert!(segment_intersects_rect(Vec2::ZERO, Vec2::new(20.0, 0.0), &r));
        assert!(!segment_intersects_rect(Vec2::ZERO, Vec2::new(5.0, 0.0), &r));
        assert!(!segment_intersects_rect(
            Vec2::new(0.0, 10.0),
            Vec2::new(20.0, 10.0),
            &r
        ));
    }

    #[test]
    fn pick_random_empty_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty: [u8; 0] = [];
        assert!(pick_random(&empty, &mut rng).is_none());
        assert!(pick_random(&[1, 2, 3], &mut rng).is_some());
    }

    #[test]
    fn clamp_length_caps_magnitude() {
        let v = Vec2::new(30.0, 40.0).clamp_length(10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
    }
}
