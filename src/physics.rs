//! Grid physics primitives
//! Provides vector math, DDA ray marching and per-axis sliding movement

use serde::{Deserialize, Serialize};

/// Directions shorter than this are treated as parallel to the other axis
const DIR_EPSILON: f64 = 1e-5;

/// 2D Vector in map units (one unit = one grid cell)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline(always)]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline(always)]
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    #[inline(always)]
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::zero()
        }
    }

    #[inline(always)]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross)
    #[inline(always)]
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline(always)]
    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    #[inline(always)]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    #[inline(always)]
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    #[inline(always)]
    pub fn rotate(&self, angle: f64) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    #[inline(always)]
    pub fn perpendicular(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    #[inline(always)]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    #[inline(always)]
    pub fn distance_to(&self, other: &Self) -> f64 {
        self.sub(other).length()
    }

    #[inline(always)]
    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        self.sub(other).length_squared()
    }
}

/// Grid axis whose line the ray crossed last before hitting a wall
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Stepped along X, hit a vertical grid line
    X,
    /// Stepped along Y, hit a horizontal grid line
    Y,
}

/// Result of a DDA march that hit a solid cell
#[derive(Clone, Copy, Debug)]
pub struct DdaHit {
    /// Perpendicular distance along the camera forward axis
    pub distance: f64,
    pub map_x: i32,
    pub map_y: i32,
    pub side: Side,
    /// Exact hit position on the wall face (0.0 - 1.0)
    pub wall_x: f64,
}

/// Perform DDA (Digital Differential Analysis) raycasting on a grid.
///
/// `dir` need not be normalized; the returned distance is measured in units
/// of `dir`, which for camera rays (`dir + plane * camera_x`) is the
/// perpendicular distance. The march gives up after `max_distance` or after
/// a step budget derived from it, so it terminates even on unbounded maps.
#[inline(always)]
pub fn raycast_dda<F>(origin: Vec2, dir: Vec2, max_distance: f64, is_solid: F) -> Option<DdaHit>
where
    F: Fn(i32, i32) -> bool,
{
    if !origin.x.is_finite() || !origin.y.is_finite() {
        return None;
    }

    let mut map_x = origin.x.floor() as i32;
    let mut map_y = origin.y.floor() as i32;

    // A zero component never crosses a line on that axis
    let delta_dist_x = if dir.x.abs() > DIR_EPSILON {
        (1.0 / dir.x).abs()
    } else {
        f64::INFINITY
    };
    let delta_dist_y = if dir.y.abs() > DIR_EPSILON {
        (1.0 / dir.y).abs()
    } else {
        f64::INFINITY
    };
    if delta_dist_x.is_infinite() && delta_dist_y.is_infinite() {
        return None;
    }

    let (step_x, mut side_dist_x) = if dir.x < 0.0 {
        (-1, (origin.x - map_x as f64) * delta_dist_x)
    } else {
        (1, (map_x as f64 + 1.0 - origin.x) * delta_dist_x)
    };
    let (step_y, mut side_dist_y) = if dir.y < 0.0 {
        (-1, (origin.y - map_y as f64) * delta_dist_y)
    } else {
        (1, (map_y as f64 + 1.0 - origin.y) * delta_dist_y)
    };
    // 0 * inf above is NaN when the origin sits exactly on a grid line
    if side_dist_x.is_nan() {
        side_dist_x = f64::INFINITY;
    }
    if side_dist_y.is_nan() {
        side_dist_y = f64::INFINITY;
    }

    let max_steps = (max_distance.max(1.0) * 4.0) as usize + 4;

    for _ in 0..max_steps {
        // Jump to next grid cell
        let (side, distance) = if side_dist_x < side_dist_y {
            side_dist_x += delta_dist_x;
            map_x += step_x;
            (Side::X, side_dist_x - delta_dist_x)
        } else {
            side_dist_y += delta_dist_y;
            map_y += step_y;
            (Side::Y, side_dist_y - delta_dist_y)
        };

        if distance > max_distance {
            return None;
        }

        if is_solid(map_x, map_y) {
            let wall_x = match side {
                Side::X => origin.y + distance * dir.y,
                Side::Y => origin.x + distance * dir.x,
            };
            return Some(DdaHit {
                distance,
                map_x,
                map_y,
                side,
                wall_x: wall_x - wall_x.floor(),
            });
        }
    }

    None
}

/// Move `pos` by `delta`, resolving X then Y independently so that a blocked
/// axis does not stop motion along the other one. The probe on each axis is
/// pushed out by `radius` in the direction of travel.
pub fn slide_move<F>(pos: Vec2, delta: Vec2, radius: f64, is_solid_at: F) -> Vec2
where
    F: Fn(f64, f64) -> bool,
{
    let mut next = pos;

    if delta.x != 0.0 {
        let probe_x = pos.x + delta.x + radius * delta.x.signum();
        if !is_solid_at(probe_x, pos.y) {
            next.x += delta.x;
        }
    }

    if delta.y != 0.0 {
        let probe_y = pos.y + delta.y + radius * delta.y.signum();
        if !is_solid_at(next.x, probe_y) {
            next.y += delta.y;
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: i32, y: i32) -> bool {
        !(1..=8).contains(&x) || !(1..=8).contains(&y)
    }

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(3.0, 4.0);
        assert!((a.length() - 5.0).abs() < 0.0001);

        let b = Vec2::new(1.0, 0.0);
        let rotated = b.rotate(std::f64::consts::FRAC_PI_2);
        assert!((rotated.x).abs() < 0.0001);
        assert!((rotated.y - 1.0).abs() < 0.0001);

        assert!((b.cross(&rotated) - 1.0).abs() < 0.0001);
        assert_eq!(Vec2::zero().normalize(), Vec2::zero());
    }

    #[test]
    fn test_dda_hits_wall_straight_ahead() {
        let hit = raycast_dda(Vec2::new(4.5, 4.5), Vec2::new(1.0, 0.0), 64.0, boxed)
            .expect("wall to the east");
        assert_eq!(hit.map_x, 9);
        assert_eq!(hit.map_y, 4);
        assert_eq!(hit.side, Side::X);
        assert!((hit.distance - 4.5).abs() < 1e-9);
        assert!((hit.wall_x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dda_terminates_in_every_direction() {
        let origin = Vec2::new(3.3, 6.7);
        for i in 0..360 {
            let dir = Vec2::new(1.0, 0.0).rotate((i as f64).to_radians());
            let hit = raycast_dda(origin, dir, 64.0, boxed).expect("enclosed room");
            assert!(hit.distance.is_finite());
            assert!(hit.distance > 0.0);
        }
    }

    #[test]
    fn test_dda_axis_aligned_rays_have_no_nan() {
        for dir in [
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(-1.0, 0.0),
        ] {
            let hit = raycast_dda(Vec2::new(2.0, 2.0), dir, 64.0, boxed).expect("hit");
            assert!(hit.distance.is_finite());
            assert!(!hit.wall_x.is_nan());
        }
    }

    #[test]
    fn test_dda_degenerate_direction_returns_none() {
        assert!(raycast_dda(Vec2::new(2.5, 2.5), Vec2::zero(), 64.0, boxed).is_none());
    }

    #[test]
    fn test_dda_open_grid_gives_up() {
        assert!(raycast_dda(Vec2::new(0.5, 0.5), Vec2::new(1.0, 0.3), 20.0, |_, _| false).is_none());
    }

    #[test]
    fn test_slide_move_keeps_blocked_axis() {
        // Wall column at x >= 5
        let solid = |x: f64, _y: f64| x >= 5.0;
        let start = Vec2::new(4.5, 2.0);
        let moved = slide_move(start, Vec2::new(0.4, 0.3), 0.2, solid);
        assert_eq!(moved.x, start.x);
        assert!((moved.y - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_slide_move_free_space() {
        let moved = slide_move(Vec2::new(1.0, 1.0), Vec2::new(0.5, -0.5), 0.2, |_, _| false);
        assert_eq!(moved, Vec2::new(1.5, 0.5));
    }
}
