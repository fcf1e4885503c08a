// Swerve module inverse kinematics
// Converts a chassis-frame velocity (linear + angular) into the velocity and
// heading one module must produce, rotating about a configurable pivot.

use tracing::debug;

use super::heading::wrap_degrees;
use super::vector::Vector2;

/// Steering never needs to travel further than this to reach a usable heading
pub const MAX_STEER_TRAVEL_DEG: f64 = 90.0;

/// Static placement of a module plus the vectors derived from the current pivot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleGeometry {
    position: Vector2,
    center_of_rotation: Vector2,
    cor_to_position: Vector2,
    cw_perp_unit: Vector2,
}

impl ModuleGeometry {
    pub fn new(position: Vector2, center_of_rotation: Vector2) -> Self {
        let (cor_to_position, cw_perp_unit) = derive(position, center_of_rotation);
        Self {
            position,
            center_of_rotation,
            cor_to_position,
            cw_perp_unit,
        }
    }

    /// Move the pivot and recompute everything that depends on it in one step
    pub fn set_center_of_rotation(&mut self, center_of_rotation: Vector2) {
        let (cor_to_position, cw_perp_unit) = derive(self.position, center_of_rotation);
        *self = Self {
            position: self.position,
            center_of_rotation,
            cor_to_position,
            cw_perp_unit,
        };
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn center_of_rotation(&self) -> Vector2 {
        self.center_of_rotation
    }

    pub fn cor_to_position(&self) -> Vector2 {
        self.cor_to_position
    }

    /// Unit direction a positive rotation rate pushes this module
    pub fn cw_perp_unit(&self) -> Vector2 {
        self.cw_perp_unit
    }

    /// Velocity this module must produce for the given chassis command
    pub fn local_velocity(&self, chassis_velocity: Vector2, rotation_rate: f64) -> Vector2 {
        local_velocity(chassis_velocity, rotation_rate, self.cw_perp_unit)
    }
}

fn derive(position: Vector2, center_of_rotation: Vector2) -> (Vector2, Vector2) {
    let cor_to_position = position - center_of_rotation;
    let cw_perp_unit = match cor_to_position.normalize() {
        Ok(unit) => unit.cw_perp(),
        Err(_) => {
            // A module sitting on the pivot doesn't translate when the chassis spins
            debug!("module lies on the center of rotation, rotation has no effect on it");
            Vector2::ZERO
        }
    };
    (cor_to_position, cw_perp_unit)
}

/// Linear chassis motion plus the tangential velocity from rotating about the pivot
pub fn local_velocity(chassis_velocity: Vector2, rotation_rate: f64, cw_perp_unit: Vector2) -> Vector2 {
    chassis_velocity + cw_perp_unit * rotation_rate
}

/// Heading a module should steer to, and whether its wheel runs backwards there
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingTarget {
    /// Degrees in (-180, 180]
    pub target_heading_deg: f64,
    pub reversed: bool,
}

/// Pick whichever of `raw_target_deg` and its antipode is closer to `current_deg`
///
/// The result is never more than 90° away from the current heading. A difference of
/// exactly 90° keeps the raw heading.
pub fn optimize_heading(raw_target_deg: f64, current_deg: f64) -> HeadingTarget {
    let raw = wrap_degrees(raw_target_deg);
    let travel = wrap_degrees(raw - current_deg);
    if travel.abs() > MAX_STEER_TRAVEL_DEG {
        HeadingTarget {
            target_heading_deg: wrap_degrees(raw + 180.0),
            reversed: true,
        }
    } else {
        HeadingTarget {
            target_heading_deg: raw,
            reversed: false,
        }
    }
}

/// Optimized heading for `local_velocity`, or `None` when the velocity is zero and
/// no direction can be derived
pub fn target_heading(local_velocity: Vector2, current_deg: f64) -> Option<HeadingTarget> {
    let direction = local_velocity.normalize().ok()?;
    Some(optimize_heading(direction.angle().to_degrees(), current_deg))
}

/// Drive speed along the wheel's current heading
///
/// Projects `local_velocity` onto the direction the wheel points now. Once the wheel
/// has settled on a flipped heading the projection comes out negative, so a reversed
/// target drives backwards without a separate sign.
pub fn drive_speed(local_velocity: Vector2, current_heading_deg: f64) -> f64 {
    Vector2::from_angle(current_heading_deg.to_radians()).dot(local_velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn front_right() -> ModuleGeometry {
        ModuleGeometry::new(Vector2::new(0.356, 0.356), Vector2::ZERO)
    }

    fn assert_vec(actual: Vector2, expected: Vector2, tol: f64) {
        assert!(
            (actual.x - expected.x).abs() < tol && (actual.y - expected.y).abs() < tol,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn projection(v: Vector2, heading_deg: f64) -> f64 {
        Vector2::from_angle(heading_deg.to_radians()).dot(v)
    }

    #[test]
    fn test_local_velocity_is_vector_sum() {
        let geometry = front_right();
        let chassis = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, -0.5),
            Vector2::new(-2.0, 3.0),
        ];
        for &v in &chassis {
            for &omega in &[-3.0, -1.0, 0.0, 0.5, 2.0] {
                let local = geometry.local_velocity(v, omega);
                let expected = v + geometry.cw_perp_unit() * omega;
                assert_vec(local, expected, TOL);
            }
        }
    }

    #[test]
    fn test_pure_translation() {
        let geometry = front_right();
        let local = geometry.local_velocity(Vector2::new(1.0, 0.0), 0.0);
        assert_vec(local, Vector2::new(1.0, 0.0), TOL);

        let target = target_heading(local, 0.0).unwrap();
        assert!(target.target_heading_deg.abs() < TOL);
        assert!(!target.reversed);
    }

    #[test]
    fn test_pure_rotation() {
        let geometry = front_right();
        let half_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
        assert_vec(geometry.cw_perp_unit(), Vector2::new(half_sqrt2, -half_sqrt2), TOL);

        let local = geometry.local_velocity(Vector2::ZERO, 1.0);
        assert_vec(local, Vector2::new(half_sqrt2, -half_sqrt2), TOL);

        let target = target_heading(local, 0.0).unwrap();
        assert!((target.target_heading_deg + 45.0).abs() < TOL);
        assert!(!target.reversed);
    }

    #[test]
    fn test_no_flip_across_seam() {
        // 20° away the short way round, so keep the raw heading
        let target = optimize_heading(-170.0, 170.0);
        assert!(!target.reversed);
        assert!((target.target_heading_deg + 170.0).abs() < TOL);
        assert!((wrap_degrees(target.target_heading_deg - 170.0) - 20.0).abs() < TOL);
    }

    #[test]
    fn test_flip_beyond_ninety() {
        let target = optimize_heading(170.0, 0.0);
        assert!(target.reversed);
        assert!((target.target_heading_deg + 10.0).abs() < TOL);

        // Wheel sitting on the flipped heading drives backwards
        let v = Vector2::from_angle(170f64.to_radians());
        let flipped = drive_speed(v, target.target_heading_deg);
        assert!((flipped + 1.0).abs() < TOL, "expected -1, got {}", flipped);

        // Compared with a wheel already pointing at 170°
        let straight = optimize_heading(170.0, 170.0);
        assert!(!straight.reversed);
        let unflipped = drive_speed(v, 170.0);
        assert!((unflipped - 1.0).abs() < TOL);
        assert!(flipped.signum() == -unflipped.signum());
    }

    #[test]
    fn test_exactly_ninety_does_not_flip() {
        let target = optimize_heading(90.0, 0.0);
        assert!(!target.reversed);
        assert_eq!(target.target_heading_deg, 90.0);
    }

    #[test]
    fn test_flip_never_exceeds_ninety() {
        let mut current = -180.0;
        while current <= 180.0 {
            let mut raw = -180.0;
            while raw <= 180.0 {
                let target = optimize_heading(raw, current);
                let travel = wrap_degrees(target.target_heading_deg - current).abs();
                assert!(
                    travel <= MAX_STEER_TRAVEL_DEG + TOL,
                    "current {} raw {} -> {} travels {}",
                    current,
                    raw,
                    target.target_heading_deg,
                    travel
                );
                assert!(target.target_heading_deg > -180.0 && target.target_heading_deg <= 180.0);
                raw += 5.5;
            }
            current += 7.5;
        }
    }

    #[test]
    fn test_settled_wheel_drives_reversed_when_flipped() {
        let velocities = [
            Vector2::new(1.0, 0.0),
            Vector2::new(-0.4, 0.9),
            Vector2::new(0.2, -1.5),
        ];
        for &v in &velocities {
            let mut current = -175.0;
            while current < 180.0 {
                let target = target_heading(v, current).unwrap();
                // Once the wheel reaches its target it carries the full speed, negated if flipped
                let speed = drive_speed(v, target.target_heading_deg);
                let expected = if target.reversed { -v.norm() } else { v.norm() };
                assert!(
                    (speed - expected).abs() < TOL,
                    "v {} from {}°: {} vs {}",
                    v,
                    current,
                    speed,
                    expected
                );
                assert!((drive_speed(v, current) - projection(v, current)).abs() < TOL);
                current += 12.5;
            }
        }
    }

    #[test]
    fn test_zero_velocity_has_no_heading() {
        assert_eq!(target_heading(Vector2::ZERO, 30.0), None);
    }

    #[test]
    fn test_center_of_rotation_update() {
        let mut geometry = front_right();
        let chassis = Vector2::new(0.3, 0.1);
        let before = geometry.local_velocity(chassis, 1.5);

        geometry.set_center_of_rotation(Vector2::new(0.356, -0.356));
        assert_vec(geometry.cor_to_position(), Vector2::new(0.0, 0.712), TOL);
        assert_vec(geometry.cw_perp_unit(), Vector2::new(1.0, 0.0), TOL);
        assert_eq!(geometry.position(), Vector2::new(0.356, 0.356));

        let after = geometry.local_velocity(chassis, 1.5);
        assert!((after - before).norm() > 1e-3, "pivot change must alter local velocity");

        // Without rotation the pivot is irrelevant
        let still = ModuleGeometry::new(Vector2::new(0.356, 0.356), Vector2::ZERO);
        assert_vec(geometry.local_velocity(chassis, 0.0), still.local_velocity(chassis, 0.0), TOL);
    }

    #[test]
    fn test_module_on_pivot() {
        let geometry = ModuleGeometry::new(Vector2::new(0.5, 0.5), Vector2::new(0.5, 0.5));
        assert_eq!(geometry.cw_perp_unit(), Vector2::ZERO);
        assert_eq!(geometry.local_velocity(Vector2::ZERO, 2.0), Vector2::ZERO);
    }
}
