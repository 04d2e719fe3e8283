//! Rigid limb segments.

use core::fmt;

use crate::error::PhysicsError;
use crate::float::Float;
use crate::vec::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a body inside its [`World`](crate::World).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub(crate) u32);

impl BodyId {
    /// Position of this body in the world's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// A rectangular rigid segment.
///
/// The body's local frame has `x` across the segment and `y` along it, so a
/// segment's two ends sit at `(0, ±half_extents.y)`. `angle` is cumulative:
/// it is never wrapped into `[-π, π]`, which keeps joint relative angles
/// continuous across full turns.
#[derive(Clone, Debug)]
pub struct Body<F: Float> {
    pub position: Vec2<F>,
    pub angle: F,
    pub velocity: Vec2<F>,
    pub angular_velocity: F,
    pub half_extents: Vec2<F>,
    pub(crate) mass: F,
    pub(crate) inv_mass: F,
    pub(crate) inertia: F,
    pub(crate) inv_inertia: F,
    pub force: Vec2<F>,
    pub torque: F,
    pub kinematic: bool,
    /// Pose at the start of the current sub-step.
    pub(crate) previous_position: Vec2<F>,
    pub(crate) previous_angle: F,
}

impl<F: Float> Body<F> {
    /// Create a dynamic body centred at `position`.
    pub fn new(position: Vec2<F>, half_extents: Vec2<F>, mass: F) -> Result<Self, PhysicsError> {
        validate_extents(half_extents)?;
        if !(mass > F::zero()) || !mass.is_finite() {
            return Err(PhysicsError::InvalidMass);
        }
        let inertia = box_inertia(half_extents, mass);
        Ok(Body {
            position,
            angle: F::zero(),
            velocity: Vec2::zero(),
            angular_velocity: F::zero(),
            half_extents,
            mass,
            inv_mass: mass.recip_or_zero(),
            inertia,
            inv_inertia: inertia.recip_or_zero(),
            force: Vec2::zero(),
            torque: F::zero(),
            kinematic: false,
            previous_position: position,
            previous_angle: F::zero(),
        })
    }

    /// Create a kinematic body: infinite mass, moved only by its own velocity.
    pub fn kinematic(position: Vec2<F>, half_extents: Vec2<F>) -> Result<Self, PhysicsError> {
        validate_extents(half_extents)?;
        Ok(Body {
            position,
            angle: F::zero(),
            velocity: Vec2::zero(),
            angular_velocity: F::zero(),
            half_extents,
            mass: F::zero(),
            inv_mass: F::zero(),
            inertia: F::zero(),
            inv_inertia: F::zero(),
            force: Vec2::zero(),
            torque: F::zero(),
            kinematic: true,
            previous_position: position,
            previous_angle: F::zero(),
        })
    }

    /// Zero for kinematic bodies.
    pub fn mass(&self) -> F {
        self.mass
    }

    pub fn inverse_mass(&self) -> F {
        self.inv_mass
    }

    /// Moment of inertia about the centre, `m (hx² + hy²) / 3`.
    pub fn inertia(&self) -> F {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> F {
        self.inv_inertia
    }

    pub fn with_angle(mut self, angle: F) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2<F>, angular_velocity: F) -> Self {
        self.velocity = velocity;
        self.angular_velocity = angular_velocity;
        self
    }

    /// Accumulate a force through the centre of mass for the next integration.
    pub fn apply_force(&mut self, force: Vec2<F>) {
        if !self.kinematic {
            self.force += force;
        }
    }

    pub fn apply_torque(&mut self, torque: F) {
        if !self.kinematic {
            self.torque += torque;
        }
    }

    /// Apply an impulse at a world-space point, changing linear and angular velocity.
    pub fn apply_impulse(&mut self, point: Vec2<F>, impulse: Vec2<F>) {
        if self.kinematic {
            return;
        }
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += (point - self.position).cross(impulse) * self.inv_inertia;
    }

    /// Semi-implicit Euler: velocities from accumulated forces first, then
    /// position and angle from the new velocities.
    pub fn integrate(&mut self, dt: F) {
        self.previous_position = self.position;
        self.previous_angle = self.angle;
        if !self.kinematic {
            self.velocity += self.force * (self.inv_mass * dt);
            self.angular_velocity += self.torque * self.inv_inertia * dt;
        }
        self.force = Vec2::zero();
        self.torque = F::zero();
        self.position += self.velocity * dt;
        self.angle += self.angular_velocity * dt;
    }

    /// Inverse of the mass felt by a push along `direction` at `point`.
    pub fn inverse_mass_at(&self, point: Vec2<F>, direction: Vec2<F>) -> F {
        let rn = (point - self.position).cross(direction);
        self.inv_mass + self.inv_inertia * rn * rn
    }

    /// Positional counterpart of [`apply_impulse`](Self::apply_impulse):
    /// shift and turn the body as if `correction` were an impulse at `point`.
    pub(crate) fn apply_correction(&mut self, point: Vec2<F>, correction: Vec2<F>) {
        if self.kinematic {
            return;
        }
        let arm = point - self.position;
        self.position += correction * self.inv_mass;
        self.angle += arm.cross(correction) * self.inv_inertia;
    }

    /// Replace the velocities with the motion made over the last sub-step,
    /// corrections included.
    pub(crate) fn update_velocity(&mut self, dt: F) {
        if self.kinematic {
            return;
        }
        let inv_dt = F::one() / dt;
        self.velocity = (self.position - self.previous_position) * inv_dt;
        self.angular_velocity = (self.angle - self.previous_angle) * inv_dt;
    }

    /// Transform a body-local point to world space.
    pub fn world_point(&self, local: Vec2<F>) -> Vec2<F> {
        self.position + local.rotate(self.angle)
    }

    /// Transform a world-space point into the body's local frame.
    pub fn local_point(&self, world: Vec2<F>) -> Vec2<F> {
        (world - self.position).rotate(-self.angle)
    }

    /// Velocity of the material point currently at `point`.
    pub fn velocity_at(&self, point: Vec2<F>) -> Vec2<F> {
        self.velocity + Vec2::cross_scalar(self.angular_velocity, point - self.position)
    }

    /// Translational plus rotational kinetic energy.
    pub fn kinetic_energy(&self) -> F {
        F::half() * (self.mass * self.velocity.length_sq()
            + self.inertia * self.angular_velocity * self.angular_velocity)
    }

    /// World-space corners, counter-clockwise from the local (-x, -y) corner.
    pub fn corners(&self) -> [Vec2<F>; 4] {
        let (cos, sin) = (self.angle.cos(), self.angle.sin());
        let h = self.half_extents;
        [
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
        ]
        .map(|c| self.position + c.rotate_cs(cos, sin))
    }

    pub fn is_dynamic(&self) -> bool {
        !self.kinematic
    }
}

/// Read-only view of a body for drawing.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodySnapshot<F: Float> {
    pub id: BodyId,
    pub position: Vec2<F>,
    pub angle: F,
    pub half_extents: Vec2<F>,
}

/// Moment of inertia of a solid rectangle about its centre.
fn box_inertia<F: Float>(half_extents: Vec2<F>, mass: F) -> F {
    mass * half_extents.length_sq() / F::from_f32(3.0)
}

fn validate_extents<F: Float>(half_extents: Vec2<F>) -> Result<(), PhysicsError> {
    if half_extents.is_finite() && half_extents.x > F::zero() && half_extents.y > F::zero() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidShape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rod() -> Body<f64> {
        Body::new(Vec2::new(0.0, 0.0), Vec2::new(0.5, 2.0), 3.0).unwrap()
    }

    #[test]
    fn inertia_matches_rectangle_formula() {
        let b = rod();
        // m (w² + l²) / 12 with w = 1, l = 4
        assert_relative_eq!(b.inertia, 3.0 * (1.0 + 16.0) / 12.0);
    }

    #[test]
    fn mass_properties_are_read_only_views() {
        let b = rod();
        assert_eq!(b.mass(), 3.0);
        assert_relative_eq!(b.inverse_mass(), 1.0 / 3.0);
        assert_relative_eq!(b.inertia() * b.inverse_inertia(), 1.0);

        let pinned = Body::<f64>::kinematic(Vec2::zero(), Vec2::new(0.5, 0.5)).unwrap();
        assert_eq!(pinned.mass(), 0.0);
        assert_eq!(pinned.inverse_mass(), 0.0);
        assert_eq!(pinned.inverse_inertia(), 0.0);
    }

    #[test]
    fn impulse_at_centre_does_not_spin() {
        let mut b = rod();
        b.apply_impulse(b.position, Vec2::new(6.0, 0.0));
        assert!((b.velocity.x - 2.0).abs() < 1e-12);
        assert_eq!(b.angular_velocity, 0.0);
    }

    #[test]
    fn off_centre_impulse_spins() {
        let mut b = rod();
        b.apply_impulse(Vec2::new(0.0, 2.0), Vec2::new(1.0, 0.0));
        // r × J = (0, 2) × (1, 0) = -2
        assert!(b.angular_velocity < 0.0);
    }

    #[test]
    fn velocity_updates_before_position() {
        let mut b = rod();
        b.apply_force(Vec2::new(0.0, -3.0)); // 1 unit/s² on mass 3
        b.integrate(0.5);
        assert!((b.velocity.y + 0.5).abs() < 1e-12);
        assert!((b.position.y + 0.25).abs() < 1e-12);
        assert_eq!(b.force, Vec2::zero());
    }

    #[test]
    fn kinematic_ignores_forces() {
        let mut b = Body::<f32>::kinematic(Vec2::new(1.0, 1.0), Vec2::new(0.1, 0.1)).unwrap();
        b.apply_force(Vec2::new(100.0, 100.0));
        b.apply_impulse(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        b.integrate(1.0 / 60.0);
        assert_eq!(b.position, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn rejects_bad_mass_and_shape() {
        let h = Vec2::new(1.0f32, 1.0);
        assert_eq!(Body::new(Vec2::zero(), h, 0.0).unwrap_err(), PhysicsError::InvalidMass);
        assert_eq!(Body::new(Vec2::zero(), h, f32::NAN).unwrap_err(), PhysicsError::InvalidMass);
        assert_eq!(
            Body::new(Vec2::zero(), Vec2::new(0.0, 1.0), 1.0).unwrap_err(),
            PhysicsError::InvalidShape
        );
    }

    #[test]
    fn velocity_follows_corrected_motion() {
        let mut b = rod();
        b.integrate(0.1);
        b.apply_correction(b.position, Vec2::new(0.3, 0.0)); // 0.1 along x for mass 3
        b.update_velocity(0.1);
        assert!((b.velocity.x - 1.0).abs() < 1e-12);
        assert_eq!(b.angular_velocity, 0.0);
    }

    #[test]
    fn off_centre_correction_turns_the_body() {
        let mut b = rod();
        let tip = b.world_point(Vec2::new(0.0, 2.0));
        let w = b.inverse_mass_at(tip, Vec2::new(1.0, 0.0));
        // 1/m + r² / I with r = 2
        assert_relative_eq!(w, 1.0 / 3.0 + 4.0 / b.inertia, epsilon = 1e-12);
        b.apply_correction(tip, Vec2::new(1.0, 0.0));
        assert!(b.angle < 0.0);
    }

    #[test]
    fn world_and_local_points_round_trip() {
        let b = rod().with_angle(0.7);
        let local = Vec2::new(0.25, -1.5);
        let back = b.local_point(b.world_point(local));
        assert!((back.x - local.x).abs() < 1e-12 && (back.y - local.y).abs() < 1e-12);
    }
}
