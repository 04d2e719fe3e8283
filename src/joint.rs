//! Pin joints: anchor pins to a point and limited pins between two bodies.
//!
//! Each joint knows how to correct itself against the body arena: point
//! and angle projection at the position level, friction at the velocity
//! level. The [`JointSolver`](crate::JointSolver) decides the order and the
//! number of sweeps.

use core::fmt;

use crate::body::{Body, BodyId};
use crate::error::PhysicsError;
use crate::float::Float;
use crate::vec::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle of a joint inside its [`World`](crate::World).
///
/// Ids are allocated monotonically and never reused, so a handle to a
/// removed joint can never alias a newer one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointId(pub(crate) u32);

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joint#{}", self.0)
    }
}

/// What an anchor joint pins its body to.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnchorTarget<F: Float> {
    /// A world-space point. May be moved between steps.
    Point(Vec2<F>),
    /// A point carried by another body. The carrier is followed, never pulled.
    Body { body: BodyId, local_offset: Vec2<F> },
}

/// Frictionless pin between a point on a body and a target point.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnchorJoint<F: Float> {
    pub body: BodyId,
    pub local_offset: Vec2<F>,
    pub target: AnchorTarget<F>,
}

impl<F: Float> AnchorJoint<F> {
    /// Pin `local_offset` on `body` to a fixed world point.
    pub fn new(body: BodyId, local_offset: Vec2<F>, point: Vec2<F>) -> Self {
        AnchorJoint { body, local_offset, target: AnchorTarget::Point(point) }
    }

    /// Pin `local_offset` on `body` to a point that travels with `carrier`.
    pub fn to_body(body: BodyId, local_offset: Vec2<F>, carrier: BodyId, carrier_offset: Vec2<F>) -> Self {
        AnchorJoint {
            body,
            local_offset,
            target: AnchorTarget::Body { body: carrier, local_offset: carrier_offset },
        }
    }
}

/// Pin between two bodies whose relative rotation is confined to
/// `[lower, upper]` and damped by a bounded friction torque.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimitedPinJoint<F: Float> {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2<F>,
    pub local_anchor_b: Vec2<F>,
    /// `angle_b - angle_a` in the rest configuration. Left unset, it is
    /// taken from the bodies when the joint is added to a world.
    pub reference_angle: Option<F>,
    pub lower: F,
    pub upper: F,
    pub friction_torque: F,
}

impl<F: Float> LimitedPinJoint<F> {
    pub fn new(
        body_a: BodyId,
        local_anchor_a: Vec2<F>,
        body_b: BodyId,
        local_anchor_b: Vec2<F>,
        lower: F,
        upper: F,
    ) -> Self {
        LimitedPinJoint {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            reference_angle: None,
            lower,
            upper,
            friction_torque: F::zero(),
        }
    }

    pub fn with_friction(mut self, friction_torque: F) -> Self {
        self.friction_torque = friction_torque;
        self
    }

    pub fn with_reference_angle(mut self, reference_angle: F) -> Self {
        self.reference_angle = Some(reference_angle);
        self
    }

    /// Relative rotation of B against A, measured from the rest configuration.
    ///
    /// Built from cumulative body angles, so it stays continuous even when a
    /// shoulder or hip limit sits right at ±π.
    pub fn relative_angle(&self, a: &Body<F>, b: &Body<F>) -> F {
        b.angle - a.angle - self.reference_angle.unwrap_or(F::zero())
    }
}

/// A constraint stored in the world.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Joint<F: Float> {
    Anchor(AnchorJoint<F>),
    LimitedPin(LimitedPinJoint<F>),
}

impl<F: Float> From<AnchorJoint<F>> for Joint<F> {
    fn from(joint: AnchorJoint<F>) -> Self {
        Joint::Anchor(joint)
    }
}

impl<F: Float> From<LimitedPinJoint<F>> for Joint<F> {
    fn from(joint: LimitedPinJoint<F>) -> Self {
        Joint::LimitedPin(joint)
    }
}

impl<F: Float> Joint<F> {
    /// Reject references to missing bodies and nonsensical parameters.
    pub fn validate(&self, body_count: usize) -> Result<(), PhysicsError> {
        let known = |id: BodyId| {
            if id.index() < body_count { Ok(()) } else { Err(PhysicsError::UnknownBody(id)) }
        };
        match self {
            Joint::Anchor(j) => {
                known(j.body)?;
                if let AnchorTarget::Body { body, .. } = j.target {
                    known(body)?;
                    if body == j.body {
                        return Err(PhysicsError::SameBody);
                    }
                }
                Ok(())
            }
            Joint::LimitedPin(j) => {
                known(j.body_a)?;
                known(j.body_b)?;
                if j.body_a == j.body_b {
                    return Err(PhysicsError::SameBody);
                }
                if !j.lower.is_finite() || !j.upper.is_finite() || j.lower > j.upper {
                    return Err(PhysicsError::InvalidJointLimits {
                        lower: j.lower.to_f64(),
                        upper: j.upper.to_f64(),
                    });
                }
                if !j.friction_torque.is_finite() || j.friction_torque < F::zero() {
                    return Err(PhysicsError::NegativeFriction);
                }
                Ok(())
            }
        }
    }

    /// True if the joint acts on or follows `body`.
    pub fn involves(&self, body: BodyId) -> bool {
        match self {
            Joint::Anchor(j) => {
                j.body == body || matches!(j.target, AnchorTarget::Body { body: b, .. } if b == body)
            }
            Joint::LimitedPin(j) => j.body_a == body || j.body_b == body,
        }
    }

    /// Distance between the two points this joint is meant to hold together.
    pub fn separation(&self, bodies: &[Body<F>]) -> F {
        match self {
            Joint::Anchor(j) => {
                let p = bodies[j.body.index()].world_point(j.local_offset);
                p.distance(anchor_target_point(&j.target, bodies))
            }
            Joint::LimitedPin(j) => {
                let a = bodies[j.body_a.index()].world_point(j.local_anchor_a);
                let b = bodies[j.body_b.index()].world_point(j.local_anchor_b);
                a.distance(b)
            }
        }
    }

    /// Pull the joint's two points together, removing `stiffness` of the gap.
    pub(crate) fn project_points(&self, bodies: &mut [Body<F>], stiffness: F) {
        match self {
            Joint::Anchor(j) => {
                let target = anchor_target_point(&j.target, bodies);
                let body = &mut bodies[j.body.index()];
                let point = body.world_point(j.local_offset);
                let Some((normal, lambda)) = point_correction(target - point, stiffness, |n| {
                    body.inverse_mass_at(point, n)
                }) else {
                    return;
                };
                body.apply_correction(point, normal * lambda);
            }
            Joint::LimitedPin(j) => {
                let (a, b) = pair_mut(bodies, j.body_a, j.body_b);
                let pa = a.world_point(j.local_anchor_a);
                let pb = b.world_point(j.local_anchor_b);
                let Some((normal, lambda)) = point_correction(pb - pa, stiffness, |n| {
                    a.inverse_mass_at(pa, n) + b.inverse_mass_at(pb, n)
                }) else {
                    return;
                };
                a.apply_correction(pa, normal * lambda);
                b.apply_correction(pb, -(normal * lambda));
            }
        }
    }

    /// Turn the bodies back inside the angle range. Returns the size of the
    /// violation that was corrected, zero if there was none.
    pub(crate) fn project_limit(&self, bodies: &mut [Body<F>]) -> F {
        let Joint::LimitedPin(j) = self else {
            return F::zero();
        };
        let (a, b) = pair_mut(bodies, j.body_a, j.body_b);
        let angle = j.relative_angle(a, b);
        let error = if angle < j.lower {
            angle - j.lower
        } else if angle > j.upper {
            angle - j.upper
        } else {
            return F::zero();
        };
        let w = a.inv_inertia + b.inv_inertia;
        if w.is_near_zero(F::from_f32(1e-12)) {
            return F::zero();
        }
        let lambda = error / w;
        a.angle += a.inv_inertia * lambda;
        b.angle -= b.inv_inertia * lambda;
        error.abs()
    }

    /// Coulomb-style joint friction: an angular impulse against the relative
    /// spin, capped at `friction_torque * dt` and never large enough to
    /// reverse it.
    pub(crate) fn apply_friction(&self, bodies: &mut [Body<F>], dt: F) {
        let Joint::LimitedPin(j) = self else {
            return;
        };
        if j.friction_torque <= F::zero() {
            return;
        }
        let (a, b) = pair_mut(bodies, j.body_a, j.body_b);
        let w = a.inv_inertia + b.inv_inertia;
        if w.is_near_zero(F::from_f32(1e-12)) {
            return;
        }
        let max = j.friction_torque * dt;
        let lambda = (-(b.angular_velocity - a.angular_velocity) / w).clamp(-max, max);
        a.angular_velocity -= a.inv_inertia * lambda;
        b.angular_velocity += b.inv_inertia * lambda;
    }
}

pub(crate) fn anchor_target_point<F: Float>(target: &AnchorTarget<F>, bodies: &[Body<F>]) -> Vec2<F> {
    match *target {
        AnchorTarget::Point(p) => p,
        AnchorTarget::Body { body, local_offset } => bodies[body.index()].world_point(local_offset),
    }
}

/// Direction and size of the correction closing `gap`, given the inverse
/// mass along that direction. `None` when there is nothing to move.
fn point_correction<F: Float>(
    gap: Vec2<F>,
    stiffness: F,
    inverse_mass: impl FnOnce(Vec2<F>) -> F,
) -> Option<(Vec2<F>, F)> {
    let length = gap.length();
    if length.is_near_zero(F::from_f32(1e-12)) {
        return None;
    }
    let normal = gap.scale(F::one() / length);
    let w = inverse_mass(normal);
    if w.is_near_zero(F::from_f32(1e-12)) {
        return None;
    }
    Some((normal, length * stiffness / w))
}

/// Disjoint mutable borrows of two different bodies.
fn pair_mut<F: Float>(bodies: &mut [Body<F>], a: BodyId, b: BodyId) -> (&mut Body<F>, &mut Body<F>) {
    let (ia, ib) = (a.index(), b.index());
    debug_assert_ne!(ia, ib);
    if ia < ib {
        let (lo, hi) = bodies.split_at_mut(ib);
        (&mut lo[ia], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(ia);
        (&mut hi[0], &mut lo[ib])
    }
}
