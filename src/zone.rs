//! Collidable regions and the contact events they emit.

use alloc::collections::BTreeSet;
use core::fmt;

use crate::body::BodyId;
use crate::error::PhysicsError;
use crate::float::Float;
use crate::vec::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a zone inside its [`World`](crate::World).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZoneId(pub(crate) u32);

impl ZoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone#{}", self.0)
    }
}

/// Geometry of a zone.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ZoneShape<F: Float> {
    /// Axis-aligned box that keeps bodies inside.
    Bounds { min: Vec2<F>, max: Vec2<F> },
    /// Disc that keeps bodies outside when solid.
    Circle { center: Vec2<F>, radius: F },
}

impl<F: Float> ZoneShape<F> {
    /// Reject empty, inverted or non-finite shapes.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let ok = match *self {
            ZoneShape::Bounds { min, max } => {
                min.is_finite() && max.is_finite() && min.x < max.x && min.y < max.y
            }
            ZoneShape::Circle { center, radius } => {
                center.is_finite() && radius.is_finite() && radius > F::zero()
            }
        };
        if ok { Ok(()) } else { Err(PhysicsError::InvalidZone) }
    }
}

/// How a zone reacts to bodies that overlap it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ZoneResponse {
    /// Report contacts only.
    Sensor,
    /// Report contacts and push overlapping bodies back out.
    Solid,
}

/// A named collidable region.
///
/// A solid circle pushes out bodies that enter it. Bodies already inside
/// when the zone switches on are let out instead: they pass freely until
/// their overlap ends.
#[derive(Clone, Debug)]
pub struct Zone<F: Float> {
    pub shape: ZoneShape<F>,
    pub response: ZoneResponse,
    pub(crate) active: bool,
    /// Overlaps as of the last completed step.
    pub(crate) touching: BTreeSet<BodyId>,
    /// Overlaps seen during the step in progress.
    pub(crate) overlapping: BTreeSet<BodyId>,
    pub(crate) passing: BTreeSet<BodyId>,
    /// False until the zone has looked at the bodies once since switching on.
    pub(crate) armed: bool,
}

impl<F: Float> Zone<F> {
    /// World boundary rectangle. Always solid.
    pub fn bounds(min: Vec2<F>, max: Vec2<F>) -> Result<Self, PhysicsError> {
        Self::with_shape(ZoneShape::Bounds { min, max }, ZoneResponse::Solid)
    }

    /// Circular region, a sensor until switched to solid.
    pub fn circle(center: Vec2<F>, radius: F) -> Result<Self, PhysicsError> {
        Self::with_shape(ZoneShape::Circle { center, radius }, ZoneResponse::Sensor)
    }

    fn with_shape(shape: ZoneShape<F>, response: ZoneResponse) -> Result<Self, PhysicsError> {
        shape.validate()?;
        Ok(Zone {
            shape,
            response,
            active: true,
            touching: BTreeSet::new(),
            overlapping: BTreeSet::new(),
            passing: BTreeSet::new(),
            armed: false,
        })
    }

    pub fn with_response(mut self, response: ZoneResponse) -> Self {
        self.response = response;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Bodies overlapping the zone as of the last step.
    pub fn touching(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.touching.iter().copied()
    }

    pub fn is_touching(&self, body: BodyId) -> bool {
        self.touching.contains(&body)
    }

    /// Whether a solid zone pushes against `body`.
    pub(crate) fn blocks(&self, body: BodyId) -> bool {
        self.response == ZoneResponse::Solid && !self.passing.contains(&body)
    }

    /// Toggle the zone. Switching off forgets every overlap without emitting
    /// events, so a body still inside on reactivation begins contact again.
    pub(crate) fn set_active(&mut self, active: bool) {
        if !active {
            self.touching.clear();
            self.passing.clear();
        } else if !self.active {
            self.armed = false;
        }
        self.active = active;
    }
}

/// Whether an overlap started or stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContactPhase {
    Begin,
    End,
}

/// A change in overlap between one zone and one body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactEvent {
    pub zone: ZoneId,
    pub body: BodyId,
    pub phase: ContactPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_shapes_are_rejected() {
        let z = Vec2::new(0.0f32, 0.0);
        assert_eq!(Zone::circle(z, 0.0).unwrap_err(), PhysicsError::InvalidZone);
        assert_eq!(Zone::circle(z, f32::NAN).unwrap_err(), PhysicsError::InvalidZone);
        assert_eq!(Zone::bounds(z, Vec2::new(1.0, 0.0)).unwrap_err(), PhysicsError::InvalidZone);
        assert!(Zone::bounds(z, Vec2::new(1.0, 1.0)).is_ok());
    }

    #[test]
    fn deactivation_forgets_overlaps() {
        let mut zone = Zone::circle(Vec2::new(0.0f32, 0.0), 1.0).unwrap();
        zone.touching.insert(BodyId(4));
        zone.set_active(false);
        assert!(!zone.is_touching(BodyId(4)));
        zone.set_active(true);
        assert!(zone.is_active());
        assert!(!zone.armed);
    }

    #[test]
    fn passing_bodies_are_not_blocked() {
        let mut zone = Zone::circle(Vec2::new(0.0f32, 0.0), 1.0).unwrap().with_response(ZoneResponse::Solid);
        zone.passing.insert(BodyId(2));
        assert!(zone.blocks(BodyId(1)));
        assert!(!zone.blocks(BodyId(2)));
        zone.set_active(false);
        assert!(zone.blocks(BodyId(2)));
    }

    #[test]
    fn events_order_by_zone_then_body() {
        let e = |z, b| ContactEvent { zone: ZoneId(z), body: BodyId(b), phase: ContactPhase::Begin };
        let mut events = [e(1, 0), e(0, 3), e(0, 1)];
        events.sort();
        assert_eq!(events, [e(0, 1), e(0, 3), e(1, 0)]);
    }
}
