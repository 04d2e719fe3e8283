//! The limberjack: two arms and two legs on a shared torso.
//!
//! Each side is a chain hand → forearm → bicep → torso → thigh → shin joined
//! by limited pins. Both sides hang on the same vertical line with the same
//! limits, so the left and right limbs coincide at rest and, under the same
//! forces, move together as one chain of twice the mass. The two sides are
//! kept apart for drawing ([`Figure::visible`]) and for the hand re-catch.

use alloc::vec::Vec as AllocVec;
use core::f32::consts::PI;

use crate::body::{Body, BodyId};
use crate::error::PhysicsError;
use crate::float::Float;
use crate::joint::{JointId, LimitedPinJoint};
use crate::vec::Vec2;
use crate::world::World;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Limb {
    Hand,
    Forearm,
    Bicep,
    /// Shared by both sides.
    Torso,
    Thigh,
    Shin,
}

/// Allowed relative rotation of a joint, in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointLimits<F: Float> {
    pub lower: F,
    pub upper: F,
}

impl<F: Float> JointLimits<F> {
    pub fn new(lower: F, upper: F) -> Self {
        JointLimits { lower, upper }
    }

    /// Limits given as fractions of π.
    fn of_pi(lower: f32, upper: f32) -> Self {
        Self::new(F::from_f32(lower * PI), F::from_f32(upper * PI))
    }
}

/// Dimensions and joint behaviour of the figure. Lengths are in points.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FigureConfig<F: Float> {
    /// Where the hands grip, in world coordinates.
    pub bar_point: Vec2<F>,
    pub hand_length: F,
    pub forearm_length: F,
    pub bicep_length: F,
    pub torso_length: F,
    pub thigh_length: F,
    pub shin_length: F,
    pub limb_width: F,
    /// Mass per unit area.
    pub density: F,
    pub wrist: JointLimits<F>,
    pub elbow: JointLimits<F>,
    pub shoulder: JointLimits<F>,
    pub hip: JointLimits<F>,
    pub knee: JointLimits<F>,
    /// Friction torque on every limb joint.
    pub joint_friction: F,
    /// Side drawn at all times.
    pub dominant_side: Side,
}

impl<F: Float> FigureConfig<F> {
    pub fn new() -> Self {
        FigureConfig {
            bar_point: Vec2::new(F::from_f32(190.0), F::from_f32(600.0)),
            hand_length: F::from_f32(20.0),
            forearm_length: F::from_f32(60.0),
            bicep_length: F::from_f32(60.0),
            torso_length: F::from_f32(100.0),
            thigh_length: F::from_f32(70.0),
            shin_length: F::from_f32(70.0),
            limb_width: F::from_f32(4.0),
            density: F::from_f32(0.01),
            wrist: JointLimits::of_pi(-0.5, 0.5),
            elbow: JointLimits::of_pi(-0.9, 0.0),
            shoulder: JointLimits::of_pi(-0.95, 0.95),
            hip: JointLimits::of_pi(-0.9, 0.9),
            knee: JointLimits::of_pi(0.0, 0.9),
            joint_friction: F::from_f32(2000.0),
            dominant_side: Side::Right,
        }
    }

    pub fn with_bar_point(mut self, bar_point: Vec2<F>) -> Self {
        self.bar_point = bar_point;
        self
    }

    pub fn with_joint_friction(mut self, friction: F) -> Self {
        self.joint_friction = friction;
        self
    }

    pub fn with_dominant_side(mut self, side: Side) -> Self {
        self.dominant_side = side;
        self
    }

    fn length(&self, limb: Limb) -> F {
        match limb {
            Limb::Hand => self.hand_length,
            Limb::Forearm => self.forearm_length,
            Limb::Bicep => self.bicep_length,
            Limb::Torso => self.torso_length,
            Limb::Thigh => self.thigh_length,
            Limb::Shin => self.shin_length,
        }
    }
}

impl<F: Float> Default for FigureConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain order from the bar down.
const CHAIN: [Limb; 6] = [Limb::Hand, Limb::Forearm, Limb::Bicep, Limb::Torso, Limb::Thigh, Limb::Shin];

/// Handles to the bodies and pins of a built figure.
#[derive(Clone, Debug)]
pub struct Figure {
    /// Hand, forearm, bicep, thigh, shin per side.
    sides: [[BodyId; 5]; 2],
    torso: BodyId,
    pins: AllocVec<JointId>,
    dominant: Side,
}

impl Figure {
    /// Add the figure's bodies and limb joints to `world`, hanging straight
    /// down from the bar. Hand anchors are left to the grasp state machine.
    pub fn build<F: Float>(world: &mut World<F>, config: &FigureConfig<F>) -> Result<Figure, PhysicsError> {
        let x = config.bar_point.x;
        let mut top = config.bar_point.y;
        let mut centres = [F::zero(); 6];
        for (centre, limb) in centres.iter_mut().zip(CHAIN) {
            let length = config.length(limb);
            *centre = top - length * F::half();
            top -= length;
        }

        let add = |limb: Limb, world: &mut World<F>| -> Result<BodyId, PhysicsError> {
            let index = chain_index(limb);
            let length = config.length(limb);
            let half_extents = Vec2::new(config.limb_width * F::half(), length * F::half());
            let mass = config.limb_width * length * config.density;
            Ok(world.add_body(Body::new(Vec2::new(x, centres[index]), half_extents, mass)?))
        };

        let torso = add(Limb::Torso, world)?;
        let mut sides = [[torso; 5]; 2];
        for side in [Side::Left, Side::Right] {
            for (slot, limb) in sides[side.index()].iter_mut().zip(SIDE_LIMBS) {
                *slot = add(limb, world)?;
            }
        }

        let mut figure = Figure { sides, torso, pins: AllocVec::new(), dominant: config.dominant_side };
        for side in [Side::Left, Side::Right] {
            for (upper, lower, limits) in [
                (Limb::Hand, Limb::Forearm, config.wrist),
                (Limb::Forearm, Limb::Bicep, config.elbow),
                (Limb::Bicep, Limb::Torso, config.shoulder),
                (Limb::Torso, Limb::Thigh, config.hip),
                (Limb::Thigh, Limb::Shin, config.knee),
            ] {
                let pin = LimitedPinJoint::new(
                    figure.body(side, upper),
                    Vec2::new(F::zero(), -config.length(upper) * F::half()),
                    figure.body(side, lower),
                    Vec2::new(F::zero(), config.length(lower) * F::half()),
                    limits.lower,
                    limits.upper,
                )
                .with_friction(config.joint_friction);
                figure.pins.push(world.add_joint(pin)?);
            }
        }
        Ok(figure)
    }

    pub fn body(&self, side: Side, limb: Limb) -> BodyId {
        match side_index(limb) {
            Some(index) => self.sides[side.index()][index],
            None => self.torso,
        }
    }

    /// Left hand, right hand.
    pub fn hands(&self) -> [BodyId; 2] {
        [self.body(Side::Left, Limb::Hand), self.body(Side::Right, Limb::Hand)]
    }

    /// Grip point in a hand's local frame: its top end.
    pub fn hand_offset<F: Float>(config: &FigureConfig<F>) -> Vec2<F> {
        Vec2::new(F::zero(), config.hand_length * F::half())
    }

    pub fn torso(&self) -> BodyId {
        self.torso
    }

    /// Limb joints, two sides of five each.
    pub fn pins(&self) -> &[JointId] {
        &self.pins
    }

    pub fn side_of(&self, body: BodyId) -> Option<Side> {
        [Side::Left, Side::Right]
            .into_iter()
            .find(|side| self.sides[side.index()].contains(&body))
    }

    /// Whether a body should be drawn. The torso and the dominant side always
    /// are; the other side only while the figure is off the bar.
    pub fn visible(&self, body: BodyId, opposite_side_visible: bool) -> bool {
        match self.side_of(body) {
            Some(side) if side != self.dominant => opposite_side_visible,
            _ => true,
        }
    }
}

const SIDE_LIMBS: [Limb; 5] = [Limb::Hand, Limb::Forearm, Limb::Bicep, Limb::Thigh, Limb::Shin];

fn chain_index(limb: Limb) -> usize {
    CHAIN.iter().position(|&l| l == limb).unwrap_or(0)
}

fn side_index(limb: Limb) -> Option<usize> {
    SIDE_LIMBS.iter().position(|&l| l == limb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::joint::Joint;

    fn built() -> (World<f64>, Figure) {
        let mut world = World::new(WorldConfig::new()).unwrap();
        let figure = Figure::build(&mut world, &FigureConfig::new()).unwrap();
        (world, figure)
    }

    #[test]
    fn topology_counts() {
        let (world, figure) = built();
        assert_eq!(world.body_count(), 11);
        assert_eq!(world.joint_count(), 10);
        assert_eq!(figure.pins().len(), 10);
    }

    #[test]
    fn pins_start_closed() {
        let (world, figure) = built();
        for &pin in figure.pins() {
            let gap = world.joint_separation(pin).unwrap();
            assert!(gap < 1e-9, "{pin} starts open by {gap}");
        }
    }

    #[test]
    fn sides_coincide_at_rest() {
        let (world, figure) = built();
        for limb in SIDE_LIMBS {
            let left = world.body(figure.body(Side::Left, limb)).unwrap();
            let right = world.body(figure.body(Side::Right, limb)).unwrap();
            assert_eq!(left.position, right.position);
            assert_eq!(left.angle, right.angle);
        }
        for &id in figure.pins() {
            let Some(Joint::LimitedPin(pin)) = world.joint(id) else { panic!("{id} is not a limb pin") };
            assert_eq!(pin.reference_angle, Some(0.0));
        }
    }

    #[test]
    fn hand_tops_sit_on_the_bar() {
        let (world, figure) = built();
        let config = FigureConfig::<f64>::new();
        for hand in figure.hands() {
            let grip = world.body(hand).unwrap().world_point(Figure::hand_offset(&config));
            assert!(grip.distance(config.bar_point) < 1e-9);
        }
    }

    #[test]
    fn opposite_side_hidden_while_grasping() {
        let (_, figure) = built();
        let left_shin = figure.body(Side::Left, Limb::Shin);
        let right_shin = figure.body(Side::Right, Limb::Shin);
        assert!(!figure.visible(left_shin, false));
        assert!(figure.visible(left_shin, true));
        assert!(figure.visible(right_shin, false));
        assert!(figure.visible(figure.torso(), false));
    }

    #[test]
    fn zero_density_rejected() {
        let mut world = World::<f32>::new(WorldConfig::new()).unwrap();
        let config = FigureConfig { density: 0.0, ..FigureConfig::new() };
        assert_eq!(Figure::build(&mut world, &config).unwrap_err(), PhysicsError::InvalidMass);
    }
}
