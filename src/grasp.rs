//! Release and re-catch cycle of the hands on the bar.
//!
//! ```text
//! Grasping --release--> Falling --End(bar, any body)--> FreeOfBar
//!                                 or nothing on the bar     |
//!     ^                                                     |
//!     +---- batch ends ---- Reattaching <--Begin(bar, hand)-+
//! ```
//!
//! The detour through `FreeOfBar` keeps the overlap that exists at the moment
//! of release from being read as an immediate re-catch.

use alloc::vec::Vec as AllocVec;

use tracing::debug;

use crate::body::BodyId;
use crate::error::PhysicsError;
use crate::float::Float;
use crate::joint::{AnchorJoint, JointId};
use crate::vec::Vec2;
use crate::world::World;
use crate::zone::{ContactEvent, ContactPhase, ZoneId, ZoneResponse};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GraspState {
    /// Both hands pinned to the bar.
    Grasping,
    /// Just let go; some part of the figure may still overlap the bar.
    Falling,
    /// Clear of the bar at least once since release.
    FreeOfBar,
    /// A hand has touched the bar; the grip is restored when the current
    /// event batch finishes.
    Reattaching,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspTransition {
    pub from: GraspState,
    pub to: GraspState,
}

/// World handles the state machine operates on.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspConfig<F: Float> {
    pub bar_zone: ZoneId,
    pub bounds_zone: ZoneId,
    pub hands: [BodyId; 2],
    /// Grip point in each hand's local frame.
    pub hand_offset: Vec2<F>,
    pub bar_point: Vec2<F>,
}

#[derive(Clone, Debug)]
pub struct GraspStateMachine<F: Float> {
    config: GraspConfig<F>,
    state: GraspState,
    hand_joints: Option<[JointId; 2]>,
}

impl<F: Float> GraspStateMachine<F> {
    /// Pin both hands to the bar and start in `Grasping`, with the bar and
    /// the bounds switched off.
    pub fn attach(world: &mut World<F>, config: GraspConfig<F>) -> Result<Self, PhysicsError> {
        for zone in [config.bar_zone, config.bounds_zone] {
            world.zone(zone).ok_or(PhysicsError::UnknownZone(zone))?;
        }
        for hand in config.hands {
            world.body(hand).ok_or(PhysicsError::UnknownBody(hand))?;
        }
        let mut machine = GraspStateMachine { config, state: GraspState::Grasping, hand_joints: None };
        machine.grip(world)?;
        Ok(machine)
    }

    pub fn state(&self) -> GraspState {
        self.state
    }

    pub fn config(&self) -> &GraspConfig<F> {
        &self.config
    }

    /// Anchor joints currently holding the hands, if grasping.
    pub fn hand_joints(&self) -> Option<[JointId; 2]> {
        self.hand_joints
    }

    pub fn is_hand(&self, body: BodyId) -> bool {
        self.config.hands.contains(&body)
    }

    /// The non-dominant limbs are drawn only while off the bar.
    pub fn opposite_side_visible(&self) -> bool {
        self.state != GraspState::Grasping
    }

    /// Let go of the bar. Ignored unless grasping.
    pub fn on_release(&mut self, world: &mut World<F>) -> Option<GraspTransition> {
        if self.state != GraspState::Grasping {
            return None;
        }
        if let Some(joints) = self.hand_joints.take() {
            for id in joints {
                // Already gone is the state we want.
                let _ = world.remove_joint(id);
            }
        }
        // Zone ids were checked in `attach` and zones are never removed.
        let _ = world.set_zone_response(self.config.bar_zone, ZoneResponse::Solid);
        let _ = world.set_zone_active(self.config.bar_zone, true);
        let _ = world.set_zone_active(self.config.bounds_zone, true);
        Some(self.transition(GraspState::Falling))
    }

    /// React to one contact event. Only the bar zone matters, and only a
    /// hand can start a re-catch.
    pub fn on_contact(&mut self, event: &ContactEvent) -> Option<GraspTransition> {
        if event.zone != self.config.bar_zone {
            return None;
        }
        match (self.state, event.phase) {
            (GraspState::Falling, ContactPhase::End) => Some(self.transition(GraspState::FreeOfBar)),
            (GraspState::FreeOfBar, ContactPhase::Begin) if self.is_hand(event.body) => {
                Some(self.transition(GraspState::Reattaching))
            }
            _ => None,
        }
    }

    /// Feed one step's events in order, then finish a pending re-catch.
    ///
    /// A fall that ends the step with nothing overlapping the bar counts as
    /// clear of it, since no `End` will arrive for a release made outside
    /// the bar.
    pub fn process(&mut self, world: &mut World<F>, events: &[ContactEvent]) -> AllocVec<GraspTransition> {
        let mut transitions: AllocVec<GraspTransition> =
            events.iter().filter_map(|event| self.on_contact(event)).collect();

        if self.state == GraspState::Falling && !self.bar_overlapped(world) {
            transitions.push(self.transition(GraspState::FreeOfBar));
        }

        if self.state == GraspState::Reattaching {
            match self.grip(world) {
                Ok(()) => transitions.push(self.transition(GraspState::Grasping)),
                Err(err) => {
                    debug!(error = %err, "re-catch failed");
                    transitions.push(self.transition(GraspState::FreeOfBar));
                }
            }
        }
        transitions
    }

    fn bar_overlapped(&self, world: &World<F>) -> bool {
        world
            .zone(self.config.bar_zone)
            .is_some_and(|zone| zone.touching().next().is_some())
    }

    /// Create both hand anchors at the bar and switch the bar and bounds off.
    fn grip(&mut self, world: &mut World<F>) -> Result<(), PhysicsError> {
        let [left, right] = self.config.hands;
        let offset = self.config.hand_offset;
        let bar = self.config.bar_point;
        let first = world.add_joint(AnchorJoint::new(left, offset, bar))?;
        let second = match world.add_joint(AnchorJoint::new(right, offset, bar)) {
            Ok(id) => id,
            Err(err) => {
                let _ = world.remove_joint(first);
                return Err(err);
            }
        };
        self.hand_joints = Some([first, second]);
        world.set_zone_active(self.config.bar_zone, false)?;
        world.set_zone_active(self.config.bounds_zone, false)?;
        Ok(())
    }

    fn transition(&mut self, to: GraspState) -> GraspTransition {
        let from = self.state;
        self.state = to;
        debug!(?from, ?to, "grasp transition");
        GraspTransition { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::config::WorldConfig;
    use crate::observer::NoOpStepObserver;
    use crate::zone::Zone;

    fn setup() -> (World<f64>, GraspStateMachine<f64>) {
        let mut world = World::new(WorldConfig::new()).unwrap();
        let bounds = world.add_zone(Zone::bounds(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0)).unwrap()).unwrap();
        let bar = world.add_zone(Zone::circle(Vec2::new(50.0, 80.0), 5.0).unwrap()).unwrap();
        let he = Vec2::new(2.0, 10.0);
        let left = world.add_body(Body::new(Vec2::new(50.0, 70.0), he, 1.0).unwrap());
        let right = world.add_body(Body::new(Vec2::new(50.0, 70.0), he, 1.0).unwrap());
        let config = GraspConfig {
            bar_zone: bar,
            bounds_zone: bounds,
            hands: [left, right],
            hand_offset: Vec2::new(0.0, 10.0),
            bar_point: Vec2::new(50.0, 80.0),
        };
        let machine = GraspStateMachine::attach(&mut world, config).unwrap();
        (world, machine)
    }

    fn bar_event(machine: &GraspStateMachine<f64>, body: u32, phase: ContactPhase) -> ContactEvent {
        ContactEvent { zone: machine.config().bar_zone, body: BodyId(body), phase }
    }

    #[test]
    fn attach_pins_hands_and_disables_zones() {
        let (world, machine) = setup();
        assert_eq!(machine.state(), GraspState::Grasping);
        assert_eq!(world.joint_count(), 2);
        assert!(!world.zone(machine.config().bar_zone).unwrap().is_active());
        assert!(!world.zone(machine.config().bounds_zone).unwrap().is_active());
        assert!(!machine.opposite_side_visible());
    }

    #[test]
    fn release_only_from_grasping() {
        let (mut world, mut machine) = setup();
        assert!(machine.on_release(&mut world).is_some());
        assert!(machine.on_release(&mut world).is_none());
        assert_eq!(world.joint_count(), 0);
        assert!(machine.opposite_side_visible());
    }

    #[test]
    fn begin_while_falling_is_ignored() {
        let (mut world, mut machine) = setup();
        machine.on_release(&mut world);
        let begin = bar_event(&machine, 0, ContactPhase::Begin);
        assert!(machine.on_contact(&begin).is_none());
        assert_eq!(machine.state(), GraspState::Falling);
    }

    #[test]
    fn non_hand_body_cannot_recatch() {
        let (mut world, mut machine) = setup();
        machine.on_release(&mut world);
        let end = bar_event(&machine, 0, ContactPhase::End);
        machine.on_contact(&end);
        assert_eq!(machine.state(), GraspState::FreeOfBar);
        let stranger = bar_event(&machine, 7, ContactPhase::Begin);
        assert!(machine.process(&mut world, &[stranger]).is_empty());
        assert_eq!(machine.state(), GraspState::FreeOfBar);
    }

    #[test]
    fn release_away_from_the_bar_is_already_clear() {
        let (mut world, mut machine) = setup();
        for hand in machine.config().hands {
            world.body_mut(hand).unwrap().position = Vec2::new(20.0, 40.0);
        }
        machine.on_release(&mut world);
        world.step(1.0 / 60.0, &mut NoOpStepObserver);
        assert!(world.contact_events().iter().all(|e| e.zone != machine.config().bar_zone));

        let events = AllocVec::from(world.contact_events());
        let transitions = machine.process(&mut world, &events);
        assert_eq!(transitions, [GraspTransition { from: GraspState::Falling, to: GraspState::FreeOfBar }]);
    }

    #[test]
    fn falling_waits_while_the_bar_is_overlapped() {
        let (mut world, mut machine) = setup();
        machine.on_release(&mut world);
        world.step(1.0 / 60.0, &mut NoOpStepObserver);
        let events = AllocVec::from(world.contact_events());
        assert!(machine.process(&mut world, &events).is_empty());
        assert_eq!(machine.state(), GraspState::Falling);
    }

    #[test]
    fn one_recatch_per_batch() {
        let (mut world, mut machine) = setup();
        machine.on_release(&mut world);
        machine.on_contact(&bar_event(&machine, 0, ContactPhase::End));
        let batch = [
            bar_event(&machine, 0, ContactPhase::Begin),
            bar_event(&machine, 1, ContactPhase::Begin),
        ];
        let transitions = machine.process(&mut world, &batch);
        assert_eq!(
            transitions,
            [
                GraspTransition { from: GraspState::FreeOfBar, to: GraspState::Reattaching },
                GraspTransition { from: GraspState::Reattaching, to: GraspState::Grasping },
            ]
        );
        assert_eq!(world.joint_count(), 2);
    }
}
