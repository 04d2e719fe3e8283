//! The simulation arena: bodies, joints, zones and the fixed-step loop.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec as AllocVec;
use core::fmt;

use tracing::{debug, trace};

use crate::body::{Body, BodyId, BodySnapshot};
use crate::collision::{apply_drag, begin_step, detect_contacts, publish_contacts, Contact};
use crate::config::WorldConfig;
use crate::error::PhysicsError;
use crate::float::Float;
use crate::joint::{AnchorTarget, Joint, JointId};
use crate::observer::StepObserver;
use crate::solver::JointSolver;
use crate::vec::Vec2;
use crate::zone::{ContactEvent, Zone, ZoneId, ZoneResponse};

type ContactListener = Box<dyn FnMut(&ContactEvent)>;

/// Owns every body, joint and zone and advances them in fixed steps.
///
/// Bodies and zones live in dense arenas indexed by their ids and are never
/// removed. Joints are keyed by monotonically allocated ids and iterate in
/// id order, which fixes the solver order.
pub struct World<F: Float> {
    bodies: AllocVec<Body<F>>,
    joints: BTreeMap<JointId, Joint<F>>,
    next_joint: u32,
    zones: AllocVec<Zone<F>>,
    gravity_direction: Vec2<F>,
    gravity_magnitude: F,
    time: F,
    config: WorldConfig<F>,
    solver: JointSolver<F>,
    contacts: AllocVec<Contact<F>>,
    events: AllocVec<ContactEvent>,
    listeners: AllocVec<ContactListener>,
}

impl<F: Float> World<F> {
    /// Empty world with gravity pointing down at unit magnitude.
    pub fn new(config: WorldConfig<F>) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(World {
            bodies: AllocVec::new(),
            joints: BTreeMap::new(),
            next_joint: 0,
            zones: AllocVec::new(),
            gravity_direction: Vec2::new(F::zero(), -F::one()),
            gravity_magnitude: F::one(),
            time: F::zero(),
            solver: JointSolver::from_config(&config),
            config,
            contacts: AllocVec::new(),
            events: AllocVec::new(),
            listeners: AllocVec::new(),
        })
    }

    pub fn config(&self) -> &WorldConfig<F> {
        &self.config
    }

    // --- bodies ---

    pub fn add_body(&mut self, body: Body<F>) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(body);
        id
    }

    pub fn body(&self, id: BodyId) -> Option<&Body<F>> {
        self.bodies.get(id.index())
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body<F>> {
        self.bodies.get_mut(id.index())
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Read-only pose of every body, in id order, for drawing.
    pub fn bodies(&self) -> AllocVec<BodySnapshot<F>> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(i, b)| BodySnapshot {
                id: BodyId(i as u32),
                position: b.position,
                angle: b.angle,
                half_extents: b.half_extents,
            })
            .collect()
    }

    /// Total kinetic energy of the dynamic bodies.
    pub fn kinetic_energy(&self) -> F {
        self.bodies.iter().fold(F::zero(), |acc, b| acc + b.kinetic_energy())
    }

    // --- joints ---

    /// Register a joint after checking its bodies and parameters.
    ///
    /// A limited pin without a reference angle takes the bodies' current
    /// relative rotation as its rest configuration.
    pub fn add_joint(&mut self, joint: impl Into<Joint<F>>) -> Result<JointId, PhysicsError> {
        let mut joint = joint.into();
        joint.validate(self.bodies.len())?;
        if let Joint::LimitedPin(pin) = &mut joint {
            if pin.reference_angle.is_none() {
                let rest = self.bodies[pin.body_b.index()].angle - self.bodies[pin.body_a.index()].angle;
                pin.reference_angle = Some(rest);
            }
        }
        let id = JointId(self.next_joint);
        self.next_joint += 1;
        debug!(joint = %id, "joint added");
        self.joints.insert(id, joint);
        Ok(id)
    }

    /// Remove a joint and hand it back. Other joints never refer to joints,
    /// so nothing is left dangling.
    pub fn remove_joint(&mut self, id: JointId) -> Result<Joint<F>, PhysicsError> {
        let joint = self.joints.remove(&id).ok_or(PhysicsError::UnknownJoint(id))?;
        debug!(joint = %id, "joint removed");
        Ok(joint)
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint<F>> {
        self.joints.get(&id)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Live joint ids in solver order.
    pub fn joint_ids(&self) -> impl Iterator<Item = JointId> + '_ {
        self.joints.keys().copied()
    }

    /// Current gap between the two points a joint holds together.
    pub fn joint_separation(&self, id: JointId) -> Option<F> {
        self.joints.get(&id).map(|j| j.separation(&self.bodies))
    }

    /// Move the world point a point anchor pins its body to.
    pub fn set_anchor_point(&mut self, id: JointId, point: Vec2<F>) -> Result<(), PhysicsError> {
        match self.joints.get_mut(&id) {
            Some(Joint::Anchor(anchor)) => match &mut anchor.target {
                AnchorTarget::Point(p) => {
                    *p = point;
                    Ok(())
                }
                AnchorTarget::Body { .. } => Err(PhysicsError::InvalidConfig("anchor follows a body")),
            },
            Some(Joint::LimitedPin(_)) => Err(PhysicsError::InvalidConfig("joint is not an anchor")),
            None => Err(PhysicsError::UnknownJoint(id)),
        }
    }

    // --- zones ---

    pub fn add_zone(&mut self, zone: Zone<F>) -> Result<ZoneId, PhysicsError> {
        zone.shape.validate()?;
        let id = ZoneId(self.zones.len() as u32);
        self.zones.push(zone);
        Ok(id)
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone<F>> {
        self.zones.get(id.index())
    }

    /// Switch a zone on or off. Switching off drops its overlap set, so
    /// bodies still inside when it comes back fire a fresh `Begin`.
    pub fn set_zone_active(&mut self, id: ZoneId, active: bool) -> Result<(), PhysicsError> {
        let zone = self.zones.get_mut(id.index()).ok_or(PhysicsError::UnknownZone(id))?;
        if zone.active != active {
            debug!(zone = %id, active, "zone toggled");
        }
        zone.set_active(active);
        Ok(())
    }

    pub fn set_zone_response(&mut self, id: ZoneId, response: ZoneResponse) -> Result<(), PhysicsError> {
        let zone = self.zones.get_mut(id.index()).ok_or(PhysicsError::UnknownZone(id))?;
        zone.response = response;
        Ok(())
    }

    // --- gravity ---

    /// Direction only; the magnitude is kept separately.
    pub fn set_gravity_direction(&mut self, direction: Vec2<F>) {
        self.gravity_direction = direction;
    }

    /// Scalar applied to the direction. Zero switches gravity off.
    pub fn set_gravity_magnitude(&mut self, magnitude: F) {
        self.gravity_magnitude = magnitude;
    }

    pub fn gravity_direction(&self) -> Vec2<F> {
        self.gravity_direction
    }

    pub fn gravity_magnitude(&self) -> F {
        self.gravity_magnitude
    }

    /// Acceleration applied to every dynamic body.
    pub fn gravity(&self) -> Vec2<F> {
        self.gravity_direction * self.gravity_magnitude
    }

    // --- events ---

    /// Subscribe to contact events. Listeners run at the end of each step,
    /// once per event, in registration order.
    ///
    /// [`Simulation`](crate::Simulation) does not listen here; it hands
    /// [`contact_events`](Self::contact_events) to the grasp machine itself.
    pub fn on_contact_event(&mut self, listener: impl FnMut(&ContactEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Events produced by the most recent step, ordered by zone then body.
    pub fn contact_events(&self) -> &[ContactEvent] {
        &self.events
    }

    pub fn time(&self) -> F {
        self.time
    }

    /// Advance the world by `dt`.
    ///
    /// Each sub-step applies gravity, integrates, gathers zone contacts and
    /// solves joints and contacts together. Limits are then settled, drag
    /// runs once, and the step's contact events go out to listeners and the
    /// observer.
    pub fn step<O: StepObserver>(&mut self, dt: F, observer: &mut O) {
        debug_assert!(dt > F::zero(), "step requires a positive dt");
        self.events.clear();
        begin_step(&mut self.zones);

        let sub_dt = dt / F::from_f32(self.config.sub_steps as f32);
        let gravity = self.gravity();
        // Anything slower than two sub-steps of free fall rests instead of bouncing.
        let bounce_threshold = F::two() * gravity.length() * sub_dt;

        for _ in 0..self.config.sub_steps {
            for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
                let weight = gravity * body.mass;
                body.apply_force(weight);
            }

            for body in self.bodies.iter_mut() {
                body.integrate(sub_dt);
            }
            observer.on_integrate();

            detect_contacts(&mut self.zones, &self.bodies, &mut self.contacts);
            self.solver.solve(
                &mut self.bodies,
                &self.joints,
                &self.contacts,
                sub_dt,
                bounce_threshold,
                observer,
            );
        }
        self.contacts.clear();

        self.solver.settle_limits(&mut self.bodies, &self.joints);
        apply_drag(&mut self.bodies, self.config.linear_drag, self.config.angular_drag, dt);
        publish_contacts(&mut self.zones, self.bodies.len(), &mut self.events);

        for event in self.events.iter() {
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
            observer.on_contact(event);
        }

        self.time += dt;
        trace!(time = self.time.to_f64(), events = self.events.len(), "world stepped");
        observer.on_step_complete();
    }
}

impl<F: Float> fmt::Debug for World<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.len())
            .field("joints", &self.joints.len())
            .field("zones", &self.zones.len())
            .field("gravity", &self.gravity())
            .field("time", &self.time)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::joint::AnchorJoint;
    use crate::observer::NoOpStepObserver;
    use crate::zone::ContactPhase;

    fn world() -> World<f64> {
        World::new(WorldConfig::new().without_drag()).unwrap()
    }

    fn rod(x: f64, y: f64) -> Body<f64> {
        Body::new(Vec2::new(x, y), Vec2::new(0.05, 0.5), 1.0).unwrap()
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = World::<f32>::new(WorldConfig::new().with_iterations(0)).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidConfig(_)));
    }

    #[test]
    fn joint_ids_are_never_reused() {
        let mut w = world();
        let b = w.add_body(rod(0.0, 0.0));
        let first = w.add_joint(AnchorJoint::new(b, Vec2::zero(), Vec2::zero())).unwrap();
        w.remove_joint(first).unwrap();
        let second = w.add_joint(AnchorJoint::new(b, Vec2::zero(), Vec2::zero())).unwrap();
        assert_ne!(first, second);
        assert_eq!(w.remove_joint(first).unwrap_err(), PhysicsError::UnknownJoint(first));
    }

    #[test]
    fn free_body_falls_with_gravity() {
        let mut w = World::new(WorldConfig::new().without_drag().with_sub_steps(1)).unwrap();
        let b = w.add_body(rod(0.0, 0.0));
        w.set_gravity_magnitude(10.0);
        w.step(0.1, &mut NoOpStepObserver);
        let body = w.body(b).unwrap();
        assert!((body.velocity.y + 1.0).abs() < 1e-12);
        assert!((body.position.y + 0.1).abs() < 1e-12);
        assert!((w.time() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn sub_steps_approach_the_exact_fall() {
        let mut w = world();
        let b = w.add_body(rod(0.0, 0.0));
        w.set_gravity_magnitude(10.0);
        w.step(0.1, &mut NoOpStepObserver);
        let body = w.body(b).unwrap();
        // semi-implicit Euler over n sub-steps falls g t² (n + 1) / 2n
        let n = w.config().sub_steps as f64;
        let expected = -10.0 * 0.01 * (n + 1.0) / (2.0 * n);
        assert_abs_diff_eq!(body.velocity.y, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.position.y, expected, epsilon = 1e-9);
    }

    #[test]
    fn floor_stops_a_falling_body() {
        let mut w = world();
        w.add_zone(Zone::bounds(Vec2::new(-10.0, -1.0), Vec2::new(10.0, 10.0)).unwrap()).unwrap();
        let b = w.add_body(Body::new(Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5), 1.0).unwrap());
        w.set_gravity_magnitude(10.0);
        for _ in 0..120 {
            w.step(1.0 / 60.0, &mut NoOpStepObserver);
        }
        let body = w.body(b).unwrap();
        assert!(body.position.y > -0.5 - 1e-3, "sank to {}", body.position.y);
        assert!(body.velocity.length() < 0.1);
    }

    #[test]
    fn reactivated_zone_begins_again() {
        let mut w = world();
        let zone = w.add_zone(Zone::circle(Vec2::new(0.0, 0.0), 1.0).unwrap()).unwrap();
        let b = w.add_body(Body::kinematic(Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5)).unwrap());
        w.step(0.01, &mut NoOpStepObserver);
        assert_eq!(w.contact_events(), [ContactEvent { zone, body: b, phase: ContactPhase::Begin }]);
        w.step(0.01, &mut NoOpStepObserver);
        assert!(w.contact_events().is_empty());

        w.set_zone_active(zone, false).unwrap();
        w.step(0.01, &mut NoOpStepObserver);
        assert!(w.contact_events().is_empty());
        w.set_zone_active(zone, true).unwrap();
        w.step(0.01, &mut NoOpStepObserver);
        assert_eq!(w.contact_events(), [ContactEvent { zone, body: b, phase: ContactPhase::Begin }]);
    }

    #[test]
    fn set_anchor_point_only_on_point_anchors() {
        let mut w = world();
        let a = w.add_body(rod(0.0, 0.0));
        let b = w.add_body(rod(1.0, 0.0));
        let anchor = w.add_joint(AnchorJoint::new(a, Vec2::zero(), Vec2::zero())).unwrap();
        let follow = w.add_joint(AnchorJoint::to_body(a, Vec2::zero(), b, Vec2::zero())).unwrap();
        assert!(w.set_anchor_point(anchor, Vec2::new(2.0, 2.0)).is_ok());
        assert!(w.set_anchor_point(follow, Vec2::new(2.0, 2.0)).is_err());
    }

    #[test]
    fn zone_toggles_reject_unknown_ids() {
        let mut w = world();
        assert_eq!(w.set_zone_active(ZoneId(0), true), Err(PhysicsError::UnknownZone(ZoneId(0))));
    }
}
