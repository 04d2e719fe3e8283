//! Zone overlap tests, solid contacts and drag.
//!
//! Contacts are gathered once per sub-step, before the solver runs, and
//! handed to it as one-sided constraints. Overlaps seen in any sub-step
//! count towards the step's begin/end events.

use alloc::vec::Vec as AllocVec;

use crate::body::{Body, BodyId};
use crate::float::Float;
use crate::vec::Vec2;
use crate::zone::{ContactEvent, ContactPhase, Zone, ZoneId, ZoneShape};

/// Penetration of a body into a solid surface.
#[derive(Copy, Clone, Debug)]
struct Penetration<F: Float> {
    /// Direction the body must move to separate.
    normal: Vec2<F>,
    depth: F,
    /// World point on the body that is too deep.
    point: Vec2<F>,
}

/// A point on a body held on the open side of a solid surface for one
/// sub-step.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Contact<F: Float> {
    body: BodyId,
    local_point: Vec2<F>,
    normal: Vec2<F>,
    /// Position of the surface along `normal`.
    plane: F,
    /// Normal speed of the point before the solver ran; negative approaches.
    approach: F,
}

impl<F: Float> Contact<F> {
    fn new(body_id: BodyId, body: &Body<F>, hit: Penetration<F>) -> Self {
        Contact {
            body: body_id,
            local_point: body.local_point(hit.point),
            normal: hit.normal,
            plane: hit.point.dot(hit.normal) + hit.depth,
            approach: body.velocity_at(hit.point).dot(hit.normal),
        }
    }

    /// Move the point back onto the surface if it has sunk below it.
    pub(crate) fn project(&self, bodies: &mut [Body<F>]) {
        let body = &mut bodies[self.body.index()];
        let point = body.world_point(self.local_point);
        let depth = self.plane - point.dot(self.normal);
        if depth <= F::zero() {
            return;
        }
        let w = body.inverse_mass_at(point, self.normal);
        if w.is_near_zero(F::from_f32(1e-12)) {
            return;
        }
        body.apply_correction(point, self.normal * (depth / w));
    }

    /// Set the point's normal speed after projection: a bounce of
    /// `restitution` times the approach speed when it hit faster than
    /// `threshold`, rest when slower, and its own speed if it was leaving.
    pub(crate) fn resolve_velocity(&self, bodies: &mut [Body<F>], restitution: F, threshold: F) {
        let body = &mut bodies[self.body.index()];
        let point = body.world_point(self.local_point);
        let speed = body.velocity_at(point).dot(self.normal);
        let target = if self.approach >= F::zero() {
            self.approach
        } else if self.approach < -threshold {
            -restitution * self.approach
        } else {
            F::zero()
        };
        let w = body.inverse_mass_at(point, self.normal);
        if w.is_near_zero(F::from_f32(1e-12)) {
            return;
        }
        body.apply_impulse(point, self.normal * ((target - speed) / w));
    }
}

/// Whether `body` overlaps the zone's shape.
pub fn overlaps<F: Float>(shape: &ZoneShape<F>, body: &Body<F>) -> bool {
    match *shape {
        ZoneShape::Bounds { min, max } => {
            let mut any = false;
            bounds_penetrations(body, min, max, |_| any = true);
            any
        }
        ZoneShape::Circle { center, radius } => circle_penetration(body, center, radius).is_some(),
    }
}

/// Every corner beyond each of the four edges.
fn bounds_penetrations<F: Float>(
    body: &Body<F>,
    min: Vec2<F>,
    max: Vec2<F>,
    mut emit: impl FnMut(Penetration<F>),
) {
    let corners = body.corners();
    let edges = [
        (Vec2::new(F::one(), F::zero()), min.x),
        (Vec2::new(-F::one(), F::zero()), -max.x),
        (Vec2::new(F::zero(), F::one()), min.y),
        (Vec2::new(F::zero(), -F::one()), -max.y),
    ];
    for (normal, offset) in edges {
        for &corner in corners.iter() {
            let depth = offset - corner.dot(normal);
            if depth > F::zero() {
                emit(Penetration { normal, depth, point: corner });
            }
        }
    }
}

fn circle_penetration<F: Float>(body: &Body<F>, center: Vec2<F>, radius: F) -> Option<Penetration<F>> {
    let local = body.local_point(center);
    let h = body.half_extents;
    let closest = Vec2::new(local.x.clamp(-h.x, h.x), local.y.clamp(-h.y, h.y));
    let gap = local - closest;
    let dist_sq = gap.length_sq();

    let (normal_local, depth, point_local) = if dist_sq > F::from_f32(1e-12) {
        let dist = dist_sq.sqrt();
        if dist >= radius {
            return None;
        }
        (-gap.scale(F::one() / dist), radius - dist, closest)
    } else {
        // Centre inside the box: leave through the nearest face.
        let sign = |v: F| if v >= F::zero() { F::one() } else { -F::one() };
        let gap_x = h.x - local.x.abs();
        let gap_y = h.y - local.y.abs();
        if gap_x < gap_y {
            let s = sign(local.x);
            (Vec2::new(-s, F::zero()), radius + gap_x, Vec2::new(s * h.x, local.y))
        } else {
            let s = sign(local.y);
            (Vec2::new(F::zero(), -s), radius + gap_y, Vec2::new(local.x, s * h.y))
        }
    };

    Some(Penetration {
        normal: normal_local.rotate(body.angle),
        depth,
        point: body.world_point(point_local),
    })
}

/// Clear the per-step overlap sets before the first sub-step.
pub(crate) fn begin_step<F: Float>(zones: &mut [Zone<F>]) {
    for zone in zones.iter_mut() {
        zone.overlapping.clear();
    }
}

/// Test every active zone against every body for one sub-step: record
/// overlaps, and collect a contact for each solid penetration of a
/// dynamic body.
///
/// The first look after a circle switches on marks the bodies already
/// inside it as passing.
pub(crate) fn detect_contacts<F: Float>(
    zones: &mut [Zone<F>],
    bodies: &[Body<F>],
    contacts: &mut AllocVec<Contact<F>>,
) {
    contacts.clear();
    for zone in zones.iter_mut().filter(|z| z.active) {
        let arming = !zone.armed;
        for (index, body) in bodies.iter().enumerate() {
            let id = BodyId(index as u32);
            match zone.shape {
                ZoneShape::Bounds { min, max } => {
                    let mut hit = false;
                    let collect = body.is_dynamic() && zone.blocks(id);
                    bounds_penetrations(body, min, max, |p| {
                        hit = true;
                        if collect {
                            contacts.push(Contact::new(id, body, p));
                        }
                    });
                    if hit {
                        zone.overlapping.insert(id);
                    }
                }
                ZoneShape::Circle { center, radius } => {
                    let Some(p) = circle_penetration(body, center, radius) else {
                        continue;
                    };
                    zone.overlapping.insert(id);
                    if arming {
                        zone.passing.insert(id);
                    }
                    if body.is_dynamic() && zone.blocks(id) {
                        contacts.push(Contact::new(id, body, p));
                    }
                }
            }
        }
        zone.armed = true;
    }
}

/// Compare the overlaps seen during the step with the previous step and
/// append begin/end events. Zones go in id order and bodies in id order,
/// so `events` comes out sorted by zone then body.
pub(crate) fn publish_contacts<F: Float>(
    zones: &mut [Zone<F>],
    body_count: usize,
    events: &mut AllocVec<ContactEvent>,
) {
    for (zone_index, zone) in zones.iter_mut().enumerate() {
        if !zone.active {
            continue;
        }
        let zone_id = ZoneId(zone_index as u32);
        for body_index in 0..body_count {
            let body = BodyId(body_index as u32);
            let overlapping = zone.overlapping.contains(&body);
            let was_touching = zone.touching.contains(&body);
            if overlapping && !was_touching {
                zone.touching.insert(body);
                events.push(ContactEvent { zone: zone_id, body, phase: ContactPhase::Begin });
            } else if !overlapping && was_touching {
                zone.touching.remove(&body);
                zone.passing.remove(&body);
                events.push(ContactEvent { zone: zone_id, body, phase: ContactPhase::End });
            }
        }
    }
}

/// Air resistance on every dynamic body, whether or not it touches anything.
pub(crate) fn apply_drag<F: Float>(bodies: &mut [Body<F>], linear: F, angular: F, dt: F) {
    let linear_factor = F::one() / (F::one() + linear * dt);
    let angular_factor = F::one() / (F::one() + angular * dt);
    for body in bodies.iter_mut().filter(|b| b.is_dynamic()) {
        body.velocity = body.velocity * linear_factor;
        body.angular_velocity *= angular_factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::zone::ZoneResponse;

    fn block(x: f64, y: f64) -> Body<f64> {
        Body::new(Vec2::new(x, y), Vec2::new(1.0, 1.0), 1.0).unwrap()
    }

    fn floor() -> Zone<f64> {
        Zone::bounds(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)).unwrap()
    }

    #[test]
    fn circle_touching_corner_region() {
        let b = block(0.0, 0.0);
        assert!(circle_penetration(&b, Vec2::new(1.5, 1.5), 0.8).is_some());
        assert!(circle_penetration(&b, Vec2::new(1.5, 1.5), 0.6).is_none());
    }

    #[test]
    fn overlap_means_outside_bounds_or_inside_circle() {
        let bounds = ZoneShape::Bounds { min: Vec2::new(0.0, 0.0), max: Vec2::new(10.0, 10.0) };
        assert!(!overlaps(&bounds, &block(5.0, 5.0)));
        assert!(overlaps(&bounds, &block(9.5, 5.0).with_angle(0.3)));
        let circle = ZoneShape::Circle { center: Vec2::new(5.0, 5.0), radius: 1.0 };
        assert!(overlaps(&circle, &block(6.5, 5.0)));
        assert!(!overlaps(&circle, &block(8.0, 5.0)));
    }

    #[test]
    fn circle_centre_inside_box_pushes_out_nearest_face() {
        let b = block(0.0, 0.0);
        let hit = circle_penetration(&b, Vec2::new(0.0, 0.9), 0.5).unwrap();
        assert!((hit.normal.y + 1.0).abs() < 1e-9);
        assert!((hit.depth - 0.6).abs() < 1e-9);
    }

    #[test]
    fn both_low_corners_contact_the_floor() {
        let mut zones = [floor()];
        let bodies = [block(5.0, 0.5)];
        let mut contacts = AllocVec::new();
        detect_contacts(&mut zones, &bodies, &mut contacts);
        assert_eq!(contacts.len(), 2);
        assert!(zones[0].overlapping.contains(&BodyId(0)));

        let mut bodies = bodies;
        contacts[0].project(&mut bodies);
        contacts[1].project(&mut bodies);
        assert!(bodies[0].position.y > 0.9);
    }

    #[test]
    fn fast_approach_bounces_slow_one_rests() {
        let mut zones = [floor()];
        let fast = [block(5.0, 0.9).with_velocity(Vec2::new(0.0, -10.0), 0.0)];
        let mut contacts = AllocVec::new();
        detect_contacts(&mut zones, &fast, &mut contacts);
        let mut bodies = fast;
        for _ in 0..20 {
            for contact in contacts.iter() {
                contact.resolve_velocity(&mut bodies, 0.5, 1.0);
            }
        }
        assert!(bodies[0].velocity.y > 0.0, "should bounce, got {}", bodies[0].velocity.y);

        let slow = [block(5.0, 0.9).with_velocity(Vec2::new(0.0, -0.5), 0.0)];
        detect_contacts(&mut zones, &slow, &mut contacts);
        let mut bodies = slow;
        for _ in 0..20 {
            for contact in contacts.iter() {
                contact.resolve_velocity(&mut bodies, 0.5, 1.0);
            }
        }
        assert!(bodies[0].velocity.y.abs() < 1e-9);
    }

    #[test]
    fn circle_lets_out_bodies_inside_at_switch_on() {
        let circle = Zone::circle(Vec2::new(0.0, 0.0), 0.5).unwrap().with_response(ZoneResponse::Solid);
        let mut zones = [circle];
        let inside = [block(0.0, 0.0)];
        let mut contacts = AllocVec::new();
        detect_contacts(&mut zones, &inside, &mut contacts);
        assert!(contacts.is_empty());
        assert!(zones[0].passing.contains(&BodyId(0)));

        let mut events = AllocVec::new();
        publish_contacts(&mut zones, 1, &mut events);
        assert_eq!(events[0].phase, ContactPhase::Begin);

        // once clear, the body is blocked again on its way back
        begin_step(&mut zones);
        detect_contacts(&mut zones, &[block(5.0, 0.0)], &mut contacts);
        publish_contacts(&mut zones, 1, &mut events);
        assert!(zones[0].passing.is_empty());
        detect_contacts(&mut zones, &inside, &mut contacts);
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn kinematic_bodies_overlap_without_contacts() {
        let mut zones = [floor()];
        let bodies = [Body::kinematic(Vec2::new(5.0, 0.5), Vec2::new(1.0, 1.0)).unwrap()];
        let mut contacts = AllocVec::new();
        detect_contacts(&mut zones, &bodies, &mut contacts);
        assert!(contacts.is_empty());
        assert!(zones[0].overlapping.contains(&BodyId(0)));
    }

    #[test]
    fn drag_slows_dynamic_bodies_only() {
        let mut bodies = [
            block(0.0, 0.0).with_velocity(Vec2::new(2.0, 0.0), 1.0),
            Body::kinematic(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)).unwrap().with_velocity(Vec2::new(2.0, 0.0), 0.0),
        ];
        apply_drag(&mut bodies, 1.0, 1.0, 0.5);
        assert_relative_eq!(bodies[0].velocity.x, 2.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(bodies[0].angular_velocity, 1.0 / 1.5, epsilon = 1e-12);
        assert_eq!(bodies[1].velocity.x, 2.0);
    }
}
