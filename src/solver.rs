//! Iterative joint and contact solver.

use alloc::collections::BTreeMap;

use crate::body::Body;
use crate::collision::Contact;
use crate::config::WorldConfig;
use crate::float::Float;
use crate::joint::{Joint, JointId};
use crate::observer::StepObserver;

/// Upper bound on the limit-only sweeps that close a step.
const MAX_LIMIT_SWEEPS: usize = 40;

/// Largest angle correction, in radians, that still counts as settled.
const LIMIT_TOLERANCE: f32 = 1e-7;

/// Gauss-Seidel position solver with bounded sweep counts.
///
/// One sub-step solve runs over the joints in id order:
///
/// 1. `iterations` position sweeps, each projecting every joint's points
///    together (scaled by `stiffness`), then every angle limit, then every
///    solid contact;
/// 2. velocities are rebuilt from the corrected motion;
/// 3. joint friction and contact bounce adjust the new velocities.
///
/// Once per step [`settle_limits`](Self::settle_limits) repeats limit-only
/// sweeps until no limit needs more than a negligible correction, so every
/// relative angle ends the step inside its range.
///
/// Solving never fails. Whatever error remains after the last sweep is
/// carried into the next sub-step.
#[derive(Copy, Clone, Debug)]
pub struct JointSolver<F: Float> {
    pub iterations: usize,
    pub stiffness: F,
    pub restitution: F,
}

impl<F: Float> JointSolver<F> {
    pub fn new(iterations: usize, stiffness: F, restitution: F) -> Self {
        JointSolver { iterations, stiffness, restitution }
    }

    pub fn from_config(config: &WorldConfig<F>) -> Self {
        Self::new(config.iterations, config.stiffness, config.restitution)
    }

    /// Solve one sub-step of length `dt`. Contacts approaching slower than
    /// `bounce_threshold` come to rest instead of bouncing.
    pub(crate) fn solve<O: StepObserver>(
        &self,
        bodies: &mut [Body<F>],
        joints: &BTreeMap<JointId, Joint<F>>,
        contacts: &[Contact<F>],
        dt: F,
        bounce_threshold: F,
        observer: &mut O,
    ) {
        for i in 0..self.iterations {
            for joint in joints.values() {
                joint.project_points(bodies, self.stiffness);
            }
            for joint in joints.values() {
                joint.project_limit(bodies);
            }
            for contact in contacts {
                contact.project(bodies);
            }
            observer.on_joint_iteration(i);
        }

        for body in bodies.iter_mut() {
            body.update_velocity(dt);
        }

        for joint in joints.values() {
            joint.apply_friction(bodies, dt);
        }
        for contact in contacts {
            contact.resolve_velocity(bodies, self.restitution, bounce_threshold);
        }
    }

    /// Limit-only sweeps. Angles change but velocities do not.
    pub fn settle_limits(&self, bodies: &mut [Body<F>], joints: &BTreeMap<JointId, Joint<F>>) {
        for _ in 0..MAX_LIMIT_SWEEPS {
            let worst = joints
                .values()
                .fold(F::zero(), |worst, joint| worst.max(joint.project_limit(bodies)));
            if worst <= F::from_f32(LIMIT_TOLERANCE) {
                break;
            }
        }
    }
}
