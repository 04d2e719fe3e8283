//! Error types for simulation setup.
//!
//! Every variant is a configuration mistake caught when a body, joint or
//! zone is built or registered. Stepping the world never produces errors.

use thiserror::Error;

use crate::body::BodyId;
use crate::joint::JointId;
use crate::zone::ZoneId;

/// Errors that can occur while configuring a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Mass must be positive and finite for a dynamic body.
    #[error("mass must be positive and finite")]
    InvalidMass,
    /// Half extents must be positive and finite.
    #[error("body half extents must be positive and finite")]
    InvalidShape,
    /// Zone shape is degenerate (empty rectangle or non-positive radius).
    #[error("zone shape is degenerate")]
    InvalidZone,
    /// Lower joint limit exceeds the upper limit, or a limit is not finite.
    #[error("joint limits are invalid: lower {lower} upper {upper}")]
    InvalidJointLimits { lower: f64, upper: f64 },
    /// Friction torque must be non-negative and finite.
    #[error("friction torque must be non-negative and finite")]
    NegativeFriction,
    /// A pin joint must connect two different bodies.
    #[error("a pin joint must connect two different bodies")]
    SameBody,
    /// Referenced body does not exist.
    #[error("unknown body {0}")]
    UnknownBody(BodyId),
    /// Referenced zone does not exist.
    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),
    /// Referenced joint does not exist.
    #[error("unknown joint {0}")]
    UnknownJoint(JointId),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
