//! Configuration types for the world and its solver.

use crate::error::PhysicsError;
use crate::float::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for stepping a [`World`](crate::World).
///
/// # Builder Pattern
/// ```
/// use limber::config::WorldConfig;
///
/// let config: WorldConfig<f32> = WorldConfig::new()
///     .with_iterations(4)
///     .with_stiffness(0.8)
///     .with_restitution(0.3)
///     .with_linear_drag(0.5)
///     .with_sub_steps(10);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig<F: Float> {
    /// Position sweeps per sub-step. Default: 2.
    pub iterations: usize,
    /// Integration sub-steps per `step` call. Contacts are gathered again
    /// in every sub-step. Default: 20.
    pub sub_steps: usize,
    /// Fraction of a joint's point gap removed per projection, in (0, 1].
    /// Default: 1.
    pub stiffness: F,
    /// Bounce factor for solid zones, in [0, 1]. Default: 0.3.
    pub restitution: F,
    /// Linear air resistance applied to every dynamic body. Default: 0.5.
    pub linear_drag: F,
    /// Angular air resistance applied to every dynamic body. Default: 0.
    pub angular_drag: F,
}

impl<F: Float> WorldConfig<F> {
    /// Create a new config with default values.
    pub fn new() -> Self {
        WorldConfig {
            iterations: 2,
            sub_steps: 20,
            stiffness: F::one(),
            restitution: F::from_f32(0.3),
            linear_drag: F::from_f32(0.5),
            angular_drag: F::zero(),
        }
    }

    /// Set the number of solver sweeps.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the number of sub-steps.
    pub fn with_sub_steps(mut self, sub_steps: usize) -> Self {
        self.sub_steps = sub_steps.max(1);
        self
    }

    /// Set the joint projection stiffness.
    pub fn with_stiffness(mut self, stiffness: F) -> Self {
        self.stiffness = stiffness.clamp(F::from_f32(1e-3), F::one());
        self
    }

    pub fn with_restitution(mut self, restitution: F) -> Self {
        self.restitution = restitution.clamp(F::zero(), F::one());
        self
    }

    pub fn with_linear_drag(mut self, drag: F) -> Self {
        self.linear_drag = drag.max(F::zero());
        self
    }

    pub fn with_angular_drag(mut self, drag: F) -> Self {
        self.angular_drag = drag.max(F::zero());
        self
    }

    /// No drag at all, for energy checks and free-fall scenarios.
    pub fn without_drag(self) -> Self {
        self.with_linear_drag(F::zero()).with_angular_drag(F::zero())
    }

    /// Check fields that may have been set directly rather than through
    /// the clamping builders.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.iterations == 0 {
            return Err(PhysicsError::InvalidConfig("iterations must be at least 1"));
        }
        if self.sub_steps == 0 {
            return Err(PhysicsError::InvalidConfig("sub_steps must be at least 1"));
        }
        if !self.stiffness.is_finite() || !(self.stiffness > F::zero()) || self.stiffness > F::one() {
            return Err(PhysicsError::InvalidConfig("stiffness must lie in (0, 1]"));
        }
        if !self.restitution.is_finite() || self.restitution < F::zero() || self.restitution > F::one() {
            return Err(PhysicsError::InvalidConfig("restitution must lie in [0, 1]"));
        }
        let drag_ok = |d: F| d.is_finite() && d >= F::zero();
        if !drag_ok(self.linear_drag) || !drag_ok(self.angular_drag) {
            return Err(PhysicsError::InvalidConfig("drag must be finite and non-negative"));
        }
        Ok(())
    }
}

impl<F: Float> Default for WorldConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_clamp_into_range() {
        let config: WorldConfig<f64> = WorldConfig::new()
            .with_stiffness(3.0)
            .with_restitution(-1.0)
            .with_linear_drag(-2.0)
            .with_sub_steps(0);
        assert_eq!(config.stiffness, 1.0);
        assert_eq!(config.restitution, 0.0);
        assert_eq!(config.linear_drag, 0.0);
        assert_eq!(config.sub_steps, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn direct_edits_are_caught() {
        let bad = |config: WorldConfig<f32>| matches!(config.validate(), Err(PhysicsError::InvalidConfig(_)));
        assert!(bad(WorldConfig { stiffness: 0.0, ..WorldConfig::new() }));
        assert!(bad(WorldConfig { restitution: 1.5, ..WorldConfig::new() }));
        assert!(bad(WorldConfig { angular_drag: f32::INFINITY, ..WorldConfig::new() }));
        assert!(bad(WorldConfig { sub_steps: 0, ..WorldConfig::new() }));
    }
}
