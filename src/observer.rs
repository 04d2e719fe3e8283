//! Step observer trait for monitoring simulation progress.

use crate::zone::ContactEvent;

/// Trait for observing world steps.
///
/// Implement this trait to watch the solver (debug overlays, profiling,
/// recording contact traces). All methods have default no-op
/// implementations.
pub trait StepObserver {
    /// Called after every body has been integrated, once per sub-step.
    fn on_integrate(&mut self) {}

    /// Called after each position sweep of the solver.
    fn on_joint_iteration(&mut self, _iteration: usize) {}

    /// Called for each contact event, in publication order.
    fn on_contact(&mut self, _event: &ContactEvent) {}

    /// Called when a step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// A no-op observer that does nothing. Use as default when no observation needed.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}
