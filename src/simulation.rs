//! Fixed-step driver that owns the world, the figure and the grasp cycle.
//!
//! Tilt samples, gravity changes and release taps arrive whenever their
//! sources fire. They are queued as [`Command`]s and applied in arrival
//! order at the start of the next [`Simulation::tick`], never mid-step.

use alloc::collections::VecDeque;
use alloc::vec::Vec as AllocVec;

use tracing::debug;

use crate::body::BodySnapshot;
use crate::config::WorldConfig;
use crate::error::PhysicsError;
use crate::figure::{Figure, FigureConfig};
use crate::float::Float;
use crate::grasp::{GraspConfig, GraspStateMachine, GraspTransition};
use crate::gravity::{GravityController, TiltSample};
use crate::observer::StepObserver;
use crate::vec::Vec2;
use crate::world::World;
use crate::zone::Zone;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An input waiting for the next tick.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Command<F: Float> {
    Tilt(TiltSample<F>),
    SetGravityMagnitude(F),
    Release,
}

/// Everything needed to set up a [`Simulation`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimberjackConfig<F: Float> {
    pub world: WorldConfig<F>,
    pub figure: FigureConfig<F>,
    /// Size of the screen rectangle, with its lower-left corner at the origin.
    pub bounds: Vec2<F>,
    /// Radius of the grab zone around the bar point.
    pub bar_radius: F,
    /// Gravity strength while running, in points/s².
    pub gravity_magnitude: F,
    /// Fixed tick length in seconds.
    pub dt: F,
}

impl<F: Float> LimberjackConfig<F> {
    pub fn new() -> Self {
        LimberjackConfig {
            world: WorldConfig::new(),
            figure: FigureConfig::new(),
            bounds: Vec2::new(F::from_f32(380.0), F::from_f32(800.0)),
            bar_radius: F::from_f32(5.0),
            gravity_magnitude: F::from_f32(1000.0),
            dt: F::one() / F::from_f32(60.0),
        }
    }

    pub fn with_world(mut self, world: WorldConfig<F>) -> Self {
        self.world = world;
        self
    }

    pub fn with_figure(mut self, figure: FigureConfig<F>) -> Self {
        self.figure = figure;
        self
    }

    pub fn with_dt(mut self, dt: F) -> Self {
        self.dt = dt;
        self
    }
}

impl<F: Float> Default for LimberjackConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Simulation<F: Float> {
    world: World<F>,
    figure: Figure,
    grasp: GraspStateMachine<F>,
    gravity: GravityController,
    commands: VecDeque<Command<F>>,
    dt: F,
}

impl<F: Float> Simulation<F> {
    /// Build the world, both zones, the figure and the hand grip.
    pub fn new(config: LimberjackConfig<F>) -> Result<Self, PhysicsError> {
        if !config.dt.is_finite() || !(config.dt > F::zero()) {
            return Err(PhysicsError::InvalidConfig("dt must be positive and finite"));
        }
        if !config.gravity_magnitude.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity magnitude must be finite"));
        }

        let mut world = World::new(config.world)?;
        world.set_gravity_magnitude(config.gravity_magnitude);

        let bounds_zone = world.add_zone(Zone::bounds(Vec2::zero(), config.bounds)?.inactive())?;
        let bar_zone = world.add_zone(Zone::circle(config.figure.bar_point, config.bar_radius)?.inactive())?;

        let figure = Figure::build(&mut world, &config.figure)?;
        let grasp = GraspStateMachine::attach(
            &mut world,
            GraspConfig {
                bar_zone,
                bounds_zone,
                hands: figure.hands(),
                hand_offset: Figure::hand_offset(&config.figure),
                bar_point: config.figure.bar_point,
            },
        )?;

        debug!(bodies = world.body_count(), joints = world.joint_count(), "simulation ready");
        Ok(Simulation {
            world,
            figure,
            grasp,
            gravity: GravityController::new(),
            commands: VecDeque::new(),
            dt: config.dt,
        })
    }

    /// Queue an input for the next tick.
    pub fn push(&mut self, command: Command<F>) {
        self.commands.push_back(command);
    }

    pub fn release(&mut self) {
        self.push(Command::Release);
    }

    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Apply queued commands, advance one fixed step and let the grasp
    /// machine react to the step's contacts.
    pub fn tick<O: StepObserver>(&mut self, observer: &mut O) -> AllocVec<GraspTransition> {
        let mut transitions = AllocVec::new();
        while let Some(command) = self.commands.pop_front() {
            match command {
                Command::Tilt(sample) => self.gravity.apply(&mut self.world, &sample),
                Command::SetGravityMagnitude(magnitude) => self.world.set_gravity_magnitude(magnitude),
                Command::Release => transitions.extend(self.grasp.on_release(&mut self.world)),
            }
        }

        self.world.step(self.dt, observer);

        let events = AllocVec::from(self.world.contact_events());
        transitions.extend(self.grasp.process(&mut self.world, &events));
        transitions
    }

    /// Switch gravity off and drop inputs that have not been applied yet.
    pub fn shutdown(&mut self) {
        self.commands.clear();
        self.world.set_gravity_magnitude(F::zero());
    }

    pub fn world(&self) -> &World<F> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World<F> {
        &mut self.world
    }

    pub fn grasp(&self) -> &GraspStateMachine<F> {
        &self.grasp
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    pub fn dt(&self) -> F {
        self.dt
    }

    pub fn bodies(&self) -> AllocVec<BodySnapshot<F>> {
        self.world.bodies()
    }
}
