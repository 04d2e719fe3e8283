//! Articulated rigid-body simulation for a jointed "limberjack" figure.
//!
//! `limber` simulates a chain of rectangular limb segments hanging from a
//! bar: limited pin joints with friction between limbs, anchor pins holding
//! the hands, a screen boundary to bounce off and a grab zone around the bar.
//! A small state machine lets the figure release the bar and catch it again.
//!
//! # Features
//!
//! - **Rigid bodies**: Rectangular segments with semi-implicit Euler integration
//! - **Joint solver**: Sub-stepped position projection, fixed sweep counts
//! - **Joint limits**: Unwrapped relative angles with hard stops and Coulomb friction
//! - **Zones**: Solid bounds, sensor or solid circles, begin/end contact events
//! - **Grasp cycle**: Release, fall, clear the bar, re-catch
//! - **Tilt gravity**: Device orientation remap for accelerometer samples
//! - **Observable**: Monitor steps via the `StepObserver` trait
//! - **`no_std` compatible**: Only needs `alloc`
//!
//! # Example
//!
//! ```
//! use limber::{Command, DeviceOrientation, LimberjackConfig, NoOpStepObserver, Simulation, TiltSample};
//!
//! let mut sim = Simulation::<f32>::new(LimberjackConfig::new()).unwrap();
//! sim.push(Command::Tilt(TiltSample::new(0.2, -0.9, DeviceOrientation::Upright)));
//! sim.release();
//! for _ in 0..30 {
//!     sim.tick(&mut NoOpStepObserver);
//! }
//! assert_eq!(sim.world().joint_count(), 10);
//! ```

#![no_std]

extern crate alloc;

pub mod float;
pub mod vec;
pub mod body;
pub mod joint;
pub mod solver;
pub mod zone;
pub mod collision;
pub mod world;
pub mod gravity;
pub mod grasp;
pub mod figure;
pub mod simulation;
pub mod observer;
pub mod config;
pub mod error;

// Re-export primary API
pub use float::Float;
pub use vec::Vec2;
pub use body::{Body, BodyId, BodySnapshot};
pub use joint::{AnchorJoint, AnchorTarget, Joint, JointId, LimitedPinJoint};
pub use solver::JointSolver;
pub use zone::{ContactEvent, ContactPhase, Zone, ZoneId, ZoneResponse, ZoneShape};
pub use world::World;
pub use gravity::{DeviceOrientation, GravityController, TiltSample};
pub use grasp::{GraspConfig, GraspState, GraspStateMachine, GraspTransition};
pub use figure::{Figure, FigureConfig, JointLimits, Limb, Side};
pub use simulation::{Command, LimberjackConfig, Simulation};
pub use config::WorldConfig;
pub use observer::{StepObserver, NoOpStepObserver};
pub use error::PhysicsError;
