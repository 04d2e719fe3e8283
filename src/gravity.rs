//! Tilt-driven gravity direction.

use crate::float::Float;
use crate::vec::Vec2;
use crate::world::World;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the device is being held.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceOrientation {
    Upright,
    UpsideDown,
    RotatedLeft,
    RotatedRight,
    /// Flat, or not reported. Produces no gravity.
    #[default]
    Unknown,
}

/// One accelerometer reading in device axes.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TiltSample<F: Float> {
    pub x: F,
    pub y: F,
    pub orientation: DeviceOrientation,
}

impl<F: Float> TiltSample<F> {
    pub fn new(x: F, y: F, orientation: DeviceOrientation) -> Self {
        TiltSample { x, y, orientation }
    }
}

/// Maps tilt samples to the world's gravity direction.
///
/// The remap table works in screen axes (y pointing down). The world is
/// y-up, so [`world_direction`](Self::world_direction) flips y afterwards.
#[derive(Copy, Clone, Debug, Default)]
pub struct GravityController;

impl GravityController {
    pub fn new() -> Self {
        GravityController
    }

    /// Gravity direction in screen axes for a tilt reading.
    pub fn screen_direction<F: Float>(sample: &TiltSample<F>) -> Vec2<F> {
        let (x, y) = (sample.x, sample.y);
        match sample.orientation {
            DeviceOrientation::Upright => Vec2::new(x, -y),
            DeviceOrientation::UpsideDown => Vec2::new(x, y),
            DeviceOrientation::RotatedRight => Vec2::new(y, x),
            DeviceOrientation::RotatedLeft => Vec2::new(-y, x),
            DeviceOrientation::Unknown => Vec2::zero(),
        }
    }

    /// Gravity direction in world axes.
    pub fn world_direction<F: Float>(sample: &TiltSample<F>) -> Vec2<F> {
        let screen = Self::screen_direction(sample);
        Vec2::new(screen.x, -screen.y)
    }

    /// Overwrite the world's gravity direction. The magnitude is untouched.
    pub fn apply<F: Float>(&self, world: &mut World<F>, sample: &TiltSample<F>) {
        world.set_gravity_direction(Self::world_direction(sample));
    }
}
