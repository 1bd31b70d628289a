//! Orientation Engine
//!
//! Turns the raw gyroscope quaternions reported by the cube into absolute
//! and relative rotations.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Magnitude divisor for raw 15-bit quaternion components
const COMPONENT_SCALE: f64 = 32767.0;

/// Rotation quaternion (w, x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Yaw/pitch/roll in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Build from the four raw sign-magnitude components sent by the cube
    pub fn from_raw(qw: u16, qx: u16, qy: u16, qz: u16) -> Self {
        Self::new(
            decode_component(qw),
            decode_component(qx),
            decode_component(qy),
            decode_component(qz),
        )
    }

    /// Inverse of a unit quaternion
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Hamilton product `self ⊗ p`
    pub fn mul(&self, p: &Quaternion) -> Self {
        let c = self;
        Self::new(
            c.w * p.w - c.x * p.x - c.y * p.y - c.z * p.z,
            c.w * p.x + c.x * p.w + c.y * p.z - c.z * p.y,
            c.w * p.y - c.x * p.z + c.y * p.w + c.z * p.x,
            c.w * p.z + c.x * p.y - c.y * p.x + c.z * p.w,
        )
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// ZYX Tait-Bryan angles
    pub fn to_euler(&self) -> EulerAngles {
        let Quaternion { w, x, y, z } = *self;

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        EulerAngles { yaw, pitch, roll }
    }

    /// World up axis expressed in the body frame
    pub fn gravity(&self) -> [f64; 3] {
        let Quaternion { w, x, y, z } = *self;
        [
            2.0 * (x * z - w * y),
            2.0 * (w * x + y * z),
            w * w - x * x - y * y + z * z,
        ]
    }
}

/// Bit 15 is the sign, the lower 15 bits the magnitude
fn decode_component(raw: u16) -> f64 {
    let magnitude = (raw & 0x7FFF) as f64 / COMPONENT_SCALE;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 4-bit sign-magnitude angular velocity component
pub fn decode_velocity(raw: u8) -> i8 {
    let magnitude = (raw & 0x07) as i8;
    if raw & 0x08 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Tracks the last two absolute orientations of one cube
#[derive(Debug, Clone, Default)]
pub struct OrientationEngine {
    previous: Quaternion,
    current: Quaternion,
}

impl OrientationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw gyroscope sample.
    ///
    /// Returns `(absolute, relative)` where `relative` is the rotation from
    /// the previous sample to this one.
    pub fn update(&mut self, qw: u16, qx: u16, qy: u16, qz: u16) -> (Quaternion, Quaternion) {
        self.push(Quaternion::from_raw(qw, qx, qy, qz))
    }

    /// Same as [`update`](Self::update) with an already decoded quaternion
    pub fn push(&mut self, absolute: Quaternion) -> (Quaternion, Quaternion) {
        self.previous = self.current;
        self.current = absolute;
        let relative = self.relative();
        trace!(?absolute, ?relative, "orientation update");
        (absolute, relative)
    }

    /// `current ⊗ conjugate(previous)`
    pub fn relative(&self) -> Quaternion {
        self.current.mul(&self.previous.conjugate())
    }

    pub fn current(&self) -> Quaternion {
        self.current
    }

    pub fn previous(&self) -> Quaternion {
        self.previous
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
