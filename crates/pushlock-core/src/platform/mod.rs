//! Platform capability boundary.
//!
//! Everything hardware- or OS-specific (permission prompts, sensor
//! subscriptions, camera streams, frame capture) sits behind [`Platform`].
//! The detection pipeline only ever talks to this trait.

mod simulated;

pub use simulated::{CapabilityProfile, SimulatedPlatform};

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, ValidationError};

/// Execution environment the challenge runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Browser-like runtime: capabilities must be probed, motion may need
    /// an explicit permission grant.
    Browser,
    /// Native mobile runtime: motion sensors are assumed present.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPermission {
    Granted,
    Denied,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPermission {
    Granted,
    Denied,
    /// The runtime has no explicit motion permission prompt.
    NotRequired,
}

impl MotionPermission {
    pub fn allows_motion(self) -> bool {
        matches!(self, MotionPermission::Granted | MotionPermission::NotRequired)
    }
}

/// Which camera to open. Pushups are watched from the selfie camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Front,
}

/// Handle to an open camera stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

/// Handle to a live motion sensor subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);

/// An RGBA pixel buffer, 4 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Frame {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, ValidationError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ValidationError::InvalidValue {
                field: "rgba".into(),
                message: format!(
                    "expected {expected} bytes for {width}x{height}, got {}",
                    rgba.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// A frame filled with a single opaque colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// The capability collaborator consumed by the detection arbitrator.
///
/// Permission requests are the only suspension points. Every resource
/// handed out by `open_camera_stream` / `subscribe_motion` must be given
/// back through the matching release call.
#[allow(async_fn_in_trait)]
pub trait Platform {
    fn runtime(&self) -> RuntimeKind;

    async fn request_camera_permission(&mut self) -> CameraPermission;

    async fn request_motion_permission(&mut self) -> MotionPermission;

    /// Whether a motion sensor API exists at all.
    fn has_motion_sensor(&self) -> bool;

    /// Whether a video element and a 2D drawing surface are available.
    fn has_camera_surface(&self) -> bool;

    fn open_camera_stream(&mut self, facing: Facing) -> Result<StreamId, PlatformError>;

    fn close_camera_stream(&mut self, stream: StreamId);

    fn subscribe_motion(&mut self, interval_ms: u64) -> Result<SubscriptionId, PlatformError>;

    fn unsubscribe_motion(&mut self, subscription: SubscriptionId);

    fn capture_frame(&mut self, stream: StreamId) -> Result<Frame, PlatformError>;
}
