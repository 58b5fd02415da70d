//! In-process platform used by the CLI simulator and the test suite.
//!
//! Capabilities come from a declarative [`CapabilityProfile`]. Frames come
//! from a queue, then from an optional generator, then repeat the last frame
//! (a still camera). Open resources are tracked so leaks are observable.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::{
    CameraPermission, Facing, Frame, MotionPermission, Platform, RuntimeKind, StreamId,
    SubscriptionId,
};
use crate::error::{Capability, PlatformError};

/// What the simulated device can do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub runtime: RuntimeKind,
    pub camera_permission: CameraPermission,
    pub motion_permission: MotionPermission,
    pub motion_sensor: bool,
    pub camera_surface: bool,
    /// `subscribe_motion` fails even though the sensor exists.
    #[serde(default)]
    pub motion_init_fails: bool,
    /// `open_camera_stream` fails even though permission was granted.
    #[serde(default)]
    pub camera_init_fails: bool,
}

impl CapabilityProfile {
    /// A phone running the native app.
    pub fn native() -> Self {
        Self {
            runtime: RuntimeKind::Native,
            camera_permission: CameraPermission::Granted,
            motion_permission: MotionPermission::NotRequired,
            motion_sensor: true,
            camera_surface: false,
            motion_init_fails: false,
            camera_init_fails: false,
        }
    }

    /// A desktop browser with a webcam and no motion sensor.
    pub fn browser() -> Self {
        Self {
            runtime: RuntimeKind::Browser,
            camera_permission: CameraPermission::Granted,
            motion_permission: MotionPermission::NotRequired,
            motion_sensor: false,
            camera_surface: true,
            motion_init_fails: false,
            camera_init_fails: false,
        }
    }
}

type FrameSource = Box<dyn FnMut(u32) -> Frame>;

pub struct SimulatedPlatform {
    profile: CapabilityProfile,
    frames: VecDeque<Frame>,
    frame_source: Option<FrameSource>,
    last_frame: Option<Frame>,
    captured: u32,
    next_id: u32,
    open_streams: HashSet<StreamId>,
    motion_subscriptions: HashSet<SubscriptionId>,
    motion_permission_requests: u32,
}

impl SimulatedPlatform {
    pub fn new(profile: CapabilityProfile) -> Self {
        Self {
            profile,
            frames: VecDeque::new(),
            frame_source: None,
            last_frame: None,
            captured: 0,
            next_id: 1,
            open_streams: HashSet::new(),
            motion_subscriptions: HashSet::new(),
            motion_permission_requests: 0,
        }
    }

    /// Generate frames on demand once the queue runs dry. The closure gets
    /// the zero-based capture index.
    pub fn with_frame_source(mut self, source: impl FnMut(u32) -> Frame + 'static) -> Self {
        self.frame_source = Some(Box::new(source));
        self
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    /// Change the answer to the next camera permission request, as when
    /// the user flips the setting between attempts.
    pub fn set_camera_permission(&mut self, permission: CameraPermission) {
        self.profile.camera_permission = permission;
    }

    pub fn open_stream_count(&self) -> usize {
        self.open_streams.len()
    }

    pub fn motion_subscription_count(&self) -> usize {
        self.motion_subscriptions.len()
    }

    pub fn motion_permission_requests(&self) -> u32 {
        self.motion_permission_requests
    }

    /// Nothing is left open.
    pub fn is_idle(&self) -> bool {
        self.open_streams.is_empty() && self.motion_subscriptions.is_empty()
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Platform for SimulatedPlatform {
    fn runtime(&self) -> RuntimeKind {
        self.profile.runtime
    }

    async fn request_camera_permission(&mut self) -> CameraPermission {
        self.profile.camera_permission
    }

    async fn request_motion_permission(&mut self) -> MotionPermission {
        self.motion_permission_requests += 1;
        self.profile.motion_permission
    }

    fn has_motion_sensor(&self) -> bool {
        self.profile.motion_sensor
    }

    fn has_camera_surface(&self) -> bool {
        self.profile.camera_surface
    }

    fn open_camera_stream(&mut self, _facing: Facing) -> Result<StreamId, PlatformError> {
        if self.profile.camera_permission != CameraPermission::Granted {
            return Err(PlatformError::PermissionDenied {
                capability: Capability::Camera,
            });
        }
        if self.profile.camera_init_fails {
            return Err(PlatformError::InitializationFailed {
                capability: Capability::Camera,
                message: "getUserMedia rejected".into(),
            });
        }
        let id = StreamId(self.next_id());
        self.open_streams.insert(id);
        Ok(id)
    }

    fn close_camera_stream(&mut self, stream: StreamId) {
        self.open_streams.remove(&stream);
    }

    fn subscribe_motion(&mut self, _interval_ms: u64) -> Result<SubscriptionId, PlatformError> {
        if self.profile.runtime == RuntimeKind::Browser && !self.profile.motion_sensor {
            return Err(PlatformError::CapabilityUnavailable(Capability::Motion));
        }
        if self.profile.motion_init_fails {
            return Err(PlatformError::InitializationFailed {
                capability: Capability::Motion,
                message: "sensor module failed to load".into(),
            });
        }
        let id = SubscriptionId(self.next_id());
        self.motion_subscriptions.insert(id);
        Ok(id)
    }

    fn unsubscribe_motion(&mut self, subscription: SubscriptionId) {
        self.motion_subscriptions.remove(&subscription);
    }

    fn capture_frame(&mut self, stream: StreamId) -> Result<Frame, PlatformError> {
        if !self.open_streams.contains(&stream) {
            return Err(PlatformError::FrameUnavailable { stream: stream.0 });
        }
        let index = self.captured;
        let frame = match self.frames.pop_front() {
            Some(frame) => frame,
            None => match self.frame_source.as_mut() {
                Some(source) => source(index),
                None => self
                    .last_frame
                    .clone()
                    .ok_or(PlatformError::FrameUnavailable { stream: stream.0 })?,
            },
        };
        self.captured += 1;
        self.last_frame = Some(frame.clone());
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_are_tracked_until_released() {
        let mut p = SimulatedPlatform::new(CapabilityProfile::browser());
        let stream = p.open_camera_stream(Facing::Front).unwrap();
        assert_eq!(p.open_stream_count(), 1);
        p.close_camera_stream(stream);
        assert!(p.is_idle());
    }

    #[test]
    fn browser_without_sensor_cannot_subscribe() {
        let mut p = SimulatedPlatform::new(CapabilityProfile::browser());
        assert_eq!(
            p.subscribe_motion(100),
            Err(PlatformError::CapabilityUnavailable(Capability::Motion))
        );
    }

    #[test]
    fn capture_repeats_last_frame_when_queue_is_empty() {
        let mut p = SimulatedPlatform::new(CapabilityProfile::browser());
        let stream = p.open_camera_stream(Facing::Front).unwrap();
        assert!(p.capture_frame(stream).is_err());

        let f = Frame::solid(2, 2, [1, 2, 3]);
        p.push_frame(f.clone());
        assert_eq!(p.capture_frame(stream).unwrap(), f);
        assert_eq!(p.capture_frame(stream).unwrap(), f);
    }

    #[test]
    fn capture_on_closed_stream_fails() {
        let mut p = SimulatedPlatform::new(CapabilityProfile::browser());
        p.push_frame(Frame::solid(1, 1, [0, 0, 0]));
        let stream = p.open_camera_stream(Facing::Front).unwrap();
        p.close_camera_stream(stream);
        assert!(p.capture_frame(stream).is_err());
    }

    #[tokio::test]
    async fn camera_permission_can_change_between_requests() {
        let mut profile = CapabilityProfile::native();
        profile.camera_permission = CameraPermission::Denied;
        let mut p = SimulatedPlatform::new(profile);
        assert_eq!(p.request_camera_permission().await, CameraPermission::Denied);

        p.set_camera_permission(CameraPermission::Granted);
        assert_eq!(p.request_camera_permission().await, CameraPermission::Granted);
    }

    #[test]
    fn frame_source_receives_capture_index() {
        let mut p = SimulatedPlatform::new(CapabilityProfile::browser())
            .with_frame_source(|i| Frame::solid(1, 1, [i as u8, 0, 0]));
        let stream = p.open_camera_stream(Facing::Front).unwrap();
        assert_eq!(p.capture_frame(stream).unwrap().rgba()[0], 0);
        assert_eq!(p.capture_frame(stream).unwrap().rgba()[0], 1);
    }
}
