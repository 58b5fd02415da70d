//! Analyzer selection and lifecycle.
//!
//! The arbitrator picks exactly one analyzer when the challenge goes
//! active, acquires the platform resources it needs and forwards its
//! signals. Initialization failures never escape: they are logged and the
//! next tier is tried.
//!
//! ```text
//! Browser: Motion --(no sensor | denied | init error)--> Visual
//!          Visual --(no surface | init error)--> Scripted
//! Native:  Motion --(init error)--> Scripted
//! ```

use serde::{Deserialize, Serialize};

use super::{
    AnalyzerKind, AnalyzerSample, MotionAnalyzer, MotionConfig, RepAnalyzer, ScriptedConfig,
    ScriptedGenerator, Signal, VisualAnalyzer, VisualConfig,
};
use crate::error::{Capability, PlatformError};
use crate::platform::{
    CameraPermission, Facing, Frame, Platform, RuntimeKind, StreamId, SubscriptionId,
};
use crate::storage::Config;

/// A tier that was skipped while selecting the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub from: AnalyzerKind,
    pub to: AnalyzerKind,
    pub reason: String,
}

/// Outcome of a successful `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub kind: AnalyzerKind,
    pub fallbacks: Vec<Fallback>,
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    Nothing,
    Motion(SubscriptionId),
    Camera(StreamId),
}

struct ActiveAnalyzer {
    analyzer: Box<dyn RepAnalyzer>,
    resource: Resource,
    next_capture_ms: u64,
}

pub struct DetectionArbitrator<P: Platform> {
    platform: P,
    motion: MotionConfig,
    visual: VisualConfig,
    scripted: ScriptedConfig,
    target_reps: u32,
    active: Option<ActiveAnalyzer>,
}

impl<P: Platform> DetectionArbitrator<P> {
    pub fn new(platform: P, config: &Config, target_reps: u32) -> Self {
        Self {
            platform,
            motion: config.motion.clone(),
            visual: config.visual.clone(),
            scripted: config.scripted.clone(),
            target_reps,
            active: None,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Kind of the analyzer currently held, if any.
    pub fn kind(&self) -> Option<AnalyzerKind> {
        self.active.as_ref().map(|a| a.analyzer.kind())
    }

    pub async fn request_camera_permission(&mut self) -> CameraPermission {
        self.platform.request_camera_permission().await
    }

    /// Select and start an analyzer. Returns `None` if one is already running.
    pub async fn start(&mut self, now_ms: u64) -> Option<Activation> {
        if self.active.is_some() {
            return None;
        }

        let mut fallbacks = Vec::new();
        let mut first_frame: Option<Frame> = None;

        let motion_interval = self.motion.sample_interval_ms;
        let (analyzer, resource): (Box<dyn RepAnalyzer>, Resource) = match self.platform.runtime() {
            RuntimeKind::Browser => match self.try_browser_motion().await {
                Ok(sub) => (self.motion_analyzer(), Resource::Motion(sub)),
                Err(e) => {
                    tracing::warn!("motion detection unavailable, trying visual: {e}");
                    fallbacks.push(fallback(AnalyzerKind::Motion, AnalyzerKind::Visual, &e));
                    match self.try_visual() {
                        Ok((stream, frame)) => {
                            first_frame = Some(frame);
                            (self.visual_analyzer(), Resource::Camera(stream))
                        }
                        Err(e) => {
                            tracing::warn!("visual detection unavailable, using scripted: {e}");
                            fallbacks.push(fallback(
                                AnalyzerKind::Visual,
                                AnalyzerKind::Scripted,
                                &e,
                            ));
                            (self.scripted_generator(), Resource::Nothing)
                        }
                    }
                }
            },
            RuntimeKind::Native => match self.platform.subscribe_motion(motion_interval) {
                Ok(sub) => (self.motion_analyzer(), Resource::Motion(sub)),
                Err(e) => {
                    tracing::warn!("motion sensor failed to start, using scripted: {e}");
                    fallbacks.push(fallback(AnalyzerKind::Motion, AnalyzerKind::Scripted, &e));
                    (self.scripted_generator(), Resource::Nothing)
                }
            },
        };

        let mut active = ActiveAnalyzer {
            analyzer,
            resource,
            next_capture_ms: now_ms.saturating_add(self.visual.capture_interval_ms),
        };
        active.analyzer.start(now_ms);
        if let Some(frame) = first_frame {
            active.analyzer.on_sample(AnalyzerSample::Frame(frame), now_ms);
        }

        let kind = active.analyzer.kind();
        tracing::info!("detection started with {kind} analyzer");
        self.active = Some(active);
        Some(Activation { kind, fallbacks })
    }

    /// Deliver a pushed observation (a motion callback, or an externally
    /// captured frame) to the active analyzer.
    pub fn ingest(&mut self, sample: AnalyzerSample, now_ms: u64) -> Vec<Signal> {
        match self.active.as_mut() {
            Some(active) if active.analyzer.is_running() => {
                active.analyzer.on_sample(sample, now_ms)
            }
            _ => Vec::new(),
        }
    }

    /// Drive timers: frame capture for the visual tier, the schedule for the
    /// scripted tier.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Signal> {
        let capture_interval = self.visual.capture_interval_ms;
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        if !active.analyzer.is_running() {
            return Vec::new();
        }

        let mut signals = Vec::new();
        if let Resource::Camera(stream) = active.resource {
            if now_ms >= active.next_capture_ms {
                active.next_capture_ms = now_ms.saturating_add(capture_interval);
                match self.platform.capture_frame(stream) {
                    Ok(frame) => {
                        let sample = AnalyzerSample::Frame(frame);
                        signals.extend(active.analyzer.on_sample(sample, now_ms));
                    }
                    Err(e) => tracing::warn!("frame analysis skipped: {e}"),
                }
            }
        }
        signals.extend(active.analyzer.poll(now_ms));
        signals
    }

    /// Stop the analyzer and release every subscription and stream.
    ///
    /// Safe to call repeatedly and from any state. Once this returns, no
    /// further signals are produced until `start` is called again.
    pub fn stop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.analyzer.stop();
        match active.resource {
            Resource::Motion(sub) => self.platform.unsubscribe_motion(sub),
            Resource::Camera(stream) => self.platform.close_camera_stream(stream),
            Resource::Nothing => {}
        }
        tracing::info!("detection stopped ({})", active.analyzer.kind());
    }

    async fn try_browser_motion(&mut self) -> Result<SubscriptionId, PlatformError> {
        if !self.platform.has_motion_sensor() {
            return Err(PlatformError::CapabilityUnavailable(Capability::Motion));
        }
        let permission = self.platform.request_motion_permission().await;
        if !permission.allows_motion() {
            return Err(PlatformError::PermissionDenied {
                capability: Capability::Motion,
            });
        }
        self.platform.subscribe_motion(self.motion.sample_interval_ms)
    }

    /// Open the front camera and read one frame to prove the surface is ready.
    fn try_visual(&mut self) -> Result<(StreamId, Frame), PlatformError> {
        if !self.platform.has_camera_surface() {
            return Err(PlatformError::CapabilityUnavailable(Capability::Camera));
        }
        let stream = self.platform.open_camera_stream(Facing::Front)?;
        match self.platform.capture_frame(stream) {
            Ok(frame) => Ok((stream, frame)),
            Err(e) => {
                self.platform.close_camera_stream(stream);
                Err(e)
            }
        }
    }

    fn motion_analyzer(&self) -> Box<dyn RepAnalyzer> {
        Box::new(MotionAnalyzer::new(self.motion.clone()))
    }

    fn visual_analyzer(&self) -> Box<dyn RepAnalyzer> {
        Box::new(VisualAnalyzer::new(self.visual.clone()))
    }

    fn scripted_generator(&self) -> Box<dyn RepAnalyzer> {
        Box::new(ScriptedGenerator::new(self.scripted.clone(), self.target_reps))
    }
}

impl<P: Platform> Drop for DetectionArbitrator<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn fallback(from: AnalyzerKind, to: AnalyzerKind, err: &PlatformError) -> Fallback {
    Fallback {
        from,
        to,
        reason: err.to_string(),
    }
}
