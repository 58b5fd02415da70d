//! Rep detection.
//!
//! Three analyzers turn raw observations into rep signals, ordered by
//! fidelity:
//!
//! ```text
//! Motion (accelerometer) > Visual (frame difference) > Scripted (timer)
//! ```
//!
//! All three implement [`RepAnalyzer`]. The [`DetectionArbitrator`] picks one
//! when a challenge goes active, owns the platform resources it needs and is
//! the single teardown path for them.

mod arbitrator;
mod motion;
mod scripted;
mod visual;

pub use arbitrator::{Activation, DetectionArbitrator, Fallback};
pub use motion::{MotionAnalyzer, MotionConfig};
pub use scripted::{ScriptedConfig, ScriptedGenerator};
pub use visual::{frame_movement, VisualAnalyzer, VisualConfig};

use serde::{Deserialize, Serialize};

use crate::platform::Frame;

/// Which analyzer tier is driving the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    Motion,
    Visual,
    Scripted,
}

impl AnalyzerKind {
    /// Label for the detection-mode indicator.
    pub fn indicator(self) -> &'static str {
        match self {
            AnalyzerKind::Motion => "MOTION",
            AnalyzerKind::Visual => "VISUAL",
            AnalyzerKind::Scripted => "SCRIPTED",
        }
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.indicator())
    }
}

/// Half-cycle of a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Up,
    Down,
}

/// One tri-axis acceleration reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean magnitude of the sample.
    pub fn intensity(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A single observation for the active analyzer. Never both kinds at once.
#[derive(Debug, Clone)]
pub enum AnalyzerSample {
    Motion(MotionSample),
    Frame(Frame),
}

/// Debug readout shown next to the counter.
///
/// Motion reports the raw axes. Visual reports `movement / 1000` on `x` and
/// the down sub-state as `y = -1 / +1`. Scripted reports canned values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readout {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<MotionSample> for Readout {
    fn from(s: MotionSample) -> Self {
        Self {
            x: s.x,
            y: s.y,
            z: s.z,
        }
    }
}

/// What an analyzer observed. `Rep` is the rep event; everything else only
/// feeds the presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Phase(Phase),
    InPosition(bool),
    Readout(Readout),
    /// A Down -> Up edge judged to be a completed repetition.
    Rep { at_ms: u64 },
}

/// Capability set shared by the three analyzer tiers.
///
/// Analyzers are pure: the arbitrator acquires platform resources and feeds
/// them observations. A stopped analyzer must return no signals.
pub trait RepAnalyzer {
    fn kind(&self) -> AnalyzerKind;

    /// Begin producing signals. Calling it on a running analyzer is a no-op.
    fn start(&mut self, now_ms: u64);

    /// Stop producing signals and drop any buffered state.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Feed one observation. Samples of the wrong kind are ignored.
    fn on_sample(&mut self, sample: AnalyzerSample, now_ms: u64) -> Vec<Signal>;

    /// Advance internal timers. Only the scripted generator uses this.
    fn poll(&mut self, _now_ms: u64) -> Vec<Signal> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_euclidean_norm() {
        let s = MotionSample::new(3.0, 4.0, 0.0);
        assert!((s.intensity() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn indicator_labels() {
        assert_eq!(AnalyzerKind::Motion.indicator(), "MOTION");
        assert_eq!(AnalyzerKind::Visual.to_string(), "VISUAL");
        assert_eq!(AnalyzerKind::Scripted.indicator(), "SCRIPTED");
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&AnalyzerKind::Scripted).unwrap();
        assert_eq!(json, "\"scripted\"");
    }
}
