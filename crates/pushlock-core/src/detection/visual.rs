//! Frame-difference rep counting.
//!
//! A deliberately coarse proxy: lots of pixel change is read as "going
//! down", a later burst of change as "coming up". Camera shake or a second
//! person walking through the frame count the same as a pushup.

use serde::{Deserialize, Serialize};

use super::{AnalyzerKind, AnalyzerSample, Phase, Readout, RepAnalyzer, Signal};
use crate::platform::Frame;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    /// Summed channel difference at or below this means "not in position".
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: u64,
    /// Movement above `movement_threshold * down_factor` enters the down sub-state.
    #[serde(default = "default_down_factor")]
    pub down_factor: f64,
    #[serde(default = "default_min_time_between_reps_ms")]
    pub min_time_between_reps_ms: u64,
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    /// Only every n-th captured frame is compared with its predecessor.
    #[serde(default = "default_analyze_every_nth_frame")]
    pub analyze_every_nth_frame: u32,
    /// Compare one pixel out of every `pixel_stride`.
    #[serde(default = "default_pixel_stride")]
    pub pixel_stride: usize,
}

fn default_movement_threshold() -> u64 {
    2000
}
fn default_down_factor() -> f64 {
    1.5
}
fn default_min_time_between_reps_ms() -> u64 {
    1200
}
fn default_capture_interval_ms() -> u64 {
    100
}
fn default_analyze_every_nth_frame() -> u32 {
    3
}
fn default_pixel_stride() -> usize {
    4
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            movement_threshold: default_movement_threshold(),
            down_factor: default_down_factor(),
            min_time_between_reps_ms: default_min_time_between_reps_ms(),
            capture_interval_ms: default_capture_interval_ms(),
            analyze_every_nth_frame: default_analyze_every_nth_frame(),
            pixel_stride: default_pixel_stride(),
        }
    }
}

/// Sum of `|Δr| + |Δg| + |Δb|` over every `pixel_stride`-th pixel.
///
/// Returns `None` when the frames differ in size.
pub fn frame_movement(previous: &Frame, current: &Frame, pixel_stride: usize) -> Option<u64> {
    if !previous.same_dimensions(current) {
        return None;
    }
    let step = pixel_stride.max(1).saturating_mul(4);
    let (a, b) = (previous.rgba(), current.rgba());
    let total = (0..a.len())
        .step_by(step)
        .map(|i| {
            (0..3)
                .map(|c| u64::from(a[i + c].abs_diff(b[i + c])))
                .sum::<u64>()
        })
        .sum();
    Some(total)
}

#[derive(Debug, Clone)]
pub struct VisualAnalyzer {
    config: VisualConfig,
    running: bool,
    previous: Option<Frame>,
    frame_count: u32,
    in_down: bool,
    last_rep_at_ms: Option<u64>,
}

impl VisualAnalyzer {
    pub fn new(config: VisualConfig) -> Self {
        Self {
            config,
            running: false,
            previous: None,
            frame_count: 0,
            in_down: false,
            last_rep_at_ms: None,
        }
    }

    pub fn in_down(&self) -> bool {
        self.in_down
    }

    fn analyze(&mut self, frame: Frame, now_ms: u64) -> Vec<Signal> {
        self.frame_count = self.frame_count.wrapping_add(1);
        let due = self.frame_count % self.config.analyze_every_nth_frame.max(1) == 0;

        let movement = match (&self.previous, due) {
            (Some(previous), true) => {
                frame_movement(previous, &frame, self.config.pixel_stride)
            }
            _ => None,
        };
        self.previous = Some(frame);

        let Some(movement) = movement else {
            return Vec::new();
        };

        let threshold = self.config.movement_threshold;
        if movement <= threshold {
            return vec![Signal::InPosition(false)];
        }

        let mut signals = vec![Signal::InPosition(true)];
        let down_level = threshold as f64 * self.config.down_factor;
        let min_gap = self.config.min_time_between_reps_ms;
        let rep_gap_elapsed = self
            .last_rep_at_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > min_gap);

        if movement as f64 > down_level && !self.in_down {
            self.in_down = true;
            signals.push(Signal::Phase(Phase::Down));
        } else if self.in_down && rep_gap_elapsed {
            self.in_down = false;
            self.last_rep_at_ms = Some(now_ms);
            signals.push(Signal::Phase(Phase::Up));
            signals.push(Signal::Rep { at_ms: now_ms });
        }

        signals.push(Signal::Readout(Readout {
            x: movement as f64 / 1000.0,
            y: if self.in_down { -1.0 } else { 1.0 },
            z: 0.0,
        }));
        signals
    }
}

impl RepAnalyzer for VisualAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Visual
    }

    fn start(&mut self, _now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        self.previous = None;
        self.frame_count = 0;
        self.in_down = false;
        self.last_rep_at_ms = None;
    }

    fn stop(&mut self) {
        self.running = false;
        self.previous = None;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn on_sample(&mut self, sample: AnalyzerSample, now_ms: u64) -> Vec<Signal> {
        if !self.running {
            return Vec::new();
        }
        match sample {
            AnalyzerSample::Frame(frame) => self.analyze(frame, now_ms),
            AnalyzerSample::Motion(_) => Vec::new(),
        }
    }
}
