//! Accelerometer rep counting.
//!
//! A Schmitt trigger on the y axis, gated by overall motion intensity.
//! There is no drift correction, calibration or orientation compensation.

use serde::{Deserialize, Serialize};

use super::{AnalyzerKind, AnalyzerSample, MotionSample, Phase, Readout, RepAnalyzer, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Samples at or below this magnitude mean "not in position".
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: f64,
    /// y below this enters the down phase.
    #[serde(default = "default_down_threshold")]
    pub down_threshold: f64,
    /// y above this, while down, completes a rep.
    #[serde(default = "default_up_threshold")]
    pub up_threshold: f64,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

fn default_motion_threshold() -> f64 {
    0.3
}
fn default_down_threshold() -> f64 {
    -0.5
}
fn default_up_threshold() -> f64 {
    0.5
}
fn default_sample_interval_ms() -> u64 {
    100
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            motion_threshold: default_motion_threshold(),
            down_threshold: default_down_threshold(),
            up_threshold: default_up_threshold(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionAnalyzer {
    config: MotionConfig,
    running: bool,
    phase: Phase,
    in_position: bool,
}

impl MotionAnalyzer {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            running: false,
            phase: Phase::Up,
            in_position: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_position(&self) -> bool {
        self.in_position
    }

    fn analyze(&mut self, sample: MotionSample, now_ms: u64) -> Vec<Signal> {
        let mut signals = vec![Signal::Readout(Readout::from(sample))];

        if sample.intensity() <= self.config.motion_threshold {
            self.in_position = false;
            signals.push(Signal::InPosition(false));
            return signals;
        }

        self.in_position = true;
        signals.push(Signal::InPosition(true));

        if sample.y < self.config.down_threshold && self.phase != Phase::Down {
            self.phase = Phase::Down;
            signals.push(Signal::Phase(Phase::Down));
        } else if sample.y > self.config.up_threshold && self.phase == Phase::Down {
            self.phase = Phase::Up;
            signals.push(Signal::Phase(Phase::Up));
            signals.push(Signal::Rep { at_ms: now_ms });
        }
        signals
    }
}

impl RepAnalyzer for MotionAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Motion
    }

    fn start(&mut self, _now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        self.phase = Phase::Up;
        self.in_position = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.in_position = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn on_sample(&mut self, sample: AnalyzerSample, now_ms: u64) -> Vec<Signal> {
        if !self.running {
            return Vec::new();
        }
        match sample {
            AnalyzerSample::Motion(s) => self.analyze(s, now_ms),
            AnalyzerSample::Frame(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> MotionAnalyzer {
        let mut a = MotionAnalyzer::new(MotionConfig::default());
        a.start(0);
        a
    }

    fn feed(a: &mut MotionAnalyzer, samples: &[(f64, f64, f64)]) -> usize {
        samples
            .iter()
            .enumerate()
            .flat_map(|(i, &(x, y, z))| {
                a.on_sample(
                    AnalyzerSample::Motion(MotionSample::new(x, y, z)),
                    i as u64 * 100,
                )
            })
            .filter(|s| matches!(s, Signal::Rep { .. }))
            .count()
    }

    #[test]
    fn single_down_up_crossing_counts_one_rep() {
        let mut a = running();
        let reps = feed(
            &mut a,
            &[
                (0.0, 0.1, 0.0),
                (0.0, -0.8, 0.1),
                (0.0, 0.0, 0.1),
                (0.1, 0.9, 0.0),
                (0.0, 0.05, 0.0),
            ],
        );
        assert_eq!(reps, 1);
        assert_eq!(a.phase(), Phase::Up);
    }

    #[test]
    fn up_without_prior_down_does_not_count() {
        let mut a = running();
        assert_eq!(feed(&mut a, &[(0.0, 0.9, 0.0), (0.0, 1.2, 0.0)]), 0);
    }

    #[test]
    fn repeated_down_samples_emit_one_phase_change() {
        let mut a = running();
        let phases: Vec<_> = [-0.7, -0.9, -0.6]
            .iter()
            .flat_map(|&y| a.on_sample(AnalyzerSample::Motion(MotionSample::new(0.0, y, 0.0)), 0))
            .filter(|s| matches!(s, Signal::Phase(_)))
            .collect();
        assert_eq!(phases, vec![Signal::Phase(Phase::Down)]);
    }

    #[test]
    fn low_intensity_marks_out_of_position_without_phase_change() {
        let mut a = running();
        feed(&mut a, &[(0.0, -0.8, 0.0)]);
        assert_eq!(a.phase(), Phase::Down);

        let signals = a.on_sample(AnalyzerSample::Motion(MotionSample::new(0.1, 0.1, 0.1)), 100);
        assert!(signals.contains(&Signal::InPosition(false)));
        assert!(!a.in_position());
        assert_eq!(a.phase(), Phase::Down);
    }

    #[test]
    fn stopped_analyzer_is_silent() {
        let mut a = running();
        feed(&mut a, &[(0.0, -0.8, 0.0)]);
        a.stop();
        let signals = a.on_sample(AnalyzerSample::Motion(MotionSample::new(0.0, 0.9, 0.0)), 200);
        assert!(signals.is_empty());
    }

    #[test]
    fn start_twice_keeps_phase() {
        let mut a = running();
        feed(&mut a, &[(0.0, -0.8, 0.0)]);
        a.start(500);
        assert_eq!(a.phase(), Phase::Down);
    }
}
