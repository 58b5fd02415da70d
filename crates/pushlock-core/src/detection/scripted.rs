//! Scripted fallback: fabricates reps on a timer.
//!
//! Used only when neither the motion sensor nor the camera is usable, so the
//! challenge stays completable end to end. Each rep is a lead-in wait, a
//! down hold and an up hold; the lead-in shrinks as reps accumulate until the
//! whole cycle hits the configured floor.

use serde::{Deserialize, Serialize};

use super::{AnalyzerKind, AnalyzerSample, Phase, Readout, RepAnalyzer, Signal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedConfig {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// How much faster each completed rep makes the next one.
    #[serde(default = "default_interval_step_ms")]
    pub interval_step_ms: u64,
    #[serde(default = "default_down_phase_ms")]
    pub down_phase_ms: u64,
    #[serde(default = "default_up_phase_ms")]
    pub up_phase_ms: u64,
}

fn default_base_interval_ms() -> u64 {
    2500
}
fn default_min_interval_ms() -> u64 {
    1800
}
fn default_interval_step_ms() -> u64 {
    100
}
fn default_down_phase_ms() -> u64 {
    1000
}
fn default_up_phase_ms() -> u64 {
    800
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            min_interval_ms: default_min_interval_ms(),
            interval_step_ms: default_interval_step_ms(),
            down_phase_ms: default_down_phase_ms(),
            up_phase_ms: default_up_phase_ms(),
        }
    }
}

impl ScriptedConfig {
    /// Full cycle length for the rep at `index` (zero-based).
    pub fn interval_ms(&self, index: u32) -> u64 {
        self.base_interval_ms
            .saturating_sub(self.interval_step_ms.saturating_mul(u64::from(index)))
            .max(self.min_interval_ms)
    }

    fn lead_in_ms(&self, index: u32) -> u64 {
        self.interval_ms(index)
            .saturating_sub(self.down_phase_ms.saturating_add(self.up_phase_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    LeadIn { until_ms: u64 },
    Down { until_ms: u64 },
    Up { until_ms: u64 },
    Finished,
}

#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    config: ScriptedConfig,
    target_reps: u32,
    emitted: u32,
    stage: Stage,
}

impl ScriptedGenerator {
    pub fn new(config: ScriptedConfig, target_reps: u32) -> Self {
        Self {
            config,
            target_reps,
            emitted: 0,
            stage: Stage::Idle,
        }
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// Advance one stage if its deadline has passed.
    fn step(&mut self, now_ms: u64) -> Option<Vec<Signal>> {
        match self.stage {
            Stage::LeadIn { until_ms } if now_ms >= until_ms => {
                self.stage = Stage::Down {
                    until_ms: until_ms.saturating_add(self.config.down_phase_ms),
                };
                Some(vec![
                    Signal::Phase(Phase::Down),
                    Signal::InPosition(true),
                    Signal::Readout(Readout {
                        x: 0.5,
                        y: -0.8,
                        z: 0.2,
                    }),
                ])
            }
            Stage::Down { until_ms } if now_ms >= until_ms => {
                self.stage = Stage::Up {
                    until_ms: until_ms.saturating_add(self.config.up_phase_ms),
                };
                Some(vec![
                    Signal::Phase(Phase::Up),
                    Signal::Readout(Readout {
                        x: 0.3,
                        y: 0.9,
                        z: 0.1,
                    }),
                ])
            }
            Stage::Up { until_ms } if now_ms >= until_ms => {
                self.emitted += 1;
                self.stage = if self.emitted >= self.target_reps {
                    Stage::Finished
                } else {
                    Stage::LeadIn {
                        until_ms: until_ms.saturating_add(self.config.lead_in_ms(self.emitted)),
                    }
                };
                Some(vec![
                    Signal::Rep { at_ms: until_ms },
                    Signal::Readout(Readout::default()),
                    Signal::InPosition(false),
                ])
            }
            _ => None,
        }
    }
}

impl RepAnalyzer for ScriptedGenerator {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Scripted
    }

    fn start(&mut self, now_ms: u64) {
        if self.stage != Stage::Idle {
            return;
        }
        self.emitted = 0;
        self.stage = if self.target_reps == 0 {
            Stage::Finished
        } else {
            Stage::LeadIn {
                until_ms: now_ms.saturating_add(self.config.lead_in_ms(0)),
            }
        };
    }

    fn stop(&mut self) {
        self.stage = Stage::Idle;
    }

    fn is_running(&self) -> bool {
        matches!(
            self.stage,
            Stage::LeadIn { .. } | Stage::Down { .. } | Stage::Up { .. }
        )
    }

    fn on_sample(&mut self, _sample: AnalyzerSample, _now_ms: u64) -> Vec<Signal> {
        Vec::new()
    }

    /// Catches up on every stage whose deadline is at or before `now_ms`.
    fn poll(&mut self, now_ms: u64) -> Vec<Signal> {
        let mut signals = Vec::new();
        while let Some(mut step) = self.step(now_ms) {
            signals.append(&mut step);
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep_times(signals: &[Signal]) -> Vec<u64> {
        signals
            .iter()
            .filter_map(|s| match s {
                Signal::Rep { at_ms } => Some(*at_ms),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn interval_shrinks_to_floor() {
        let c = ScriptedConfig::default();
        assert_eq!(c.interval_ms(0), 2500);
        assert_eq!(c.interval_ms(3), 2200);
        assert_eq!(c.interval_ms(7), 1800);
        assert_eq!(c.interval_ms(40), 1800);
    }

    #[test]
    fn emits_exactly_target_reps_then_stops() {
        let mut g = ScriptedGenerator::new(ScriptedConfig::default(), 10);
        g.start(0);
        let mut all = Vec::new();
        for t in (0..60_000).step_by(100) {
            all.extend(g.poll(t));
        }
        let times = rep_times(&all);
        assert_eq!(times.len(), 10);
        assert!(g.is_finished());
        assert!(!g.is_running());

        let gaps: Vec<u64> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*gaps.last().unwrap(), 1800);
        assert_eq!(times[0], 2500);
    }

    #[test]
    fn huge_holds_saturate_instead_of_overflowing() {
        let config = ScriptedConfig {
            down_phase_ms: u64::MAX,
            up_phase_ms: u64::MAX,
            ..ScriptedConfig::default()
        };
        assert_eq!(config.lead_in_ms(0), 0);
        let mut g = ScriptedGenerator::new(config, 2);
        g.start(1_000);
        let signals = g.poll(u64::MAX);
        assert!(signals.contains(&Signal::Phase(Phase::Down)));
        assert_eq!(rep_times(&signals).len(), 2);
    }

    #[test]
    fn coarse_poll_catches_up_with_distinct_timestamps() {
        let mut g = ScriptedGenerator::new(ScriptedConfig::default(), 3);
        g.start(1_000);
        let times = rep_times(&g.poll(100_000));
        assert_eq!(times, vec![3_500, 5_900, 8_200]);
    }

    #[test]
    fn phases_follow_down_then_up() {
        let mut g = ScriptedGenerator::new(ScriptedConfig::default(), 1);
        g.start(0);
        assert!(g.poll(699).is_empty());
        assert!(g.poll(700).contains(&Signal::Phase(Phase::Down)));
        assert!(g.poll(1700).contains(&Signal::Phase(Phase::Up)));
        assert_eq!(rep_times(&g.poll(2500)), vec![2500]);
    }

    #[test]
    fn stopped_generator_emits_nothing() {
        let mut g = ScriptedGenerator::new(ScriptedConfig::default(), 5);
        g.start(0);
        g.stop();
        assert!(g.poll(100_000).is_empty());
    }
}
