//! Motion traces: JSON lines of timestamped accelerometer samples.
//!
//! ```text
//! {"at_ms":3100,"x":0.05,"y":-0.9,"z":0.1}
//! ```
//!
//! `at_ms` counts from the moment the countdown starts, so a template
//! begins one sample after the configured countdown ends.

use std::io::BufRead;
use std::path::Path;

use pushlock_core::error::{CoreError, Result};
use pushlock_core::MotionSample;
use serde::{Deserialize, Serialize};

const SAMPLE_MS: u64 = 100;
/// Samples per half of a rep, plus a short rest between reps.
const DOWN_SAMPLES: u64 = 4;
const UP_SAMPLES: u64 = 4;
const REST_SAMPLES: u64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    pub at_ms: u64,
    #[serde(flatten)]
    pub sample: MotionSample,
}

pub fn load(path: &Path) -> Result<Vec<TraceSample>> {
    let file = std::fs::File::open(path)?;
    let mut samples = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: TraceSample = serde_json::from_str(&line)
            .map_err(|e| CoreError::Custom(format!("trace line {}: {e}", n + 1)))?;
        samples.push(sample);
    }
    samples.sort_by_key(|s| s.at_ms);
    Ok(samples)
}

/// A clean run of `reps` pushups: down, up, rest. The first sample lands
/// just after a countdown of `countdown_secs`.
pub fn template(reps: u32, countdown_secs: u32) -> Vec<TraceSample> {
    let start_ms = u64::from(countdown_secs) * 1000 + SAMPLE_MS;
    let per_rep = DOWN_SAMPLES + UP_SAMPLES + REST_SAMPLES;
    (0..u64::from(reps) * per_rep)
        .map(|i| {
            let y = match i % per_rep {
                k if k < DOWN_SAMPLES => -0.9,
                k if k < DOWN_SAMPLES + UP_SAMPLES => 0.9,
                _ => 0.1,
            };
            TraceSample {
                at_ms: start_ms + i * SAMPLE_MS,
                sample: MotionSample::new(0.05, y, 0.1),
            }
        })
        .collect()
}
