//! User-facing feedback strings.

use rand::seq::SliceRandom;

use crate::detection::{AnalyzerKind, Phase};
use crate::platform::CameraPermission;

const MOTIVATION: [&str; 5] = [
    "Perfect pushup! Keep it up!",
    "Great form! You are crushing it!",
    "Excellent technique! Stay strong!",
    "Amazing work! Keep pushing!",
    "Outstanding form! Do not stop!",
];

pub(crate) const IDLE: &str = "Position yourself in frame";
pub(crate) const START: &str = "Start your pushups!";
pub(crate) const COMPLETED: &str = "Challenge completed! Amazing work!";

pub(crate) fn permission(result: CameraPermission) -> &'static str {
    match result {
        CameraPermission::Granted => "Camera ready - position yourself in frame",
        CameraPermission::Denied => "Camera permission denied - please enable in settings",
        CameraPermission::Error => "Camera permission error",
    }
}

pub(crate) fn activated(kind: AnalyzerKind) -> &'static str {
    match kind {
        AnalyzerKind::Motion => "Motion sensors active! Do pushups over the phone!",
        AnalyzerKind::Visual => "Visual detection active! Do pushups in front of the camera!",
        AnalyzerKind::Scripted => "Guided mode active! Perform pushups at your own pace!",
    }
}

pub(crate) fn phase(kind: AnalyzerKind, phase: Phase) -> &'static str {
    match (kind, phase) {
        (AnalyzerKind::Scripted, Phase::Down) => "Going down... maintain straight body!",
        (AnalyzerKind::Scripted, Phase::Up) => "Push up... excellent form!",
        (AnalyzerKind::Visual, Phase::Down) => "Going down... maintain good form!",
        (_, Phase::Down) => "Going down...",
        (_, Phase::Up) => "Coming up...",
    }
}

/// Shown when the analyzer loses sight of the user. `None` for the
/// scripted tier, which has nothing to lose sight of.
pub(crate) fn out_of_position(kind: AnalyzerKind) -> Option<&'static str> {
    match kind {
        AnalyzerKind::Motion => Some("Position yourself over the phone and start pushups!"),
        AnalyzerKind::Visual => Some("Position yourself in frame and start pushups!"),
        AnalyzerKind::Scripted => None,
    }
}

pub(crate) fn rep_counted(kind: AnalyzerKind, remaining: u32) -> String {
    let lead = match kind {
        AnalyzerKind::Scripted => MOTIVATION
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(MOTIVATION[0]),
        _ => "Perfect pushup!",
    };
    format!("{lead} {remaining} more to go!")
}
