use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::{ChallengeState, PermissionStatus};
use crate::detection::{AnalyzerKind, Fallback, Phase};

/// Every state change of a challenge produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PermissionResolved {
        permission: PermissionStatus,
        at: DateTime<Utc>,
    },
    CountdownStarted {
        seconds: u32,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining: u32,
        at: DateTime<Utc>,
    },
    /// A detection tier was skipped while going active.
    AnalyzerFallback {
        from: AnalyzerKind,
        to: AnalyzerKind,
        reason: String,
        at: DateTime<Utc>,
    },
    ChallengeActivated {
        analyzer: AnalyzerKind,
        indicator: String,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: Phase,
        at: DateTime<Utc>,
    },
    RepCounted {
        rep_count: u32,
        target_reps: u32,
        /// Vibrate for this rep.
        haptic: bool,
        at: DateTime<Utc>,
    },
    ChallengeCompleted {
        rep_count: u32,
        analyzer: Option<AnalyzerKind>,
        at: DateTime<Utc>,
    },
    ChallengeAborted {
        from: ChallengeState,
        at: DateTime<Utc>,
    },
    /// The user confirmed completion; blocked apps are unlocked.
    CompletionAcknowledged {
        unlocked: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub(crate) fn fallback(fallback: &Fallback) -> Self {
        Event::AnalyzerFallback {
            from: fallback.from,
            to: fallback.to,
            reason: fallback.reason.clone(),
            at: Utc::now(),
        }
    }
}
