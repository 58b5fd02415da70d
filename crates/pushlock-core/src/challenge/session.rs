//! The challenge aggregate.
//!
//! `ChallengeSession` is a plain state machine driven by explicit
//! timestamps. It never looks at a clock and never talks to the platform;
//! the controller feeds it.
//!
//! ## State Transitions
//!
//! ```text
//! Setup -> Countdown -> Active -> Completed
//!   ^          |           |
//!   +--abort---+---abort---+
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detection::{AnalyzerKind, Phase};
use crate::storage::ChallengeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeState {
    Setup,
    Countdown,
    Active,
    /// Terminal for the session.
    Completed,
}

/// Why a rep event was dropped. Never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredRep {
    NotActive(ChallengeState),
    Debounced { since_last_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepOutcome {
    Accepted { rep_count: u32 },
    /// Accepted, and it was the last one.
    Completed { rep_count: u32 },
    Ignored(IgnoredRep),
}

/// Ticks produced by one countdown advance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownProgress {
    /// Remaining seconds after each elapsed tick, in order.
    pub ticks: Vec<u32>,
    pub activated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSession {
    id: Uuid,
    state: ChallengeState,
    rep_count: u32,
    target_reps: u32,
    phase: Phase,
    last_rep_at_ms: Option<u64>,
    analyzer_kind: Option<AnalyzerKind>,
    min_rep_interval_ms: u64,
    countdown_secs: u32,
    countdown_remaining: u32,
    next_countdown_tick_ms: Option<u64>,
    rep_timestamps: Vec<u64>,
}

impl ChallengeSession {
    /// A fresh session in `Setup`. `target_reps` is clamped to at least 1.
    pub fn new(target_reps: u32, min_rep_interval_ms: u64, countdown_secs: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ChallengeState::Setup,
            rep_count: 0,
            target_reps: target_reps.max(1),
            phase: Phase::Up,
            last_rep_at_ms: None,
            analyzer_kind: None,
            min_rep_interval_ms,
            countdown_secs: countdown_secs.max(1),
            countdown_remaining: countdown_secs.max(1),
            next_countdown_tick_ms: None,
            rep_timestamps: Vec::new(),
        }
    }

    pub fn from_config(config: &ChallengeConfig) -> Self {
        Self::new(
            config.target_reps,
            config.min_rep_interval_ms,
            config.countdown_secs,
        )
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn target_reps(&self) -> u32 {
        self.target_reps
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_rep_at_ms(&self) -> Option<u64> {
        self.last_rep_at_ms
    }

    pub fn analyzer_kind(&self) -> Option<AnalyzerKind> {
        self.analyzer_kind
    }

    pub fn countdown_secs(&self) -> u32 {
        self.countdown_secs
    }

    /// Seconds left on the countdown, only while counting down.
    pub fn countdown_remaining(&self) -> Option<u32> {
        (self.state == ChallengeState::Countdown).then_some(self.countdown_remaining)
    }

    /// Timestamps of every accepted rep.
    pub fn rep_timestamps(&self) -> &[u64] {
        &self.rep_timestamps
    }

    /// 0.0 .. 100.0
    pub fn progress_pct(&self) -> f64 {
        f64::from(self.rep_count) / f64::from(self.target_reps) * 100.0
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Setup -> Countdown. Returns false (and changes nothing) otherwise.
    pub fn start_countdown(&mut self, now_ms: u64) -> bool {
        if self.state != ChallengeState::Setup {
            return false;
        }
        self.state = ChallengeState::Countdown;
        self.countdown_remaining = self.countdown_secs;
        self.next_countdown_tick_ms = Some(now_ms.saturating_add(1000));
        tracing::info!(session = %self.id, "countdown started");
        true
    }

    /// Consume every whole second elapsed since the last tick. Reaching zero
    /// moves the session to `Active`.
    pub fn advance_countdown(&mut self, now_ms: u64) -> CountdownProgress {
        let mut progress = CountdownProgress::default();
        if self.state != ChallengeState::Countdown {
            return progress;
        }
        while let Some(due) = self.next_countdown_tick_ms {
            if now_ms < due {
                break;
            }
            self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
            progress.ticks.push(self.countdown_remaining);
            if self.countdown_remaining == 0 {
                self.next_countdown_tick_ms = None;
                self.state = ChallengeState::Active;
                progress.activated = true;
                tracing::info!(session = %self.id, "challenge active");
            } else {
                self.next_countdown_tick_ms = Some(due.saturating_add(1000));
            }
        }
        progress
    }

    /// Record which analyzer drives this session. Only the first call while
    /// active has any effect.
    pub fn set_analyzer(&mut self, kind: AnalyzerKind) -> bool {
        if self.state != ChallengeState::Active || self.analyzer_kind.is_some() {
            return false;
        }
        self.analyzer_kind = Some(kind);
        true
    }

    pub fn set_phase(&mut self, phase: Phase) -> bool {
        if self.state != ChallengeState::Active {
            return false;
        }
        self.phase = phase;
        true
    }

    /// Count a rep if the session is active and the debounce window has passed.
    pub fn on_rep_event(&mut self, at_ms: u64) -> RepOutcome {
        if self.state != ChallengeState::Active {
            return RepOutcome::Ignored(IgnoredRep::NotActive(self.state));
        }
        if let Some(last) = self.last_rep_at_ms {
            let since_last_ms = at_ms.saturating_sub(last);
            if at_ms < last || since_last_ms < self.min_rep_interval_ms {
                return RepOutcome::Ignored(IgnoredRep::Debounced { since_last_ms });
            }
        }

        self.rep_count += 1;
        self.last_rep_at_ms = Some(at_ms);
        self.rep_timestamps.push(at_ms);
        self.phase = Phase::Up;

        if self.rep_count >= self.target_reps {
            self.state = ChallengeState::Completed;
            tracing::info!(session = %self.id, reps = self.rep_count, "challenge completed");
            RepOutcome::Completed {
                rep_count: self.rep_count,
            }
        } else {
            RepOutcome::Accepted {
                rep_count: self.rep_count,
            }
        }
    }

    /// Countdown/Active return to a fresh Setup. Setup and Completed are left
    /// untouched. Returns whether anything changed.
    pub fn abort(&mut self) -> bool {
        match self.state {
            ChallengeState::Countdown | ChallengeState::Active => {
                tracing::info!(session = %self.id, from = ?self.state, "challenge aborted");
                *self = Self::new(self.target_reps, self.min_rep_interval_ms, self.countdown_secs);
                true
            }
            ChallengeState::Setup | ChallengeState::Completed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(target: u32) -> ChallengeSession {
        let mut s = ChallengeSession::new(target, 800, 3);
        s.start_countdown(0);
        assert!(s.advance_countdown(3000).activated);
        s
    }

    #[test]
    fn countdown_ticks_three_two_one() {
        let mut s = ChallengeSession::new(10, 800, 3);
        assert!(s.start_countdown(0));
        assert_eq!(s.countdown_remaining(), Some(3));

        assert!(s.advance_countdown(999).ticks.is_empty());
        assert_eq!(s.advance_countdown(1000).ticks, vec![2]);
        let last = s.advance_countdown(3500);
        assert_eq!(last.ticks, vec![1, 0]);
        assert!(last.activated);
        assert_eq!(s.state(), ChallengeState::Active);
        assert_eq!(s.countdown_remaining(), None);
    }

    #[test]
    fn start_countdown_only_from_setup() {
        let mut s = active(10);
        assert!(!s.start_countdown(5000));
        assert_eq!(s.state(), ChallengeState::Active);
    }

    #[test]
    fn reps_outside_active_are_ignored() {
        let mut s = ChallengeSession::new(10, 800, 3);
        assert_eq!(
            s.on_rep_event(0),
            RepOutcome::Ignored(IgnoredRep::NotActive(ChallengeState::Setup))
        );
        s.start_countdown(0);
        assert!(matches!(s.on_rep_event(100), RepOutcome::Ignored(_)));
        assert_eq!(s.rep_count(), 0);
    }

    #[test]
    fn debounce_rejects_close_reps() {
        let mut s = active(10);
        assert_eq!(s.on_rep_event(4000), RepOutcome::Accepted { rep_count: 1 });
        assert_eq!(
            s.on_rep_event(4799),
            RepOutcome::Ignored(IgnoredRep::Debounced { since_last_ms: 799 })
        );
        assert_eq!(s.on_rep_event(4800), RepOutcome::Accepted { rep_count: 2 });
        assert_eq!(s.rep_timestamps(), &[4000, 4800]);
    }

    #[test]
    fn out_of_order_rep_is_debounced() {
        let mut s = active(10);
        s.on_rep_event(10_000);
        assert!(matches!(
            s.on_rep_event(5_000),
            RepOutcome::Ignored(IgnoredRep::Debounced { .. })
        ));
    }

    #[test]
    fn accepted_rep_resets_phase_to_up() {
        let mut s = active(10);
        s.set_phase(Phase::Down);
        s.on_rep_event(4000);
        assert_eq!(s.phase(), Phase::Up);
    }

    #[test]
    fn completes_exactly_once_at_target() {
        let mut s = active(3);
        s.on_rep_event(4000);
        s.on_rep_event(5000);
        assert_eq!(s.on_rep_event(6000), RepOutcome::Completed { rep_count: 3 });
        assert_eq!(s.state(), ChallengeState::Completed);
        assert_eq!(
            s.on_rep_event(7000),
            RepOutcome::Ignored(IgnoredRep::NotActive(ChallengeState::Completed))
        );
        assert_eq!(s.rep_count(), 3);
    }

    #[test]
    fn abort_returns_to_fresh_setup() {
        let mut s = active(10);
        s.on_rep_event(4000);
        let id = s.id();
        assert!(s.abort());
        assert_eq!(s.state(), ChallengeState::Setup);
        assert_eq!(s.rep_count(), 0);
        assert_eq!(s.analyzer_kind(), None);
        assert_ne!(s.id(), id);
    }

    #[test]
    fn completed_survives_abort() {
        let mut s = active(1);
        s.on_rep_event(4000);
        assert!(!s.abort());
        assert_eq!(s.state(), ChallengeState::Completed);
    }

    #[test]
    fn analyzer_kind_is_set_once() {
        let mut s = active(10);
        assert!(s.set_analyzer(AnalyzerKind::Visual));
        assert!(!s.set_analyzer(AnalyzerKind::Scripted));
        assert_eq!(s.analyzer_kind(), Some(AnalyzerKind::Visual));
    }
}
