//! Wires the session to the detection arbitrator.
//!
//! The controller is what the presentation layer talks to. It runs on a
//! single cooperative thread: the caller invokes `tick()` from its timer and
//! `ingest()` from its sensor callback, never concurrently.
//!
//! ## Usage
//!
//! ```ignore
//! let mut challenge = ChallengeController::new(platform, &config);
//! challenge.request_permissions().await;
//! challenge.start_countdown(now_ms);
//! // In a loop:
//! challenge.tick(now_ms).await;          // countdown, frame capture, scripted reps
//! challenge.ingest(sample, now_ms);      // motion callback
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::feedback;
use super::session::{ChallengeSession, ChallengeState, RepOutcome};
use crate::detection::{AnalyzerKind, AnalyzerSample, DetectionArbitrator, Phase, Readout, Signal};
use crate::events::Event;
use crate::platform::{CameraPermission, Platform};
use crate::storage::Config;

/// Camera permission as seen by the challenge screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Unknown,
    Granted,
    Denied,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSnapshot {
    pub session_id: Uuid,
    pub state: ChallengeState,
    pub rep_count: u32,
    pub target_reps: u32,
    pub progress_pct: f64,
    pub phase: Phase,
    pub feedback: String,
    pub analyzer: Option<AnalyzerKind>,
    /// "MOTION" / "VISUAL" / "SCRIPTED"
    pub indicator: Option<String>,
    pub countdown_remaining: Option<u32>,
    pub in_position: bool,
    pub readout: Readout,
    pub permission: PermissionStatus,
    pub acknowledged: bool,
}

pub struct ChallengeController<P: Platform> {
    session: ChallengeSession,
    arbitrator: DetectionArbitrator<P>,
    permission: PermissionStatus,
    feedback: String,
    in_position: bool,
    readout: Readout,
    haptic: bool,
    acknowledged: bool,
}

impl<P: Platform> ChallengeController<P> {
    pub fn new(platform: P, config: &Config) -> Self {
        let session = ChallengeSession::from_config(&config.challenge);
        let arbitrator = DetectionArbitrator::new(platform, config, session.target_reps());
        Self {
            session,
            arbitrator,
            permission: PermissionStatus::Unknown,
            feedback: feedback::IDLE.to_string(),
            in_position: false,
            readout: Readout::default(),
            haptic: config.challenge.haptic_feedback,
            acknowledged: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &ChallengeSession {
        &self.session
    }

    pub fn arbitrator(&self) -> &DetectionArbitrator<P> {
        &self.arbitrator
    }

    pub fn arbitrator_mut(&mut self) -> &mut DetectionArbitrator<P> {
        &mut self.arbitrator
    }

    pub fn state(&self) -> ChallengeState {
        self.session.state()
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    pub fn snapshot(&self) -> ChallengeSnapshot {
        let analyzer = self.session.analyzer_kind();
        ChallengeSnapshot {
            session_id: self.session.id(),
            state: self.session.state(),
            rep_count: self.session.rep_count(),
            target_reps: self.session.target_reps(),
            progress_pct: self.session.progress_pct(),
            phase: self.session.phase(),
            feedback: self.feedback.clone(),
            analyzer,
            indicator: analyzer.map(|k| k.indicator().to_string()),
            countdown_remaining: self.session.countdown_remaining(),
            in_position: self.in_position,
            readout: self.readout,
            permission: self.permission,
            acknowledged: self.acknowledged,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Ask for camera access. Call again to retry after a denial.
    pub async fn request_permissions(&mut self) -> Event {
        let result = self.arbitrator.request_camera_permission().await;
        self.permission = match result {
            CameraPermission::Granted => PermissionStatus::Granted,
            CameraPermission::Denied | CameraPermission::Error => PermissionStatus::Denied,
        };
        self.feedback = feedback::permission(result).to_string();
        if self.permission == PermissionStatus::Denied {
            tracing::warn!("camera permission not granted: {result:?}");
        }
        Event::PermissionResolved {
            permission: self.permission,
            at: Utc::now(),
        }
    }

    /// Setup -> Countdown. Requires a granted camera permission.
    pub fn start_countdown(&mut self, now_ms: u64) -> Option<Event> {
        if self.permission != PermissionStatus::Granted {
            tracing::debug!("start ignored, permission is {:?}", self.permission);
            return None;
        }
        if !self.session.start_countdown(now_ms) {
            return None;
        }
        Some(Event::CountdownStarted {
            seconds: self.session.countdown_secs(),
            at: Utc::now(),
        })
    }

    /// Advance the countdown, start detection on activation, and drive the
    /// active analyzer's timers.
    pub async fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        match self.session.state() {
            ChallengeState::Countdown => {
                let progress = self.session.advance_countdown(now_ms);
                let mut events: Vec<Event> = progress
                    .ticks
                    .iter()
                    .map(|&remaining| Event::CountdownTick {
                        remaining,
                        at: Utc::now(),
                    })
                    .collect();
                if progress.activated {
                    events.extend(self.activate(now_ms).await);
                }
                events
            }
            ChallengeState::Active => {
                let signals = self.arbitrator.poll(now_ms);
                self.apply(signals)
            }
            ChallengeState::Setup | ChallengeState::Completed => Vec::new(),
        }
    }

    /// Deliver a motion sample or an externally captured frame.
    pub fn ingest(&mut self, sample: AnalyzerSample, now_ms: u64) -> Vec<Event> {
        if self.session.state() != ChallengeState::Active {
            return Vec::new();
        }
        let signals = self.arbitrator.ingest(sample, now_ms);
        self.apply(signals)
    }

    /// Cancel from any state. Detection is torn down first.
    pub fn abort(&mut self) -> Event {
        self.arbitrator.stop();
        let from = self.session.state();
        if self.session.abort() {
            self.in_position = false;
            self.readout = Readout::default();
            self.feedback = feedback::IDLE.to_string();
        }
        Event::ChallengeAborted {
            from,
            at: Utc::now(),
        }
    }

    /// Confirm a completed challenge. Only the first call does anything.
    pub fn acknowledge_completion(&mut self) -> Option<Event> {
        if self.session.state() != ChallengeState::Completed || self.acknowledged {
            return None;
        }
        self.arbitrator.stop();
        self.acknowledged = true;
        tracing::info!(session = %self.session.id(), "completion acknowledged, apps unlocked");
        Some(Event::CompletionAcknowledged {
            unlocked: true,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn activate(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let kind = match self.arbitrator.start(now_ms).await {
            Some(activation) => {
                events.extend(activation.fallbacks.iter().map(Event::fallback));
                activation.kind
            }
            None => match self.arbitrator.kind() {
                Some(kind) => kind,
                None => return events,
            },
        };
        self.session.set_analyzer(kind);
        self.feedback = if events.is_empty() {
            feedback::START.to_string()
        } else {
            feedback::activated(kind).to_string()
        };
        events.push(Event::ChallengeActivated {
            analyzer: kind,
            indicator: kind.indicator().to_string(),
            at: Utc::now(),
        });
        events
    }

    fn apply(&mut self, signals: Vec<Signal>) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(kind) = self.session.analyzer_kind() else {
            return events;
        };

        for signal in signals {
            if self.session.state() != ChallengeState::Active {
                tracing::debug!("dropping {signal:?}, session is {:?}", self.session.state());
                break;
            }
            match signal {
                Signal::Phase(phase) => {
                    if self.session.phase() != phase {
                        events.push(Event::PhaseChanged {
                            phase,
                            at: Utc::now(),
                        });
                    }
                    self.session.set_phase(phase);
                    self.feedback = feedback::phase(kind, phase).to_string();
                }
                Signal::InPosition(in_position) => {
                    self.in_position = in_position;
                    if !in_position {
                        if let Some(prompt) = feedback::out_of_position(kind) {
                            self.feedback = prompt.to_string();
                        }
                    }
                }
                Signal::Readout(readout) => self.readout = readout,
                Signal::Rep { at_ms } => match self.session.on_rep_event(at_ms) {
                    RepOutcome::Accepted { rep_count } => {
                        let remaining = self.session.target_reps() - rep_count;
                        self.feedback = feedback::rep_counted(kind, remaining);
                        events.push(self.rep_counted(rep_count));
                    }
                    RepOutcome::Completed { rep_count } => {
                        self.arbitrator.stop();
                        self.feedback = feedback::COMPLETED.to_string();
                        events.push(self.rep_counted(rep_count));
                        events.push(Event::ChallengeCompleted {
                            rep_count,
                            analyzer: Some(kind),
                            at: Utc::now(),
                        });
                    }
                    RepOutcome::Ignored(reason) => {
                        tracing::debug!("rep at {at_ms}ms ignored: {reason:?}");
                    }
                },
            }
        }
        events
    }

    fn rep_counted(&self, rep_count: u32) -> Event {
        Event::RepCounted {
            rep_count,
            target_reps: self.session.target_reps(),
            haptic: self.haptic,
            at: Utc::now(),
        }
    }
}
