//! Property tests for the counting invariants.

use proptest::prelude::*;

use pushlock_core::challenge::{ChallengeSession, ChallengeState, RepOutcome};
use pushlock_core::detection::{
    AnalyzerSample, MotionAnalyzer, MotionConfig, MotionSample, RepAnalyzer, ScriptedConfig,
    ScriptedGenerator, Signal, VisualAnalyzer, VisualConfig,
};
use pushlock_core::platform::Frame;

const DEBOUNCE_MS: u64 = 800;

fn active_session(target: u32) -> ChallengeSession {
    let mut session = ChallengeSession::new(target, DEBOUNCE_MS, 3);
    session.start_countdown(0);
    session.advance_countdown(3000);
    session
}

fn rep_times(signals: &[Signal]) -> Vec<u64> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::Rep { at_ms } => Some(*at_ms),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Advance(u64),
    Rep(u64),
    Abort,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        (0u64..2000).prop_map(Op::Advance),
        (0u64..2000).prop_map(Op::Rep),
        Just(Op::Abort),
    ]
}

fn legal(from: ChallengeState, to: ChallengeState) -> bool {
    use ChallengeState::*;
    from == to
        || matches!(
            (from, to),
            (Setup, Countdown)
                | (Countdown, Active)
                | (Active, Completed)
                | (Countdown, Setup)
                | (Active, Setup)
        )
}

proptest! {
    #[test]
    fn accepted_reps_are_bounded_and_spaced(
        target in 1u32..=50,
        gaps in prop::collection::vec(0u64..2500, 0..120),
    ) {
        let mut session = active_session(target);
        let mut t = 3000;
        let mut accepted = 0u32;
        for gap in gaps {
            t += gap;
            match session.on_rep_event(t) {
                RepOutcome::Accepted { .. } | RepOutcome::Completed { .. } => accepted += 1,
                RepOutcome::Ignored(_) => {}
            }
        }
        prop_assert_eq!(session.rep_count(), accepted);
        prop_assert!(session.rep_count() <= target);
        prop_assert!(session
            .rep_timestamps()
            .windows(2)
            .all(|w| w[1] - w[0] >= DEBOUNCE_MS));
    }

    #[test]
    fn only_legal_transitions(ops in prop::collection::vec(op(), 0..80)) {
        let mut session = ChallengeSession::new(5, DEBOUNCE_MS, 3);
        let mut now = 0u64;
        for op in ops {
            let before = session.state();
            match op {
                Op::Start => { session.start_countdown(now); }
                Op::Advance(dt) => { now += dt; session.advance_countdown(now); }
                Op::Rep(dt) => { now += dt; session.on_rep_event(now); }
                Op::Abort => { session.abort(); }
            }
            let after = session.state();
            prop_assert!(legal(before, after), "{:?} -> {:?}", before, after);
            if before == ChallengeState::Completed {
                prop_assert_eq!(after, ChallengeState::Completed);
            }
        }
    }

    #[test]
    fn one_motion_crossing_is_one_rep(
        before in prop::collection::vec(-0.49f64..0.49, 0..20),
        between in prop::collection::vec(-0.49f64..0.49, 0..20),
        after in prop::collection::vec(-0.49f64..0.49, 0..20),
    ) {
        let mut analyzer = MotionAnalyzer::new(MotionConfig::default());
        analyzer.start(0);
        let ys = before
            .into_iter()
            .chain(std::iter::once(-0.9))
            .chain(between)
            .chain(std::iter::once(0.9))
            .chain(after);

        let mut signals = Vec::new();
        for (i, y) in ys.enumerate() {
            let sample = AnalyzerSample::Motion(MotionSample::new(0.0, y, 0.0));
            signals.extend(analyzer.on_sample(sample, i as u64 * 100));
        }
        prop_assert_eq!(rep_times(&signals).len(), 1);
    }

    #[test]
    fn visual_noise_below_threshold_counts_nothing(
        noise in prop::collection::vec(prop::collection::vec(0u8..=10, 16 * 16 * 4), 1..40),
    ) {
        let mut analyzer = VisualAnalyzer::new(VisualConfig::default());
        analyzer.start(0);
        let mut signals = Vec::new();
        for (i, bytes) in noise.into_iter().enumerate() {
            let rgba = bytes.into_iter().map(|n| 100 + n).collect();
            let frame = Frame::from_rgba(16, 16, rgba).unwrap();
            signals.extend(analyzer.on_sample(AnalyzerSample::Frame(frame), i as u64 * 100));
        }
        prop_assert!(rep_times(&signals).is_empty());
        prop_assert!(!signals.contains(&Signal::InPosition(true)));
    }

    #[test]
    fn scripted_emits_exactly_target_with_shrinking_gaps(
        target in 1u32..=50,
        step_ms in 1u64..700,
    ) {
        let config = ScriptedConfig::default();
        let mut generator = ScriptedGenerator::new(config.clone(), target);
        generator.start(0);
        let mut signals = Vec::new();
        let mut t = 0;
        while generator.is_running() {
            t += step_ms;
            signals.extend(generator.poll(t));
        }
        let reps = rep_times(&signals);
        prop_assert_eq!(reps.len() as u32, target);
        let gaps: Vec<u64> = reps.windows(2).map(|w| w[1] - w[0]).collect();
        prop_assert!(gaps.windows(2).all(|g| g[1] <= g[0]));
        prop_assert!(gaps.iter().all(|&g| g >= config.min_interval_ms));
    }
}
