use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Subcommand, ValueEnum};
use pushlock_core::challenge::{ChallengeController, ChallengeState};
use pushlock_core::error::{CoreError, Result};
use pushlock_core::platform::{CameraPermission, CapabilityProfile, Frame, MotionPermission};
use pushlock_core::{AnalyzerSample, Config, Event, SimulatedPlatform};

use super::trace::{self, TraceSample};

#[derive(Clone, Copy, ValueEnum)]
pub enum Runtime {
    Native,
    Browser,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MotionPermissionArg {
    Granted,
    Denied,
    NotRequired,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FramePattern {
    /// Alternate dark and bright frames, read as steady pushups
    Flicker,
    /// Identical frames, nobody in view
    Still,
}

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Run a challenge against a simulated device, printing events as JSON lines
    Simulate {
        #[arg(long, value_enum, default_value = "native")]
        runtime: Runtime,
        /// Required pushups (overrides config)
        #[arg(long)]
        target: Option<u32>,
        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
        /// Refuse camera access
        #[arg(long)]
        deny_camera: bool,
        /// Device has a motion sensor (browser runtimes default to none)
        #[arg(long)]
        motion_sensor: bool,
        #[arg(long, value_enum)]
        motion_permission: Option<MotionPermissionArg>,
        /// No camera surface available
        #[arg(long)]
        no_camera: bool,
        /// Motion sensor module fails to start
        #[arg(long)]
        motion_init_fails: bool,
        /// Camera stream fails to open
        #[arg(long)]
        camera_init_fails: bool,
        /// Frames produced by the simulated camera
        #[arg(long, value_enum, default_value = "flicker")]
        frames: FramePattern,
        /// Motion trace in JSON lines (defaults to a clean template run)
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Pace the simulation with the wall clock
        #[arg(long)]
        realtime: bool,
        #[arg(long, default_value = "100")]
        tick_ms: u64,
        /// Give up after this many simulated seconds
        #[arg(long, default_value = "120")]
        max_secs: u64,
    },
    /// Print a motion trace of clean pushups as JSON lines
    TraceTemplate {
        #[arg(long, default_value = "10")]
        reps: u32,
        /// Countdown the trace waits out (defaults to the configured one)
        #[arg(long)]
        countdown_secs: Option<u32>,
    },
}

pub fn run(action: ChallengeAction) -> Result<()> {
    match action {
        ChallengeAction::Simulate {
            runtime,
            target,
            config,
            deny_camera,
            motion_sensor,
            motion_permission,
            no_camera,
            motion_init_fails,
            camera_init_fails,
            frames,
            trace,
            realtime,
            tick_ms,
            max_secs,
        } => {
            let mut cfg = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load_or_default(),
            };
            if let Some(target) = target {
                cfg.set("challenge.target_reps", &target.to_string())?;
            }

            let mut profile = match runtime {
                Runtime::Native => CapabilityProfile::native(),
                Runtime::Browser => CapabilityProfile::browser(),
            };
            if deny_camera {
                profile.camera_permission = CameraPermission::Denied;
            }
            if motion_sensor {
                profile.motion_sensor = true;
            }
            if let Some(permission) = motion_permission {
                profile.motion_permission = match permission {
                    MotionPermissionArg::Granted => MotionPermission::Granted,
                    MotionPermissionArg::Denied => MotionPermission::Denied,
                    MotionPermissionArg::NotRequired => MotionPermission::NotRequired,
                };
            }
            if no_camera {
                profile.camera_surface = false;
            }
            profile.motion_init_fails = motion_init_fails;
            profile.camera_init_fails = camera_init_fails;

            let samples = match trace {
                Some(path) => trace::load(&path)?,
                None => trace::template(cfg.challenge.target_reps, cfg.challenge.countdown_secs),
            };

            let platform =
                SimulatedPlatform::new(profile).with_frame_source(move |i| match frames {
                    FramePattern::Flicker if i % 2 == 1 => Frame::solid(32, 24, [230, 230, 230]),
                    _ => Frame::solid(32, 24, [20, 20, 20]),
                });

            let sim = Simulation {
                controller: ChallengeController::new(platform, &cfg),
                samples,
                tick_ms: tick_ms.max(1),
                max_ms: max_secs.saturating_mul(1000),
            };
            let rt = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
            rt.block_on(sim.run(realtime))
        }
        ChallengeAction::TraceTemplate {
            reps,
            countdown_secs,
        } => {
            let countdown_secs = countdown_secs
                .unwrap_or_else(|| Config::load_or_default().challenge.countdown_secs);
            for sample in trace::template(reps, countdown_secs) {
                println!("{}", serde_json::to_string(&sample)?);
            }
            Ok(())
        }
    }
}

struct Simulation {
    controller: ChallengeController<SimulatedPlatform>,
    samples: Vec<TraceSample>,
    tick_ms: u64,
    max_ms: u64,
}

impl Simulation {
    async fn run(mut self, realtime: bool) -> Result<()> {
        emit(&self.controller.request_permissions().await)?;
        let Some(started) = self.controller.start_countdown(0) else {
            return Err(CoreError::Custom(self.controller.feedback().to_string()));
        };
        emit(&started)?;

        let clock = Instant::now();
        let mut interval = tokio::time::interval(Duration::from_millis(self.tick_ms));
        let mut next_sample = 0;
        let mut now_ms = 0;

        while now_ms <= self.max_ms {
            if realtime {
                interval.tick().await;
                now_ms = clock.elapsed().as_millis() as u64;
            }

            while let Some(s) = self.samples.get(next_sample).filter(|s| s.at_ms <= now_ms) {
                let sample = AnalyzerSample::Motion(s.sample);
                let at_ms = s.at_ms;
                next_sample += 1;
                for event in self.controller.ingest(sample, at_ms) {
                    emit(&event)?;
                }
            }
            for event in self.controller.tick(now_ms).await {
                emit(&event)?;
            }

            if self.controller.state() == ChallengeState::Completed {
                if let Some(event) = self.controller.acknowledge_completion() {
                    emit(&event)?;
                }
                return Ok(());
            }
            if !realtime {
                now_ms += self.tick_ms;
            }
        }

        let snapshot = self.controller.snapshot();
        emit(&self.controller.abort())?;
        Err(CoreError::Custom(format!(
            "challenge incomplete after {}s: {}/{} reps",
            self.max_ms / 1000,
            snapshot.rep_count,
            snapshot.target_reps
        )))
    }
}

fn emit(event: &Event) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
