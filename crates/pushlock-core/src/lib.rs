//! # Pushlock Core Library
//!
//! This library provides the rep-detection pipeline behind the Pushlock app
//! blocker: blocked apps stay locked until the user completes a set of
//! pushups. It follows a CLI-first philosophy where every operation is
//! reachable from the standalone `pushlock-cli` binary, and a mobile or web
//! shell is a thin presentation layer over the same core.
//!
//! ## Architecture
//!
//! - **Challenge**: A timestamp-driven state machine that requires the caller
//!   to periodically invoke `tick()` for countdown and analyzer progress
//! - **Detection**: Three rep analyzers (motion, visual, scripted) and the
//!   arbitrator that picks one and owns its resources
//! - **Platform**: Capability boundary for permissions, sensors and cameras
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ChallengeController`]: Challenge lifecycle and event stream
//! - [`DetectionArbitrator`]: Analyzer selection with graceful fallback
//! - [`Platform`]: Trait implemented by each runtime
//! - [`Config`]: Application configuration management

pub mod challenge;
pub mod detection;
pub mod error;
pub mod events;
pub mod platform;
pub mod storage;

pub use challenge::{
    ChallengeController, ChallengeSession, ChallengeSnapshot, ChallengeState, PermissionStatus,
};
pub use detection::{
    AnalyzerKind, AnalyzerSample, DetectionArbitrator, MotionSample, Phase, RepAnalyzer, Signal,
};
pub use error::{ConfigError, CoreError, PlatformError, ValidationError};
pub use events::Event;
pub use platform::{CapabilityProfile, Frame, Platform, RuntimeKind, SimulatedPlatform};
pub use storage::Config;
