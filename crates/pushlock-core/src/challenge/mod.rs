//! The pushup challenge.
//!
//! [`ChallengeSession`] holds the state; [`ChallengeController`] connects it
//! to detection and produces [`crate::events::Event`]s for the presentation
//! layer.

mod controller;
mod feedback;
mod session;

pub use controller::{ChallengeController, ChallengeSnapshot, PermissionStatus};
pub use session::{ChallengeSession, ChallengeState, CountdownProgress, IgnoredRep, RepOutcome};
