//! Domain layer for the submission engine.

pub mod config;
pub mod correlation;
pub mod errors;
pub mod gates;
pub mod outcome;
pub mod pending;
pub mod state;

pub use config::{parse_deadline, ConfigError, Confirmation, EngineConfig, NO_DEADLINE};
pub use correlation::{correlate, step, Step};
pub use errors::{OnChainEffect, SubmissionError, SubmissionFailure};
pub use gates::{GateGuard, Gates};
pub use outcome::{Resolution, SubmissionOutcome};
pub use pending::{PendingStats, PendingSubmission, PendingSubmissionStore, StatsSnapshot};
pub use state::SubmissionState;
