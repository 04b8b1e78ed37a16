//! Submission state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where one submission is in its lifecycle.
///
/// ```text
/// Building → Signing → Submitted → AwaitingInclusion → Resolving → Resolved
///     │         │          │               │               │
///     └─────────┴──────────┴───────────────┴───────────────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    /// Encoding the call and resolving the signer.
    Building,
    /// Fetching the nonce, signing and handing the extrinsic to the node.
    Signing,
    /// Accepted by the node; status subscription open.
    Submitted,
    /// Consuming status notifications until the required confirmation.
    AwaitingInclusion,
    /// Scanning the block's events for the expected one.
    Resolving,
    Resolved,
    Failed,
}

impl SubmissionState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Resolved | SubmissionState::Failed)
    }

    /// Whether the extrinsic may already have reached the node.
    #[must_use]
    pub fn may_have_submitted(&self) -> bool {
        matches!(
            self,
            SubmissionState::Signing
                | SubmissionState::Submitted
                | SubmissionState::AwaitingInclusion
                | SubmissionState::Resolving
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Building => "building",
            SubmissionState::Signing => "signing",
            SubmissionState::Submitted => "submitted",
            SubmissionState::AwaitingInclusion => "awaitingInclusion",
            SubmissionState::Resolving => "resolving",
            SubmissionState::Resolved => "resolved",
            SubmissionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
