//! Terminal results of a submission.

use crate::domain::errors::SubmissionFailure;
use serde::Serialize;
use shared_types::{BlockHash, CorrelationId};
use xn_03_operation_codec::{EventPayload, OperationKind};

/// A submission that took effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub id: CorrelationId,
    pub kind: OperationKind,
    /// Block containing the expected event.
    pub block_hash: Option<BlockHash>,
    /// The decoded expected event.
    pub payload: EventPayload,
}

/// Exactly one of these is delivered per submission.
pub type SubmissionOutcome = Result<Resolution, SubmissionFailure>;
