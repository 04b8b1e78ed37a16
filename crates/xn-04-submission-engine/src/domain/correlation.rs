//! # Correlation
//!
//! Pure decisions taken on each status notification: keep waiting, fail, or
//! scan the block for the expected event.
//!
//! Matching is by event tag: the first event in emission order whose tag
//! equals the expected one wins. Two same-kind submissions included in the
//! same block cannot be told apart this way, which is why the engine
//! serializes same-kind submissions by default.

use crate::domain::config::Confirmation;
use crate::domain::errors::{SubmissionError, SubmissionFailure};
use shared_types::{BlockHash, InclusionPhase, RawEvent, StatusEvent};
use xn_03_operation_codec::{decode, decode_dispatch_error, EventKind, EventPayload, SYSTEM_FAILED_TAG};

/// What to do with one status notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Not the confirmation we wait for.
    Wait,
    /// The pool discarded the submission.
    Fail(SubmissionError),
    /// Confirmed; scan these events.
    Scan {
        block_hash: Option<BlockHash>,
        events: Vec<RawEvent>,
    },
}

/// Classify a status notification.
#[must_use]
pub fn step(event: StatusEvent, confirmation: Confirmation) -> Step {
    match event.phase {
        InclusionPhase::Future
        | InclusionPhase::Ready
        | InclusionPhase::Broadcast
        | InclusionPhase::Retracted
        | InclusionPhase::FinalityTimeout => Step::Wait,
        InclusionPhase::InBlock if confirmation == Confirmation::Finalized => Step::Wait,
        InclusionPhase::InBlock | InclusionPhase::Finalized => Step::Scan {
            block_hash: event.block_hash,
            events: event.events,
        },
        phase @ (InclusionPhase::Usurped | InclusionPhase::Dropped | InclusionPhase::Invalid) => {
            Step::Fail(SubmissionError::Dropped { phase })
        }
    }
}

/// Find and decode the expected event among a block's events.
pub fn correlate(
    expected: EventKind,
    block_hash: Option<BlockHash>,
    events: &[RawEvent],
) -> Result<EventPayload, SubmissionFailure> {
    if let Some(raw) = events.iter().find(|e| e.tag == expected.tag()) {
        return Ok(decode(expected, &raw.data)?);
    }

    let dispatch_error = events
        .iter()
        .find(|e| e.tag == SYSTEM_FAILED_TAG)
        .and_then(|e| decode_dispatch_error(&e.data).ok());

    Err(SubmissionFailure::UnexpectedOutcome {
        expected: expected.tag().to_string(),
        block_hash,
        observed: events.iter().map(|e| e.tag.clone()).collect(),
        dispatch_error,
    })
}
