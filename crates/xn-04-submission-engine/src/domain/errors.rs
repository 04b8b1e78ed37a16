//! # Submission Failures
//!
//! Every failure says what it did to the ledger, so callers can tell
//! "nothing happened" from "something happened but not what was expected".

use shared_types::{AccountError, BlockHash, ConnectionError, InclusionPhase};
use std::time::Duration;
use thiserror::Error;
use xn_03_operation_codec::{DecodingError, DispatchError, EncodingError};

/// What a failed submission did on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnChainEffect {
    /// The operation never took effect.
    None,
    /// The operation may or may not land; the client cannot tell.
    Unknown,
    /// The operation was included but did not produce the expected event.
    LandedWithoutExpectedEffect,
}

/// Node-side submission failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The node refused the extrinsic outright.
    #[error("rejected by node: {reason}")]
    Rejected { reason: String },

    /// The pool discarded the extrinsic before inclusion.
    #[error("discarded by pool ({phase})")]
    Dropped { phase: InclusionPhase },

    /// The node ended the status watch before any terminal phase.
    #[error("status watch ended before inclusion")]
    WatchEnded,

    /// The node did not answer the submission in time.
    #[error("no answer from node after {after:?}")]
    Unanswered { after: Duration },

    /// The node answered with something unintelligible.
    #[error("protocol error: {reason}")]
    Protocol { reason: String },
}

/// Terminal failure of one submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// The connection was unusable before anything was sent.
    #[error("connection unavailable: {0}")]
    Connection(ConnectionError),

    /// The connection dropped after the extrinsic was handed to the node.
    #[error("connection lost while awaiting inclusion (last phase: {last_phase:?})")]
    ConnectionLost { last_phase: Option<InclusionPhase> },

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Included, but the block did not contain the expected event.
    #[error("included in block without the expected event {expected} (saw {observed:?})")]
    UnexpectedOutcome {
        expected: String,
        block_hash: Option<BlockHash>,
        observed: Vec<String>,
        dispatch_error: Option<DispatchError>,
    },

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// The expected event was found but could not be decoded.
    #[error("decoding failed: {0}")]
    Decoding(#[from] DecodingError),

    /// The required confirmation did not arrive in time.
    #[error("no confirmation after {after:?}")]
    Timeout { after: Duration },

    /// Abandoned by the caller.
    #[error("cancelled by caller")]
    Cancelled { after_submit: bool },
}

impl SubmissionFailure {
    /// What this failure did to the ledger.
    #[must_use]
    pub fn effect(&self) -> OnChainEffect {
        match self {
            SubmissionFailure::Connection(_)
            | SubmissionFailure::Account(_)
            | SubmissionFailure::Encoding(_) => OnChainEffect::None,
            SubmissionFailure::Submission(err) => match err {
                SubmissionError::Rejected { .. } | SubmissionError::Dropped { .. } => {
                    OnChainEffect::None
                }
                SubmissionError::WatchEnded
                | SubmissionError::Unanswered { .. }
                | SubmissionError::Protocol { .. } => OnChainEffect::Unknown,
            },
            SubmissionFailure::UnexpectedOutcome { .. } => {
                OnChainEffect::LandedWithoutExpectedEffect
            }
            SubmissionFailure::ConnectionLost { .. }
            | SubmissionFailure::Decoding(_)
            | SubmissionFailure::Timeout { .. } => OnChainEffect::Unknown,
            SubmissionFailure::Cancelled { after_submit } => {
                if *after_submit {
                    OnChainEffect::Unknown
                } else {
                    OnChainEffect::None
                }
            }
        }
    }

    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, SubmissionFailure::ConnectionLost { .. })
    }

    #[must_use]
    pub fn is_unexpected_outcome(&self) -> bool {
        matches!(self, SubmissionFailure::UnexpectedOutcome { .. })
    }
}
