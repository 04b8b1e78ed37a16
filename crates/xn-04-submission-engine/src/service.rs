//! # Submission Engine Service
//!
//! Drives each identity operation from encoding to a single terminal
//! outcome. Every submission runs in its own task inside a `submission` span;
//! the caller holds a `SubmissionTicket` to observe or abandon it.

use crate::domain::{
    correlate, step, Confirmation, EngineConfig, Gates, PendingSubmission,
    PendingSubmissionStore, Resolution, StatsSnapshot, Step, SubmissionError, SubmissionFailure,
    SubmissionOutcome, SubmissionState,
};
use shared_bus::{CloseReason, StatusSubscription, SubscriptionError};
use shared_types::{
    AccountAddress, BlockHash, ChainId, ConnectionError, CorrelationId, InclusionPhase, RawEvent,
    SignedExtrinsic,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use xn_01_connection_manager::{ConnectionHandle, LedgerError};
use xn_02_account_registry::AccountRegistry;
use xn_03_operation_codec::{
    encode, signing_payload, ChainLinked, ChainUnlinked, DecodingError, DocumentCreated,
    EventPayload, Operation, OperationKind,
};

struct EngineShared {
    connection: ConnectionHandle,
    registry: Arc<AccountRegistry>,
    config: EngineConfig,
    store: Arc<PendingSubmissionStore>,
    accounts: Gates<AccountAddress>,
    kinds: Gates<OperationKind>,
}

/// Submits identity operations over one connection and correlates each with
/// the event it is expected to emit.
#[derive(Clone)]
pub struct SubmissionEngine {
    shared: Arc<EngineShared>,
}

impl SubmissionEngine {
    pub fn new(
        connection: ConnectionHandle,
        registry: Arc<AccountRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                connection,
                registry,
                config,
                store: Arc::new(PendingSubmissionStore::new()),
                accounts: Gates::new(),
                kinds: Gates::new(),
            }),
        }
    }

    /// Start submitting `operation` signed by `submitter`.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    pub fn submit(&self, submitter: &AccountAddress, operation: Operation) -> SubmissionTicket {
        let kind = operation.kind();
        let (id, outcome) = self.shared.store.register(kind, submitter.clone());
        let (progress_tx, progress) = watch::channel(SubmissionState::Building);

        let driver = Driver {
            shared: Arc::clone(&self.shared),
            id,
            kind,
            submitter: submitter.clone(),
            progress: progress_tx,
        };
        let span = info_span!("submission", correlation_id = %id, %kind);
        let task = tokio::spawn(driver.run(operation).instrument(span));

        SubmissionTicket {
            id,
            kind,
            progress,
            outcome,
            task: task.abort_handle(),
            store: Arc::clone(&self.shared.store),
            cancelled: None,
            finished: false,
        }
    }

    /// Create a DID document for `submitter`.
    pub async fn create_identity(
        &self,
        submitter: &AccountAddress,
    ) -> Result<DocumentCreated, SubmissionFailure> {
        match self
            .submit(submitter, Operation::CreateIdentity)
            .outcome()
            .await?
            .payload
        {
            EventPayload::DocumentCreated(event) => Ok(event),
            other => Err(wrong_payload(&other)),
        }
    }

    /// Link an external chain address to `submitter`'s document.
    pub async fn link_chain(
        &self,
        submitter: &AccountAddress,
        chain_name: &str,
        chain_id: ChainId,
        address: &str,
    ) -> Result<ChainLinked, SubmissionFailure> {
        let operation = Operation::link_chain(chain_name, chain_id, address);
        match self.submit(submitter, operation).outcome().await?.payload {
            EventPayload::ChainLinked(event) => Ok(event),
            other => Err(wrong_payload(&other)),
        }
    }

    /// Remove a linked chain from `submitter`'s document.
    pub async fn unlink_chain(
        &self,
        submitter: &AccountAddress,
        chain_id: ChainId,
    ) -> Result<ChainUnlinked, SubmissionFailure> {
        let operation = Operation::UnlinkChain { chain_id };
        match self.submit(submitter, operation).outcome().await?.payload {
            EventPayload::ChainUnlinked(event) => Ok(event),
            other => Err(wrong_payload(&other)),
        }
    }

    /// In-flight submissions, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingSubmission> {
        self.shared.store.snapshot()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.store.stats().snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionHandle {
        &self.shared.connection
    }
}

impl fmt::Debug for SubmissionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionEngine")
            .field("connection", &self.shared.connection)
            .field("config", &self.shared.config)
            .field("pending", &self.shared.store.pending_count())
            .finish()
    }
}

fn wrong_payload(payload: &EventPayload) -> SubmissionFailure {
    SubmissionFailure::Decoding(DecodingError::Malformed {
        what: "resolution",
        reason: format!("unexpected {:?} payload", payload.kind()),
    })
}

/// One submission's task.
struct Driver {
    shared: Arc<EngineShared>,
    id: CorrelationId,
    kind: OperationKind,
    submitter: AccountAddress,
    progress: watch::Sender<SubmissionState>,
}

impl Driver {
    async fn run(self, operation: Operation) {
        let outcome = self.drive(operation).await;
        let state = match &outcome {
            Ok(resolution) => {
                info!(block = ?resolution.block_hash.map(hex_prefix), "Submission resolved");
                SubmissionState::Resolved
            }
            Err(failure) => {
                warn!(error = %failure, effect = ?failure.effect(), "Submission failed");
                SubmissionState::Failed
            }
        };
        // Deliver before publishing the terminal state, so a caller that
        // observes it can no longer cancel.
        self.shared.store.complete(&self.id, outcome);
        self.progress.send_replace(state);
        debug!(%state, "Submission finished");
    }

    async fn drive(&self, operation: Operation) -> SubmissionOutcome {
        let call = encode(&operation)?;
        let signer = self.shared.registry.resolve_signer(&self.submitter)?;

        let _kind_gate = if self.shared.config.serialize_same_kind {
            Some(self.shared.kinds.acquire(&self.kind).await)
        } else {
            None
        };
        self.advance(SubmissionState::Signing);

        let mut subscription = {
            let _account_gate = self.shared.accounts.acquire(&self.submitter).await;
            let nonce = self
                .shared
                .connection
                .next_nonce(&self.submitter)
                .await
                .map_err(|e| self.before_submit(e))?;

            let payload = signing_payload(&self.submitter, nonce, &call);
            let signature = signer.sign(&payload).await?;
            let extrinsic = SignedExtrinsic {
                version: SignedExtrinsic::CURRENT_VERSION,
                signer: self.submitter.clone(),
                public_key: signer.public_key(),
                nonce,
                call: call.into_inner(),
                signature,
            };
            debug!(nonce, "Signed");

            self.shared
                .connection
                .submit_and_watch(&extrinsic)
                .await
                .map_err(at_submit)?
        };
        self.shared.store.set_handle(&self.id, subscription.handle());
        self.advance(SubmissionState::Submitted);

        self.advance(SubmissionState::AwaitingInclusion);
        let wait = self.await_inclusion(&mut subscription);
        let (block_hash, events) = match self.shared.config.inclusion_timeout {
            Some(after) => timeout(after, wait)
                .await
                .map_err(|_| SubmissionFailure::Timeout { after })??,
            None => wait.await?,
        };
        drop(subscription);

        self.advance(SubmissionState::Resolving);
        let payload = correlate(self.kind.expected_event(), block_hash, &events)?;
        Ok(Resolution {
            id: self.id,
            kind: self.kind,
            block_hash,
            payload,
        })
    }

    /// Consume status notifications until the required confirmation.
    async fn await_inclusion(
        &self,
        subscription: &mut StatusSubscription,
    ) -> Result<(Option<BlockHash>, Vec<RawEvent>), SubmissionFailure> {
        let confirmation: Confirmation = self.shared.config.confirmation;
        let mut last_phase = None;

        loop {
            let event = tokio::select! {
                biased;
                received = subscription.recv() => match received {
                    Ok(event) => event,
                    Err(SubscriptionError::Closed(reason)) => {
                        return Err(self.watch_closed(reason, last_phase));
                    }
                },
                _ = self.shared.connection.lost() => {
                    return Err(SubmissionFailure::ConnectionLost { last_phase });
                }
            };

            let phase = event.phase;
            debug!(%phase, "Status notification");
            match step(event, confirmation) {
                Step::Wait => last_phase = Some(phase),
                Step::Fail(err) => return Err(err.into()),
                Step::Scan { block_hash, events } => return Ok((block_hash, events)),
            }
        }
    }

    fn watch_closed(
        &self,
        reason: CloseReason,
        last_phase: Option<InclusionPhase>,
    ) -> SubmissionFailure {
        if reason.is_connection_failure() || !self.shared.connection.state().is_live() {
            SubmissionFailure::ConnectionLost { last_phase }
        } else {
            SubmissionError::WatchEnded.into()
        }
    }

    /// Failures before anything reached the node.
    fn before_submit(&self, err: LedgerError) -> SubmissionFailure {
        match err {
            LedgerError::Connection(e) => SubmissionFailure::Connection(e),
            LedgerError::Timeout { after } => {
                SubmissionFailure::Connection(ConnectionError::Unreachable {
                    node: self.shared.connection.node_address().to_string(),
                    reason: format!("no account index after {after:?}"),
                })
            }
            LedgerError::Rejected { reason } | LedgerError::Protocol(reason) => {
                SubmissionFailure::Connection(ConnectionError::ProtocolMismatch { reason })
            }
            LedgerError::Encoding(e) => SubmissionFailure::Encoding(e),
        }
    }

    fn advance(&self, state: SubmissionState) {
        self.progress.send_replace(state);
        self.shared.store.set_state(&self.id, state);
        debug!(%state, "Submission advanced");
    }
}

/// Failures while handing the extrinsic to the node.
fn at_submit(err: LedgerError) -> SubmissionFailure {
    match err {
        LedgerError::Connection(_) => SubmissionFailure::ConnectionLost { last_phase: None },
        LedgerError::Rejected { reason } => SubmissionError::Rejected { reason }.into(),
        LedgerError::Timeout { after } => SubmissionError::Unanswered { after }.into(),
        LedgerError::Protocol(reason) => SubmissionError::Protocol { reason }.into(),
        LedgerError::Encoding(e) => SubmissionFailure::Encoding(e),
    }
}

fn hex_prefix(hash: BlockHash) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// The caller's side of one submission.
///
/// Dropping an unfinished ticket abandons the submission: its status route
/// is released, but an extrinsic already handed to the node may still land.
pub struct SubmissionTicket {
    id: CorrelationId,
    kind: OperationKind,
    progress: watch::Receiver<SubmissionState>,
    outcome: oneshot::Receiver<SubmissionOutcome>,
    task: AbortHandle,
    store: Arc<PendingSubmissionStore>,
    /// `Some(after_submit)` once cancelled.
    cancelled: Option<bool>,
    finished: bool,
}

impl SubmissionTicket {
    #[must_use]
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current state. A cancelled ticket reports `Failed`.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        if self.cancelled.is_some() {
            SubmissionState::Failed
        } else {
            *self.progress.borrow()
        }
    }

    /// Follow state changes.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<SubmissionState> {
        self.progress.clone()
    }

    /// Stop driving the submission and release its resources.
    ///
    /// Returns false, leaving the ticket untouched, if the submission had
    /// already finished or was already cancelled. Its outcome is then still
    /// available from `outcome()`.
    pub fn cancel(&mut self) -> bool {
        if self.finished || self.cancelled.is_some() {
            return false;
        }
        if !self.store.cancel(&self.id) {
            return false;
        }
        self.task.abort();
        let after_submit = self.progress.borrow().may_have_submitted();
        self.cancelled = Some(after_submit);
        info!(correlation_id = %self.id, after_submit, "Submission cancelled by caller");
        true
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(mut self) -> SubmissionOutcome {
        if let Some(after_submit) = self.cancelled {
            return Err(SubmissionFailure::Cancelled { after_submit });
        }
        let received = (&mut self.outcome).await;
        self.finished = true;
        match received {
            Ok(outcome) => outcome,
            Err(_) => Err(SubmissionFailure::Cancelled {
                after_submit: self.progress.borrow().may_have_submitted(),
            }),
        }
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        if self.finished || self.cancelled.is_some() {
            return;
        }
        if self.store.is_pending(&self.id) {
            self.task.abort();
            self.store.cancel(&self.id);
            debug!(correlation_id = %self.id, "Submission abandoned");
        }
    }
}

impl fmt::Debug for SubmissionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionTicket")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}
