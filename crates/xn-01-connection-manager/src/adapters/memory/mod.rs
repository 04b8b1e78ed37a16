//! # In-Memory Ledger
//!
//! A deterministic, single-process ledger node. It verifies and executes
//! submissions against the DID pallet and pushes the same status sequence a
//! real node does:
//!
//! ```text
//! Ready → Broadcast → InBlock{events} → Finalized{events}
//! ```
//!
//! Every block carries a fee event, then the pallet event (or the dispatch
//! error), then the system result event. All watchers of a block receive the
//! block's full event list.
//!
//! Test controls: scripted status sequences, outright rejection, held
//! inclusion, dropped connections, metadata overrides and unreachable mode.

mod pallet;

pub use pallet::PalletError;

use crate::ports::{LedgerConnector, LedgerTransport, TransportError};
use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use pallet::DidRegistry;
use parking_lot::Mutex;
use shared_bus::NotificationRouter;
use shared_types::{
    AccountAddress, BlockHash, DidDocument, InclusionPhase, LedgerMetadata, RawEvent,
    SignedExtrinsic, StatusEvent, SubmissionHandle,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use xn_03_operation_codec::{
    decode_call, decode_extrinsic, encode_dispatch_error, encode_document, encode_event,
    required_calls, required_events, signing_payload, CallBytes, DispatchError, Operation,
    CODEC_VERSION, SYSTEM_SUCCESS_TAG,
};

/// Tag of the fee event preceding every dispatch.
pub const FEE_EVENT_TAG: &str = "Balances.Withdraw";

/// A ledger node living in this process.
///
/// Cheap to clone; clones share state. Implements `LedgerConnector`, so a
/// `ConnectionManager` can connect to it like any remote node.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<LedgerInner>,
}

#[derive(Default)]
struct LedgerInner {
    chain: Mutex<ChainState>,
    controls: Mutex<Controls>,
    links: Mutex<Vec<Weak<watch::Sender<bool>>>>,
}

#[derive(Default)]
struct ChainState {
    registry: DidRegistry,
    /// Committed account indices.
    nonces: HashMap<AccountAddress, u64>,
    /// Submissions per account sitting in the pool.
    pending: HashMap<AccountAddress, u64>,
    block_number: u64,
    held: Vec<PoolEntry>,
}

impl ChainState {
    fn next_nonce(&self, account: &AccountAddress) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
            + self.pending.get(account).copied().unwrap_or(0)
    }

    fn commit_nonce(&mut self, account: &AccountAddress) {
        if let Some(pending) = self.pending.get_mut(account) {
            *pending = pending.saturating_sub(1);
        }
        *self.nonces.entry(account.clone()).or_insert(0) += 1;
    }
}

struct Controls {
    unreachable: bool,
    metadata: Option<LedgerMetadata>,
    rejections: VecDeque<String>,
    scripts: VecDeque<Vec<StatusEvent>>,
    hold_inclusion: bool,
    finalize: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            unreachable: false,
            metadata: None,
            rejections: VecDeque::new(),
            scripts: VecDeque::new(),
            hold_inclusion: false,
            finalize: true,
        }
    }
}

/// A verified submission waiting for a block.
struct PoolEntry {
    handle: SubmissionHandle,
    signer: AccountAddress,
    operation: Operation,
    watcher: Watcher,
}

/// Where a submission's status goes, as long as its connection is up.
#[derive(Clone)]
struct Watcher {
    handle: SubmissionHandle,
    publisher: NotificationRouter,
    link: Arc<watch::Sender<bool>>,
}

impl Watcher {
    fn deliver(&self, event: StatusEvent) -> bool {
        if *self.link.borrow() {
            return false;
        }
        self.publisher.publish(self.handle, event)
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata advertised when no override is set.
    #[must_use]
    pub fn default_metadata() -> LedgerMetadata {
        let mut events = required_events();
        events.push(FEE_EVENT_TAG.to_string());
        LedgerMetadata {
            runtime: "xenon-dev".to_string(),
            codec_version: CODEC_VERSION,
            calls: required_calls(),
            events,
        }
    }

    // =========================================================================
    // STATE INSPECTION
    // =========================================================================

    #[must_use]
    pub fn document(&self, did: &AccountAddress) -> Option<DidDocument> {
        self.inner.chain.lock().registry.document(did).cloned()
    }

    /// Store a document directly, bypassing dispatch.
    pub fn seed_document(&self, document: DidDocument) {
        self.inner.chain.lock().registry.insert(document);
    }

    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.inner.chain.lock().block_number
    }

    /// Committed account index.
    #[must_use]
    pub fn nonce(&self, account: &AccountAddress) -> u64 {
        self.inner
            .chain
            .lock()
            .nonces
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Submissions waiting in the pool for `release_held`.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.inner.chain.lock().held.len()
    }

    /// Connections currently open.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner
            .links
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|link| !*link.borrow())
            .count()
    }

    // =========================================================================
    // TEST CONTROLS
    // =========================================================================

    /// Refuse new connections.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.controls.lock().unreachable = unreachable;
    }

    /// Advertise `metadata` instead of the default.
    pub fn set_metadata(&self, metadata: LedgerMetadata) {
        self.inner.controls.lock().metadata = Some(metadata);
    }

    /// Reject the next submission outright with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.inner.controls.lock().rejections.push_back(reason.into());
    }

    /// Answer the next submission with exactly `events` instead of executing
    /// it. The nonce is still consumed.
    pub fn script_next(&self, events: Vec<StatusEvent>) {
        self.inner.controls.lock().scripts.push_back(events);
    }

    /// While set, submissions stop after `Broadcast` until `release_held`.
    pub fn hold_inclusion(&self, hold: bool) {
        self.inner.controls.lock().hold_inclusion = hold;
    }

    /// Whether blocks are followed by a `Finalized` notification.
    pub fn set_finalize(&self, finalize: bool) {
        self.inner.controls.lock().finalize = finalize;
    }

    /// Include every held submission in one block. Returns how many.
    pub fn release_held(&self) -> usize {
        let held = std::mem::take(&mut self.inner.chain.lock().held);
        let count = held.len();
        if count > 0 {
            self.inner.produce_block(held);
        }
        count
    }

    /// Sever every open connection, as if the node went away.
    pub fn drop_connections(&self) -> usize {
        let links: Vec<_> = self
            .inner
            .links
            .lock()
            .drain(..)
            .filter_map(|link| link.upgrade())
            .collect();
        for link in &links {
            link.send_replace(true);
        }
        warn!(count = links.len(), "In-memory ledger dropped connections");
        links.len()
    }
}

impl LedgerInner {
    fn produce_block(&self, entries: Vec<PoolEntry>) {
        let (hash, events) = {
            let mut chain = self.chain.lock();
            chain.block_number += 1;
            let block_number = chain.block_number;

            let mut events = Vec::new();
            for entry in &entries {
                events.push(RawEvent::new(
                    FEE_EVENT_TAG,
                    entry.signer.as_str().as_bytes().to_vec(),
                ));
                match chain
                    .registry
                    .dispatch(&entry.signer, &entry.operation, block_number)
                {
                    Ok(payload) => match encode_event(&payload) {
                        Ok(event) => {
                            events.push(event);
                            events.push(RawEvent::new(SYSTEM_SUCCESS_TAG, Vec::new()));
                        }
                        Err(e) => warn!(error = %e, "Could not encode pallet event"),
                    },
                    Err(err) => {
                        debug!(handle = %entry.handle, error = %err, "Dispatch failed");
                        match encode_dispatch_error(&DispatchError::from(err)) {
                            Ok(event) => events.push(event),
                            Err(e) => warn!(error = %e, "Could not encode dispatch error"),
                        }
                    }
                }
                chain.commit_nonce(&entry.signer);
            }

            info!(block = block_number, extrinsics = entries.len(), "Block produced");
            (block_hash(block_number), events)
        };

        let finalize = self.controls.lock().finalize;
        for entry in &entries {
            entry
                .watcher
                .deliver(StatusEvent::in_block(hash, events.clone()));
            if finalize {
                entry
                    .watcher
                    .deliver(StatusEvent::finalized(hash, events.clone()));
            }
        }
    }
}

fn block_hash(number: u64) -> BlockHash {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&number.to_be_bytes());
    hash[31] = 0x58;
    hash
}

fn verify(extrinsic: &SignedExtrinsic) -> Result<(), String> {
    if extrinsic.version != SignedExtrinsic::CURRENT_VERSION {
        return Err(format!("unsupported envelope version {}", extrinsic.version));
    }
    if extrinsic.signer != AccountAddress::from_public_key(&extrinsic.public_key) {
        return Err("signer does not match public key".to_string());
    }

    let key = VerifyingKey::from_bytes(&extrinsic.public_key)
        .map_err(|e| format!("bad public key: {e}"))?;
    let payload = signing_payload(
        &extrinsic.signer,
        extrinsic.nonce,
        &CallBytes(extrinsic.call.clone()),
    );
    key.verify(&payload, &Signature::from_bytes(&extrinsic.signature))
        .map_err(|_| "bad signature".to_string())
}

#[async_trait]
impl LedgerConnector for InMemoryLedger {
    async fn open(&self, node_address: &str) -> Result<Arc<dyn LedgerTransport>, TransportError> {
        if self.inner.controls.lock().unreachable {
            return Err(TransportError::Unreachable(format!(
                "{node_address}: connection refused"
            )));
        }

        let link = Arc::new(watch::channel(false).0);
        self.inner.links.lock().push(Arc::downgrade(&link));
        debug!(node = %node_address, "In-memory connection opened");

        Ok(Arc::new(MemoryTransport {
            ledger: Arc::clone(&self.inner),
            link,
        }))
    }
}

/// One connection to an `InMemoryLedger`.
pub struct MemoryTransport {
    ledger: Arc<LedgerInner>,
    /// `true` once closed from either end.
    link: Arc<watch::Sender<bool>>,
}

impl MemoryTransport {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if *self.link.borrow() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerTransport for MemoryTransport {
    async fn metadata(&self) -> Result<LedgerMetadata, TransportError> {
        self.ensure_open()?;
        Ok(self
            .ledger
            .controls
            .lock()
            .metadata
            .clone()
            .unwrap_or_else(InMemoryLedger::default_metadata))
    }

    async fn next_nonce(&self, account: &AccountAddress) -> Result<u64, TransportError> {
        self.ensure_open()?;
        Ok(self.ledger.chain.lock().next_nonce(account))
    }

    async fn submit_and_watch(
        &self,
        handle: SubmissionHandle,
        extrinsic: Vec<u8>,
        publisher: NotificationRouter,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let reject = |reason: String| TransportError::Rejected { reason };

        let extrinsic =
            decode_extrinsic(&extrinsic).map_err(|e| reject(format!("malformed extrinsic: {e}")))?;
        verify(&extrinsic).map_err(reject)?;
        let operation =
            decode_call(&extrinsic.call).map_err(|e| reject(format!("malformed call: {e}")))?;

        let (rejection, script, hold) = {
            let mut controls = self.ledger.controls.lock();
            (
                controls.rejections.pop_front(),
                controls.scripts.pop_front(),
                controls.hold_inclusion,
            )
        };
        if let Some(reason) = rejection {
            return Err(reject(reason));
        }

        {
            let mut chain = self.ledger.chain.lock();
            let expected = chain.next_nonce(&extrinsic.signer);
            if extrinsic.nonce != expected {
                return Err(reject(format!(
                    "invalid nonce: expected {expected}, got {}",
                    extrinsic.nonce
                )));
            }
            if script.is_some() {
                chain.commit_nonce(&extrinsic.signer);
            } else {
                *chain.pending.entry(extrinsic.signer.clone()).or_insert(0) += 1;
            }
        }

        let watcher = Watcher {
            handle,
            publisher,
            link: Arc::clone(&self.link),
        };
        debug!(%handle, signer = %extrinsic.signer, kind = %operation.kind(), "Extrinsic accepted");

        if let Some(events) = script {
            tokio::spawn(async move {
                for event in events {
                    tokio::task::yield_now().await;
                    watcher.deliver(event);
                }
            });
            return Ok(());
        }

        let ledger = Arc::clone(&self.ledger);
        let entry = PoolEntry {
            handle,
            signer: extrinsic.signer,
            operation,
            watcher,
        };
        tokio::spawn(async move {
            for phase in [InclusionPhase::Ready, InclusionPhase::Broadcast] {
                tokio::task::yield_now().await;
                entry.watcher.deliver(StatusEvent::phase(phase));
            }
            if hold {
                ledger.chain.lock().held.push(entry);
            } else {
                tokio::task::yield_now().await;
                ledger.produce_block(vec![entry]);
            }
        });
        Ok(())
    }

    async fn query_document(
        &self,
        did: &AccountAddress,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.ensure_open()?;
        let chain = self.ledger.chain.lock();
        chain
            .registry
            .document(did)
            .map(encode_document)
            .transpose()
            .map_err(|e| TransportError::Protocol(e.to_string()))
    }

    async fn closed(&self) {
        let mut rx = self.link.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        self.link.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use std::time::Duration;
    use tokio::time::timeout;
    use xn_03_operation_codec::{decode_document, encode, encode_extrinsic, EventKind};

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn signed(key: &SigningKey, nonce: u64, operation: &Operation) -> Vec<u8> {
        let public_key = key.verifying_key().to_bytes();
        let signer = AccountAddress::from_public_key(&public_key);
        let call = encode(operation).unwrap();
        let signature = key.sign(&signing_payload(&signer, nonce, &call)).to_bytes();
        encode_extrinsic(&SignedExtrinsic {
            version: SignedExtrinsic::CURRENT_VERSION,
            signer,
            public_key,
            nonce,
            call: call.into_inner(),
            signature,
        })
        .unwrap()
    }

    async fn next(sub: &mut shared_bus::StatusSubscription) -> StatusEvent {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timeout")
            .expect("route open")
    }

    async fn open(ledger: &InMemoryLedger) -> Arc<dyn LedgerTransport> {
        ledger.open("memory://test").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_identity_emits_full_sequence() {
        let ledger = InMemoryLedger::new();
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let mut sub = router.open_route().unwrap();

        transport
            .submit_and_watch(
                sub.handle(),
                signed(&key(1), 0, &Operation::CreateIdentity),
                router.clone(),
            )
            .await
            .unwrap();

        assert_eq!(next(&mut sub).await.phase, InclusionPhase::Ready);
        assert_eq!(next(&mut sub).await.phase, InclusionPhase::Broadcast);

        let in_block = next(&mut sub).await;
        assert_eq!(in_block.phase, InclusionPhase::InBlock);
        let tags: Vec<_> = in_block.events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                FEE_EVENT_TAG,
                EventKind::DocumentCreated.tag(),
                SYSTEM_SUCCESS_TAG
            ]
        );

        assert_eq!(next(&mut sub).await.phase, InclusionPhase::Finalized);
        assert_eq!(ledger.block_number(), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let ledger = InMemoryLedger::new();
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let sub = router.open_route().unwrap();

        let mut bytes = signed(&key(1), 0, &Operation::CreateIdentity);
        let mut extrinsic = decode_extrinsic(&bytes).unwrap();
        extrinsic.signature[0] ^= 0xFF;
        bytes = encode_extrinsic(&extrinsic).unwrap();

        let result = transport
            .submit_and_watch(sub.handle(), bytes, router.clone())
            .await;
        assert_eq!(
            result,
            Err(TransportError::Rejected {
                reason: "bad signature".into()
            })
        );
    }

    #[tokio::test]
    async fn test_stale_nonce_rejected() {
        let ledger = InMemoryLedger::new();
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let first = router.open_route().unwrap();
        let second = router.open_route().unwrap();

        let op = Operation::CreateIdentity;
        transport
            .submit_and_watch(first.handle(), signed(&key(1), 0, &op), router.clone())
            .await
            .unwrap();
        let result = transport
            .submit_and_watch(second.handle(), signed(&key(1), 0, &op), router.clone())
            .await;

        assert!(matches!(result, Err(TransportError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_pool_counts_toward_next_nonce() {
        let ledger = InMemoryLedger::new();
        ledger.hold_inclusion(true);
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let sub = router.open_route().unwrap();
        let signer = AccountAddress::from_public_key(&key(1).verifying_key().to_bytes());

        transport
            .submit_and_watch(
                sub.handle(),
                signed(&key(1), 0, &Operation::CreateIdentity),
                router.clone(),
            )
            .await
            .unwrap();

        assert_eq!(transport.next_nonce(&signer).await.unwrap(), 1);
        assert_eq!(ledger.nonce(&signer), 0);
    }

    #[tokio::test]
    async fn test_failed_dispatch_reports_module_error() {
        let ledger = InMemoryLedger::new();
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let mut sub = router.open_route().unwrap();

        transport
            .submit_and_watch(
                sub.handle(),
                signed(&key(1), 0, &Operation::UnlinkChain { chain_id: 1 }),
                router.clone(),
            )
            .await
            .unwrap();

        let mut event = next(&mut sub).await;
        while event.phase != InclusionPhase::InBlock {
            event = next(&mut sub).await;
        }
        let failed = event.events.last().unwrap();
        assert_eq!(failed.tag, xn_03_operation_codec::SYSTEM_FAILED_TAG);
        let error = xn_03_operation_codec::decode_dispatch_error(&failed.data).unwrap();
        assert_eq!(error.error, "DidDocumentNotFound");
    }

    #[tokio::test]
    async fn test_held_submissions_share_a_block() {
        let ledger = InMemoryLedger::new();
        ledger.hold_inclusion(true);
        let transport = open(&ledger).await;
        let router = NotificationRouter::new();
        let mut a = router.open_route().unwrap();
        let mut b = router.open_route().unwrap();

        for (sub, seed) in [(&a, 1u8), (&b, 2u8)] {
            transport
                .submit_and_watch(
                    sub.handle(),
                    signed(&key(seed), 0, &Operation::CreateIdentity),
                    router.clone(),
                )
                .await
                .unwrap();
        }
        for sub in [&mut a, &mut b] {
            assert_eq!(next(sub).await.phase, InclusionPhase::Ready);
            assert_eq!(next(sub).await.phase, InclusionPhase::Broadcast);
        }
        tokio::task::yield_now().await;

        assert_eq!(ledger.release_held(), 2);
        let block_a = next(&mut a).await;
        let block_b = next(&mut b).await;
        assert_eq!(block_a.block_hash, block_b.block_hash);
        assert_eq!(block_a.events.len(), 6);
    }

    #[tokio::test]
    async fn test_drop_connections_closes_transport() {
        let ledger = InMemoryLedger::new();
        let transport = open(&ledger).await;
        assert_eq!(ledger.connection_count(), 1);

        ledger.drop_connections();
        timeout(Duration::from_millis(100), transport.closed())
            .await
            .expect("closed must resolve");
        assert_eq!(
            transport.metadata().await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_unreachable_mode() {
        let ledger = InMemoryLedger::new();
        ledger.set_unreachable(true);
        assert!(matches!(
            ledger.open("memory://test").await,
            Err(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_query_document() {
        let ledger = InMemoryLedger::new();
        let alice = AccountAddress::new("0xa11ce");
        ledger.seed_document(DidDocument::new(alice.clone(), 4));
        let transport = open(&ledger).await;

        let bytes = transport.query_document(&alice).await.unwrap().unwrap();
        assert_eq!(decode_document(&bytes).unwrap().created_at, 4);
        assert_eq!(
            transport
                .query_document(&AccountAddress::new("0xb0b"))
                .await
                .unwrap(),
            None
        );
    }
}
