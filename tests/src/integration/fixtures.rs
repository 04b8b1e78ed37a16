//! Shared fixtures: a connected client over an in-memory ledger.

use shared_types::AccountAddress;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use xenon_runtime::{RuntimeConfig, XenonClient};
use xn_01_connection_manager::InMemoryLedger;
use xn_02_account_registry::LocalKeystore;
use xn_04_submission_engine::{EngineConfig, SubmissionState, SubmissionTicket};

/// Upper bound for any single step; a scenario that needs longer has hung.
pub const GUARD: Duration = Duration::from_secs(5);

pub struct Node {
    pub ledger: InMemoryLedger,
    pub keystore: Arc<LocalKeystore>,
    pub client: XenonClient,
    pub alice: AccountAddress,
    pub bob: AccountAddress,
}

pub async fn node() -> Node {
    node_with(EngineConfig::default()).await
}

pub async fn node_with(engine: EngineConfig) -> Node {
    let ledger = InMemoryLedger::new();
    let keystore = Arc::new(LocalKeystore::new());
    let alice = keystore.add_seed([0xA1; 32], Some("alice"));
    let bob = keystore.add_seed([0xB0; 32], Some("bob"));

    let config = RuntimeConfig {
        node_url: "memory://integration".into(),
        engine,
        ..Default::default()
    };
    let client = XenonClient::connect(config, Arc::new(ledger.clone()), keystore.clone())
        .await
        .expect("client should connect");

    Node {
        ledger,
        keystore,
        client,
        alice,
        bob,
    }
}

/// Await `future`, failing the test if it does not finish within `GUARD`.
pub async fn within<F: Future>(future: F) -> F::Output {
    timeout(GUARD, future).await.expect("step did not finish in time")
}

/// Wait until `ticket` reports `state`.
pub async fn reach(ticket: &SubmissionTicket, state: SubmissionState) {
    let mut progress = ticket.progress();
    within(progress.wait_for(|s| *s == state))
        .await
        .expect("submission task ended before reaching state");
}

/// Include held submissions once they have all reached the pool.
pub async fn release(ledger: &InMemoryLedger, expected: usize) {
    within(async {
        loop {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if ledger.held_count() >= expected {
                break;
            }
        }
    })
    .await;
    assert_eq!(ledger.release_held(), expected);
}
