//! # Submission Flows
//!
//! Identity operations driven end to end: keystore signer, connection,
//! in-memory ledger dispatch, status stream and event correlation.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{node, node_with, reach, release, within};
    use shared_types::InclusionPhase;
    use std::time::Duration;
    use xn_03_operation_codec::{EventPayload, Operation, SYSTEM_FAILED_TAG};
    use xn_04_submission_engine::{
        Confirmation, EngineConfig, OnChainEffect, SubmissionFailure, SubmissionState,
    };

    // =========================================================================
    // HAPPY PATHS
    // =========================================================================

    #[tokio::test]
    async fn test_every_operation_resolves_once() {
        let node = node().await;
        let engine = node.client.engine();

        let created = within(engine.create_identity(&node.alice)).await.unwrap();
        assert_eq!(created.did, node.alice);

        let linked = within(engine.link_chain(&node.alice, "Ethereum", 1, "0xabc"))
            .await
            .unwrap();
        assert_eq!(linked.chain_id, 1);
        assert_eq!(linked.address, "0xabc");

        let unlinked = within(engine.unlink_chain(&node.alice, 1)).await.unwrap();
        assert_eq!(unlinked.chain_id, 1);

        let stats = engine.stats();
        assert_eq!(stats.registered, 3);
        assert_eq!(stats.resolved, 3);
        assert_eq!(stats.failed, 0);
        assert!(engine.pending().is_empty());
        assert_eq!(node.client.connection().open_routes(), 0);
    }

    #[tokio::test]
    async fn test_ticket_ends_resolved() {
        let node = node().await;
        let ticket = node
            .client
            .engine()
            .submit(&node.alice, Operation::CreateIdentity);
        let mut progress = ticket.progress();

        let resolution = within(ticket.outcome()).await.unwrap();
        assert!(resolution.block_hash.is_some());
        assert_eq!(*progress.borrow_and_update(), SubmissionState::Resolved);
    }

    #[tokio::test]
    async fn test_fee_event_ahead_of_expected_event_is_skipped() {
        let node = node().await;
        within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();

        // Every block from the ledger leads with a fee event.
        let resolution = within(
            node.client
                .engine()
                .submit(&node.alice, Operation::link_chain("Ethereum", 1, "0xabc"))
                .outcome(),
        )
        .await
        .unwrap();
        match resolution.payload {
            EventPayload::ChainLinked(event) => {
                assert_eq!(event.chain_id, 1);
                assert_eq!(event.address, "0xabc");
            }
            other => panic!("expected ChainLinked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_different_kinds_share_a_block() {
        let node = node().await;
        within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();
        node.ledger.hold_inclusion(true);

        let engine = node.client.engine();
        let link = engine.submit(&node.alice, Operation::link_chain("Polygon", 137, "0x89"));
        let create = engine.submit(&node.bob, Operation::CreateIdentity);
        release(&node.ledger, 2).await;

        let link = within(link.outcome()).await.unwrap();
        let create = within(create.outcome()).await.unwrap();
        assert_eq!(link.block_hash, create.block_hash);
        assert_eq!(link.payload.did(), &node.alice);
        assert_eq!(create.payload.did(), &node.bob);
    }

    // =========================================================================
    // TYPE-TAG MATCHING
    // =========================================================================

    /// Same-kind submissions are serialized, so each resolves with its own event.
    #[tokio::test]
    async fn test_same_kind_serialized_resolves_own_event() {
        let node = node().await;
        node.ledger.hold_inclusion(true);

        let engine = node.client.engine();
        let first = engine.submit(&node.alice, Operation::CreateIdentity);
        let second = engine.submit(&node.bob, Operation::CreateIdentity);

        reach(&first, SubmissionState::AwaitingInclusion).await;
        assert_eq!(second.state(), SubmissionState::Building);
        release(&node.ledger, 1).await;
        let first = within(first.outcome()).await.unwrap();

        reach(&second, SubmissionState::AwaitingInclusion).await;
        release(&node.ledger, 1).await;
        let second = within(second.outcome()).await.unwrap();

        assert_eq!(first.payload.did(), &node.alice);
        assert_eq!(second.payload.did(), &node.bob);
        assert_ne!(first.block_hash, second.block_hash);
    }

    /// Without serialization two same-kind submissions in one block both
    /// match the first event of that kind.
    #[tokio::test]
    async fn test_same_kind_in_one_block_matches_first_event() {
        let node = node_with(EngineConfig {
            serialize_same_kind: false,
            ..Default::default()
        })
        .await;
        node.ledger.hold_inclusion(true);

        let engine = node.client.engine();
        let first = engine.submit(&node.alice, Operation::CreateIdentity);
        let second = engine.submit(&node.bob, Operation::CreateIdentity);
        release(&node.ledger, 2).await;

        let first = within(first.outcome()).await.unwrap();
        let second = within(second.outcome()).await.unwrap();
        assert_eq!(first.payload, second.payload);
        assert!(node.ledger.document(&node.alice).is_some());
        assert!(node.ledger.document(&node.bob).is_some());
    }

    // =========================================================================
    // LANDED WITHOUT EFFECT
    // =========================================================================

    #[tokio::test]
    async fn test_second_unlink_is_unexpected_outcome() {
        let node = node().await;
        let engine = node.client.engine();
        within(engine.create_identity(&node.alice)).await.unwrap();
        within(engine.link_chain(&node.alice, "Ethereum", 1, "0xabc"))
            .await
            .unwrap();

        within(engine.unlink_chain(&node.alice, 1)).await.unwrap();
        let failure = within(engine.unlink_chain(&node.alice, 1))
            .await
            .unwrap_err();

        assert!(failure.is_unexpected_outcome());
        assert_eq!(failure.effect(), OnChainEffect::LandedWithoutExpectedEffect);
        match failure {
            SubmissionFailure::UnexpectedOutcome {
                expected,
                observed,
                dispatch_error,
                ..
            } => {
                assert_eq!(expected, "Xenon.ChainUnlinked");
                assert!(observed.iter().any(|tag| tag == SYSTEM_FAILED_TAG));
                assert_eq!(dispatch_error.unwrap().error, "ChainNotLinked");
            }
            other => panic!("unexpected failure {other:?}"),
        }
        // The extrinsic was included and paid for.
        assert_eq!(node.ledger.nonce(&node.alice), 4);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_unexpected_outcome() {
        let node = node().await;
        let engine = node.client.engine();
        within(engine.create_identity(&node.alice)).await.unwrap();

        match within(engine.create_identity(&node.alice)).await {
            Err(SubmissionFailure::UnexpectedOutcome { dispatch_error, .. }) => {
                assert_eq!(dispatch_error.unwrap().error, "DidDocumentAlreadyExists");
            }
            other => panic!("expected UnexpectedOutcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_link_without_identity_is_unexpected_outcome() {
        let node = node().await;
        match within(node.client.engine().link_chain(&node.bob, "Ethereum", 1, "0x1")).await {
            Err(SubmissionFailure::UnexpectedOutcome { dispatch_error, .. }) => {
                assert_eq!(dispatch_error.unwrap().error, "DidDocumentNotFound");
            }
            other => panic!("expected UnexpectedOutcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_linked_chain_limit() {
        let node = node().await;
        let engine = node.client.engine();
        within(engine.create_identity(&node.alice)).await.unwrap();

        for chain_id in 0..10 {
            within(engine.link_chain(&node.alice, "Chain", chain_id, "0x1"))
                .await
                .unwrap();
        }
        match within(engine.link_chain(&node.alice, "Chain", 10, "0x1")).await {
            Err(SubmissionFailure::UnexpectedOutcome { dispatch_error, .. }) => {
                assert_eq!(dispatch_error.unwrap().error, "TooManyLinkedChains");
            }
            other => panic!("expected UnexpectedOutcome, got {other:?}"),
        }
    }

    // =========================================================================
    // CONFIRMATION LEVEL
    // =========================================================================

    #[tokio::test]
    async fn test_finalized_confirmation_times_out_without_finality() {
        let node = node_with(EngineConfig {
            confirmation: Confirmation::Finalized,
            inclusion_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        })
        .await;
        node.ledger.set_finalize(false);

        let failure = within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap_err();
        assert_eq!(
            failure,
            SubmissionFailure::Timeout {
                after: Duration::from_millis(100)
            }
        );
        // Included all the same; the client just could not confirm it.
        assert_eq!(failure.effect(), OnChainEffect::Unknown);
        assert!(node.ledger.document(&node.alice).is_some());
    }

    #[tokio::test]
    async fn test_finalized_confirmation_resolves() {
        let node = node_with(EngineConfig {
            confirmation: Confirmation::Finalized,
            ..Default::default()
        })
        .await;

        let created = within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();
        assert_eq!(created.did, node.alice);
    }

    #[tokio::test]
    async fn test_pool_rejection_leaves_nothing_on_chain() {
        let node = node().await;
        node.ledger.script_next(vec![
            shared_types::StatusEvent::phase(InclusionPhase::Ready),
            shared_types::StatusEvent::phase(InclusionPhase::Invalid),
        ]);

        let failure = within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap_err();
        assert_eq!(failure.effect(), OnChainEffect::None);
        assert!(node.ledger.document(&node.alice).is_none());
    }
}
