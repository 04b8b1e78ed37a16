//! # Connection Loss
//!
//! A dropped connection is terminal for every pending submission: each one
//! fails with `ConnectionLost` instead of waiting forever.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{node, reach, within};
    use shared_types::{ConnectionError, InclusionPhase, StatusEvent};
    use std::sync::Arc;
    use std::time::Duration;
    use xenon_runtime::XenonClient;
    use xn_01_connection_manager::ConnectionState;
    use xn_03_operation_codec::Operation;
    use xn_04_submission_engine::{OnChainEffect, SubmissionFailure, SubmissionState};

    #[tokio::test]
    async fn test_loss_after_broadcast_fails_pending() {
        let node = node().await;
        node.ledger.script_next(vec![
            StatusEvent::phase(InclusionPhase::Ready),
            StatusEvent::phase(InclusionPhase::Broadcast),
        ]);

        let ticket = node
            .client
            .engine()
            .submit(&node.alice, Operation::CreateIdentity);
        reach(&ticket, SubmissionState::AwaitingInclusion).await;

        // Let both pool notifications arrive before the node goes away.
        tokio::time::sleep(Duration::from_millis(20)).await;
        node.ledger.drop_connections();

        let failure = within(ticket.outcome()).await.unwrap_err();
        assert_eq!(
            failure,
            SubmissionFailure::ConnectionLost {
                last_phase: Some(InclusionPhase::Broadcast)
            }
        );
        assert_eq!(failure.effect(), OnChainEffect::Unknown);
        assert_eq!(node.client.connection().state(), ConnectionState::Lost);
    }

    #[tokio::test]
    async fn test_every_pending_submission_fails() {
        let node = node().await;
        within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();
        node.ledger.hold_inclusion(true);

        let engine = node.client.engine();
        let tickets = vec![
            engine.submit(&node.alice, Operation::link_chain("Ethereum", 1, "0x1")),
            engine.submit(&node.bob, Operation::CreateIdentity),
            engine.submit(&node.alice, Operation::UnlinkChain { chain_id: 9 }),
        ];
        for ticket in &tickets {
            reach(ticket, SubmissionState::AwaitingInclusion).await;
        }
        assert_eq!(node.client.connection().open_routes(), 3);

        node.ledger.drop_connections();

        for ticket in tickets {
            assert!(within(ticket.outcome()).await.unwrap_err().is_connection_lost());
        }
        assert_eq!(node.client.connection().open_routes(), 0);
        assert_eq!(node.client.engine().stats().failed, 3);
    }

    #[tokio::test]
    async fn test_submit_after_loss_fails_before_signing_anything() {
        let node = node().await;
        node.ledger.drop_connections();
        within(node.client.connection().lost()).await;

        let failure = within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap_err();
        assert_eq!(failure, SubmissionFailure::Connection(ConnectionError::Lost));
        assert_eq!(failure.effect(), OnChainEffect::None);
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending() {
        let node = node().await;
        node.ledger.hold_inclusion(true);

        let ticket = node
            .client
            .engine()
            .submit(&node.alice, Operation::CreateIdentity);
        reach(&ticket, SubmissionState::AwaitingInclusion).await;
        node.client.shutdown().await;

        assert!(within(ticket.outcome()).await.unwrap_err().is_connection_lost());
        assert_eq!(
            node.client.connection().state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_fresh_client_after_loss() {
        let node = node().await;
        within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();
        node.ledger.drop_connections();

        // Reconnection is the caller's call; ledger state survives it.
        let client = XenonClient::connect(
            node.client.config().clone(),
            Arc::new(node.ledger.clone()),
            node.keystore.clone(),
        )
        .await
        .unwrap();
        let document = within(client.queries().get_did_document(&node.alice))
            .await
            .unwrap();
        assert!(document.is_some());
        within(client.engine().link_chain(&node.alice, "Ethereum", 1, "0xabc"))
            .await
            .unwrap();
    }
}
