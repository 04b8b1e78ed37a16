//! # Account Registry Integration
//!
//! Snapshot replacement as seen by the submission engine: resolution uses
//! the snapshot current at call time.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{node, within};
    use shared_types::AccountError;
    use xn_04_submission_engine::{OnChainEffect, SubmissionFailure};

    #[tokio::test]
    async fn test_removed_account_not_found_despite_older_snapshot() {
        let node = node().await;
        let registry = node.client.registry();
        let mut updates = registry.subscribe();
        let before = registry.snapshot();
        assert!(before.contains(&node.bob));

        assert!(node.keystore.remove_account(&node.bob));
        within(updates.changed()).await.unwrap();

        // The old snapshot is untouched; resolution ignores it.
        assert!(before.contains(&node.bob));
        assert!(registry.snapshot().version() > before.version());
        assert_eq!(
            registry.resolve_signer(&node.bob).unwrap_err(),
            AccountError::AccountNotFound {
                address: node.bob.clone()
            }
        );

        let failure = within(node.client.engine().create_identity(&node.bob))
            .await
            .unwrap_err();
        assert!(matches!(
            failure,
            SubmissionFailure::Account(AccountError::AccountNotFound { .. })
        ));
        assert_eq!(failure.effect(), OnChainEffect::None);
        assert_eq!(node.ledger.nonce(&node.bob), 0);
    }

    #[tokio::test]
    async fn test_added_account_becomes_usable() {
        let node = node().await;
        let mut updates = node.client.registry().subscribe();

        let carol = node.keystore.generate_account(Some("carol"));
        within(updates.changed()).await.unwrap();

        let snapshot = node.client.registry().snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.get(&carol).and_then(|a| a.name.as_deref()),
            Some("carol")
        );

        let created = within(node.client.engine().create_identity(&carol))
            .await
            .unwrap();
        assert_eq!(created.did, carol);
    }

    #[tokio::test]
    async fn test_declined_signature_submits_nothing() {
        let node = node().await;
        node.keystore.set_declining(true);

        let failure = within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap_err();
        assert!(matches!(
            failure,
            SubmissionFailure::Account(AccountError::SigningRejected { .. })
        ));
        assert_eq!(failure.effect(), OnChainEffect::None);
        assert_eq!(node.ledger.block_number(), 0);

        node.keystore.set_declining(false);
        within(node.client.engine().create_identity(&node.alice))
            .await
            .unwrap();
    }
}
