//! # Query Integration
//!
//! Document reads following the writes the engine made.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{node, within};
    use shared_types::AccountAddress;

    #[tokio::test]
    async fn test_unknown_address_has_no_document() {
        let node = node().await;
        let queries = node.client.queries();

        let document = within(queries.get_did_document(&AccountAddress::new("addrX")))
            .await
            .unwrap();
        assert!(document.is_none());
    }

    #[tokio::test]
    async fn test_reads_follow_writes() {
        let node = node().await;
        let engine = node.client.engine();
        let queries = node.client.queries();

        within(engine.create_identity(&node.alice)).await.unwrap();
        within(engine.link_chain(&node.alice, "Ethereum", 1, "0xabc"))
            .await
            .unwrap();
        within(engine.link_chain(&node.alice, "Polygon", 137, "0xdef"))
            .await
            .unwrap();

        let view = within(queries.identity_view(&node.alice)).await.unwrap();
        assert!(view.is_registered());
        assert_eq!(view.did_uri, node.alice.did_uri());
        let document = view.document.as_ref().unwrap();
        assert_eq!(document.controller, node.alice);
        assert_eq!(document.created_at, 1);
        assert_eq!(document.updated_at, 3);

        let chains = within(queries.linked_chains(&node.alice)).await.unwrap();
        let ids: Vec<_> = chains.iter().map(|c| c.chain_id).collect();
        assert_eq!(ids, vec![1, 137]);

        within(engine.unlink_chain(&node.alice, 1)).await.unwrap();
        let chains = within(queries.linked_chains(&node.alice)).await.unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].chain_name, "Polygon");
    }

    #[tokio::test]
    async fn test_query_after_shutdown_is_error() {
        let node = node().await;
        node.client.shutdown().await;

        let err = within(node.client.queries().get_did_document(&node.alice))
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }
}
