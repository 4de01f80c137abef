// Renewal edge cases:
//  - a fresh token failing its probe ends the call, no second handshake
//  - a live token rejected by the feed triggers exactly one renewal
//  - concurrent callers share a single handshake
//  - the file store carries a token across dispatcher instances

#[cfg(test)]
mod test {

    use chrono::Duration;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use tempfile::tempdir;

    use crate::cache::file_store::FileTokenStore;
    use crate::cache::token::encode_token;
    use crate::cache::token_store::{CredentialStore, MemoryTokenStore};
    use crate::dispatch::dispatcher::Dispatcher;
    use crate::error::FeedError;
    use crate::tests::common::{
        credentials_header, dispatcher, feed_config, record_expiring_in, test_settings,
        token_header, BRANCHES_XML, BRANCH_LIST_PATH, PROPERTIES_XML, PROPERTY_LIST_PATH,
    };

    #[tokio::test]
    async fn failed_probe_ends_without_second_renewal() {
        let server = MockServer::start_async().await;
        let handshake = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", credentials_header());
                then.status(200).header("Token", "abc123");
            })
            .await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", token_header("abc123"));
                then.status(401);
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH);
                then.status(200).body(PROPERTIES_XML);
            })
            .await;

        let store = MemoryTokenStore::new();
        let dispatcher = dispatcher(&server, store.clone());

        let err = dispatcher.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap_err();

        assert!(matches!(err, FeedError::AuthRejected), "{err:?}");
        handshake.assert_hits_async(1).await;
        probe.assert_hits_async(1).await;
        assert_eq!(target.hits_async().await, 0);
        // persisted before the probe
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_live_token_is_renewed_once() {
        let server = MockServer::start_async().await;
        let handshake = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", credentials_header());
                then.status(200).header("Token", "fresh");
            })
            .await;
        let probe = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", token_header("fresh"));
                then.status(200).body(BRANCHES_XML);
            })
            .await;
        let revoked = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH).header("authorization", token_header("revoked"));
                then.status(401);
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH).header("authorization", token_header("fresh"));
                then.status(200).body(PROPERTIES_XML);
            })
            .await;

        let store = MemoryTokenStore::new();
        store.append_token(&record_expiring_in("revoked", Duration::hours(1))).await.unwrap();
        let dispatcher = dispatcher(&server, store.clone());

        let value = dispatcher.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap();

        assert_eq!(value["property"]["prop_id"], "7001");
        revoked.assert_hits_async(1).await;
        handshake.assert_hits_async(1).await;
        probe.assert_hits_async(1).await;
        target.assert_hits_async(1).await;
        assert_eq!(store.latest_token().await.unwrap(), encode_token("fresh"));
    }

    #[tokio::test]
    async fn persistent_rejection_surfaces_after_one_renewal() {
        let server = MockServer::start_async().await;
        let handshake = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", credentials_header());
                then.status(200).header("Token", "fresh");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", token_header("fresh"));
                then.status(200).body(BRANCHES_XML);
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH);
                then.status(401);
            })
            .await;

        let store = MemoryTokenStore::new();
        store.append_token(&record_expiring_in("revoked", Duration::hours(1))).await.unwrap();
        let dispatcher = dispatcher(&server, store);

        let err = dispatcher.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap_err();

        assert!(matches!(err, FeedError::AuthRejected), "{err:?}");
        handshake.assert_hits_async(1).await;
        target.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn handshake_without_token_header_is_a_protocol_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH);
                then.status(200).body(BRANCHES_XML);
            })
            .await;

        let store = MemoryTokenStore::new();
        let dispatcher = dispatcher(&server, store.clone());

        let err = dispatcher.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap_err();

        assert!(matches!(err, FeedError::Protocol { status: 200 }), "{err:?}");
        assert!(store.records().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_share_one_handshake() {
        let server = MockServer::start_async().await;
        let handshake = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", credentials_header());
                then.status(200)
                    .header("Token", "shared")
                    .delay(std::time::Duration::from_millis(100));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", token_header("shared"));
                then.status(200).body(BRANCHES_XML);
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH).header("authorization", token_header("shared"));
                then.status(200).body(PROPERTIES_XML);
            })
            .await;

        let store = MemoryTokenStore::new();
        let dispatcher = dispatcher(&server, store.clone());
        let url = server.url(PROPERTY_LIST_PATH);

        let (first, second) = tokio::join!(dispatcher.dispatch(&url), dispatcher.dispatch(&url));

        assert!(first.is_ok(), "{first:?}");
        assert!(second.is_ok(), "{second:?}");
        handshake.assert_hits_async(1).await;
        target.assert_hits_async(2).await;
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn file_store_token_is_reused_by_next_process() {
        let server = MockServer::start_async().await;
        let handshake = server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", credentials_header());
                then.status(200).header("Token", "persisted");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(BRANCH_LIST_PATH).header("authorization", token_header("persisted"));
                then.status(200).body(BRANCHES_XML);
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path(PROPERTY_LIST_PATH).header("authorization", token_header("persisted"));
                then.status(200).body(PROPERTIES_XML);
            })
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.jsonl");
        let dump = dir.path().join("headers.txt");

        let mut feed = feed_config(&server);
        feed.handshake_dump_path = Some(dump.clone());
        let first = Dispatcher::new(FileTokenStore::new(&path), &feed, &test_settings()).unwrap();
        first.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap();

        let second = dispatcher(&server, FileTokenStore::new(&path));
        second.dispatch(&server.url(PROPERTY_LIST_PATH)).await.unwrap();

        handshake.assert_hits_async(1).await;
        target.assert_hits_async(2).await;
        let head = tokio::fs::read_to_string(&dump).await.unwrap();
        assert!(head.starts_with("HTTP 200"));
        assert!(head.contains("token: persisted"));
    }
}
