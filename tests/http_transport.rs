use content_delivery::{
    Client, ClientConfig, Error, HttpTransport, Linked, NoopPersistence, Query, QueryParams, SyncState, Transport,
    TransportError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_PATH: &str = "/spaces/space1/environments/master";

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("space1", "secret-token").with_api_url(server.uri())
}

async fn mount_locales(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{ENV_PATH}/locales")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"code": "en-US", "name": "English", "default": true},
                {"code": "de-DE", "name": "German", "fallbackCode": "en-US"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_bearer_token_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("authorization", "Bearer secret-token"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::from_config(&config(&server)).unwrap();
    let params: QueryParams = [("limit".to_string(), "5".to_string())].into_iter().collect();
    let body = transport.fetch(&format!("{}/things", server.uri()), &params).await.unwrap();
    assert_eq!(body, b"ok".to_vec());
}

#[tokio::test]
async fn non_success_status_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let transport = HttpTransport::from_config(&config(&server)).unwrap();
    let err = transport
        .fetch(&format!("{}/limited", server.uri()), &QueryParams::new())
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_fetches_entries_with_includes() {
    let server = MockServer::start().await;
    mount_locales(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{ENV_PATH}/entries")))
        .and(query_param("content_type", "cat"))
        .and(query_param("include", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sys": {"type": "Array"},
            "total": 1, "skip": 0, "limit": 100,
            "items": [{
                "sys": {"id": "nyancat", "type": "Entry", "locale": "en-US", "contentType": {"sys": {"id": "cat"}}},
                "fields": {
                    "name": "Nyan Cat",
                    "bestFriend": {"sys": {"type": "Link", "linkType": "Entry", "id": "happycat"}}
                }
            }],
            "includes": {
                "Entry": [{
                    "sys": {"id": "happycat", "type": "Entry", "locale": "en-US"},
                    "fields": {
                        "name": "Happy Cat",
                        "bestFriend": {"sys": {"type": "Link", "linkType": "Entry", "id": "nyancat"}}
                    }
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let collection = client.entries(&Query::new().content_type("cat").include(2)).await.unwrap();

    assert_eq!(collection.total, 1);
    let nyan = &collection.items[0];
    assert_eq!(nyan.content_type_id(), Some("cat"));
    let friend = match collection.follow(nyan.link("bestFriend").unwrap()) {
        Some(Linked::Entry(entry)) => entry,
        other => panic!("expected happycat, got {other:?}"),
    };
    assert_eq!(friend.string("name"), Some("Happy Cat"));

    // The cycle back to nyancat resolves through the items.
    let back = collection.follow(friend.link("bestFriend").unwrap());
    assert!(matches!(back, Some(Linked::Entry(entry)) if entry.id() == "nyancat"));
}

#[tokio::test]
async fn coordinator_syncs_against_http_server() {
    let server = MockServer::start().await;
    mount_locales(&server).await;
    let sync_path = format!("{ENV_PATH}/sync");
    Mock::given(method("GET"))
        .and(path(sync_path.clone()))
        .and(query_param("initial", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "sys": {"id": "cat-1", "type": "Entry"},
                "fields": {"image": {"en-US": {"sys": {"type": "Link", "linkType": "Asset", "id": "img-1"}}}}
            }],
            "nextPageUrl": format!("{}{}?sync_token=tokenA", server.uri(), sync_path)
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(sync_path.clone()))
        .and(query_param("sync_token", "tokenA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"sys": {"id": "img-1", "type": "Asset"}, "fields": {"title": {"en-US": "Nyan"}}}],
            "nextSyncUrl": format!("{}{}?sync_token=tokenB", server.uri(), sync_path)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let coordinator = client.coordinator(NoopPersistence).await.unwrap();
    let state: SyncState = coordinator.run_sync(None, &QueryParams::new()).await.unwrap();

    assert_eq!(state.sync_token(), Some("tokenB"));
    let image = state.entry("cat-1").unwrap().link("image").unwrap();
    assert_eq!(state.graph().linked_asset(image).and_then(|a| a.title()), Some("Nyan"));
}

#[tokio::test]
async fn failed_locale_fetch_surfaces_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{ENV_PATH}/locales")))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let client = Client::new(config(&server)).unwrap();
    let err = client.entries(&Query::new()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Status { status: 401, .. })));
    assert!(!err.is_retryable());
}
