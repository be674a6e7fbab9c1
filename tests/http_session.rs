//! End-to-end tests of a session over the HTTP transports against a mock API.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedline::api::{ApiClient, HttpFeedFetcher, HttpInteractionWriter};
use feedline::{ArticleId, FeedSession, Rating, Resolution, SessionError, SessionOptions};

type Session = FeedSession<HttpFeedFetcher, HttpInteractionWriter>;

fn session_for(server: &MockServer) -> Session {
    let client = ApiClient::new(&server.uri())
        .unwrap()
        .with_token(SecretString::from("test-token".to_string()))
        .with_max_retries(1)
        .with_retry_delay(Duration::from_millis(1));
    FeedSession::new(
        HttpFeedFetcher::new(client.clone()),
        HttpInteractionWriter::new(client),
        SessionOptions {
            page_size: 2,
            ..SessionOptions::default()
        },
    )
}

async fn mount_first_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feeds/recommendations"))
        .and(query_param("limit", "2"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "articles": [
                    {"id": 102, "title": "B", "url": "https://n.example/102", "sourceId": "s1"},
                    {"id": 101, "title": "A", "url": "https://n.example/101", "sourceId": "s2"}
                ],
                "sources": {
                    "s1": {"name": "Wire", "iconData": null},
                    "s2": {"name": "Ledger", "iconData": "data:image/png;base64,AAAA"}
                }
            }"#,
        ))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pages_through_http_feed() {
    let server = MockServer::start().await;
    mount_first_page(&server).await;
    Mock::given(method("GET"))
        .and(path("/feeds/recommendations"))
        .and(query_param("max_id", "101"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"articles": []}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.load_newer("recommendations").await.unwrap();
    let outcome = session.load_older("recommendations").await.unwrap();

    assert!(outcome.end_of_data);
    let snapshot = session.snapshot("recommendations").unwrap();
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.items[0].source.as_ref().unwrap().name, "Wire");
    assert_eq!(
        snapshot.items[1].source.as_ref().unwrap().icon_data.as_deref(),
        Some("data:image/png;base64,AAAA")
    );
}

#[tokio::test]
async fn test_rating_round_trip_over_http() {
    let server = MockServer::start().await;
    mount_first_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/articles/101/interaction"))
        .and(body_json(serde_json::json!({ "rating": -1 })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rating": -1}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.load_newer("recommendations").await.unwrap();
    let id = ArticleId::from(101);

    let resolution = session.rate_and_sync(&id, Rating::Down).await.unwrap();

    assert_eq!(resolution, Resolution::Confirmed);
    assert_eq!(session.interaction(&id).unwrap().rating, Rating::Down);
}

#[tokio::test]
async fn test_server_error_on_bookmark_rolls_back() {
    let server = MockServer::start().await;
    mount_first_page(&server).await;
    Mock::given(method("POST"))
        .and(path("/articles/102/interaction"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.load_newer("recommendations").await.unwrap();
    let id = ArticleId::from(102);

    let err = session.toggle_bookmark_and_sync(&id).await.unwrap_err();

    assert!(matches!(err, SessionError::WriteFailed { .. }));
    assert!(!session.interaction(&id).unwrap().bookmarked);
    assert!(session.bookmarks().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_error_keeps_loaded_items() {
    let server = MockServer::start().await;
    mount_first_page(&server).await;
    Mock::given(method("GET"))
        .and(path("/feeds/recommendations"))
        .and(query_param("since_id", "102"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.load_newer("recommendations").await.unwrap();
    let err = session.load_newer("recommendations").await.unwrap_err();

    assert!(matches!(err, SessionError::FetchFailed { .. }));
    assert_eq!(session.feed("recommendations").unwrap().len(), 2);
}
