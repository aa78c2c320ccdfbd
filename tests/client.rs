//! Throttle handling of the shared client against a scripted origin

mod support;

use url::Url;

use manga_fetcher::app::MangaClient;
use manga_fetcher::errors::DownloadError;

use support::{reader_page, test_client_config, StubResponse, StubServer};

const PATH: &str = "/read-online/One-Piece-chapter-0001.html";

fn client(throttle_retries: u32) -> MangaClient {
    let mut config = test_client_config();
    config.throttle_retries = throttle_retries;
    MangaClient::new(&config, 2).unwrap()
}

fn url(server: &StubServer) -> Url {
    Url::parse(&format!("{}{}", server.base_url, PATH)).unwrap()
}

#[tokio::test]
async fn throttled_answer_is_replayed_then_reported() {
    let server = StubServer::spawn();
    server.route(PATH, StubResponse::Status(429));

    let result = client(1).get_page(&url(&server)).await;

    assert!(matches!(result, Err(DownloadError::RateLimitExceeded)), "{result:?}");
    assert_eq!(server.request_count(PATH), 2);
}

#[tokio::test]
async fn overloaded_server_is_reported_after_replays() {
    let server = StubServer::spawn();
    server.route(PATH, StubResponse::Status(503));

    let result = client(1).get_page(&url(&server)).await;

    assert!(matches!(result, Err(DownloadError::ServerOverloaded)), "{result:?}");
    assert_eq!(server.request_count(PATH), 2);
}

#[tokio::test]
async fn throttled_answer_is_a_plain_status_without_replays() {
    let server = StubServer::spawn();
    server.route(PATH, StubResponse::Status(429));

    let result = client(0).get_page(&url(&server)).await;

    assert!(
        matches!(result, Err(DownloadError::HttpStatus { status: 429, .. })),
        "{result:?}"
    );
    assert_eq!(server.request_count(PATH), 1);
}

#[tokio::test]
async fn replay_recovers_once_the_server_answers() {
    let server = StubServer::spawn();
    let page = reader_page(Some(&server.authority), Some(4));
    server.route(
        PATH,
        StubResponse::Sequence(vec![StubResponse::Status(429), StubResponse::Html(page.clone())]),
    );

    let client = client(1);
    let html = client.get_page(&url(&server)).await.unwrap();

    assert_eq!(html, page);
    assert_eq!(server.request_count(PATH), 2);
    assert_eq!(client.idle_connections(), 2);
}
