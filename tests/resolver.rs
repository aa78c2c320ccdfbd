//! Address resolution against a scripted origin

mod support;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use manga_fetcher::app::{AddressResolver, Endpoints, LookupStage, MangaClient};
use manga_fetcher::errors::{DownloadError, ResolveError};

use support::{
    fallback_path, lookup_path, reader_page, test_client_config, StubResponse, StubServer,
};

fn resolver_for(server: &StubServer) -> AddressResolver {
    let client = Arc::new(MangaClient::new(&test_client_config(), 4).unwrap());
    AddressResolver::new(client, Arc::new(server.endpoints()))
}

/// A local address nothing listens on
fn closed_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn primary_page_resolves_in_one_request() {
    let server = StubServer::spawn();
    server.route(
        lookup_path("Berserk", "0001"),
        StubResponse::Html(reader_page(Some("scans.example.net/cdn"), Some(24))),
    );

    let resolved = resolver_for(&server).resolve("Berserk", "0001").await.unwrap();

    assert_eq!(resolved.resource_path, "scans.example.net/cdn");
    assert_eq!(resolved.page_count, Some(24));
    assert_eq!(resolved.source, LookupStage::Primary);
    assert_eq!(server.requests(), vec![lookup_path("Berserk", "0001")]);
}

#[tokio::test]
async fn missing_token_falls_back_to_alternate_page() {
    let server = StubServer::spawn();
    server.route(
        lookup_path("Berserk", "0002"),
        StubResponse::Html(reader_page(None, None)),
    );
    server.route(
        fallback_path("Berserk", "0002"),
        StubResponse::Html(reader_page(Some("mirror.example.net"), None)),
    );

    let resolved = resolver_for(&server).resolve("Berserk", "0002").await.unwrap();

    assert_eq!(resolved.resource_path, "mirror.example.net");
    assert_eq!(resolved.page_count, None);
    assert_eq!(resolved.source, LookupStage::Fallback);
    assert_eq!(
        server.requests(),
        vec![lookup_path("Berserk", "0002"), fallback_path("Berserk", "0002")]
    );
}

#[tokio::test]
async fn primary_http_error_skips_fallback() {
    let server = StubServer::spawn();
    server.route(lookup_path("Berserk", "0003"), StubResponse::Status(500));
    server.route(
        fallback_path("Berserk", "0003"),
        StubResponse::Html(reader_page(Some("mirror.example.net"), None)),
    );

    let err = resolver_for(&server)
        .resolve("Berserk", "0003")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::Download(DownloadError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(server.requests(), vec![lookup_path("Berserk", "0003")]);
}

#[tokio::test]
async fn token_absent_everywhere_is_not_found() {
    let server = StubServer::spawn();
    server.route(
        lookup_path("Berserk", "0004"),
        StubResponse::Html(reader_page(None, Some(12))),
    );
    // Fallback page is unrouted and answers 404

    let err = resolver_for(&server)
        .resolve("Berserk", "0004")
        .await
        .unwrap_err();

    match err {
        ResolveError::TokenNotFound { slug, chapter } => {
            assert_eq!(slug, "Berserk");
            assert_eq!(chapter, "0004");
        }
        other => panic!("expected TokenNotFound, got {other:?}"),
    }
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn decimal_chapter_codes_reach_the_lookup_url() {
    let server = StubServer::spawn();
    server.route(
        lookup_path("Berserk", "0010.5"),
        StubResponse::Html(reader_page(Some("scans.example.net"), Some(8))),
    );

    let resolved = resolver_for(&server)
        .resolve("Berserk", "0010.5")
        .await
        .unwrap();

    assert_eq!(resolved.page_count, Some(8));
    assert_eq!(server.request_count("/read-online/Berserk-chapter-0010.5"), 1);
}

#[tokio::test]
async fn unreachable_origin_is_a_transport_error() {
    let client = Arc::new(MangaClient::new(&test_client_config(), 4).unwrap());
    let endpoints = Endpoints::new(closed_origin(), "http").unwrap();
    let resolver = AddressResolver::new(client, Arc::new(endpoints));

    let err = resolver.resolve("Berserk", "0005").await.unwrap_err();

    assert!(
        matches!(err, ResolveError::Download(DownloadError::Http(_))),
        "{err:?}"
    );
}

#[tokio::test]
async fn timed_out_primary_skips_fallback() {
    let server = StubServer::spawn();
    server.route(
        lookup_path("Berserk", "0006"),
        StubResponse::Delayed(
            Duration::from_secs(3),
            Box::new(StubResponse::Html(reader_page(Some("scans.example.net"), None))),
        ),
    );
    server.route(
        fallback_path("Berserk", "0006"),
        StubResponse::Html(reader_page(Some("mirror.example.net"), None)),
    );

    let mut config = test_client_config();
    config.request_timeout = Duration::from_millis(500);
    let client = Arc::new(MangaClient::new(&config, 4).unwrap());
    let resolver = AddressResolver::new(client, Arc::new(server.endpoints()));

    let err = resolver.resolve("Berserk", "0006").await.unwrap_err();

    assert!(
        matches!(err, ResolveError::Download(DownloadError::Http(_))),
        "{err:?}"
    );
    assert_eq!(server.requests(), vec![lookup_path("Berserk", "0006")]);
}
