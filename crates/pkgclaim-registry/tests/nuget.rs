//! NuGet checker against a mock V3 feed.

mod common;

use std::time::{Duration, Instant};

use common::{claim, config_for, refused_origin, validator};
use pkgclaim_core::{ErrorKind, PackageReference};
use pkgclaim_registry::ValidationContext;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves a service index, a version list for `acme.foo` and, if given, a README.
async fn nuget_feed(readme: Option<&str>) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "3.0.0",
            "resources": [
                { "@id": format!("{}/query", server.uri()), "@type": "SearchQueryService" },
                { "@id": format!("{}/flat/", server.uri()), "@type": "PackageBaseAddress/3.0.0" }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flat/acme.foo/index.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "versions": ["0.9.0", "1.0.0", "1.1.0-beta"] })),
        )
        .mount(&server)
        .await;

    if let Some(readme) = readme {
        for version in ["1.0.0", "1.1.0-beta"] {
            Mock::given(method("GET"))
                .and(path(format!("/flat/acme.foo/{version}/readme")))
                .respond_with(ResponseTemplate::new(200).set_body_string(readme))
                .mount(&server)
                .await;
        }
    }

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}

async fn validate(server: &MockServer, package: &PackageReference) -> pkgclaim_core::Result<()> {
    validator()
        .validate(
            &ValidationContext::background(),
            package,
            &claim(),
            &config_for(&server.uri()),
        )
        .await
}

#[tokio::test]
async fn test_readme_marker_matches() {
    let server = nuget_feed(Some("# Acme.Foo\n\nmcp-name: io.github.acme/foo\n")).await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    assert_eq!(validate(&server, &package).await, Ok(()));
}

#[tokio::test]
async fn test_latest_stable_version_used_when_unversioned() {
    let server = nuget_feed(Some("<!-- mcp-name: io.github.acme/foo -->")).await;

    let package = PackageReference::new("nuget", "Acme.Foo");
    assert!(validate(&server, &package).await.is_ok());

    let readme_paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p.ends_with("/readme"))
        .collect();
    assert_eq!(readme_paths, ["/flat/acme.foo/1.0.0/readme"]);
}

#[tokio::test]
async fn test_short_version_matches_published_version() {
    let server = nuget_feed(Some("mcp-name: io.github.acme/foo")).await;

    for requested in ["1.0", "1.0.0.0", "01.0.0", "1.0.0+build.5"] {
        let package = PackageReference::new("nuget", "Acme.Foo").with_version(requested);
        assert_eq!(validate(&server, &package).await, Ok(()), "{requested}");
    }
}

#[tokio::test]
async fn test_prerelease_can_be_requested_explicitly() {
    let server = nuget_feed(Some("mcp-name: io.github.acme/foo")).await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.1.0-BETA");
    assert_eq!(validate(&server, &package).await, Ok(()));
}

#[tokio::test]
async fn test_readme_for_other_server_is_mismatch() {
    let server = nuget_feed(Some("mcp-name: io.github.acme/bar")).await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProofMismatch);
}

#[tokio::test]
async fn test_package_without_readme_is_proof_missing() {
    let server = nuget_feed(None).await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProofMissing);
}

#[tokio::test]
async fn test_unpublished_version_is_not_found() {
    let server = nuget_feed(Some("mcp-name: io.github.acme/foo")).await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("2.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PackageNotFound);
}

#[tokio::test]
async fn test_unknown_package_is_not_found() {
    let server = nuget_feed(None).await;

    let package = PackageReference::new("nuget", "Acme.Missing").with_version("1.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PackageNotFound);
}

#[tokio::test]
async fn test_feed_without_flat_container_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resources": [] })))
        .mount(&server)
        .await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OriginUnreachable);
}

#[tokio::test]
async fn test_refused_connection_is_unreachable() {
    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let err = validator()
        .validate(
            &ValidationContext::background(),
            &package,
            &claim(),
            &config_for(&refused_origin()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OriginUnreachable);
}

#[tokio::test]
async fn test_version_index_server_error_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [
                { "@id": format!("{}/flat/", server.uri()), "@type": "PackageBaseAddress/3.0.0" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let err = validate(&server, &package).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OriginUnreachable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_deadline_covers_every_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": [
                { "@id": format!("{}/flat/", server.uri()), "@type": "PackageBaseAddress/3.0.0" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/acme.foo/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "versions": ["1.0.0"] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flat/acme.foo/1.0.0/readme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("mcp-name: io.github.acme/foo")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let package = PackageReference::new("nuget", "Acme.Foo").with_version("1.0.0");
    let ctx = ValidationContext::with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let err = validator()
        .validate(&ctx, &package, &claim(), &config_for(&server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CancelledOrTimedOut);
    assert!(started.elapsed() < Duration::from_secs(3));
    // The first two round trips completed before the deadline.
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 3);
}
