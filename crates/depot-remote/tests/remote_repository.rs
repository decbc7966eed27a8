//! Contract tests for RemoteRepository against a mock Maven repository.
//!
//! ## Requests Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | HEAD | `/{group}/{name}/{version}/{file}` | `last_modified_*` |
//! | GET  | `/{group}/{name}/{version}/{file}` | `fetch_*` |
//! | GET  | `/{path}/maven-metadata.xml` | `metadata_*` |
//! | GET  | `/archetype-catalog.xml` | `catalog_*` |

use chrono::{TimeZone, Utc};
use depot_core::{Coordinate, GroupPath};
use depot_remote::{RemoteConfig, RemoteRepository};
use depot_store::Upstream;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JAR_PATH: &str = "/org/example/lib/1.0/lib-1.0.jar";
const LAST_MODIFIED: &str = "Tue, 05 Mar 2024 07:08:09 GMT";

fn client(server: &MockServer) -> RemoteRepository {
    let mut config = RemoteConfig::new(&server.uri()).unwrap();
    config.timeout_secs = 5;
    config.max_retries = 0;
    RemoteRepository::new(config).unwrap()
}

fn jar() -> Coordinate {
    Coordinate::new(GroupPath::from_dotted("org.example"), "lib", "1.0", "jar")
}

// ── HEAD artifact ────────────────────────────────────────────────────

#[tokio::test]
async fn last_modified_reads_header() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(JAR_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("Last-Modified", LAST_MODIFIED))
        .expect(1)
        .mount(&server)
        .await;

    let modified = client(&server).last_modified(&jar()).await.unwrap();
    assert_eq!(modified, Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).single().unwrap());
}

#[tokio::test]
async fn last_modified_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(JAR_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).last_modified(&jar()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_error_is_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(JAR_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).last_modified(&jar()).await.unwrap_err();
    assert!(err.is_upstream_failure());
}

#[tokio::test]
async fn unreachable_upstream_is_unavailable() {
    let mut config = RemoteConfig::new("http://127.0.0.1:1").unwrap();
    config.timeout_secs = 1;
    config.max_retries = 0;
    let client = RemoteRepository::new(config).unwrap();

    let err = client.last_modified(&jar()).await.unwrap_err();
    assert!(err.is_upstream_failure());
}

// ── GET artifact ─────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JAR_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_bytes(b"jar-bytes".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let content = client(&server).fetch(&jar()).await.unwrap();
    assert_eq!(content.size, 9);
    assert_eq!(
        content.last_modified,
        Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).single().unwrap()
    );
    assert_eq!(content.into_bytes().await.unwrap(), b"jar-bytes");
}

// ── GET maven-metadata.xml ───────────────────────────────────────────

#[tokio::test]
async fn metadata_parses_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/example/lib/maven-metadata.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<metadata><groupId>org.example</groupId><artifactId>lib</artifactId>\
             <versioning><versions><version>1.0</version><version>2.0</version></versions>\
             </versioning></metadata>",
        ))
        .mount(&server)
        .await;

    let (metadata, _) = client(&server).metadata("org/example/lib").await.unwrap();
    assert_eq!(metadata.artifact_id.as_deref(), Some("lib"));
    assert_eq!(metadata.versioning.unwrap().versions, vec!["1.0", "2.0"]);
}

#[tokio::test]
async fn metadata_rejects_garbage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/org/example/lib/maven-metadata.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).metadata("org/example/lib").await.unwrap_err();
    assert!(matches!(err, depot_core::StoreError::InvalidDocument { .. }));
}

// ── GET archetype-catalog.xml ────────────────────────────────────────

#[tokio::test]
async fn catalog_parses_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archetype-catalog.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<archetype-catalog><archetypes><archetype>\
             <groupId>org.example</groupId><artifactId>starter</artifactId><version>1.0</version>\
             </archetype></archetypes></archetype-catalog>",
        ))
        .mount(&server)
        .await;

    let (catalog, _) = client(&server).catalog().await.unwrap();
    assert_eq!(catalog.archetypes.len(), 1);
    assert_eq!(catalog.archetypes[0].artifact_id, "starter");
}
