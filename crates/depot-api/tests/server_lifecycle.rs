//! Server lifecycle over real sockets: start, serve, finish.

use std::sync::Arc;

use depot_api::config::{ListenConfig, RepositoryConfig};
use depot_api::{create_store, DepotConfig, ServerError, ServerHandle, ServerRegistry, ServerState};
use depot_store::{ArtifactStore, MemoryStore};

fn config() -> DepotConfig {
    DepotConfig {
        listen: ListenConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        ..DepotConfig::default()
    }
}

fn store() -> Arc<dyn ArtifactStore> {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn start_on_port_zero_picks_a_port() {
    let server = ServerHandle::start(store(), &config()).await.unwrap();
    server.await_ready().await;
    assert!(server.port() > 0);
    assert!(server.is_started());
    assert!(!server.is_finished());
    assert_eq!(server.url(), format!("http://127.0.0.1:{}", server.port()));

    server.finish();
    server.await_finished().await;
    assert!(server.is_finished());
    assert_eq!(server.state(), ServerState::Finished);
}

#[tokio::test]
async fn finish_is_idempotent() {
    let server = ServerHandle::start(store(), &config()).await.unwrap();
    server.finish();
    server.finish();
    server.await_finished().await;
    server.finish();
    assert!(server.is_finished());
}

#[tokio::test]
async fn bind_conflict_is_an_error() {
    let first = ServerHandle::start(store(), &config()).await.unwrap();
    let taken = DepotConfig {
        listen: ListenConfig {
            host: "127.0.0.1".into(),
            port: first.port(),
        },
        ..DepotConfig::default()
    };
    let err = ServerHandle::start(store(), &taken).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
    first.finish();
    first.await_finished().await;
}

#[tokio::test]
async fn upload_and_download_over_http() {
    let store = create_store(&config()).await.unwrap();
    let server = ServerHandle::start(store, &config()).await.unwrap();
    let client = reqwest::Client::new();
    let url = format!("{}/org/example/app/1.0/app-1.0.jar", server.url());

    let put = client.put(&url).body("payload").send().await.unwrap();
    assert_eq!(put.status(), 200);

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.text().await.unwrap(), "payload");

    let metadata = client
        .get(format!("{}/org/example/app/maven-metadata.xml", server.url()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metadata.contains("<version>1.0</version>"));

    assert_eq!(server.metrics().uploads(), 1);
    server.finish();
    server.await_finished().await;
}

#[tokio::test]
async fn context_path_appears_in_url() {
    let config = DepotConfig {
        context_path: "repo/".into(),
        ..config()
    };
    let server = ServerHandle::start(store(), &config).await.unwrap();
    assert!(server.url().ends_with("/repo"));

    let settings = reqwest::get(format!("{}/settings.xml", server.url()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(settings.contains(&format!("<url>{}</url>", server.url())));
    server.finish();
    server.await_finished().await;
}

#[tokio::test]
async fn registry_finishes_everything() {
    let mut registry = ServerRegistry::new();
    let a = ServerHandle::start(store(), &config()).await.unwrap();
    let b = ServerHandle::start(store(), &config()).await.unwrap();
    assert!(registry.register("a", a.clone()).is_none());
    registry.register("b", b.clone());
    assert_eq!(registry.get("a").map(ServerHandle::port), Some(a.port()));
    assert_eq!(registry.len(), 2);

    registry.finish_all().await;
    assert!(registry.is_empty());
    assert!(a.is_finished() && b.is_finished());
}

#[tokio::test]
async fn registry_remove_returns_handle() {
    let mut registry = ServerRegistry::new();
    let server = ServerHandle::start(store(), &config()).await.unwrap();
    registry.register("only", server);
    let removed = registry.remove("only").unwrap();
    assert!(registry.get("only").is_none());
    removed.finish();
    removed.await_finished().await;
}

#[test]
fn memory_repository_is_the_default() {
    assert_eq!(DepotConfig::default().repositories, vec![RepositoryConfig::Memory]);
}
