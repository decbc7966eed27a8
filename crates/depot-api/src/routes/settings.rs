//! Maven `settings.xml` pointing every repository at this server.

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

const SETTINGS_PATHS: [&str; 2] = ["/settings.xml", "/.settings.xml"];

pub fn is_settings_path(path: &str) -> bool {
    SETTINGS_PATHS.contains(&path)
}

/// The URL clients should use for this server, context path included.
pub fn server_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.public_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}{}", state.context_prefix())
}

pub fn document(state: &AppState, headers: &HeaderMap) -> Response {
    let url = server_url(state, headers);
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/xml"))],
        render(&url),
    )
        .into_response()
}

fn render(url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0"
          xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
          xsi:schemaLocation="http://maven.apache.org/SETTINGS/1.0.0 https://maven.apache.org/xsd/settings-1.0.0.xsd">
  <mirrors>
    <mirror>
      <id>depot</id>
      <mirrorOf>*</mirrorOf>
      <url>{url}</url>
    </mirror>
  </mirrors>
  <profiles>
    <profile>
      <id>depot</id>
      <repositories>
        <repository>
          <id>depot</id>
          <url>{url}</url>
          <releases><enabled>true</enabled></releases>
          <snapshots><enabled>true</enabled></snapshots>
        </repository>
      </repositories>
      <pluginRepositories>
        <pluginRepository>
          <id>depot</id>
          <url>{url}</url>
          <releases><enabled>true</enabled></releases>
          <snapshots><enabled>true</enabled></snapshots>
        </pluginRepository>
      </pluginRepositories>
    </profile>
  </profiles>
  <activeProfiles>
    <activeProfile>depot</activeProfile>
  </activeProfiles>
</settings>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn url_from_host_header_and_context() {
        let state = AppState::new(Arc::new(MemoryStore::new())).with_context_path(Some("/repo"));
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("build-box:8081"));
        assert_eq!(server_url(&state, &headers), "http://build-box:8081/repo");
    }

    #[test]
    fn configured_url_wins() {
        let state = AppState::new(Arc::new(MemoryStore::new()))
            .with_public_url("http://localhost:9000/");
        assert_eq!(server_url(&state, &HeaderMap::new()), "http://localhost:9000");
    }

    #[test]
    fn document_mirrors_everything() {
        let xml = render("http://localhost:1234");
        assert!(xml.contains("<mirrorOf>*</mirrorOf>"));
        assert_eq!(xml.matches("<url>http://localhost:1234</url>").count(), 3);
    }

    #[test]
    fn both_names_are_served() {
        assert!(is_settings_path("/settings.xml"));
        assert!(is_settings_path("/.settings.xml"));
        assert!(!is_settings_path("/org/settings.xml"));
    }
}
