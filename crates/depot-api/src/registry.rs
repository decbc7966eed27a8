//! Keyed collection of running servers.
//!
//! The registry is an ordinary value owned by whoever starts servers and
//! passed by reference. Keys are chosen by the caller.

use std::collections::BTreeMap;

use crate::server::ServerHandle;

#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: BTreeMap<String, ServerHandle>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` under `key`, returning any handle it replaces.
    pub fn register(&mut self, key: impl Into<String>, handle: ServerHandle) -> Option<ServerHandle> {
        self.servers.insert(key.into(), handle)
    }

    pub fn get(&self, key: &str) -> Option<&ServerHandle> {
        self.servers.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ServerHandle> {
        self.servers.remove(key)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    /// Stop every server and wait for all of them. Empties the registry.
    pub async fn finish_all(&mut self) {
        let servers = std::mem::take(&mut self.servers);
        for handle in servers.values() {
            handle.finish();
        }
        for (key, handle) in servers {
            handle.await_finished().await;
            tracing::debug!(key = %key, "server removed from registry");
        }
    }
}
