//! # Server Lifecycle
//!
//! [`ServerHandle`] owns one running repository server.
//!
//! ## States
//!
//! ```text
//! Stopped → Starting → Listening → Stopping → Finished
//! ```
//!
//! `start` returns once the socket is bound, so a returned handle is
//! always `Listening`. `finish` triggers graceful shutdown: the listener
//! closes, in-flight connections drain, then the state becomes `Finished`.
//! Proxy fetches already running on detached tasks complete on their own.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use depot_store::ArtifactStore;

use crate::config::DepotConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Errors starting a server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("cannot read bound address: {0}")]
    LocalAddr(std::io::Error),
}

/// Lifecycle state of a [`ServerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Stopping,
    Finished,
}

/// Handle to a running server. Clones share the same server.
#[derive(Clone)]
pub struct ServerHandle {
    inner: Arc<Inner>,
}

struct Inner {
    addr: SocketAddr,
    url: String,
    state: Arc<watch::Sender<ServerState>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    metrics: ApiMetrics,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl ServerHandle {
    /// Bind and start serving `store`. Port 0 picks an ephemeral port.
    pub async fn start(
        store: Arc<dyn ArtifactStore>,
        config: &DepotConfig,
    ) -> Result<Self, ServerError> {
        let (state_tx, _) = watch::channel(ServerState::Stopped);
        let state_tx = Arc::new(state_tx);
        state_tx.send_replace(ServerState::Starting);

        let bind_addr = format!("{}:{}", config.listen.host, config.listen.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: bind_addr.clone(),
                source: e,
            })?;
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let context = config.context_path();
        let url = server_url(&addr, &context);
        let state = AppState::new(store)
            .with_context_path(Some(&context))
            .with_public_url(url.clone());
        let metrics = ApiMetrics::new();
        let app = crate::router(state, metrics.clone());

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        state_tx.send_replace(ServerState::Listening);
        let task_state = state_tx.clone();
        let task_url = url.clone();
        let task_metrics = metrics.clone();
        let task = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(signal).await {
                tracing::error!(url = %task_url, "server terminated: {e}");
            }
            task_state.send_replace(ServerState::Finished);
            tracing::info!(
                url = %task_url,
                requests = task_metrics.requests(),
                errors = task_metrics.errors(),
                uploads = task_metrics.uploads(),
                "server finished"
            );
        });
        tracing::info!(url = %url, "server listening");

        Ok(Self {
            inner: Arc::new(Inner {
                addr,
                url,
                state: state_tx,
                shutdown: shutdown_tx,
                task: Mutex::new(Some(task)),
                metrics,
            }),
        })
    }

    pub fn port(&self) -> u16 {
        self.inner.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// `http://{host}:{port}{context}`, with `localhost` for wildcard binds.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state.borrow()
    }

    pub fn metrics(&self) -> &ApiMetrics {
        &self.inner.metrics
    }

    pub fn is_started(&self) -> bool {
        self.state() >= ServerState::Listening
    }

    pub fn is_finished(&self) -> bool {
        self.state() == ServerState::Finished
    }

    /// Signal graceful shutdown. Safe to call more than once.
    pub fn finish(&self) {
        let moved = self.inner.state.send_if_modified(|state| {
            if *state == ServerState::Listening {
                *state = ServerState::Stopping;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::info!(url = %self.inner.url, "server stopping");
        }
        self.inner.shutdown.send_replace(true);
    }

    /// Wait until the server accepts connections.
    pub async fn await_ready(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| *s >= ServerState::Listening).await;
    }

    /// Wait until the server task has exited.
    pub async fn await_finished(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| *s == ServerState::Finished).await;
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(url = %self.inner.url, "server task failed: {e}");
            }
        }
    }
}

fn server_url(addr: &SocketAddr, context: &str) -> String {
    let host = if addr.ip().is_unspecified() {
        "localhost".to_string()
    } else if addr.is_ipv6() {
        format!("[{}]", addr.ip())
    } else {
        addr.ip().to_string()
    };
    let context = context.trim_end_matches('/');
    format!("http://{host}:{}{context}", addr.port())
}
