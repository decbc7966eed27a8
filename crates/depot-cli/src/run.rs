//! # Run Subcommand
//!
//! Starts a repository server and blocks until Ctrl-C, or until `finish`,
//! `stop` or `quit` is typed on stdin (unless `--no-console`). Shutdown is
//! graceful: in-flight requests complete before the process exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use depot_api::{DepotConfig, ServerHandle, ServerRegistry};

const SERVER_KEY: &str = "default";

/// Arguments for the `depot run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration file. Without it a single writable in-memory repository is served.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (0 picks a free port).
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Path prefix for every repository URL.
    #[arg(long)]
    pub context_path: Option<String>,

    /// Do not read stop commands from stdin.
    #[arg(long)]
    pub no_console: bool,
}

impl RunArgs {
    /// Command-line flags override file and environment settings.
    fn apply(&self, config: &mut DepotConfig) {
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(context) = &self.context_path {
            config.context_path = context.clone();
        }
    }
}

/// Execute the run subcommand.
pub fn run_run(args: &RunArgs) -> Result<u8> {
    let mut config = crate::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    crate::runtime()?.block_on(serve(config, !args.no_console))
}

async fn serve(config: DepotConfig, console: bool) -> Result<u8> {
    let store = depot_api::create_store(&config)
        .await
        .context("configuration rejected")?;
    let server = ServerHandle::start(store, &config)
        .await
        .context("failed to start server")?;
    server.await_ready().await;

    let mut registry = ServerRegistry::new();
    registry.register(SERVER_KEY, server.clone());

    println!("depot listening on {}", server.url());
    println!("Maven settings: {}/settings.xml", server.url());
    if console {
        println!("Type 'finish' to stop.");
    }

    wait_for_stop(console).await;

    tracing::info!(url = %server.url(), "shutting down");
    registry.finish_all().await;
    Ok(0)
}

async fn wait_for_stop(console: bool) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let stdin = async {
        if !console {
            return std::future::pending::<()>().await;
        }
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if is_stop_command(&line) => return,
                Ok(Some(_)) => {}
                // Closed stdin leaves Ctrl-C as the only way out.
                Ok(None) | Err(_) => return std::future::pending::<()>().await,
            }
        }
    };
    tokio::select! {
        _ = ctrl_c => tracing::debug!("received Ctrl-C"),
        _ = stdin => tracing::debug!("received stop command"),
    }
}

fn is_stop_command(line: &str) -> bool {
    matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "finish" | "stop" | "quit"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_commands() {
        assert!(is_stop_command("finish"));
        assert!(is_stop_command("  STOP \n"));
        assert!(is_stop_command("quit"));
        assert!(!is_stop_command("status"));
        assert!(!is_stop_command(""));
    }

    #[test]
    fn flags_override_config() {
        let args = RunArgs {
            config: None,
            port: Some(8123),
            host: Some("0.0.0.0".into()),
            context_path: Some("maven".into()),
            no_console: true,
        };
        let mut config = DepotConfig::default();
        args.apply(&mut config);
        assert_eq!(config.listen.port, 8123);
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.context_path(), "/maven");
    }
}
