//! # depot-cli — Repository Server Launcher
//!
//! | Subcommand | Module       | Purpose                                   |
//! |------------|--------------|-------------------------------------------|
//! | `run`      | [`run`]      | Start a server and wait for a stop signal |
//! | `check`    | [`check`]    | Validate a configuration and build stores |

pub mod check;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};

use depot_api::DepotConfig;

/// Load `path`, or the default single in-memory repository when absent.
pub fn load_config(path: Option<&Path>) -> Result<DepotConfig> {
    match path {
        Some(path) => DepotConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            let mut config = DepotConfig::default();
            config
                .apply_env_overrides(|key| std::env::var(key).ok())
                .context("invalid DEPOT_* environment override")?;
            Ok(config)
        }
    }
}

/// A multi-threaded runtime for subcommands that serve or touch stores.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
