//! # Check Subcommand
//!
//! Loads and validates a configuration, then builds every configured
//! store without starting a server. Creates `target` and `cache_dir`
//! directories as a side effect.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use depot_api::RepositoryConfig;

/// Arguments for the `depot check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML configuration file. Without it the default in-memory setup is checked.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the check subcommand. Returns 0 when the configuration is usable.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let config = crate::load_config(args.config.as_deref())?;
    let runtime = crate::runtime()?;
    let store = runtime
        .block_on(depot_api::create_store(&config))
        .context("configuration rejected")?;

    println!("listen:       {}:{}", config.listen.host, config.listen.port);
    println!("context path: {}", config.context_path());
    for (index, repo) in config.repositories.iter().enumerate() {
        println!("  #{index} {}", describe(repo));
    }
    println!("writable:     {}", store.is_writable());
    Ok(0)
}

fn describe(repo: &RepositoryConfig) -> String {
    match repo {
        RepositoryConfig::Hosted { target } => format!("hosted  {}", target.display()),
        RepositoryConfig::Local { source } => format!("local   {}", source.display()),
        RepositoryConfig::Mock { source } => format!("mock    {}", source.display()),
        RepositoryConfig::Proxy { url, cache_dir, .. } => format!(
            "proxy   {} (cache: {})",
            url.as_ref().map(|u| u.to_string()).unwrap_or_else(|| "no upstream".into()),
            cache_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "memory".into())
        ),
        RepositoryConfig::Memory => "memory".to_string(),
    }
}
