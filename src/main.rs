use anyhow::Result;
use clap::Parser;
use log::warn;
use std::time::Duration;

use subscout::cli::Args;
use subscout::engine::SubscoutEngine;
use subscout::types::{Config, SubscoutError};
use subscout::{config, sources};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let args = Args::parse();

    if args.list_sources {
        list_sources();
        return Ok(());
    }

    // No target is a silent no-op: stdout stays clean for whatever is
    // consuming the pipeline, and the exit code stays 0.
    let Some(domain) = args.domain.clone() else {
        return Ok(());
    };

    let config = build_config(&args)?;
    let engine = SubscoutEngine::new(config)?;

    match engine.run(&domain).await {
        Ok(()) => Ok(()),
        // A malformed target follows the same contract as a missing one.
        Err(SubscoutError::InvalidDomain(domain)) => {
            warn!("ignoring invalid domain: {}", domain);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match args.config_path.as_deref() {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if args.verify_tls {
        config.verify_tls = true;
    }
    if let Some(output_file) = args.output_file.clone() {
        config.output.file = Some(output_file);
    }
    if let Some(source_names) = args.sources.clone() {
        config.sources = source_names;
    }
    if let Some(api_key) = args.api_key.clone() {
        config.api_keys.insert("alienvault".to_string(), vec![api_key]);
    }

    Ok(config)
}

fn list_sources() {
    println!("Available sources:\n");

    let config = Config::default();
    for source in sources::all_sources(&config) {
        let info = source.info();
        let marker = if info.needs_key { " *" } else { "" };
        println!("  {}{}", info.name, marker);
    }

    println!("\n* = requires an API key");
}
