use crate::config::Config;
use anyhow::Result;
use std::path::Path;

pub mod args;

pub use args::{Cli, CliCommand};

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

pub fn handle_check_config_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let dispatcher_url = config.dispatcher_sources()?.resolve()?;

    println!("Worker id:      {}", config.worker.id);
    println!("Dispatcher url: {}", dispatcher_url);
    if config.webhook.subscribers.is_empty() {
        println!("Subscribers:    (none)");
    } else {
        println!("Subscribers:");
        for subscriber in &config.webhook.subscribers {
            println!("  {}", subscriber);
        }
    }
    println!(
        "Request timeout: {}s",
        config.webhook.request_timeout_seconds
    );

    Ok(())
}
