mod api;
mod application;
mod config;
mod domain;
mod notify;
mod utils;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use api::SabClient;
use application::{Command, CommandRouter, PollAgent, PollTimer, StateCache};
use config::AgentConfig;
use domain::AppError;
use notify::{NotificationSink, StdoutSink};

#[derive(Debug, Parser)]
#[command(name = "sabagent", version, about = "Background agent for a SABnzbd server")]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Stdout carries the event/response protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(AgentConfig::default_path);
    let config = AgentConfig::load(&config_path)?;
    info!("connecting to {}", config.host);

    let client = SabClient::new(config.credentials());
    let cache = StateCache::shared();
    let sink: Arc<dyn NotificationSink> = Arc::new(StdoutSink::new(config.popup_hide_ms));
    let agent = Arc::new(PollAgent::new(client.clone(), cache.clone(), sink.clone()));
    let timer = Arc::new(Mutex::new(PollTimer::new()));
    let interval = config.poll_interval();

    let router = CommandRouter::new(
        client,
        cache,
        sink,
        Arc::new(RwLock::new(config)),
        config_path,
        agent.clone(),
        timer.clone(),
    );

    // First poll right away, the timer takes over from there
    agent.tick().await;
    {
        let agent = agent.clone();
        timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rearm(interval, move || {
                let agent = agent.clone();
                async move { agent.tick().await }
            });
    }

    serve_commands(&router).await;
    Ok(())
}

/// Reads line-delimited JSON commands from stdin until EOF, answering on
/// stdout. Commands without a response value produce no output.
async fn serve_commands(router: &CommandRouter) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                if let Some(value) = router.handle(command).await {
                    println!("{}", serde_json::json!({ "result": value }));
                }
            }
            Err(e) => {
                debug!("unrecognized command: {}", e);
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            }
        }
    }
}
