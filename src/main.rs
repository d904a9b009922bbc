mod clock;
mod config;
mod error;
mod game;
mod network;
mod protocol;
mod service;
mod store;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::config::ServerConfig;
use crate::service::GameService;
use crate::store::GameStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match &config.data_dir {
        Some(dir) => match GameStore::open(dir) {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to open store at {}: {}", dir.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("Running with an in-memory store; state is lost on exit");
            GameStore::in_memory()
        }
    };
    let service = Arc::new(GameService::new(store, Arc::new(SystemClock)));

    let http = tokio::spawn(network::http_api::start(config.http_addr, service.clone()));
    let ws = tokio::spawn(network::server::start(config.ws_addr, service));

    tokio::select! {
        res = http => report("HTTP API", res),
        res = ws => report("WebSocket server", res),
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            ExitCode::SUCCESS
        }
    }
}

fn report(name: &str, res: Result<std::io::Result<()>, tokio::task::JoinError>) -> ExitCode {
    match res {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("{} failed: {}", name, e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{} task panicked: {}", name, e);
            ExitCode::FAILURE
        }
    }
}
