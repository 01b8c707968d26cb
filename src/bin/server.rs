//! `honu-server` — runs one replica. See `spec.md` §6's CLI surface.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use honugossip::{Replica, ReplicaConfig};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let config = ReplicaConfig::parse();

    let replica = match Replica::new(&config) {
        Ok(replica) => Arc::new(replica),
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        match config.uptime_limit() {
            Some(limit) => {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };

    match replica.serve(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("replica stopped with an error: {e}");
            ExitCode::FAILURE
        }
    }
}
