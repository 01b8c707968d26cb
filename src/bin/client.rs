//! `honu-client` — one-shot `get`/`put` CLI against a running replica. See
//! `spec.md` §6's CLI surface.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use honugossip::net::PeerClient;

#[derive(Parser)]
#[command(name = "honu-client", about = "One-shot client for a gossip replica")]
struct Cli {
    /// Replica address to connect to.
    #[arg(long, env = "HONU_ADDR", default_value = "127.0.0.1:3264")]
    addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Get { key: String },
    Put {
        key: String,
        value: String,
        #[arg(long)]
        track_visibility: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = PeerClient::new(&cli.addr);

    let result = match cli.command {
        Command::Get { key } => match client.get(&key).await {
            Ok(reply) if reply.success => {
                println!(
                    "{} = {:?} (version {})",
                    reply.key,
                    String::from_utf8_lossy(reply.value.as_deref().unwrap_or_default()),
                    reply.version.as_deref().unwrap_or("?"),
                );
                Ok(())
            }
            Ok(reply) => Err(reply.error.unwrap_or_else(|| "unknown error".to_string())),
            Err(e) => Err(e.to_string()),
        },
        Command::Put { key, value, track_visibility } => {
            match client.put(&key, value.into_bytes(), track_visibility).await {
                Ok(reply) if reply.success => {
                    println!("{} -> version {}", reply.key, reply.version.as_deref().unwrap_or("?"));
                    Ok(())
                }
                Ok(reply) => Err(reply.error.unwrap_or_else(|| "unknown error".to_string())),
                Err(e) => Err(e.to_string()),
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
