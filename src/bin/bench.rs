//! `honu-bench` — throughput benchmark driver. Spins up a pool of worker
//! tasks issuing `Put`s against a running replica and records latencies to
//! a CSV file. See `spec.md` §6's CLI surface.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use honugossip::net::PeerClient;
use honugossip::results::{Latency, ResultsWriter};
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "honu-bench", about = "Throughput benchmark against a gossip replica")]
struct Cli {
    /// Replica address to hammer with writes.
    #[arg(long, env = "HONU_ADDR", default_value = "127.0.0.1:3264")]
    addr: String,

    /// Number of concurrent worker tasks.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// How long to run, in seconds.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Delay before the first request, letting the replica finish booting.
    #[arg(long, default_value_t = 0)]
    startup_delay_secs: u64,

    /// Prefix applied to generated keys, so concurrent runs don't collide.
    #[arg(long, default_value = "bench")]
    key_prefix: String,

    /// Where to append per-request latencies.
    #[arg(long, default_value = "bench-results.csv")]
    results_path: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.startup_delay_secs > 0 {
        tokio::time::sleep(Duration::from_secs(cli.startup_delay_secs)).await;
    }

    let writer = match ResultsWriter::open(&cli.results_path) {
        Ok(w) => Arc::new(Mutex::new(w)),
        Err(e) => {
            eprintln!("error opening results file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let deadline = Instant::now() + Duration::from_secs(cli.duration_secs);
    let mut workers = Vec::with_capacity(cli.workers);

    for worker_id in 0..cli.workers {
        let addr = cli.addr.clone();
        let key_prefix = cli.key_prefix.clone();
        let writer = writer.clone();

        workers.push(tokio::spawn(async move {
            let client = PeerClient::new(&addr);
            let mut counter: u64 = 0;
            while Instant::now() < deadline {
                let key = format!("{key_prefix}-{worker_id}-{counter}");
                let value = format!("v{counter}").into_bytes();
                let bytes = value.len();

                let started = Instant::now();
                let outcome = client.put(&key, value, false).await;
                let latency = started.elapsed();

                let (version, success) = match &outcome {
                    Ok(reply) => (reply.version.clone(), reply.success),
                    Err(_) => (None, false),
                };

                let record = Latency::new("put", key, version, latency, bytes, success);
                let _ = writer.lock().await.record(&record);

                counter += 1;
            }
        }));
    }

    for worker in workers {
        let _ = worker.await;
    }

    if let Ok(mut writer) = writer.try_lock() {
        let _ = writer.flush();
    }

    ExitCode::SUCCESS
}
