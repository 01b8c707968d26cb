//! Two replicas gossiping over real TCP sockets, exercising `spec.md` §8
//! scenario 1 end-to-end rather than through the `Store` trait directly.

use std::sync::Arc;
use std::time::Duration;

use honugossip::config::{BanditKind, ReplicaConfig, StoreKind};
use honugossip::net::PeerClient;
use honugossip::Replica;

fn config(addr: &str, pid: u64, peer: &str) -> ReplicaConfig {
    ReplicaConfig {
        addr: addr.to_string(),
        pid,
        store: StoreKind::Sequential,
        peers: vec![peer.to_string()],
        delay_ms: 50,
        uptime_secs: 0,
        stats_path: std::env::temp_dir().join(format!("honu-test-stats-{pid}.jsonl")),
        history_path: std::env::temp_dir().join(format!("honu-test-history-{pid}.jsonl")),
        visibility_path: None,
        bandit: BanditKind::Uniform,
        epsilon: 0.1,
    }
}

#[tokio::test]
async fn single_key_converges_to_the_higher_pid_after_one_anti_entropy_cycle() {
    let addr_a = "127.0.0.1:18291";
    let addr_b = "127.0.0.1:18292";

    let replica_a = Arc::new(Replica::new(&config(addr_a, 1, addr_b)).unwrap());
    let replica_b = Arc::new(Replica::new(&config(addr_b, 2, addr_a)).unwrap());

    let (shutdown_a_tx, shutdown_a_rx) = tokio::sync::oneshot::channel();
    let (shutdown_b_tx, shutdown_b_rx) = tokio::sync::oneshot::channel();

    let handle_a = tokio::spawn({
        let replica_a = replica_a.clone();
        async move {
            let _ = replica_a.serve(async { let _ = shutdown_a_rx.await; }).await;
        }
    });
    let handle_b = tokio::spawn({
        let replica_b = replica_b.clone();
        async move {
            let _ = replica_b.serve(async { let _ = shutdown_b_rx.await; }).await;
        }
    });

    // Give both listeners a moment to bind before dialing them.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client_a = PeerClient::new(addr_a);
    let client_b = PeerClient::new(addr_b);

    let put_a = client_a.put("x", b"a1".to_vec(), false).await.unwrap();
    let put_b = client_b.put("x", b"b1".to_vec(), false).await.unwrap();
    assert_eq!(put_a.version.as_deref(), Some("1.1"));
    assert_eq!(put_b.version.as_deref(), Some("1.2"));

    // A's and B's 50ms anti-entropy cycles run independently; wait for
    // several rounds of both directions to settle.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let reply_a = client_a.get("x").await.unwrap();
    let reply_b = client_b.get("x").await.unwrap();

    assert_eq!(reply_a.value.as_deref(), Some(b"b1".as_slice()));
    assert_eq!(reply_b.value.as_deref(), Some(b"b1".as_slice()));
    assert_eq!(reply_a.version.as_deref(), Some("1.2"));
    assert_eq!(reply_b.version.as_deref(), Some("1.2"));

    let _ = shutdown_a_tx.send(());
    let _ = shutdown_b_tx.send(());
    let _ = handle_a.await;
    let _ = handle_b.await;
}

#[tokio::test]
async fn empty_peer_list_still_serves_reads_and_writes() {
    let addr = "127.0.0.1:18293";
    let mut cfg = config(addr, 1, "127.0.0.1:18294");
    cfg.peers.clear();

    let replica = Arc::new(Replica::new(&cfg).unwrap());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn({
        let replica = replica.clone();
        async move {
            let _ = replica.serve(async { let _ = shutdown_rx.await; }).await;
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = PeerClient::new(addr);
    let put = client.put("k", b"v".to_vec(), false).await.unwrap();
    assert!(put.success);

    let get = client.get("k").await.unwrap();
    assert_eq!(get.value.as_deref(), Some(b"v".as_slice()));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
