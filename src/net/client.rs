//! `PeerClient` — dials a peer and issues one request per connection.
//!
//! The teacher's RPC client keeps a long-lived `tonic` channel per peer;
//! this crate has no code generation step, so each call opens a fresh
//! `TcpStream`, rather than pooling connections. The anti-entropy loop
//! calls a peer at most once per cycle, so a connect-per-call strategy
//! keeps the implementation simple without costing anything real.

use std::collections::HashMap;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::entry::Entry;
use crate::error::{ReplicaError, Result};
use crate::version::Version;

use super::protocol::{GetReply, PullReply, PushReply, PutReply, Request, Response};
use super::transport::{read_message, write_message};

/// Dial timeout for a single peer connection. See `spec.md` §5 and §7.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// A thin, short-lived connection to one peer, used both by the
/// anti-entropy loop (`pull`/`push`) and the one-shot client binary
/// (`get`/`put`).
pub struct PeerClient {
    addr: String,
}

impl PeerClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream> {
        timeout(DIAL_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ReplicaError::Transport(format!("dial to {} timed out", self.addr)))?
            .map_err(|e| ReplicaError::Transport(format!("dial to {} failed: {e}", self.addr)))
    }

    async fn roundtrip(&self, request: Request) -> Result<Response> {
        let mut stream = self.connect().await?;
        write_message(&mut stream, &request).await?;
        read_message(&mut stream).await
    }

    pub async fn get(&self, key: &str) -> Result<GetReply> {
        match self.roundtrip(Request::Get { key: key.to_string() }).await? {
            Response::Get(reply) => Ok(reply),
            other => Err(unexpected("Get", other)),
        }
    }

    pub async fn put(&self, key: &str, value: Vec<u8>, track_visibility: bool) -> Result<PutReply> {
        let request = Request::Put {
            key: key.to_string(),
            value,
            track_visibility,
        };
        match self.roundtrip(request).await? {
            Response::Put(reply) => Ok(reply),
            other => Err(unexpected("Put", other)),
        }
    }

    pub async fn pull(&self, versions: HashMap<String, Version>) -> Result<PullReply> {
        match self.roundtrip(Request::Pull { versions }).await? {
            Response::Pull(reply) => Ok(reply),
            other => Err(unexpected("Pull", other)),
        }
    }

    pub async fn push(&self, entries: HashMap<String, Entry>) -> Result<PushReply> {
        match self.roundtrip(Request::Push { entries }).await? {
            Response::Push(reply) => Ok(reply),
            other => Err(unexpected("Push", other)),
        }
    }
}

fn unexpected(expected: &str, got: Response) -> ReplicaError {
    ReplicaError::Transport(format!("expected a {expected} reply, got {got:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_to_a_closed_port_fails_promptly() {
        // Port 0 never accepts; connect() fails fast rather than hanging for
        // the full dial timeout.
        let client = PeerClient::new("127.0.0.1:0");
        let result = client.get("k").await;
        assert!(result.is_err());
    }
}
