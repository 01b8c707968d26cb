//! Wire protocol, framing, and the peer client. The server side (accepting
//! connections and dispatching to a `Replica`) lives in `replica.rs`, next
//! to the state it mutates.

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{PeerClient, DIAL_TIMEOUT};
pub use protocol::{GetReply, PullReply, PushReply, PutReply, Request, Response};
