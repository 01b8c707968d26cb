//! Length-prefixed `bincode` framing over a `TcpStream`. The teacher's
//! `network::server` reads one request per `read()` call on a fresh buffer;
//! that only works for a single request-then-close connection. This
//! crate's peers hold long-lived connections (gossip + client traffic both
//! reuse them), so each message is framed with a 4-byte big-endian length
//! prefix to tell replies apart on the wire.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ReplicaError, Result};

/// Maximum single message size (16MB), mirroring the teacher's
/// `MAX_BINCODE_SIZE` guard against unbounded allocation from a malformed
/// length prefix.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

pub async fn write_message<T, W>(stream: &mut W, message: &T) -> Result<()>
where
    T: bincode::Encode,
    W: AsyncWrite + Unpin,
{
    let bytes = bincode::encode_to_vec(message, bincode::config::standard())?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| ReplicaError::Serialization("message too large to frame".into()))?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_message<T, R>(stream: &mut R) -> Result<T>
where
    T: bincode::Decode<()>,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(ReplicaError::Transport(format!(
            "message of {len} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit"
        )));
    }

    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;

    let (message, _) = bincode::decode_from_slice(&buf, bincode::config::standard())?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{GetReply, Response};

    #[tokio::test]
    async fn message_round_trips_over_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let reply = Response::Get(GetReply {
            success: true,
            key: "k".into(),
            version: Some("1.1".into()),
            value: Some(b"v".to_vec()),
            error: None,
        });

        write_message(&mut client, &reply).await.unwrap();
        let decoded: Response = read_message(&mut server).await.unwrap();

        match decoded {
            Response::Get(g) => {
                assert_eq!(g.key, "k");
                assert_eq!(g.value, Some(b"v".to_vec()));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected_before_allocating() {
        let (mut client, mut server) = tokio::io::duplex(16);
        let too_big = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        client.write_all(&too_big).await.unwrap();

        let result: Result<Response> = read_message(&mut server).await;
        assert!(result.is_err());
    }
}
