// Plain (simple) RTMP handshake: C0/C1 -> S0/S1/S2 -> C2.
//
// The teacher's `rtmp/handshake.rs` implements the complex FP9 digest
// handshake (HMAC-SHA256 signed C1/S1). That dialect is out of scope here;
// this keeps the same entry-point shape (one function that drives the
// whole exchange over an `AsyncRead + AsyncWrite`) but the much smaller
// plain algorithm for its body.

use std::time::Duration;

use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::constants::{RTMP_HANDSHAKE_SIG_SIZE, RTMP_PING_TIMEOUT_SECS, RTMP_VERSION};
use crate::error::RtmpError;

/// Reads exactly `buf.len()` bytes, bounded by the same ping timeout the
/// chunk decoder uses, so a client that never sends C1/C2 doesn't pin a
/// task forever.
async fn read_exact_timed<S>(stream: &mut S, buf: &mut [u8]) -> Result<(), RtmpError>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout(Duration::from_secs(RTMP_PING_TIMEOUT_SECS), stream.read_exact(buf)).await {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => Err(RtmpError::HandshakeShortRead),
    }
}

/// Runs the server side of the plain handshake to completion
pub async fn perform_handshake<S>(stream: &mut S) -> Result<(), RtmpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut c0 = [0u8; 1];
    read_exact_timed(stream, &mut c0).await?;
    if c0[0] != RTMP_VERSION {
        return Err(RtmpError::HandshakePlainRequired);
    }

    let mut c1 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
    read_exact_timed(stream, &mut c1).await?;

    let mut s1 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
    // time(4) + zero(4) + random bytes, all zero/random is an acceptable
    // plain-handshake S1 since neither side validates the digest
    rand::thread_rng().fill_bytes(&mut s1[8..]);

    let s0 = [RTMP_VERSION];
    // S2 echoes C1 back verbatim, which is what a plain-handshake peer
    // checks before sending its own C2
    let s2 = c1.clone();

    stream.write_all(&s0).await?;
    stream.write_all(&s1).await?;
    stream.write_all(&s2).await?;
    stream.flush().await?;

    let mut c2 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
    read_exact_timed(stream, &mut c2).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn completes_over_a_well_behaved_client() {
        let (mut server, mut client) = duplex(RTMP_HANDSHAKE_SIG_SIZE * 4);

        let client_task = tokio::spawn(async move {
            let c1 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
            client.write_all(&[RTMP_VERSION]).await.unwrap();
            client.write_all(&c1).await.unwrap();
            client.flush().await.unwrap();

            let mut s0 = [0u8; 1];
            client.read_exact(&mut s0).await.unwrap();
            let mut s1 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
            client.read_exact(&mut s1).await.unwrap();
            let mut s2 = vec![0u8; RTMP_HANDSHAKE_SIG_SIZE];
            client.read_exact(&mut s2).await.unwrap();

            client.write_all(&s1).await.unwrap();
            client.flush().await.unwrap();

            assert_eq!(s0[0], RTMP_VERSION);
        });

        perform_handshake(&mut server).await.unwrap();
        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_a_non_version_3_client() {
        let (mut server, mut client) = duplex(RTMP_HANDSHAKE_SIG_SIZE * 4);

        let client_task = tokio::spawn(async move {
            client.write_all(&[6]).await.unwrap();
            client.flush().await.unwrap();
        });

        let result = perform_handshake(&mut server).await;
        assert!(matches!(result, Err(RtmpError::HandshakePlainRequired)));
        client_task.await.unwrap();
    }
}
