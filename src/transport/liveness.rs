//! Liveness probing: a best-effort "is anything listening" check, not part
//! of the upload or control protocols themselves (a supplemented
//! feature — no registry, just a point-in-time probe).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Upper bound on how long a liveness probe may take.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Attempt a bare TCP connect to `addr` within [`PING_TIMEOUT`]. Returns
/// `true` only if a connection was established; any failure (refused,
/// unreachable, timed out) reports `false` rather than propagating an
/// error, since this check exists precisely to tolerate an absent fan.
pub async fn ping(addr: SocketAddr) -> bool {
    match tokio::time::timeout(PING_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!(%addr, %e, "ping: connect failed");
            false
        }
        Err(_) => {
            debug!(%addr, "ping: timed out");
            false
        }
    }
}
