//! The control protocol (port 5233): one packet out, at most one response
//! in.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::Result;
use crate::transport::packet::{build_control_packet, ControlCommand};

/// How long we wait for a status reply before treating the fan as silent.
pub const STATUS_READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound on a status reply; the payload shape is undocumented, so we
/// cap it rather than read until EOF.
pub const STATUS_READ_CAP: usize = 1024;

/// Outcome of a control command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlResponse {
    /// The command does not solicit a reply (pause/play/delete).
    Acknowledged,
    /// The fan's (opaque, undocumented) status payload.
    Status(Vec<u8>),
    /// A status request that expected a reply got none before the deadline.
    /// Treated as a non-error outcome, since the fan may simply not be
    /// running anything.
    NoReply,
}

/// Send `cmd` over an already-connected control socket and, for
/// [`ControlCommand::Status`], read back its reply.
pub async fn send_control<S>(stream: &mut S, cmd: ControlCommand) -> Result<ControlResponse>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let packet = build_control_packet(cmd);
    stream.write_all(&packet).await?;
    debug!(?cmd, "control command sent");

    if !cmd.expects_response() {
        return Ok(ControlResponse::Acknowledged);
    }

    let mut buf = vec![0u8; STATUS_READ_CAP];
    match tokio::time::timeout(STATUS_READ_TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(0)) => Ok(ControlResponse::NoReply),
        Ok(Ok(n)) => {
            buf.truncate(n);
            Ok(ControlResponse::Status(buf))
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Ok(ControlResponse::NoReply),
    }
}
