//! Fan transport: the upload and control wire
//! protocols, plus a liveness probe, bundled behind a single handle.

pub mod control;
pub mod liveness;
pub mod packet;
#[cfg(feature = "locking-default")]
mod stats;
pub mod upload;

pub use control::{ControlResponse, STATUS_READ_CAP, STATUS_READ_TIMEOUT};
pub use packet::ControlCommand;
#[cfg(feature = "locking-default")]
pub use stats::Stats;
pub use upload::{UploadSession, UploadState, MIN_PACKET_GAP};

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::{Error, Result, TransportError};

/// Default upload-protocol port.
pub const DEFAULT_UPLOAD_PORT: u16 = 5499;
/// Default control-protocol port.
pub const DEFAULT_CONTROL_PORT: u16 = 5233;
/// Default deadline for establishing either connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A handle to one fan, addressed by IP. Upload and control each open a
/// fresh short-lived TCP connection per call; [`Fan`] only holds the
/// address and a single-flight guard, not a persistent socket.
///
/// Uploads and control commands are serialized against each other: the
/// fan's firmware has no documented behaviour for concurrent sessions, so
/// a [`tokio::sync::Mutex`] makes "one in flight at a time" an invariant of
/// this handle rather than the caller's responsibility.
pub struct Fan {
    addr: IpAddr,
    upload_port: u16,
    control_port: u16,
    connect_timeout: Duration,
    guard: Mutex<()>,
    #[cfg(feature = "locking-default")]
    stats: Stats,
}

impl Fan {
    /// A handle using the protocol's default ports and connect timeout.
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            upload_port: DEFAULT_UPLOAD_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            guard: Mutex::new(()),
            #[cfg(feature = "locking-default")]
            stats: Stats::new(),
        }
    }

    /// Counters for uploads completed through this handle. Only available
    /// with the `locking-default` feature (on by default).
    #[cfg(feature = "locking-default")]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// A handle overriding the default ports, for test rigs or
    /// non-standard deployments.
    pub fn with_ports(addr: IpAddr, upload_port: u16, control_port: u16) -> Self {
        Self {
            upload_port,
            control_port,
            ..Self::new(addr)
        }
    }

    /// Override the connect deadline (default [`DEFAULT_CONNECT_TIMEOUT`]).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn connect(&self, port: u16) -> Result<TcpStream> {
        let socket_addr = SocketAddr::new(self.addr, port);
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(Error::Transport(TransportError::ConnectFailed(e))),
            Err(_) => Err(Error::Transport(TransportError::Timeout)),
        }
    }

    /// Upload `data` (a complete `.bin` container, typically produced by
    /// [`crate::codec::encode_frame`]/[`crate::codec::encode_animation`])
    /// under `filename`. Only one upload or control call runs at a time
    /// per handle; concurrent callers queue.
    pub async fn upload(&self, filename: &str, data: &[u8]) -> Result<()> {
        let _permit = self.guard.lock().await;
        let stream = self.connect(self.upload_port).await?;
        let mut session = UploadSession::new(stream, MIN_PACKET_GAP);
        session.run(filename, data).await?;
        #[cfg(feature = "locking-default")]
        self.stats.record_upload(data.len() as u64);
        Ok(())
    }

    /// Send a control command and, for [`ControlCommand::Status`], read
    /// back its reply.
    pub async fn control(&self, cmd: ControlCommand) -> Result<ControlResponse> {
        let _permit = self.guard.lock().await;
        let mut stream = self.connect(self.control_port).await?;
        control::send_control(&mut stream, cmd).await
    }

    /// Best-effort liveness check: attempts a bare connect to the upload
    /// port and reports whether it succeeded within
    /// [`liveness::PING_TIMEOUT`]. Never returns an error.
    pub async fn ping(&self) -> bool {
        liveness::ping(SocketAddr::new(self.addr, self.upload_port)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn connect_to_closed_port_surfaces_as_transport_error() {
        // Bind then drop immediately: the OS reclaims the port so the next
        // connect attempt is refused, without needing an unreachable host.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fan = Fan::with_ports(addr.ip(), addr.port(), addr.port())
            .with_connect_timeout(Duration::from_millis(500));
        let err = fan.upload("demo", b"hi").await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn ping_unreachable_address_is_false() {
        let fan = Fan::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert!(!fan.ping().await);
    }
}
