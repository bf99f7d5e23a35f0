//! The upload state machine (NAME -> DATA* -> END) over the upload socket
//! (port 5499).

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result, TransportError};
use crate::transport::packet::{
    build_data_packet, build_name_packet, to_bytes, DATA_PAYLOAD_SIZE,
};

/// The protocol's mandated floor on the gap between any two sends on the
/// upload socket. This is not a politeness rate limit: the target firmware
/// drops or corrupts traffic sent faster than this.
pub const MIN_PACKET_GAP: Duration = Duration::from_millis(30);

/// State of one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    /// Socket connected, nothing sent yet.
    Open,
    /// NAME sent; DATA or END may follow.
    Named,
    /// At least one DATA packet sent; more DATA or END may follow.
    Data,
    /// END sent successfully; the session is complete.
    Done,
    /// A send failed or a packet was sent out of order; the session is
    /// unusable.
    Failed,
}

/// Drives one upload (NAME -> DATA* -> END) over an already-connected
/// socket. Generic over the writer so tests can substitute an in-memory
/// duplex pipe for a real `TcpStream`.
///
/// A session is single-use: once `Done` or `Failed` it cannot be reused for
/// another upload. Partial uploads are not resumable — a
/// socket error here always leaves the session `Failed`.
pub struct UploadSession<W> {
    writer: W,
    state: UploadState,
    pace: Duration,
}

impl<W: AsyncWriteExt + Unpin> UploadSession<W> {
    /// Wrap an open writer. `pace` is the minimum delay enforced between
    /// sends; pass [`MIN_PACKET_GAP`] for real hardware.
    pub fn new(writer: W, pace: Duration) -> Self {
        Self {
            writer,
            state: UploadState::Open,
            pace,
        }
    }

    /// Current state.
    pub fn state(&self) -> UploadState {
        self.state
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.writer.write_all(bytes).await {
            self.state = UploadState::Failed;
            return Err(Error::Transport(TransportError::SendFailed(e)));
        }
        tokio::time::sleep(self.pace).await;
        Ok(())
    }

    /// Send the single NAME packet. Must be the first call on a freshly
    /// opened session.
    pub async fn send_name(&mut self, filename: &str, file_size: u32) -> Result<()> {
        if self.state != UploadState::Open {
            self.state = UploadState::Failed;
            return Err(Error::ProtocolViolation(
                "NAME must be the first packet of an upload".into(),
            ));
        }
        let packet = build_name_packet(file_size, filename)?;
        let bytes = to_bytes(&packet)?;
        self.send(&bytes).await?;
        self.state = UploadState::Named;
        Ok(())
    }

    /// Send one DATA packet carrying `chunk` (at most
    /// [`DATA_PAYLOAD_SIZE`] bytes; shorter chunks are zero-padded).
    /// Requires a NAME (or a prior DATA) packet to have already been sent.
    pub async fn send_data(&mut self, chunk: &[u8]) -> Result<()> {
        if !matches!(self.state, UploadState::Named | UploadState::Data) {
            self.state = UploadState::Failed;
            return Err(Error::ProtocolViolation(
                "DATA sent before NAME".into(),
            ));
        }
        let packet = build_data_packet(chunk);
        let bytes = to_bytes(&packet)?;
        self.send(&bytes).await?;
        self.state = UploadState::Data;
        Ok(())
    }

    /// Send the single END packet, terminating the upload.
    pub async fn send_end(&mut self) -> Result<()> {
        if !matches!(self.state, UploadState::Named | UploadState::Data) {
            self.state = UploadState::Failed;
            return Err(Error::ProtocolViolation(
                "END sent before NAME/DATA".into(),
            ));
        }
        let bytes = to_bytes(&crate::transport::packet::EndPacket)?;
        // The final send of an upload still needs the floor observed, but
        // there is no following packet to delay; `send` already sleeps
        // after writing, which keeps behaviour uniform and harmless.
        self.send(&bytes).await?;
        self.state = UploadState::Done;
        Ok(())
    }

    /// Run a complete upload: NAME, then as many DATA packets as `data`
    /// requires, then END. `filename`'s `.bin` extension is appended if
    /// missing.
    pub async fn run(&mut self, filename: &str, data: &[u8]) -> Result<()> {
        let file_size = u32::try_from(data.len())
            .map_err(|_| Error::InvalidInput("payload exceeds 4 GiB".into()))?;
        self.send_name(filename, file_size).await?;
        let mut sent_packets = 0u32;
        for chunk in data.chunks(DATA_PAYLOAD_SIZE).chain(empty_chunk_if_zero(data)) {
            self.send_data(chunk).await?;
            sent_packets += 1;
            if sent_packets % 100 == 0 {
                debug!(sent_packets, "upload progress");
            }
        }
        self.send_end().await?;
        debug!(filename, file_size, sent_packets, "upload complete");
        Ok(())
    }
}

/// `data.chunks()` yields nothing for an empty slice, but the protocol still
/// wants at least one (zero-padded) DATA packet for a zero-byte file.
fn empty_chunk_if_zero(data: &[u8]) -> std::option::IntoIter<&[u8]> {
    if data.is_empty() {
        Some(&[][..]).into_iter()
    } else {
        None.into_iter()
    }
}

impl<W> std::fmt::Debug for UploadSession<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("state", &self.state)
            .field("pace", &self.pace)
            .finish()
    }
}
