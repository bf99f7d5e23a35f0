//! Wire framing for the upload protocol (port 5499) and control protocol
//! (port 5233): header/trailer constants and the packet shapes built from
//! them.

use binrw::{binwrite, BinWrite};
use std::io::Cursor;

use crate::error::{Error, Result};

/// Serialize any fixed-shape, argument-free `binrw` packet to its wire bytes.
pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>>
where
    T: BinWrite,
    for<'a> T::Args<'a>: Default,
{
    let mut cursor = Cursor::new(Vec::new());
    value.write(&mut cursor)?;
    Ok(cursor.into_inner())
}

/// Shared header prefix of every upload-protocol packet (NAME/DATA/END).
pub const UPLOAD_HEADER: [u8; 8] = *b"\xD3\xE0\xC9\xBA\x02\x01\x4D\xD8";
/// Shared trailer suffix of every upload-protocol packet.
pub const UPLOAD_TRAILER: [u8; 4] = *b"\xBF\xB5\xD2\xA2";
/// NAME packet tag.
pub const TAG_NAME: [u8; 4] = *b"0AgQ";
/// DATA packet tag.
pub const TAG_DATA: [u8; 4] = *b"1GnH";
/// END packet tag.
pub const TAG_END: [u8; 4] = *b"1AfF";

/// Fixed DATA payload size: the reference device's fixed 1460-byte packet
/// size minus the 8-byte header, 4-byte tag, and 4-byte trailer that wrap
/// it (`1460 - 8 - 4 - 4`).
pub const DATA_PAYLOAD_SIZE: usize = 1444;

/// Maximum filename length, in bytes, accepted in a NAME packet.
pub const MAX_FILENAME_LEN: usize = 99;

/// Shared header prefix of every control packet.
pub const CONTROL_HEADER: [u8; 13] = *b"\xC0\xEE\xB7\xC9\xBA\xA3\x02\x00\x00\x00\x00\x14\xCC";

/// Pause command code.
pub const CMD_PAUSE: [u8; 2] = *b"34";
/// Play/resume command code.
pub const CMD_PLAY: [u8; 2] = *b"35";
/// Status-query command code; the only command expecting a reply.
pub const CMD_STATUS: [u8; 2] = *b"38";
/// Delete command code.
pub const CMD_DELETE: [u8; 2] = *b"39";

/// Control-packet suffix used by pause/play/status.
///
/// The reference device mixes two literal ASCII suffixes rather than a
/// consistent binary trailer; this follows the observed wire captures
/// rather than assuming a transcription bug.
pub const CONTROL_SUFFIX_DEFAULT: &[u8] = b"lfhbfb5d2a2";
/// Control-packet suffix used by delete only.
pub const CONTROL_SUFFIX_DELETE: &[u8] = b"lfj00bfb5d2a2";

/// NAME packet: first packet of an upload, carrying the total file size and
/// filename.
#[binwrite]
#[bw(big, magic = b"\xD3\xE0\xC9\xBA\x02\x01\x4D\xD80AgQ")]
pub struct NamePacket {
    file_size: u32,
    filename: Vec<u8>,
    #[bw(magic = b"\xBF\xB5\xD2\xA2")]
    _trailer: (),
}

/// Build a NAME packet for `filename` (the `.bin` extension is appended if
/// missing) announcing `file_size` bytes of subsequent DATA payload.
pub fn build_name_packet(file_size: u32, filename: &str) -> Result<NamePacket> {
    let mut name = filename.to_string();
    if !name.ends_with(".bin") {
        name.push_str(".bin");
    }
    let filename_bytes = name.into_bytes();
    if filename_bytes.is_empty() {
        return Err(Error::InvalidInput("filename must not be empty".into()));
    }
    if filename_bytes.len() > MAX_FILENAME_LEN {
        return Err(Error::ProtocolViolation(format!(
            "filename {} bytes exceeds the {MAX_FILENAME_LEN}-byte limit",
            filename_bytes.len()
        )));
    }
    Ok(NamePacket {
        file_size,
        filename: filename_bytes,
        _trailer: (),
    })
}

/// DATA packet: exactly [`DATA_PAYLOAD_SIZE`] bytes of payload, zero-padded
/// by the caller if this is the final chunk.
#[binwrite]
#[bw(big, magic = b"\xD3\xE0\xC9\xBA\x02\x01\x4D\xD81GnH")]
pub struct DataPacket {
    payload: [u8; DATA_PAYLOAD_SIZE],
    #[bw(magic = b"\xBF\xB5\xD2\xA2")]
    _trailer: (),
}

/// Build a DATA packet from a chunk of at most [`DATA_PAYLOAD_SIZE`] bytes,
/// zero-padding if short.
pub fn build_data_packet(chunk: &[u8]) -> DataPacket {
    debug_assert!(chunk.len() <= DATA_PAYLOAD_SIZE);
    let mut payload = [0u8; DATA_PAYLOAD_SIZE];
    payload[..chunk.len()].copy_from_slice(chunk);
    DataPacket {
        payload,
        _trailer: (),
    }
}

/// END packet: terminates an upload. Carries no body.
#[binwrite]
#[bw(big, magic = b"\xD3\xE0\xC9\xBA\x02\x01\x4D\xD81AfF\xBF\xB5\xD2\xA2")]
pub struct EndPacket;

/// Control command vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Pause playback on the fan.
    Pause,
    /// Resume (or start) playback on the fan.
    Play,
    /// Only this command expects a response.
    Status,
    /// Delete the uploaded content from the fan.
    Delete,
}

impl ControlCommand {
    fn code(self) -> [u8; 2] {
        match self {
            ControlCommand::Pause => CMD_PAUSE,
            ControlCommand::Play => CMD_PLAY,
            ControlCommand::Status => CMD_STATUS,
            ControlCommand::Delete => CMD_DELETE,
        }
    }

    fn suffix(self) -> &'static [u8] {
        match self {
            ControlCommand::Delete => CONTROL_SUFFIX_DELETE,
            _ => CONTROL_SUFFIX_DEFAULT,
        }
    }

    /// Whether the fan is expected to write a response back for this
    /// command.
    pub fn expects_response(self) -> bool {
        matches!(self, ControlCommand::Status)
    }
}

/// Build the raw bytes of a control packet for `cmd`. The command-dependent
/// literal ASCII suffix rules this out of being a single `binrw` struct.
pub fn build_control_packet(cmd: ControlCommand) -> Vec<u8> {
    let mut out = Vec::with_capacity(CONTROL_HEADER.len() + 2 + cmd.suffix().len());
    out.extend_from_slice(&CONTROL_HEADER);
    out.extend_from_slice(&cmd.code());
    out.extend_from_slice(cmd.suffix());
    out
}
