//! Wire frame and message codec.
//!
//! Wire format:
//! ```text
//! ┌──────┬──────────┬─────────┬──────┬───────────────────┬─────────┬──────┐
//! │ 0xFA │ len (2B) │ hdr CRC │ 0xFB │ message (len B)   │ msg CRC │ 0xFE │
//! │      │ LE u16   │         │      │                   │         │      │
//! └──────┴──────────┴─────────┴──────┴───────────────────┴─────────┴──────┘
//!
//! message:
//! ┌──────┬────────┬────────────────────┬──────┬────────────────────┐
//! │ type │ id (4B)│ name (32B, NUL-    │ 0x00 │ arguments          │
//! │      │ LE u32 │ terminated ASCII)  │      │ (len - 38 bytes)   │
//! └──────┴────────┴────────────────────┴──────┴────────────────────┘
//! ```
//!
//! The header CRC covers the sync byte and both length bytes; the message
//! CRC covers the message bytes only. Both use [`crc8`].
//!
//! Only a `Request` name is checked. Replies are correlated by id, and their
//! name field is read as the ASCII text before the first NUL or bad byte.

use core::fmt;

use super::crc::crc8;
use crate::error::{Error, Result};

/// Frame start marker; the decoder resynchronises on it.
pub const SYNC_START: u8 = 0xFA;
/// Structural marker closing the frame header.
pub const SYNC_MID: u8 = 0xFB;
/// Frame end marker.
pub const TERMINATOR: u8 = 0xFE;

/// sync-start, length (2), header CRC, sync-mid.
pub const FRAME_HEADER_SIZE: usize = 5;
/// Message CRC and terminator.
pub const FRAME_TRAILER_SIZE: usize = 2;
/// Largest frame the receive buffer accepts, overhead included.
pub const MAX_FRAME_SIZE: usize = 1024;
/// Largest message carried by one frame.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - FRAME_HEADER_SIZE - FRAME_TRAILER_SIZE;

/// Fixed size of the function name field, terminator included.
pub const NAME_FIELD_SIZE: usize = 32;
/// Usable characters in a function name.
pub const MAX_NAME_LEN: usize = NAME_FIELD_SIZE - 1;
/// type (1) + id (4) + name (32) + separator (1).
pub const MESSAGE_HEADER_SIZE: usize = 1 + 4 + NAME_FIELD_SIZE + 1;
/// Largest argument body a single frame can carry.
pub const MAX_ARGS_SIZE: usize = MAX_PAYLOAD_SIZE - MESSAGE_HEADER_SIZE;

const ID_OFFSET: usize = 1;
const NAME_OFFSET: usize = ID_OFFSET + 4;
const SEPARATOR_OFFSET: usize = NAME_OFFSET + NAME_FIELD_SIZE;

/// Owned, fixed-capacity buffer holding one complete frame.
pub type FrameBuf = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Total number of wire bytes for a message of `payload_len` bytes.
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_SIZE + payload_len + FRAME_TRAILER_SIZE
}

/// Header CRC over the sync byte and the little-endian length.
pub fn header_crc(payload_len: u16) -> u8 {
    let [lo, hi] = payload_len.to_le_bytes();
    crc8(&[SYNC_START, lo, hi])
}

// ── Message type ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Request = 0x01,
    Response = 0x02,
    /// Reserved for multi-frame transfers; accepted on the wire, not acted upon.
    Stream = 0x03,
    Error = 0x04,
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(raw: u8) -> core::result::Result<Self, DecodeError> {
        match raw {
            0x01 => Ok(Self::Request),
            0x02 => Ok(Self::Response),
            0x03 => Ok(Self::Stream),
            0x04 => Ok(Self::Error),
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

// ── Decode errors ────────────────────────────────────────────

/// Why a frame or message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the fixed overhead requires.
    TooShort,
    /// First byte is not `SYNC_START`.
    BadSync,
    /// Declared length would exceed `MAX_FRAME_SIZE`.
    Oversize(u16),
    /// Buffer length disagrees with the declared length.
    LengthMismatch,
    HeaderChecksum,
    /// Fifth byte is not `SYNC_MID`.
    SyncMid,
    PayloadChecksum,
    Terminator,
    UnknownType(u8),
    /// Name field has no terminator or is not ASCII.
    BadName,
    /// Separator byte after the name field is non-zero.
    Separator,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "frame too short"),
            Self::BadSync => write!(f, "missing start marker"),
            Self::Oversize(len) => write!(f, "declared length {len} exceeds buffer"),
            Self::LengthMismatch => write!(f, "length mismatch"),
            Self::HeaderChecksum => write!(f, "header checksum mismatch"),
            Self::SyncMid => write!(f, "missing mid-frame marker"),
            Self::PayloadChecksum => write!(f, "payload checksum mismatch"),
            Self::Terminator => write!(f, "missing terminator"),
            Self::UnknownType(t) => write!(f, "unknown message type 0x{t:02X}"),
            Self::BadName => write!(f, "malformed function name"),
            Self::Separator => write!(f, "non-zero separator"),
        }
    }
}

// ── Message view ─────────────────────────────────────────────

/// A decoded message borrowing from its frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub kind: MessageType,
    pub id: u32,
    pub name: &'a str,
    pub args: &'a [u8],
}

// ── Encoding ─────────────────────────────────────────────────

/// Encode a complete frame.
///
/// `name` is truncated to [`MAX_NAME_LEN`] bytes and NUL-padded to the
/// fixed field size. The output is exactly `frame_len(MESSAGE_HEADER_SIZE +
/// args.len())` bytes.
pub fn encode(kind: MessageType, id: u32, name: &str, args: &[u8]) -> Result<FrameBuf> {
    if args.len() > MAX_ARGS_SIZE {
        return Err(Error::FrameTooLarge);
    }
    let payload_len = (MESSAGE_HEADER_SIZE + args.len()) as u16;
    let [lo, hi] = payload_len.to_le_bytes();

    let mut name_field = [0u8; NAME_FIELD_SIZE];
    let name_bytes = &name.as_bytes()[..name.len().min(MAX_NAME_LEN)];
    name_field[..name_bytes.len()].copy_from_slice(name_bytes);

    let mut out = FrameBuf::new();
    let header = [SYNC_START, lo, hi, header_crc(payload_len), SYNC_MID];
    out.extend_from_slice(&header)
        .map_err(|_| Error::FrameTooLarge)?;
    out.push(kind as u8).map_err(|_| Error::FrameTooLarge)?;
    out.extend_from_slice(&id.to_le_bytes())
        .map_err(|_| Error::FrameTooLarge)?;
    out.extend_from_slice(&name_field)
        .map_err(|_| Error::FrameTooLarge)?;
    out.push(0).map_err(|_| Error::FrameTooLarge)?;
    out.extend_from_slice(args)
        .map_err(|_| Error::FrameTooLarge)?;

    let payload_crc = crc8(&out[FRAME_HEADER_SIZE..]);
    out.extend_from_slice(&[payload_crc, TERMINATOR])
        .map_err(|_| Error::FrameTooLarge)?;

    Ok(out)
}

// ── Decoding ─────────────────────────────────────────────────

/// Check the frame envelope and return the message bytes it carries.
pub fn validate_frame(frame: &[u8]) -> core::result::Result<&[u8], DecodeError> {
    if frame.len() < FRAME_HEADER_SIZE + FRAME_TRAILER_SIZE {
        return Err(DecodeError::TooShort);
    }
    if frame[0] != SYNC_START {
        return Err(DecodeError::BadSync);
    }
    let payload_len = u16::from_le_bytes([frame[1], frame[2]]);
    if frame_len(payload_len as usize) > MAX_FRAME_SIZE {
        return Err(DecodeError::Oversize(payload_len));
    }
    if frame.len() != frame_len(payload_len as usize) {
        return Err(DecodeError::LengthMismatch);
    }
    if header_crc(payload_len) != frame[3] {
        return Err(DecodeError::HeaderChecksum);
    }
    if frame[4] != SYNC_MID {
        return Err(DecodeError::SyncMid);
    }

    let payload_end = FRAME_HEADER_SIZE + payload_len as usize;
    let payload = &frame[FRAME_HEADER_SIZE..payload_end];
    if crc8(payload) != frame[payload_end] {
        return Err(DecodeError::PayloadChecksum);
    }
    if frame[payload_end + 1] != TERMINATOR {
        return Err(DecodeError::Terminator);
    }
    Ok(payload)
}

/// Interpret the message bytes carried inside a frame.
pub fn parse_message(payload: &[u8]) -> core::result::Result<Message<'_>, DecodeError> {
    if payload.len() < MESSAGE_HEADER_SIZE {
        return Err(DecodeError::TooShort);
    }
    let kind = MessageType::try_from(payload[0])?;

    let mut id_bytes = [0u8; 4];
    id_bytes.copy_from_slice(&payload[ID_OFFSET..NAME_OFFSET]);
    let id = u32::from_le_bytes(id_bytes);

    if payload[SEPARATOR_OFFSET] != 0 {
        return Err(DecodeError::Separator);
    }

    let field = &payload[NAME_OFFSET..SEPARATOR_OFFSET];
    let name = match kind {
        MessageType::Request => strict_name(field)?,
        // Replies are matched by id alone; some peers leave this field
        // uninitialised.
        MessageType::Response | MessageType::Error | MessageType::Stream => lossy_name(field),
    };

    Ok(Message {
        kind,
        id,
        name,
        args: &payload[MESSAGE_HEADER_SIZE..],
    })
}

/// A request's name must be NUL-terminated ASCII: it is looked up.
fn strict_name(field: &[u8]) -> core::result::Result<&str, DecodeError> {
    let nul = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::BadName)?;
    let name_bytes = &field[..nul];
    if !name_bytes.is_ascii() {
        return Err(DecodeError::BadName);
    }
    core::str::from_utf8(name_bytes).map_err(|_| DecodeError::BadName)
}

/// Longest ASCII prefix before the first NUL, possibly empty.
fn lossy_name(field: &[u8]) -> &str {
    let end = field
        .iter()
        .position(|&b| b == 0 || !b.is_ascii())
        .unwrap_or(field.len());
    core::str::from_utf8(&field[..end]).unwrap_or_default()
}

/// Validate a complete frame and decode the message it carries.
///
/// Any failure rejects the whole frame; no partial message is produced.
pub fn decode(frame: &[u8]) -> core::result::Result<Message<'_>, DecodeError> {
    parse_message(validate_frame(frame)?)
}

// ── Tests ────────────────────────────────────────────────────
