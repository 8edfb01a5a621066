//! Byte-at-a-time frame reassembly.
//!
//! ```text
//! WaitSync ──0xFA──▶ WaitLenLow ──▶ WaitLenHigh ──▶ WaitData ──▶ emit / discard
//!    ▲                                   │             │              │
//!    └────────── oversize length ────────┘── bad hdr ──┘──────────────┘
//! ```
//!
//! The decoder never blocks, never allocates and never writes past its fixed
//! receive buffer: a declared length that cannot fit is rejected as soon as
//! the high length byte arrives. The header checksum is verified as soon as
//! its byte lands so a corrupted length cannot swallow the frames behind it.

use super::codec::{self, DecodeError, MAX_FRAME_SIZE, SYNC_START};
use super::crc::crc8;

const HEADER_CRC_INDEX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    WaitSync,
    WaitLenLow,
    WaitLenHigh,
    /// Accumulating until `expected` bytes (overhead included) are buffered.
    WaitData { expected: usize },
}

/// Result of feeding one byte.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<'a> {
    /// Frame still incomplete (or no frame in progress).
    Pending,
    /// A complete, validated frame. Valid until the next `feed_byte`.
    Frame(&'a [u8]),
    /// The accumulated bytes were discarded.
    Discarded(DecodeError),
}

/// Streaming frame decoder with a fixed receive buffer.
pub struct FrameDecoder {
    state: RxState,
    buf: [u8; MAX_FRAME_SIZE],
    index: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: RxState::WaitSync,
            buf: [0; MAX_FRAME_SIZE],
            index: 0,
        }
    }

    /// Feed one received byte. Safe to call from interrupt context.
    pub fn feed_byte(&mut self, byte: u8) -> Step<'_> {
        match self.state {
            RxState::WaitSync => {
                if byte == SYNC_START {
                    self.index = 0;
                    self.store(byte);
                    self.state = RxState::WaitLenLow;
                }
                Step::Pending
            }

            RxState::WaitLenLow => {
                self.store(byte);
                self.state = RxState::WaitLenHigh;
                Step::Pending
            }

            RxState::WaitLenHigh => {
                self.store(byte);
                let declared = u16::from_le_bytes([self.buf[1], byte]);
                let expected = codec::frame_len(declared as usize);
                if expected > MAX_FRAME_SIZE {
                    self.reset();
                    return Step::Discarded(DecodeError::Oversize(declared));
                }
                self.state = RxState::WaitData { expected };
                Step::Pending
            }

            RxState::WaitData { expected } => {
                self.store(byte);

                if self.index == HEADER_CRC_INDEX + 1
                    && crc8(&self.buf[..HEADER_CRC_INDEX]) != self.buf[HEADER_CRC_INDEX]
                {
                    self.reset();
                    return Step::Discarded(DecodeError::HeaderChecksum);
                }

                if self.index < expected {
                    return Step::Pending;
                }

                let len = self.index;
                self.reset();
                let frame = &self.buf[..len];
                match codec::decode(frame) {
                    Ok(_) => Step::Frame(frame),
                    Err(e) => Step::Discarded(e),
                }
            }
        }
    }

    /// Drop any partial frame and wait for the next start marker.
    pub fn reset(&mut self) {
        self.state = RxState::WaitSync;
        self.index = 0;
    }

    /// Whether a frame is partially accumulated.
    pub fn in_frame(&self) -> bool {
        self.state != RxState::WaitSync
    }

    fn store(&mut self, byte: u8) {
        // `expected` never exceeds the buffer, so this only guards against
        // a logic error rather than hostile input.
        if let Some(slot) = self.buf.get_mut(self.index) {
            *slot = byte;
            self.index += 1;
        } else {
            self.reset();
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::codec::{MessageType, TERMINATOR, encode, header_crc};

    fn feed_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &b in bytes {
            if let Step::Frame(f) = decoder.feed_byte(b) {
                frames.push(f.to_vec());
            }
        }
        frames
    }

    #[test]
    fn reassembles_single_frame() {
        let frame = encode(MessageType::Request, 5, "echo", &[1, 2]).unwrap();
        let mut d = FrameDecoder::new();
        let frames = feed_all(&mut d, &frame);
        assert_eq!(frames, vec![frame.to_vec()]);
        assert!(!d.in_frame());
    }

    #[test]
    fn skips_leading_noise() {
        let frame = encode(MessageType::Response, 2, "f", &[7]).unwrap();
        let mut bytes = vec![0x00, 0x13, TERMINATOR, 0x42];
        bytes.extend_from_slice(&frame);
        let mut d = FrameDecoder::new();
        assert_eq!(feed_all(&mut d, &bytes), vec![frame.to_vec()]);
    }

    #[test]
    fn back_to_back_frames() {
        let a = encode(MessageType::Request, 1, "a", &[]).unwrap();
        let b = encode(MessageType::Request, 2, "b", &[0xFA, 0xFE]).unwrap();
        let mut bytes = a.to_vec();
        bytes.extend_from_slice(&b);
        let mut d = FrameDecoder::new();
        assert_eq!(feed_all(&mut d, &bytes), vec![a.to_vec(), b.to_vec()]);
    }

    #[test]
    fn oversize_length_rejected_before_payload() {
        let mut d = FrameDecoder::new();
        assert_eq!(d.feed_byte(SYNC_START), Step::Pending);
        assert_eq!(d.feed_byte(0xFF), Step::Pending);
        assert_eq!(
            d.feed_byte(0xFF),
            Step::Discarded(DecodeError::Oversize(0xFFFF))
        );
        assert!(!d.in_frame());

        // Recovers on the next valid frame.
        let frame = encode(MessageType::Request, 3, "ok", &[]).unwrap();
        assert_eq!(feed_all(&mut d, &frame), vec![frame.to_vec()]);
    }

    #[test]
    fn largest_frame_accepted() {
        let args = vec![0x11; codec::MAX_ARGS_SIZE];
        let frame = encode(MessageType::Response, 1, "big", &args).unwrap();
        let mut d = FrameDecoder::new();
        assert_eq!(feed_all(&mut d, &frame).len(), 1);
    }

    #[test]
    fn one_past_capacity_rejected() {
        let declared = (MAX_FRAME_SIZE - 6) as u16;
        let [lo, hi] = declared.to_le_bytes();
        let mut d = FrameDecoder::new();
        d.feed_byte(SYNC_START);
        d.feed_byte(lo);
        assert_eq!(
            d.feed_byte(hi),
            Step::Discarded(DecodeError::Oversize(declared))
        );
    }

    #[test]
    fn bad_header_checksum_discards_early() {
        let mut d = FrameDecoder::new();
        d.feed_byte(SYNC_START);
        d.feed_byte(40);
        d.feed_byte(0);
        assert_eq!(
            d.feed_byte(header_crc(40) ^ 0x01),
            Step::Discarded(DecodeError::HeaderChecksum)
        );
        assert!(!d.in_frame());
    }

    #[test]
    fn corrupted_payload_discarded_then_recovers() {
        let good = encode(MessageType::Request, 8, "x", &[1, 2, 3]).unwrap();
        let mut bad = good.clone();
        bad[10] ^= 0x04;

        let mut d = FrameDecoder::new();
        let mut last = Step::Pending;
        for &b in bad.iter() {
            if let Step::Discarded(e) = d.feed_byte(b) {
                last = Step::Discarded(e);
            }
        }
        assert_eq!(last, Step::Discarded(DecodeError::PayloadChecksum));
        assert_eq!(feed_all(&mut d, &good), vec![good.to_vec()]);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let frame = encode(MessageType::Request, 1, "x", &[]).unwrap();
        let mut d = FrameDecoder::new();
        feed_all(&mut d, &frame[..10]);
        assert!(d.in_frame());
        d.reset();
        assert!(!d.in_frame());
        assert_eq!(feed_all(&mut d, &frame), vec![frame.to_vec()]);
    }
}
