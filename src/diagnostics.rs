//! Link diagnostics.
//!
//! The link protocol has no NACK: malformed frames, queue overflows and
//! unmatched replies are dropped silently on the wire. Each drop is counted
//! here instead so the application can observe link health.
//!
//! Counters are lock-free atomics and may be bumped from interrupt context.
//! [`LinkStats::snapshot`] copies them into a serialisable
//! [`StatsSnapshot`] on demand.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::rpc::codec::DecodeError;

/// Live counters for one link.
#[derive(Debug, Default)]
pub struct LinkStats {
    frames_accepted: AtomicU32,
    header_crc_errors: AtomicU32,
    payload_crc_errors: AtomicU32,
    terminator_errors: AtomicU32,
    sync_mid_errors: AtomicU32,
    oversize_frames: AtomicU32,
    malformed_messages: AtomicU32,
    packet_overflows: AtomicU32,
    reply_overflows: AtomicU32,
    requests_served: AtomicU32,
    unknown_functions: AtomicU32,
    handler_failures: AtomicU32,
    replies_delivered: AtomicU32,
    unmatched_replies: AtomicU32,
    streams_ignored: AtomicU32,
    transmit_failures: AtomicU32,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_accepted: u32,
    pub header_crc_errors: u32,
    pub payload_crc_errors: u32,
    pub terminator_errors: u32,
    pub sync_mid_errors: u32,
    pub oversize_frames: u32,
    pub malformed_messages: u32,
    pub packet_overflows: u32,
    pub reply_overflows: u32,
    pub requests_served: u32,
    pub unknown_functions: u32,
    pub handler_failures: u32,
    pub replies_delivered: u32,
    pub unmatched_replies: u32,
    pub streams_ignored: u32,
    pub transmit_failures: u32,
}

impl StatsSnapshot {
    /// Frames dropped by the decoder for any reason.
    pub fn frames_discarded(&self) -> u32 {
        self.header_crc_errors
            + self.payload_crc_errors
            + self.terminator_errors
            + self.sync_mid_errors
            + self.oversize_frames
            + self.malformed_messages
    }
}

fn bump(counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            frames_accepted: AtomicU32::new(0),
            header_crc_errors: AtomicU32::new(0),
            payload_crc_errors: AtomicU32::new(0),
            terminator_errors: AtomicU32::new(0),
            sync_mid_errors: AtomicU32::new(0),
            oversize_frames: AtomicU32::new(0),
            malformed_messages: AtomicU32::new(0),
            packet_overflows: AtomicU32::new(0),
            reply_overflows: AtomicU32::new(0),
            requests_served: AtomicU32::new(0),
            unknown_functions: AtomicU32::new(0),
            handler_failures: AtomicU32::new(0),
            replies_delivered: AtomicU32::new(0),
            unmatched_replies: AtomicU32::new(0),
            streams_ignored: AtomicU32::new(0),
            transmit_failures: AtomicU32::new(0),
        }
    }

    /// Count a frame the decoder threw away.
    pub fn record_discard(&self, reason: DecodeError) {
        let counter = match reason {
            DecodeError::HeaderChecksum => &self.header_crc_errors,
            DecodeError::PayloadChecksum => &self.payload_crc_errors,
            DecodeError::Terminator => &self.terminator_errors,
            DecodeError::SyncMid => &self.sync_mid_errors,
            DecodeError::Oversize(_) => &self.oversize_frames,
            DecodeError::TooShort
            | DecodeError::BadSync
            | DecodeError::LengthMismatch
            | DecodeError::UnknownType(_)
            | DecodeError::BadName
            | DecodeError::Separator => &self.malformed_messages,
        };
        bump(counter);
    }

    pub fn record_accepted(&self) {
        bump(&self.frames_accepted);
    }

    pub fn record_packet_overflow(&self) {
        bump(&self.packet_overflows);
    }

    pub fn record_reply_overflow(&self) {
        bump(&self.reply_overflows);
    }

    pub fn record_request_served(&self) {
        bump(&self.requests_served);
    }

    pub fn record_unknown_function(&self) {
        bump(&self.unknown_functions);
    }

    pub fn record_handler_failure(&self) {
        bump(&self.handler_failures);
    }

    pub fn record_reply_delivered(&self) {
        bump(&self.replies_delivered);
    }

    pub fn record_unmatched_reply(&self) {
        bump(&self.unmatched_replies);
    }

    pub fn record_stream_ignored(&self) {
        bump(&self.streams_ignored);
    }

    pub fn record_transmit_failure(&self) {
        bump(&self.transmit_failures);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU32| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_accepted: load(&self.frames_accepted),
            header_crc_errors: load(&self.header_crc_errors),
            payload_crc_errors: load(&self.payload_crc_errors),
            terminator_errors: load(&self.terminator_errors),
            sync_mid_errors: load(&self.sync_mid_errors),
            oversize_frames: load(&self.oversize_frames),
            malformed_messages: load(&self.malformed_messages),
            packet_overflows: load(&self.packet_overflows),
            reply_overflows: load(&self.reply_overflows),
            requests_served: load(&self.requests_served),
            unknown_functions: load(&self.unknown_functions),
            handler_failures: load(&self.handler_failures),
            replies_delivered: load(&self.replies_delivered),
            unmatched_replies: load(&self.unmatched_replies),
            streams_ignored: load(&self.streams_ignored),
            transmit_failures: load(&self.transmit_failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = LinkStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn discards_are_bucketed_by_reason() {
        let stats = LinkStats::new();
        stats.record_discard(DecodeError::HeaderChecksum);
        stats.record_discard(DecodeError::PayloadChecksum);
        stats.record_discard(DecodeError::PayloadChecksum);
        stats.record_discard(DecodeError::Oversize(4000));
        stats.record_discard(DecodeError::Separator);
        stats.record_discard(DecodeError::UnknownType(9));

        let snap = stats.snapshot();
        assert_eq!(snap.header_crc_errors, 1);
        assert_eq!(snap.payload_crc_errors, 2);
        assert_eq!(snap.oversize_frames, 1);
        assert_eq!(snap.malformed_messages, 2);
        assert_eq!(snap.frames_discarded(), 6);
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let stats = LinkStats::new();
        stats.record_accepted();
        stats.record_reply_delivered();
        let snap = stats.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: StatsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
