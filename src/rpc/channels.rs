//! Inter-context queues.
//!
//! Uses `embassy-sync` bounded channels to decouple the three execution
//! contexts of a link. Producers on the interrupt path only ever call
//! `try_send`, which takes a short critical section and never waits.
//!
//! ```text
//! ┌──────────────┐  PacketMsg  ┌──────────────┐  ReplyMsg  ┌──────────────┐
//! │ Byte intake  │────────────▶│  Processing  │───────────▶│   Delivery   │
//! │ (ISR)        │             │  worker      │            │   worker     │
//! └──────────────┘             └──────────────┘            └──────────────┘
//! ```

use core::sync::atomic::AtomicBool;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::codec::FrameBuf;
use super::correlator::PendingReply;
use crate::diagnostics::LinkStats;

/// Channel depth for reassembled inbound frames.
pub const PACKET_QUEUE_DEPTH: usize = 10;

/// Channel depth for replies awaiting delivery to callers.
pub const REPLY_QUEUE_DEPTH: usize = 10;

/// Work item for the processing worker.
pub enum PacketMsg {
    /// A complete, validated frame, exclusively owned by the receiver.
    Frame(FrameBuf),
    Shutdown,
}

/// Work item for the response-delivery worker.
pub enum ReplyMsg {
    Reply(PendingReply),
    Shutdown,
}

pub type PacketQueue = Channel<CriticalSectionRawMutex, PacketMsg, PACKET_QUEUE_DEPTH>;
pub type ReplyQueue = Channel<CriticalSectionRawMutex, ReplyMsg, REPLY_QUEUE_DEPTH>;

/// State shared by every context of one link: both queues and the counters.
pub struct Link {
    pub packets: PacketQueue,
    pub replies: ReplyQueue,
    pub stats: LinkStats,
    /// Set while one set of workers owns the queues.
    pub(crate) workers_active: AtomicBool,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            packets: Channel::new(),
            replies: Channel::new(),
            stats: LinkStats::new(),
            workers_active: AtomicBool::new(false),
        }
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}
