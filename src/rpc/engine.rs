//! RPC engine: request issue, inbound dispatch and reply delivery.
//!
//! **Transport-decoupled**: the engine only ever *transmits* through a
//! [`Transport`]. Received bytes arrive through a separate [`ByteIntake`]
//! owned by the RX context (usually an interrupt handler), which reassembles
//! frames and queues them without blocking.
//!
//! Every validated inbound frame goes through the dispatcher:
//!
//! 1. **Request**: look up the named function, run it, answer with a
//!    `Response` (success) or an `Error` (unknown function / handler failure).
//! 2. **Response / Error**: queue the reply for the delivery worker, which
//!    matches it against the pending-request table and runs the callback.
//! 3. **Stream**: counted and ignored; multi-frame transfers are not
//!    implemented.
//!
//! The engine can be driven by the two worker threads from
//! [`spawn_workers`](RpcEngine::spawn_workers) or, on a single-threaded
//! target, by calling [`poll`](RpcEngine::poll) from the main loop. Do not
//! mix the two on one engine.

use core::ops::ControlFlow;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use futures_lite::future::block_on;
use log::{debug, warn};

use super::channels::{Link, PacketMsg, ReplyMsg};
use super::codec::{self, FrameBuf, Message, MessageType};
use super::correlator::{ArgsBuf, PendingReply, PendingTable, ReplyCallback};
use super::decoder::{FrameDecoder, Step};
use super::registry::{FunctionRegistry, Handler};
use super::transport::Transport;
use crate::config::RpcConfig;
use crate::diagnostics::{LinkStats, StatsSnapshot};
use crate::error::{Error, Result};

// ── Builder ──────────────────────────────────────────────────

/// Setup phase: functions can only be registered before the engine exists,
/// so the registry is read-only once frames can be processed.
pub struct RpcBuilder<T: Transport> {
    transport: T,
    config: RpcConfig,
    registry: FunctionRegistry,
}

impl<T: Transport> RpcBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: RpcConfig::default(),
            registry: FunctionRegistry::new(),
        }
    }

    pub fn with_config(mut self, config: RpcConfig) -> Self {
        self.config = config;
        self
    }

    /// Make `handler` callable by the peer under `name`.
    pub fn register_function(
        &mut self,
        name: &str,
        handler: impl Handler + 'static,
    ) -> Result<()> {
        self.registry.register(name, handler).inspect_err(|e| {
            warn!("RPC: cannot register '{}': {}", name, e);
        })
    }

    /// Finish setup. Returns the engine handle and the byte intake for the
    /// RX context.
    pub fn build(self) -> Result<(RpcEngine<T>, ByteIntake)> {
        self.config.validate()?;
        let link = Arc::new(Link::new());
        let shared = Shared {
            registry: self.registry,
            pending: PendingTable::new(),
            transport: Mutex::new(self.transport),
            link: link.clone(),
            next_id: AtomicU32::new(1),
            config: self.config,
        };
        let engine = RpcEngine {
            shared: Arc::new(shared),
        };
        Ok((engine, ByteIntake::new(link)))
    }
}

// ── Engine ───────────────────────────────────────────────────

struct Shared<T> {
    registry: FunctionRegistry,
    pending: PendingTable,
    transport: Mutex<CriticalSectionRawMutex, T>,
    link: Arc<Link>,
    next_id: AtomicU32,
    config: RpcConfig,
}

/// Cheaply clonable handle to a running link.
pub struct RpcEngine<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RpcEngine<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Transport> RpcEngine<T> {
    /// Encode and transmit a `Request` for `function_name`.
    ///
    /// With a callback, a pending entry is registered before the frame goes
    /// out, so even an immediate reply finds it. If the table is full, or the
    /// frame cannot be encoded or transmitted, nothing is left pending and the
    /// error is returned. Names longer than 31 bytes are truncated on the wire.
    pub fn send_request(
        &self,
        function_name: &str,
        args: &[u8],
        callback: Option<ReplyCallback>,
    ) -> Result<u32> {
        if function_name.is_empty() || !function_name.is_ascii() || function_name.contains('\0')
        {
            return Err(Error::InvalidName);
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = codec::encode(MessageType::Request, id, function_name, args)?;

        let tracked = callback.is_some();
        if tracked {
            self.shared.pending.register(id, callback).inspect_err(|_| {
                warn!("RPC: pending table full, '{}' not sent", function_name);
            })?;
        }

        if let Err(e) = self.transmit(&frame) {
            if tracked {
                self.shared.pending.cancel(id);
            }
            return Err(e);
        }

        debug!(
            "RPC: -> request '{}' id={} ({} arg bytes)",
            function_name,
            id,
            args.len()
        );
        Ok(id)
    }

    /// Drop the pending entry for `id` without running its callback.
    ///
    /// For callers enforcing their own reply timeout. Returns whether the
    /// request was still pending.
    pub fn cancel_request(&self, id: u32) -> bool {
        self.shared.pending.cancel(id)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn is_pending(&self, id: u32) -> bool {
        self.shared.pending.contains(id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.link.stats.snapshot()
    }

    pub fn config(&self) -> &RpcConfig {
        &self.shared.config
    }

    /// Functions this side serves. Read-only once built.
    pub fn registry(&self) -> &FunctionRegistry {
        &self.shared.registry
    }

    /// Route one complete frame. Runs on the processing worker.
    pub fn dispatch(&self, frame: &[u8]) {
        let msg = match codec::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                self.link_stats().record_discard(e);
                debug!("RPC: dropping frame: {}", e);
                return;
            }
        };

        match msg.kind {
            MessageType::Request => self.serve_request(&msg),
            MessageType::Response | MessageType::Error => self.forward_reply(&msg),
            MessageType::Stream => {
                self.link_stats().record_stream_ignored();
                debug!("RPC: stream frame id={} ignored", msg.id);
            }
        }
    }

    /// Handle at most one queued frame without blocking.
    pub fn process_next_frame(&self) -> bool {
        match self.shared.link.packets.try_receive() {
            Ok(msg) => self.handle_packet(msg).is_continue(),
            Err(_) => false,
        }
    }

    /// Deliver at most one queued reply without blocking.
    pub fn deliver_next_reply(&self) -> bool {
        match self.shared.link.replies.try_receive() {
            Ok(msg) => self.handle_reply(msg).is_continue(),
            Err(_) => false,
        }
    }

    /// Drain both queues. Returns the number of items handled.
    pub fn poll(&self) -> usize {
        let mut handled = 0;
        loop {
            let mut progressed = false;
            while self.process_next_frame() {
                handled += 1;
                progressed = true;
            }
            while self.deliver_next_reply() {
                handled += 1;
                progressed = true;
            }
            if !progressed {
                return handled;
            }
        }
    }

    pub(crate) fn handle_packet(&self, msg: PacketMsg) -> ControlFlow<()> {
        match msg {
            PacketMsg::Frame(frame) => {
                self.dispatch(&frame);
                ControlFlow::Continue(())
            }
            PacketMsg::Shutdown => ControlFlow::Break(()),
        }
    }

    pub(crate) fn handle_reply(&self, msg: ReplyMsg) -> ControlFlow<()> {
        match msg {
            ReplyMsg::Reply(reply) => {
                let id = reply.id;
                if self.shared.pending.resolve(reply) {
                    self.link_stats().record_reply_delivered();
                } else {
                    self.link_stats().record_unmatched_reply();
                    debug!("RPC: reply id={} matched no pending request", id);
                }
                ControlFlow::Continue(())
            }
            ReplyMsg::Shutdown => ControlFlow::Break(()),
        }
    }

    pub(crate) fn link(&self) -> &Arc<Link> {
        &self.shared.link
    }

    fn link_stats(&self) -> &LinkStats {
        &self.shared.link.stats
    }

    fn serve_request(&self, msg: &Message<'_>) {
        let stats = self.link_stats();
        let (kind, body) = match self.shared.registry.call(msg.name, msg.args) {
            Some(Ok(body)) => (MessageType::Response, body),
            Some(Err(e)) => {
                stats.record_handler_failure();
                warn!("RPC: '{}' (id={}): {}", msg.name, msg.id, e);
                (MessageType::Error, Vec::new())
            }
            None => {
                stats.record_unknown_function();
                warn!("RPC: unknown function '{}' (id={})", msg.name, msg.id);
                (MessageType::Error, Vec::new())
            }
        };

        let Some(frame) = self.reply_frame(kind, msg, &body) else {
            return;
        };
        if self.transmit(&frame).is_ok() {
            stats.record_request_served();
            debug!(
                "RPC: <- {:?} for '{}' id={} ({} bytes)",
                kind,
                msg.name,
                msg.id,
                body.len()
            );
        }
    }

    /// Encode a reply, degrading to an empty `Error` if the handler produced
    /// more than one frame can carry.
    fn reply_frame(&self, kind: MessageType, msg: &Message<'_>, body: &[u8]) -> Option<FrameBuf> {
        match codec::encode(kind, msg.id, msg.name, body) {
            Ok(frame) => Some(frame),
            Err(e) => {
                self.link_stats().record_handler_failure();
                warn!(
                    "RPC: reply to '{}' (id={}) not sent: {}",
                    msg.name, msg.id, e
                );
                codec::encode(MessageType::Error, msg.id, msg.name, &[]).ok()
            }
        }
    }

    fn forward_reply(&self, msg: &Message<'_>) {
        let Ok(data) = ArgsBuf::from_slice(msg.args) else {
            self.link_stats().record_reply_overflow();
            return;
        };
        let reply = PendingReply {
            id: msg.id,
            data,
            is_error: msg.kind == MessageType::Error,
        };
        if self.shared.link.replies.try_send(ReplyMsg::Reply(reply)).is_err() {
            self.link_stats().record_reply_overflow();
            warn!("RPC: reply queue full, dropping reply id={}", msg.id);
        }
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        let mut transport = block_on(self.shared.transport.lock());
        transport.transmit(frame).map_err(|e| {
            self.link_stats().record_transmit_failure();
            warn!("RPC: transmit failed: {:?}", e);
            Error::Transport
        })
    }
}

// ── Byte intake ──────────────────────────────────────────────

/// Receive side of a link, owned by the context that sees raw bytes.
///
/// `feed_byte` never blocks and never touches the heap: a completed frame is
/// copied into a fixed-capacity buffer and offered to the processing queue
/// with `try_send`. When the queue is full the newest frame is dropped and
/// counted.
pub struct ByteIntake {
    decoder: FrameDecoder,
    link: Arc<Link>,
}

impl ByteIntake {
    fn new(link: Arc<Link>) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            link,
        }
    }

    /// Feed one received byte. Returns `true` when it completed a frame that
    /// was queued for processing.
    pub fn feed_byte(&mut self, byte: u8) -> bool {
        match self.decoder.feed_byte(byte) {
            Step::Pending => false,
            Step::Discarded(reason) => {
                self.link.stats.record_discard(reason);
                false
            }
            Step::Frame(frame) => {
                let Ok(owned) = FrameBuf::from_slice(frame) else {
                    return false;
                };
                if self.link.packets.try_send(PacketMsg::Frame(owned)).is_err() {
                    self.link.stats.record_packet_overflow();
                    return false;
                }
                self.link.stats.record_accepted();
                true
            }
        }
    }

    /// Feed a chunk byte by byte. Returns the number of frames queued.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        let mut queued = 0;
        for &byte in data {
            if self.feed_byte(byte) {
                queued += 1;
            }
        }
        queued
    }

    /// Drop any partial frame, e.g. after a UART error or line break.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.link.stats.snapshot()
    }
}

// ── Tests ────────────────────────────────────────────────────
