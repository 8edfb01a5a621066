//! Worker threads for a link.
//!
//! Two long-running loops, each parked on its queue until work arrives:
//!
//! - **processing**: pulls reassembled frames and runs the dispatcher, so
//!   registered handlers execute here.
//! - **delivery**: pulls replies and resolves pending requests, so reply
//!   callbacks execute here.
//!
//! Both loops end when they receive their `Shutdown` message. [`Workers`]
//! sends it and joins the threads on [`shutdown`](Workers::shutdown) or drop.

use core::ops::ControlFlow;
use core::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use futures_lite::future::block_on;
use log::{info, warn};

use super::channels::{Link, PacketMsg, ReplyMsg};
use super::engine::RpcEngine;
use super::transport::Transport;
use crate::error::{Error, Result};

impl<T: Transport + Send + 'static> RpcEngine<T> {
    /// Start the processing and delivery workers for this engine.
    ///
    /// Thread names and stack sizes come from the engine's
    /// [`RpcConfig`](crate::config::RpcConfig). Only one set of workers may
    /// drain the queues: a second call before the first set is shut down
    /// fails with [`Error::WorkersRunning`].
    pub fn spawn_workers(&self) -> Result<Workers> {
        let active = &self.link().workers_active;
        if active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("RPC: workers already running");
            return Err(Error::WorkersRunning);
        }
        let config = self.config().clone();

        let engine = self.clone();
        let processing = match spawn(
            config.processing_thread_name.as_str(),
            config.processing_stack_bytes,
            move || processing_loop(engine),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                active.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let engine = self.clone();
        let delivery = match spawn(
            config.delivery_thread_name.as_str(),
            config.delivery_stack_bytes,
            move || delivery_loop(engine),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                let mut partial = Workers {
                    link: self.link().clone(),
                    processing: Some(processing),
                    delivery: None,
                };
                partial.stop();
                return Err(e);
            }
        };

        Ok(Workers {
            link: self.link().clone(),
            processing: Some(processing),
            delivery: Some(delivery),
        })
    }
}

fn spawn(
    name: &str,
    stack_bytes: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    info!("Spawning '{}' (stack={}KB)", name, stack_bytes / 1024);
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack_bytes)
        .spawn(f)
        .map_err(|e| {
            warn!("RPC: failed to spawn '{}': {}", name, e);
            Error::WorkerSpawn
        })
}

fn processing_loop<T: Transport>(engine: RpcEngine<T>) {
    info!("RPC processing worker started");
    let link = engine.link().clone();
    block_on(async {
        loop {
            let msg = link.packets.receive().await;
            if engine.handle_packet(msg).is_break() {
                break;
            }
        }
    });
    info!("RPC processing worker stopped");
}

fn delivery_loop<T: Transport>(engine: RpcEngine<T>) {
    info!("RPC delivery worker started");
    let link = engine.link().clone();
    block_on(async {
        loop {
            let msg = link.replies.receive().await;
            if let ControlFlow::Break(()) = engine.handle_reply(msg) {
                break;
            }
        }
    });
    info!("RPC delivery worker stopped");
}

/// Handles to the running worker threads of one link.
pub struct Workers {
    link: Arc<Link>,
    processing: Option<JoinHandle<()>>,
    delivery: Option<JoinHandle<()>>,
}

impl Workers {
    /// Stop both workers and wait for them to exit.
    ///
    /// Frames already queued ahead of the stop request are still processed;
    /// the processing worker stops first so replies it forwards are delivered.
    pub fn shutdown(mut self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        let alive = |h: &Option<JoinHandle<()>>| h.as_ref().is_some_and(|h| !h.is_finished());
        alive(&self.processing) || alive(&self.delivery)
    }

    fn stop(&mut self) {
        if self.processing.is_none() && self.delivery.is_none() {
            return;
        }
        if let Some(handle) = self.processing.take() {
            if !handle.is_finished() {
                block_on(self.link.packets.send(PacketMsg::Shutdown));
            }
            if handle.join().is_err() {
                warn!("RPC processing worker panicked");
            }
        }
        if let Some(handle) = self.delivery.take() {
            if !handle.is_finished() {
                block_on(self.link.replies.send(ReplyMsg::Shutdown));
            }
            if handle.join().is_err() {
                warn!("RPC delivery worker panicked");
            }
        }
        self.link.workers_active.store(false, Ordering::Release);
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        self.stop();
    }
}
