//! Link configuration parameters
//!
//! Runtime-tunable settings for the worker threads. Table and queue
//! capacities are compile-time constants (`FUNCTION_CAPACITY`,
//! `PENDING_CAPACITY`, `PACKET_QUEUE_DEPTH`, `REPLY_QUEUE_DEPTH`) because
//! they size fixed buffers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest worker stack accepted by [`RpcConfig::validate`].
pub const MIN_STACK_BYTES: usize = 4 * 1024;

/// Worker thread name, kept short enough for RTOS task-name limits.
pub type ThreadName = heapless::String<16>;

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    // --- Processing worker ---
    /// Thread name of the frame-processing worker
    pub processing_thread_name: ThreadName,
    /// Stack size of the frame-processing worker (bytes). Registered
    /// handlers run on this stack.
    pub processing_stack_bytes: usize,

    // --- Delivery worker ---
    /// Thread name of the response-delivery worker
    pub delivery_thread_name: ThreadName,
    /// Stack size of the response-delivery worker (bytes). Reply callbacks
    /// run on this stack.
    pub delivery_stack_bytes: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            processing_thread_name: thread_name("rpc-proc"),
            processing_stack_bytes: 16 * 1024,
            delivery_thread_name: thread_name("rpc-resp"),
            delivery_stack_bytes: 16 * 1024,
        }
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.processing_thread_name.is_empty() || self.delivery_thread_name.is_empty() {
            return Err(Error::Config("worker thread name must not be empty"));
        }
        if self.processing_stack_bytes < MIN_STACK_BYTES
            || self.delivery_stack_bytes < MIN_STACK_BYTES
        {
            return Err(Error::Config("worker stack below minimum"));
        }
        Ok(())
    }
}

/// Build a thread name, truncating to capacity.
pub fn thread_name(name: &str) -> ThreadName {
    let mut s = ThreadName::new();
    for c in name.chars() {
        if s.push(c).is_err() {
            break;
        }
    }
    s
}
