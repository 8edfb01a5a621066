//! Pending-request correlation.
//!
//! Outbound requests that expect an answer park a callback here under their
//! correlation id. The response-delivery worker resolves inbound `Response`
//! and `Error` messages against the table; a match invokes the callback once
//! and always frees the slot.
//!
//! The table is touched from the requesting context and from the delivery
//! worker, so every read-modify-write happens inside one critical section.
//! Callbacks run after the lock is released and may issue new requests.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::debug;

use super::codec::MAX_ARGS_SIZE;
use crate::error::{Error, Result};

/// Default number of requests that may await a reply at once.
pub const PENDING_CAPACITY: usize = 10;

/// Owned reply body, sized for the largest argument block a frame carries.
pub type ArgsBuf = heapless::Vec<u8, MAX_ARGS_SIZE>;

/// A reply as seen by the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply<'a> {
    pub id: u32,
    pub data: &'a [u8],
    pub is_error: bool,
}

impl Reply<'_> {
    pub fn is_success(&self) -> bool {
        !self.is_error
    }
}

/// Invoked at most once with the reply to a request.
pub type ReplyCallback = Box<dyn FnOnce(Reply<'_>) + Send>;

/// Box a closure as a [`ReplyCallback`].
pub fn callback<F>(f: F) -> ReplyCallback
where
    F: FnOnce(Reply<'_>) + Send + 'static,
{
    Box::new(f)
}

/// An inbound reply queued for delivery. Owns its payload until resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub id: u32,
    pub data: ArgsBuf,
    pub is_error: bool,
}

struct PendingRequest {
    id: u32,
    callback: Option<ReplyCallback>,
}

/// Fixed-capacity table of requests awaiting a reply.
pub struct PendingTable<const N: usize = PENDING_CAPACITY> {
    entries: Mutex<CriticalSectionRawMutex, RefCell<heapless::Vec<PendingRequest, N>>>,
}

impl<const N: usize> PendingTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new(heapless::Vec::new())),
        }
    }

    /// Track `id` until its reply arrives.
    pub fn register(&self, id: u32, callback: Option<ReplyCallback>) -> Result<()> {
        self.entries.lock(|cell| {
            cell.borrow_mut()
                .push(PendingRequest { id, callback })
                .map_err(|_| Error::CapacityExceeded)
        })
    }

    /// Match a reply against the table.
    ///
    /// On a match the entry is removed and its callback (if any) invoked with
    /// the reply. The reply payload is released on return regardless of the
    /// outcome. Returns whether an entry matched.
    pub fn resolve(&self, reply: PendingReply) -> bool {
        let Some(entry) = self.take(reply.id) else {
            debug!("correlator: no pending request for id {}", reply.id);
            return false;
        };
        if let Some(cb) = entry.callback {
            cb(Reply {
                id: reply.id,
                data: &reply.data[..],
                is_error: reply.is_error,
            });
        }
        true
    }

    /// Forget `id` without invoking its callback.
    ///
    /// Used by callers that time out on their own. Returns whether the entry
    /// existed.
    pub fn cancel(&self, id: u32) -> bool {
        // Dropped outside the critical section.
        let entry = self.take(id);
        entry.is_some()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries
            .lock(|cell| cell.borrow().iter().any(|e| e.id == id))
    }

    pub fn len(&self) -> usize {
        self.entries.lock(|cell| cell.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, id: u32) -> Option<PendingRequest> {
        self.entries.lock(|cell| {
            let mut entries = cell.borrow_mut();
            let pos = entries.iter().position(|e| e.id == id)?;
            Some(entries.swap_remove(pos))
        })
    }
}

impl<const N: usize> Default for PendingTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────
