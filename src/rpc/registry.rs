//! Function registry for dispatching inbound requests by name.
//!
//! Populated once during setup, read-only afterwards. Lookups are a linear
//! scan over at most `N` entries, which beats hashing at this size and keeps
//! the table allocation-free apart from the boxed handlers.

use log::debug;

use super::codec::MAX_NAME_LEN;
use crate::error::{Error, HandlerError, Result};

/// Default number of registrable functions.
pub const FUNCTION_CAPACITY: usize = 10;

/// Output of a handler: reply body on success.
pub type HandlerResult = core::result::Result<Vec<u8>, HandlerError>;

/// A locally callable remote procedure.
///
/// Implemented for every `Fn(&[u8]) -> HandlerResult` closure, so handlers
/// can capture their own context.
pub trait Handler: Send + Sync {
    fn call(&self, args: &[u8]) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&[u8]) -> HandlerResult + Send + Sync,
{
    fn call(&self, args: &[u8]) -> HandlerResult {
        self(args)
    }
}

/// Owned function name, at most 31 ASCII characters.
pub type FunctionName = heapless::String<MAX_NAME_LEN>;

struct FunctionEntry {
    name: FunctionName,
    handler: Box<dyn Handler>,
}

/// Fixed-capacity name → handler table.
pub struct FunctionRegistry<const N: usize = FUNCTION_CAPACITY> {
    entries: heapless::Vec<FunctionEntry, N>,
}

impl<const N: usize> FunctionRegistry<N> {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Register `handler` under `name`.
    ///
    /// Fails with [`Error::InvalidName`] for names the wire cannot carry,
    /// [`Error::DuplicateName`] if the name is taken and
    /// [`Error::CapacityExceeded`] once `N` functions are registered. The
    /// registry is unchanged on failure.
    pub fn register(&mut self, name: &str, handler: impl Handler + 'static) -> Result<()> {
        let owned = validate_name(name)?;
        if self.contains(name) {
            return Err(Error::DuplicateName);
        }
        let entry = FunctionEntry {
            name: owned,
            handler: Box::new(handler),
        };
        self.entries
            .push(entry)
            .map_err(|_| Error::CapacityExceeded)?;
        debug!("registry: registered '{}' ({}/{})", name, self.entries.len(), N);
        Ok(())
    }

    /// Invoke the handler registered under `name`.
    ///
    /// Returns `None` when no such function exists.
    pub fn call(&self, name: &str, args: &[u8]) -> Option<HandlerResult> {
        self.entries
            .iter()
            .find(|e| e.name.as_str() == name)
            .map(|e| e.handler.call(args))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl<const N: usize> Default for FunctionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `name` fits the 32-byte wire field and copy it.
pub(crate) fn validate_name(name: &str) -> Result<FunctionName> {
    if name.is_empty() || !name.is_ascii() || name.contains('\0') {
        return Err(Error::InvalidName);
    }
    let mut owned = FunctionName::new();
    owned.push_str(name).map_err(|_| Error::InvalidName)?;
    Ok(owned)
}

// ── Tests ────────────────────────────────────────────────────
