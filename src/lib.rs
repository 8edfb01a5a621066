//! Bidirectional RPC over a framed serial link.
//!
//! Exposes the link stack (framing, CRC, reassembly, dispatch, correlation)
//! as a library so both the device and host side of a link, and the
//! integration tests, share one implementation.

#![deny(unused_must_use)]

pub mod config;
pub mod diagnostics;
pub mod rpc;

mod error;

pub use config::RpcConfig;
pub use diagnostics::StatsSnapshot;
pub use error::{Error, HandlerError, Result};
pub use rpc::{
    ByteIntake, Handler, HandlerResult, MessageType, NullTransport, Reply, ReplyCallback,
    RpcBuilder, RpcEngine, Transport, Workers, callback,
};
