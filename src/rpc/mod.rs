//! Framed RPC over a point-to-point byte link.
//!
//! ```text
//!   RX bytes                                                  TX frames
//!  ──────────▶ ByteIntake ──PacketMsg──▶ processing worker ──▶ Transport
//!              (decoder)                  (dispatcher,           ▲
//!                                          registry)             │
//!                                              │ ReplyMsg        │
//!                                              ▼                 │
//!                                         delivery worker   send_request
//!                                         (pending table)
//! ```
//!
//! Both peers run the same stack: each can call functions registered on the
//! other and answer calls made to it.

pub mod channels;
pub mod codec;
pub mod correlator;
pub mod crc;
pub mod decoder;
pub mod engine;
pub mod registry;
pub mod transport;
pub mod workers;

pub use codec::{Message, MessageType};
pub use correlator::{Reply, ReplyCallback, callback};
pub use engine::{ByteIntake, RpcBuilder, RpcEngine};
pub use registry::{Handler, HandlerResult};
pub use transport::{NullTransport, Transport};
pub use workers::Workers;
