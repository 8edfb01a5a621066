//! Transmission abstraction: the physical-layer primitive that pushes a
//! finished frame onto the wire.
//!
//! Concrete implementations live with the application:
//! - UART TX (blocking or DMA)
//! - USB CDC endpoint
//! - an in-memory pipe for host tests
//!
//! Reception is not part of this trait. Received bytes are pushed into the
//! engine through [`ByteIntake`](super::engine::ByteIntake), typically from
//! the RX interrupt.

/// Byte-oriented transmit channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Deliver `frame` to the wire, in order and in full.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// A null transport that discards every frame.
/// Useful during bring-up and for receive-only tests.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = core::convert::Infallible;

    fn transmit(&mut self, _frame: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    type Error = T::Error;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        (**self).transmit(frame)
    }
}
