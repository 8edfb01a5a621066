//! Fuzz target: `FrameDecoder::feed_byte`
//!
//! Drives arbitrary byte sequences through the byte-at-a-time frame decoder
//! and checks that every frame it yields is complete and decodes, and that
//! it never panics on garbage.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use uartrpc::rpc::codec::{self, MAX_FRAME_SIZE};
use uartrpc::rpc::decoder::{FrameDecoder, Step};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    for &byte in data {
        if let Step::Frame(frame) = decoder.feed_byte(byte) {
            assert!(frame.len() <= MAX_FRAME_SIZE, "frame exceeds MAX_FRAME_SIZE");
            assert!(codec::decode(frame).is_ok(), "yielded frame must decode");
        }
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    assert!(!decoder.in_frame());
    for &byte in data {
        let _ = decoder.feed_byte(byte);
    }
});
