//! Property tests for the framing layer.
//!
//! Runs on host only; proptest is not available for embedded targets.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use uartrpc::rpc::codec::{self, DecodeError, MAX_ARGS_SIZE, MAX_NAME_LEN, MessageType};
use uartrpc::rpc::decoder::{FrameDecoder, Step};

fn message_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::Request),
        Just(MessageType::Response),
        Just(MessageType::Stream),
        Just(MessageType::Error),
    ]
}

fn function_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z_][a-zA-Z0-9_.]{0,30}").unwrap()
}

/// Feed `bytes` one at a time and collect every emitted frame.
fn frames_from(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for &b in bytes {
        if let Step::Frame(frame) = decoder.feed_byte(b) {
            out.push(frame.to_vec());
        }
    }
    out
}

proptest! {
    /// Whatever the encoder produces, the decoder yields back unchanged.
    #[test]
    fn encoded_frames_decode_to_same_message(
        kind in message_type(),
        id in any::<u32>(),
        name in function_name(),
        args in proptest::collection::vec(any::<u8>(), 0..=64),
    ) {
        let frame = codec::encode(kind, id, &name, &args).unwrap();
        prop_assert_eq!(frame.len(), codec::frame_len(codec::MESSAGE_HEADER_SIZE + args.len()));

        let msg = codec::decode(&frame).unwrap();
        prop_assert_eq!(msg.kind, kind);
        prop_assert_eq!(msg.id, id);
        prop_assert_eq!(msg.name, name.as_str());
        prop_assert_eq!(msg.args, args.as_slice());
    }

    /// Frame boundaries do not depend on how the byte stream is split.
    #[test]
    fn chunking_does_not_change_frames(
        payloads in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..=48), 1..=5),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut stream = Vec::new();
        for (i, args) in payloads.iter().enumerate() {
            stream.extend_from_slice(
                &codec::encode(MessageType::Request, i as u32, "f", args).unwrap(),
            );
        }

        let mut whole = FrameDecoder::new();
        let expected = frames_from(&mut whole, &stream);
        prop_assert_eq!(expected.len(), payloads.len());

        let split = cut.index(stream.len());
        let mut chunked = FrameDecoder::new();
        let mut got = frames_from(&mut chunked, &stream[..split]);
        got.extend(frames_from(&mut chunked, &stream[split..]));
        prop_assert_eq!(got, expected);
    }

    /// A single flipped bit anywhere past the start marker never yields a
    /// frame that passes validation with altered content.
    #[test]
    fn single_bit_flip_is_never_accepted(
        args in proptest::collection::vec(any::<u8>(), 0..=32),
        pos in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let frame = codec::encode(MessageType::Response, 7, "probe", &args).unwrap();
        let mut corrupted = frame.to_vec();
        let at = 1 + pos.index(corrupted.len() - 1);
        corrupted[at] ^= 1 << bit;

        let mut decoder = FrameDecoder::new();
        let emitted = frames_from(&mut decoder, &corrupted);
        prop_assert!(emitted.is_empty(), "corrupted frame emitted at byte {}", at);
    }

    /// After an oversize length claim, the decoder still finds the next
    /// valid frame.
    #[test]
    fn recovers_after_oversize_length(
        len in (codec::MAX_PAYLOAD_SIZE as u16 + 1)..=u16::MAX,
        args in proptest::collection::vec(any::<u8>(), 0..=16),
    ) {
        let mut decoder = FrameDecoder::new();
        let [lo, hi] = len.to_le_bytes();
        prop_assert_eq!(decoder.feed_byte(codec::SYNC_START), Step::Pending);
        prop_assert_eq!(decoder.feed_byte(lo), Step::Pending);
        prop_assert_eq!(decoder.feed_byte(hi), Step::Discarded(DecodeError::Oversize(len)));

        let good = codec::encode(MessageType::Request, 3, "next", &args).unwrap();
        let emitted = frames_from(&mut decoder, &good);
        prop_assert_eq!(emitted, vec![good.to_vec()]);
    }

    /// Encoding rejects argument bodies that cannot fit a frame and accepts
    /// everything up to the limit.
    #[test]
    fn args_limit_is_exact(extra in 0usize..4) {
        let fits = vec![0u8; MAX_ARGS_SIZE - extra];
        prop_assert!(codec::encode(MessageType::Request, 1, "big", &fits).is_ok());
        let too_big = vec![0u8; MAX_ARGS_SIZE + 1 + extra];
        prop_assert!(codec::encode(MessageType::Request, 1, "big", &too_big).is_err());
    }

    /// Long names are cut to the field width, never rejected by the encoder.
    #[test]
    fn long_names_are_truncated(name in "[a-z]{32,60}") {
        let frame = codec::encode(MessageType::Request, 1, &name, &[]).unwrap();
        let msg = codec::decode(&frame).unwrap();
        prop_assert_eq!(msg.name, &name[..MAX_NAME_LEN]);
    }
}
