//! Frame codec (encode/decode)
//!
//! ```text
//! [START 0x16] [CMD] [PAYLOAD (N bytes)] [CHECKSUM] [END 0x04]
//! ```
//!
//! `N` is not transmitted; it is implied by `CMD` (see [`payload_len`]).
//! The checksum is the XOR of `CMD` and every payload byte.
//!
//! [`payload_len`]: super::payload_len

use bytes::Bytes;

use super::{
    Command, DecodeError, END_BYTE, Error, FRAME_OVERHEAD, Frame, MAX_PAYLOAD_LEN, Result,
    START_BYTE,
};

/// XOR-fold of every byte in `bytes`
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Encode a command and payload to wire bytes
///
/// The command byte is taken as-is so that callers (and tests) can emit
/// commands the local table does not know about.
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] if the payload exceeds
/// [`MAX_PAYLOAD_LEN`].
pub fn encode(command: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(write_frame(command, payload))
}

pub(crate) fn write_frame(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);

    bytes.push(START_BYTE);
    bytes.push(command);
    bytes.extend_from_slice(payload);

    // Checksum covers CMD + payload, not the markers
    let sum = checksum(&bytes[1..]);
    bytes.push(sum);
    bytes.push(END_BYTE);

    bytes
}

/// Decode one candidate frame
///
/// The caller is expected to have sliced exactly one frame's worth of bytes
/// starting at the start marker. The terminator, checksum and command are
/// verified again here, in that order.
///
/// # Errors
///
/// Returns an error if:
/// - Candidate is shorter than an empty frame or lacks the start marker
/// - Last byte is not the end marker
/// - Checksum doesn't match
/// - Command is unknown
pub fn decode(candidate: Bytes) -> std::result::Result<Frame, DecodeError> {
    let len = candidate.len();

    if len < FRAME_OVERHEAD {
        return Err(DecodeError::TruncatedFrame {
            needed: FRAME_OVERHEAD,
            got: len,
        });
    }

    if candidate[0] != START_BYTE {
        return Err(DecodeError::MissingStart {
            found: candidate[0],
        });
    }

    let terminator = candidate[len - 1];
    if terminator != END_BYTE {
        return Err(DecodeError::BadTerminator { found: terminator });
    }

    let stored = candidate[len - 2];
    let calculated = checksum(&candidate[1..len - 2]);
    if stored != calculated {
        return Err(DecodeError::ChecksumMismatch {
            expected: calculated,
            found: stored,
        });
    }

    let command_byte = candidate[1];
    let command =
        Command::from_u8(command_byte).ok_or(DecodeError::UnknownCommand {
            command: command_byte,
        })?;

    Ok(Frame::from_parts(command, candidate.slice(2..len - 2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_payload() -> Vec<u8> {
        (0u8..38).collect()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = params_payload();
        let encoded = encode(Command::SendParams.as_u8(), &payload).unwrap();
        assert_eq!(encoded.len(), 42);

        let decoded = decode(Bytes::from(encoded)).unwrap();
        assert_eq!(decoded.command(), Command::SendParams);
        assert_eq!(decoded.payload().as_ref(), payload.as_slice());
    }

    #[test]
    fn test_request_egram_layout() {
        let encoded = encode(Command::RequestEgram.as_u8(), &[]).unwrap();
        assert_eq!(encoded, vec![0x16, 0x22, 0x22, 0x04]);
    }

    #[test]
    fn test_checksum_excludes_markers() {
        let encoded = encode(0xE0, &[0x01, 0xC8, 0x00]).unwrap();
        assert_eq!(encoded[encoded.len() - 2], 0xE0 ^ 0x01 ^ 0xC8);
    }

    #[test]
    fn test_decode_bad_terminator() {
        let mut encoded = encode(0xAA, &[]).unwrap();
        let last = encoded.len() - 1;
        encoded[last] = 0x05;

        let result = decode(Bytes::from(encoded));
        assert_eq!(result, Err(DecodeError::BadTerminator { found: 0x05 }));
    }

    #[test]
    fn test_terminator_checked_before_checksum() {
        let mut encoded = encode(0xAA, &[]).unwrap();
        let len = encoded.len();
        encoded[len - 2] ^= 0xFF;
        encoded[len - 1] = 0x00;

        let result = decode(Bytes::from(encoded));
        assert!(matches!(result, Err(DecodeError::BadTerminator { .. })));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut encoded = encode(0x55, &params_payload()).unwrap();

        // Corrupt a payload byte
        encoded[10] ^= 0x01;

        let result = decode(Bytes::from(encoded));
        assert!(matches!(result, Err(DecodeError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_decode_unknown_command() {
        let encoded = encode(0x7F, &[]).unwrap();
        let result = decode(Bytes::from(encoded));
        assert_eq!(result, Err(DecodeError::UnknownCommand { command: 0x7F }));
    }

    #[test]
    fn test_decode_truncated() {
        let result = decode(Bytes::from_static(&[0x16, 0xAA, 0xAA]));
        assert!(matches!(result, Err(DecodeError::TruncatedFrame { .. })));
    }

    #[test]
    fn test_decode_missing_start() {
        let result = decode(Bytes::from_static(&[0x00, 0xAA, 0xAA, 0x04]));
        assert_eq!(result, Err(DecodeError::MissingStart { found: 0x00 }));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let result = encode(0xE0, &[0u8; 256]);
        assert!(matches!(result, Err(Error::PayloadTooLarge { .. })));
    }

    // Property-based tests
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        // Commands paired with a payload that satisfies the length table
        fn frame_strategy() -> impl Strategy<Value = (Command, Vec<u8>)> {
            prop_oneof![
                prop::collection::vec(any::<u8>(), 38)
                    .prop_map(|p| (Command::SendParams, p)),
                Just((Command::RequestEgram, vec![])),
                Just((Command::Ack, vec![])),
                prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN)
                    .prop_map(|p| (Command::EgramData, p)),
            ]
        }

        proptest! {
            /// Property: any table-conforming frame decodes to what was encoded
            #[test]
            fn prop_roundtrip_preserves_data((command, payload) in frame_strategy()) {
                let encoded = encode(command.as_u8(), &payload).unwrap();
                let decoded = decode(Bytes::from(encoded)).unwrap();

                prop_assert_eq!(decoded.command(), command);
                prop_assert_eq!(decoded.payload().as_ref(), payload.as_slice());
            }

            /// Property: a single flipped bit in command or payload is a checksum error
            #[test]
            fn prop_single_bit_flip_detected(
                (command, payload) in frame_strategy(),
                position in any::<prop::sample::Index>(),
                bit in 0u8..8,
            ) {
                let mut encoded = encode(command.as_u8(), &payload).unwrap();

                // covered range is CMD .. last payload byte
                let offset = 1 + position.index(payload.len() + 1);
                encoded[offset] ^= 1 << bit;

                let result = decode(Bytes::from(encoded));
                let is_checksum_mismatch =
                    matches!(result, Err(DecodeError::ChecksumMismatch { .. }));
                prop_assert!(is_checksum_mismatch);
            }

            /// Property: encoding is a pure function of command and payload
            #[test]
            fn prop_encoding_deterministic(
                command in any::<u8>(),
                payload in prop::collection::vec(any::<u8>(), 0..64),
            ) {
                prop_assert_eq!(encode(command, &payload).unwrap(), encode(command, &payload).unwrap());
            }
        }
    }
}
