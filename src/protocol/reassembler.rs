//! Incremental frame reassembly from a raw byte stream.
//!
//! Serial reads arrive in arbitrary chunks: a chunk may hold half a frame,
//! several frames back to back, or line noise. [`Reassembler`] accumulates
//! chunks and repeatedly:
//!
//! 1. discards everything before the next start marker;
//! 2. reads the command byte and looks up the payload length;
//! 3. waits until the whole frame is buffered;
//! 4. splits the frame off the front and hands it to [`decode`].
//!
//! Fixed-length commands are framed by length alone, so an end-marker value
//! inside their payload is harmless. `EgramData` carries no length; its frame
//! runs to the last checksum/end pair that is followed by a start marker or
//! the end of the buffered input.
//!
//! [`decode`]: super::decode

use bytes::{Buf, BytesMut};
use tracing::trace;

use super::codec::{checksum, decode};
use super::{
    DecodeError, END_BYTE, FRAME_OVERHEAD, Frame, MAX_PAYLOAD_LEN, PayloadLen, START_BYTE,
    payload_len,
};

const INITIAL_CAPACITY: usize = 1024;

/// Outcome of one reassembly step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyEvent {
    /// A complete frame passed validation
    Frame(Frame),
    /// A complete candidate failed validation and was dropped
    Rejected(DecodeError),
    /// Bytes ahead of the next start marker were dropped
    Noise {
        /// Number of bytes dropped
        discarded: usize,
    },
}

/// Receive buffer plus framing state for one connection.
///
/// Owned by exactly one reader; not shared.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
}

impl Reassembler {
    /// Create an empty reassembler
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Append a chunk and extract every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ReassemblyEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event);
        }
        events
    }

    /// Run one step of the extraction loop.
    ///
    /// Returns `None` once no further progress is possible without more
    /// input.
    pub fn next_event(&mut self) -> Option<ReassemblyEvent> {
        if self.buffer.is_empty() {
            return None;
        }

        if self.buffer[0] != START_BYTE {
            let discarded = self
                .buffer
                .iter()
                .position(|&b| b == START_BYTE)
                .unwrap_or(self.buffer.len());
            self.buffer.advance(discarded);
            trace!(discarded, "skipped bytes ahead of start marker");
            return Some(ReassemblyEvent::Noise { discarded });
        }

        // Need the command byte to know how long the frame is
        if self.buffer.len() < 2 {
            return None;
        }

        let frame_len = self.complete_frame_len()?;
        let candidate = self.buffer.split_to(frame_len).freeze();

        Some(match decode(candidate) {
            Ok(frame) => ReassemblyEvent::Frame(frame),
            Err(err) => ReassemblyEvent::Rejected(err),
        })
    }

    /// Bytes buffered but not yet consumed
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Length of the frame at the front of the buffer, if fully buffered
    fn complete_frame_len(&self) -> Option<usize> {
        match payload_len(self.buffer[1]) {
            PayloadLen::Fixed(len) => {
                let frame_len = len + FRAME_OVERHEAD;
                (self.buffer.len() >= frame_len).then_some(frame_len)
            }
            PayloadLen::Variable => self.variable_frame_len(),
        }
    }

    /// Find where a variable-length payload ends.
    ///
    /// The payload runs to the last buffered checksum/end pair that is
    /// followed by a start marker or by the end of the buffer. A pair
    /// followed by anything else is only taken once the longest legal frame
    /// is buffered and nothing better turned up; with no pair at all that
    /// span is returned so the decoder rejects it and the stream moves on.
    fn variable_frame_len(&self) -> Option<usize> {
        let buf = &self.buffer[..];
        let max_frame_len = MAX_PAYLOAD_LEN + FRAME_OVERHEAD;
        let mut running = checksum(&buf[1..2]);
        let mut delimited = None;
        let mut loose = None;

        for len in 0..=MAX_PAYLOAD_LEN {
            // checksum at 2 + len, end marker right after it
            let end_at = len + 3;
            if end_at >= buf.len() {
                break;
            }
            if buf[end_at] == END_BYTE && buf[end_at - 1] == running {
                let frame_len = len + FRAME_OVERHEAD;
                match buf.get(end_at + 1) {
                    None | Some(&START_BYTE) => delimited = Some(frame_len),
                    Some(_) => loose = Some(frame_len),
                }
            }
            running ^= buf[len + 2];
        }

        if delimited.is_some() {
            return delimited;
        }
        (buf.len() >= max_frame_len).then_some(loose.unwrap_or(max_frame_len))
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, encode};

    fn frames(events: &[ReassemblyEvent]) -> Vec<Frame> {
        events
            .iter()
            .filter_map(|event| match event {
                ReassemblyEvent::Frame(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    fn ack() -> Vec<u8> {
        encode(Command::Ack.as_u8(), &[]).unwrap()
    }

    fn params() -> Vec<u8> {
        let payload: Vec<u8> = (1u8..=38).collect();
        encode(Command::SendParams.as_u8(), &payload).unwrap()
    }

    fn egram() -> Vec<u8> {
        encode(Command::EgramData.as_u8(), &[0, 100, 0, 1, 200, 0]).unwrap()
    }

    #[test]
    fn test_single_frame() {
        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&ack());

        assert_eq!(events, vec![ReassemblyEvent::Frame(Frame::empty(Command::Ack))]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn test_noise_before_frame() {
        let mut reassembler = Reassembler::new();
        let mut input = vec![0x00, 0xFF, 0x04, 0x42];
        input.extend(params());

        let events = reassembler.push(&input);
        assert_eq!(events[0], ReassemblyEvent::Noise { discarded: 4 });
        assert_eq!(frames(&events).len(), 1);
        assert_eq!(frames(&events)[0].command(), Command::SendParams);
    }

    #[test]
    fn test_pure_noise_is_dropped() {
        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&[0x01, 0x02, 0x03]);

        assert_eq!(events, vec![ReassemblyEvent::Noise { discarded: 3 }]);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn test_lone_start_waits() {
        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&[START_BYTE]).is_empty());
        assert_eq!(reassembler.buffered(), 1);
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut reassembler = Reassembler::new();
        let mut input = params();
        input.extend(ack());

        let extracted = frames(&reassembler.push(&input));
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].command(), Command::SendParams);
        assert_eq!(extracted[1].command(), Command::Ack);
    }

    #[test]
    fn test_torn_frame_every_split() {
        let frame = params();
        for split in 1..frame.len() {
            let mut reassembler = Reassembler::new();
            let first = reassembler.push(&frame[..split]);
            assert!(
                frames(&first).is_empty(),
                "partial dispatch at split {split}"
            );

            let second = reassembler.push(&frame[split..]);
            assert_eq!(frames(&second).len(), 1, "split {split}");
            assert_eq!(reassembler.buffered(), 0);
        }
    }

    #[test]
    fn test_end_marker_inside_payload() {
        let mut payload = [0u8; 38];
        payload[0] = END_BYTE;
        payload[5] = END_BYTE;
        let frame = encode(Command::SendParams.as_u8(), &payload).unwrap();

        let mut reassembler = Reassembler::new();
        let extracted = frames(&reassembler.push(&frame));
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].payload().as_ref(), payload.as_slice());
    }

    #[test]
    fn test_corrupt_frame_rejected_then_resync() {
        let mut corrupt = params();
        corrupt[7] ^= 0x10;
        let mut input = corrupt;
        input.extend(ack());

        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&input);
        assert!(matches!(
            events[0],
            ReassemblyEvent::Rejected(DecodeError::ChecksumMismatch { .. })
        ));
        assert_eq!(frames(&events), vec![Frame::empty(Command::Ack)]);
    }

    #[test]
    fn test_unknown_command_framed_as_empty() {
        let mut input = encode(0x7F, &[]).unwrap();
        input.extend(ack());

        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&input);
        assert_eq!(
            events[0],
            ReassemblyEvent::Rejected(DecodeError::UnknownCommand { command: 0x7F })
        );
        assert_eq!(frames(&events).len(), 1);
    }

    #[test]
    fn test_variable_length_burst() {
        let mut input = egram();
        input.extend(ack());

        let mut reassembler = Reassembler::new();
        let extracted = frames(&reassembler.push(&input));
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].command(), Command::EgramData);
        assert_eq!(extracted[0].payload().as_ref(), &[0, 100, 0, 1, 200, 0]);
    }

    #[test]
    fn test_variable_length_burst_torn() {
        let frame = egram();
        for split in 1..frame.len() {
            let mut reassembler = Reassembler::new();
            assert!(frames(&reassembler.push(&frame[..split])).is_empty());
            assert_eq!(frames(&reassembler.push(&frame[split..])).len(), 1);
        }
    }

    #[test]
    fn test_burst_with_inner_checksum_and_end_pair() {
        // (0, 1248) encodes as 00 E0 04, which looks like a checksum and end marker
        let payload = [0x00, 0xE0, 0x04, 0x01, 0xC8, 0x00];
        let mut input = encode(Command::EgramData.as_u8(), &payload).unwrap();
        input.extend(ack());

        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&input);
        assert!(events.iter().all(|e| matches!(e, ReassemblyEvent::Frame(_))));

        let extracted = frames(&events);
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].payload().as_ref(), &payload);
        assert_eq!(crate::protocol::samples(extracted[0].payload()).count(), 2);
        assert_eq!(extracted[1].command(), Command::Ack);
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn test_burst_followed_by_noise() {
        let mut input = egram();
        input.extend(std::iter::repeat_n(0x11u8, MAX_PAYLOAD_LEN));

        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&input);
        let extracted = frames(&events);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].payload().as_ref(), &[0, 100, 0, 1, 200, 0]);
        assert_eq!(
            events.last(),
            Some(&ReassemblyEvent::Noise {
                discarded: MAX_PAYLOAD_LEN
            })
        );
    }

    #[test]
    fn test_unterminated_burst_is_eventually_dropped() {
        let mut input = vec![START_BYTE, Command::EgramData.as_u8()];
        input.extend(std::iter::repeat_n(0x11u8, MAX_PAYLOAD_LEN + 2));

        let mut reassembler = Reassembler::new();
        let events = reassembler.push(&input);
        assert!(matches!(events[0], ReassemblyEvent::Rejected(_)));
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn test_clear() {
        let mut reassembler = Reassembler::new();
        reassembler.push(&params()[..10]);
        reassembler.clear();
        assert_eq!(reassembler.buffered(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn noise_strategy() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(any::<u8>().prop_filter("not a start marker", |b| *b != START_BYTE), 0..64)
        }

        // Frames whose end marker is the first END byte after the command,
        // so the variable-length scan cannot stop early
        fn frame_strategy() -> impl Strategy<Value = Vec<u8>> {
            prop_oneof![
                prop::collection::vec(any::<u8>(), 38)
                    .prop_map(|p| encode(Command::SendParams.as_u8(), &p).unwrap()),
                Just(encode(Command::Ack.as_u8(), &[]).unwrap()),
                Just(encode(Command::RequestEgram.as_u8(), &[]).unwrap()),
                prop::collection::vec(any::<u8>().prop_filter("no end marker", |b| *b != END_BYTE), 0..90)
                    .prop_map(|p| encode(Command::EgramData.as_u8(), &p).unwrap())
                    .prop_filter("checksum is not an end marker", |f| f[f.len() - 2] != END_BYTE),
            ]
        }

        fn split_points(len: usize) -> impl Strategy<Value = Vec<usize>> {
            prop::collection::vec(0..=len, 0..6).prop_map(|mut points| {
                points.sort_unstable();
                points
            })
        }

        proptest! {
            /// Property: noise + frame yields exactly that frame regardless of chunking
            #[test]
            fn prop_resync_any_chunking(
                (input, frame, points) in (noise_strategy(), frame_strategy())
                    .prop_flat_map(|(noise, frame)| {
                        let mut input = noise;
                        input.extend_from_slice(&frame);
                        let len = input.len();
                        (Just(input), Just(frame), split_points(len))
                    })
            ) {
                let mut reassembler = Reassembler::new();
                let mut extracted = Vec::new();
                let mut start = 0;
                for point in points.into_iter().chain(std::iter::once(input.len())) {
                    extracted.extend(frames(&reassembler.push(&input[start..point])));
                    start = point;
                }

                prop_assert_eq!(extracted.len(), 1);
                prop_assert_eq!(extracted[0].encode(), frame);
                prop_assert_eq!(reassembler.buffered(), 0);
            }

            /// Property: back-to-back frames come out in order
            #[test]
            fn prop_batched_frames_in_order(first in frame_strategy(), second in frame_strategy()) {
                let mut input = first.clone();
                input.extend_from_slice(&second);

                let mut reassembler = Reassembler::new();
                let extracted = frames(&reassembler.push(&input));

                prop_assert_eq!(extracted.len(), 2);
                prop_assert_eq!(extracted[0].encode(), first);
                prop_assert_eq!(extracted[1].encode(), second);
            }
        }
    }
}
