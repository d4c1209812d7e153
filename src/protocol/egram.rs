//! Electrogram samples and per-channel history

use std::collections::VecDeque;
use std::time::Instant;

use super::{Error, Result};

/// Bytes per sample in an `EgramData` burst: channel + u16 LE value
pub const SAMPLE_LEN: usize = 3;

/// Sensing channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EgramChannel {
    /// Atrial lead
    Atrial = 0,
    /// Ventricular lead
    Ventricular = 1,
}

impl EgramChannel {
    /// Map a wire channel byte
    #[must_use]
    pub const fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Atrial),
            1 => Some(Self::Ventricular),
            _ => None,
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// One sample from a burst, exactly as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EgramSample {
    /// Channel byte (0 = atrial, 1 = ventricular)
    pub channel: u8,
    /// Raw sample value
    pub value: u16,
}

impl EgramSample {
    /// Typed channel, if the byte is a known channel
    #[must_use]
    pub const fn channel(&self) -> Option<EgramChannel> {
        EgramChannel::from_wire(self.channel)
    }
}

/// Split a burst payload into samples.
///
/// A trailing partial triplet is dropped.
pub fn samples(payload: &[u8]) -> impl Iterator<Item = EgramSample> + '_ {
    payload.chunks_exact(SAMPLE_LEN).map(|chunk| EgramSample {
        channel: chunk[0],
        value: u16::from_le_bytes([chunk[1], chunk[2]]),
    })
}

/// Sample retained by [`EgramBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedSample {
    /// When the sample was recorded
    pub at: Instant,
    /// Raw sample value
    pub value: u16,
}

/// Rolling history of the newest samples on each channel.
///
/// Sits on the consumer side of the egram callback; the link itself keeps
/// no history.
#[derive(Debug, Clone)]
pub struct EgramBuffer {
    channels: [VecDeque<RecordedSample>; 2],
    capacity: usize,
}

impl EgramBuffer {
    /// Default samples kept per channel
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a buffer keeping at most `capacity` samples per channel
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: [
                VecDeque::with_capacity(capacity),
                VecDeque::with_capacity(capacity),
            ],
            capacity,
        }
    }

    /// Record a sample timestamped now
    pub fn record(&mut self, channel: EgramChannel, value: u16) {
        self.record_at(channel, value, Instant::now());
    }

    /// Record a sample with an explicit timestamp
    pub fn record_at(&mut self, channel: EgramChannel, value: u16, at: Instant) {
        if self.capacity == 0 {
            return;
        }
        let queue = &mut self.channels[channel.slot()];
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(RecordedSample { at, value });
    }

    /// Record a sample straight from the wire
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownChannel`] for channel bytes other than 0 and 1.
    pub fn record_wire(&mut self, sample: EgramSample) -> Result<()> {
        let channel = sample.channel().ok_or(Error::UnknownChannel(sample.channel))?;
        self.record(channel, sample.value);
        Ok(())
    }

    /// The last `n` samples on a channel, oldest first
    #[must_use]
    pub fn recent(&self, channel: EgramChannel, n: usize) -> Vec<RecordedSample> {
        let queue = &self.channels[channel.slot()];
        let skip = queue.len().saturating_sub(n);
        queue.iter().skip(skip).copied().collect()
    }

    /// Every retained sample on a channel, oldest first
    #[must_use]
    pub fn all(&self, channel: EgramChannel) -> Vec<RecordedSample> {
        self.channels[channel.slot()].iter().copied().collect()
    }

    /// Number of retained samples on a channel
    #[must_use]
    pub fn len(&self, channel: EgramChannel) -> usize {
        self.channels[channel.slot()].len()
    }

    /// Whether every channel is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(VecDeque::is_empty)
    }

    /// Samples kept per channel
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history
    pub fn clear(&mut self) {
        for queue in &mut self.channels {
            queue.clear();
        }
    }
}

impl Default for EgramBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(samples: &[RecordedSample]) -> Vec<u16> {
        samples.iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_split_burst() {
        let payload = [0, 100, 0, 1, 200, 0];
        let split: Vec<_> = samples(&payload).collect();
        assert_eq!(
            split,
            vec![
                EgramSample { channel: 0, value: 100 },
                EgramSample { channel: 1, value: 200 },
            ]
        );
    }

    #[test]
    fn test_split_drops_trailing_partial() {
        let payload = [0, 100, 0, 1, 200, 0, 0x55];
        assert_eq!(samples(&payload).count(), 2);
        assert_eq!(samples(&payload[..2]).count(), 0);
    }

    #[test]
    fn test_value_is_little_endian() {
        let sample = samples(&[1, 0x34, 0x12]).next().unwrap();
        assert_eq!(sample.value, 0x1234);
        assert_eq!(sample.channel(), Some(EgramChannel::Ventricular));
    }

    #[test]
    fn test_add_and_get_recent() {
        let mut buf = EgramBuffer::new(5);
        buf.record(EgramChannel::Atrial, 1);
        buf.record(EgramChannel::Atrial, 2);
        buf.record(EgramChannel::Atrial, 4);

        assert_eq!(values(&buf.recent(EgramChannel::Atrial, 2)), vec![2, 4]);
        assert_eq!(values(&buf.recent(EgramChannel::Atrial, 10)), vec![1, 2, 4]);
        assert!(buf.recent(EgramChannel::Ventricular, 2).is_empty());
    }

    #[test]
    fn test_buffer_overflow_keeps_newest() {
        let mut buf = EgramBuffer::new(2);
        buf.record(EgramChannel::Atrial, 1);
        buf.record(EgramChannel::Atrial, 2);
        buf.record(EgramChannel::Atrial, 4);

        assert_eq!(values(&buf.all(EgramChannel::Atrial)), vec![2, 4]);
    }

    #[test]
    fn test_get_all_and_clear() {
        let mut buf = EgramBuffer::new(5);
        buf.record(EgramChannel::Ventricular, 2);
        buf.record(EgramChannel::Ventricular, 4);
        assert_eq!(buf.len(EgramChannel::Ventricular), 2);

        buf.clear();
        assert!(buf.all(EgramChannel::Ventricular).is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_record_wire_rejects_unknown_channel() {
        let mut buf = EgramBuffer::default();
        buf.record_wire(EgramSample { channel: 1, value: 7 }).unwrap();
        assert_eq!(buf.len(EgramChannel::Ventricular), 1);

        let result = buf.record_wire(EgramSample { channel: 9, value: 7 });
        assert!(matches!(result, Err(Error::UnknownChannel(9))));
    }
}
