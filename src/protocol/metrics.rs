use std::sync::atomic::{AtomicU64, Ordering};

use super::{Command, DecodeError};

/// Counters for one link, shared between the reader thread and callers.
#[derive(Debug, Default)]
pub struct LinkStats {
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    acks_received: AtomicU64,
    ack_replies: AtomicU64,
    egram_samples: AtomicU64,
    noise_bytes: AtomicU64,
    bad_terminators: AtomicU64,
    checksum_errors: AtomicU64,
    unknown_commands: AtomicU64,
    read_errors: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames that passed validation
    pub frames_received: u64,
    /// Frames written to the transport
    pub frames_sent: u64,
    /// `Ack` frames received
    pub acks_received: u64,
    /// `Ack` frames sent in reply to a received `SendParams`
    pub ack_replies: u64,
    /// Electrogram samples delivered to the callback
    pub egram_samples: u64,
    /// Bytes dropped while hunting for a start marker
    pub noise_bytes: u64,
    /// Candidates rejected for a bad end marker
    pub bad_terminators: u64,
    /// Candidates rejected for a checksum mismatch
    pub checksum_errors: u64,
    /// Candidates rejected for an unknown command
    pub unknown_commands: u64,
    /// Failed reads from the transport
    pub read_errors: u64,
}

impl LinkStats {
    #[inline]
    pub(crate) fn record_received(&self, command: Command) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        if command == Command::Ack {
            self.acks_received.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_ack_reply(&self) {
        self.ack_replies.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_samples(&self, count: usize) {
        self.egram_samples.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_noise(&self, discarded: usize) {
        self.noise_bytes.fetch_add(discarded as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected(&self, err: DecodeError) {
        let counter = match err {
            DecodeError::BadTerminator { .. } => &self.bad_terminators,
            DecodeError::ChecksumMismatch { .. } => &self.checksum_errors,
            DecodeError::UnknownCommand { .. } => &self.unknown_commands,
            // preconditions the reassembler always satisfies
            DecodeError::TruncatedFrame { .. }
            | DecodeError::MissingStart { .. }
            | DecodeError::PayloadLength { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            ack_replies: self.ack_replies.load(Ordering::Relaxed),
            egram_samples: self.egram_samples.load(Ordering::Relaxed),
            noise_bytes: self.noise_bytes.load(Ordering::Relaxed),
            bad_terminators: self.bad_terminators.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            unknown_commands: self.unknown_commands.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Total candidates dropped by validation
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.bad_terminators + self.checksum_errors + self.unknown_commands
    }
}
