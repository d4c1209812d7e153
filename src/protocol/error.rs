//! pacelink error types

use thiserror::Error;

use crate::transport::TransportError;

/// Reasons a candidate frame is rejected by the decoder.
///
/// None of these are fatal to a session: the reassembler discards the
/// offending bytes and resynchronizes on the next start marker.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Last byte of the candidate is not the end marker
    #[error("bad terminator: expected 0x04, got {found:#04x}")]
    BadTerminator {
        /// Byte found where the end marker should be
        found: u8,
    },

    /// Checksum byte does not match the XOR-fold of command and payload
    #[error("checksum mismatch: expected {expected:#04x}, got {found:#04x}")]
    ChecksumMismatch {
        /// Checksum recomputed over command and payload
        expected: u8,
        /// Checksum carried by the frame
        found: u8,
    },

    /// Command byte is not in the command table
    #[error("unknown command: {command:#04x}")]
    UnknownCommand {
        /// Unrecognized command byte
        command: u8,
    },

    /// Candidate is shorter than the smallest possible frame
    #[error("truncated frame: need {needed} bytes, got {got}")]
    TruncatedFrame {
        /// Minimum bytes needed
        needed: usize,
        /// Bytes supplied
        got: usize,
    },

    /// Candidate does not begin with the start marker
    #[error("missing start marker: got {found:#04x}")]
    MissingStart {
        /// Byte found at offset zero
        found: u8,
    },

    /// Payload has the wrong size for its command
    #[error("payload length mismatch: expected {expected} bytes, got {got}")]
    PayloadLength {
        /// Size required by the command table
        expected: usize,
        /// Size received
        got: usize,
    },
}

/// pacelink errors
#[derive(Error, Debug)]
pub enum Error {
    /// Frame failed validation
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Payload does not fit in a single frame
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Read or write failure on the underlying channel
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Operation requires an open connection
    #[error("link is not connected")]
    NotConnected,

    /// `connect` called on a link that already has a reader running
    #[error("link is already connected")]
    AlreadyConnected,

    /// Pacing mode name not in the mode table
    #[error("unknown pacing mode: {0}")]
    UnknownMode(String),

    /// Electrogram channel byte not in the channel table
    #[error("unknown electrogram channel: {0}")]
    UnknownChannel(u8),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(TransportError::Io(err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
