//! Validated protocol frame

use bytes::Bytes;

use super::{Command, Error, MAX_PAYLOAD_LEN, Result};

/// One complete, validated protocol message.
///
/// Frames are immutable once built and cheap to clone; the payload shares
/// the receive buffer's allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    payload: Bytes,
}

impl Frame {
    /// Create a frame, checking that the payload fits on the wire
    pub fn new(command: Command, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(Self { command, payload })
    }

    /// Frame with no payload
    #[must_use]
    pub const fn empty(command: Command) -> Self {
        Self {
            command,
            payload: Bytes::new(),
        }
    }

    /// Build from parts already checked by the decoder
    pub(crate) const fn from_parts(command: Command, payload: Bytes) -> Self {
        Self { command, payload }
    }

    /// Get command
    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Get payload
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encode frame to wire bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        super::codec::write_frame(self.command.as_u8(), &self.payload)
    }

    /// Decode frame from wire bytes
    pub fn decode(bytes: impl Into<Bytes>) -> std::result::Result<Self, super::DecodeError> {
        super::decode(bytes.into())
    }
}
