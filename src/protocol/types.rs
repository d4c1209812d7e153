//! Command identifiers and the static payload-length table

use std::fmt;

use super::params::PARAMS_PAYLOAD_LEN;

/// Commands exchanged with the pacemaker emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Parameter set from console to device. When received from the device
    /// it is a request to acknowledge.
    SendParams = 0x55,
    /// Ask the device to start streaming electrogram samples
    RequestEgram = 0x22,
    /// Acknowledgement
    Ack = 0xAA,
    /// Burst of electrogram samples
    EgramData = 0xE0,
}

/// Payload size implied by a command byte.
///
/// The wire carries no length field, so the receiver has to know this up
/// front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    /// Every frame of this command carries exactly this many payload bytes
    Fixed(usize),
    /// Payload runs until the checksum and end marker line up
    Variable,
}

impl Command {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x55 => Some(Self::SendParams),
            0x22 => Some(Self::RequestEgram),
            0xAA => Some(Self::Ack),
            0xE0 => Some(Self::EgramData),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Payload size carried by this command
    #[must_use]
    pub const fn payload_len(self) -> PayloadLen {
        match self {
            Self::SendParams => PayloadLen::Fixed(PARAMS_PAYLOAD_LEN),
            Self::RequestEgram | Self::Ack => PayloadLen::Fixed(0),
            Self::EgramData => PayloadLen::Variable,
        }
    }
}

/// Payload size for a raw command byte.
///
/// Unknown commands are assumed to carry no payload. A future firmware
/// command with a payload will therefore misframe until it is added to the
/// table.
#[must_use]
pub const fn payload_len(command: u8) -> PayloadLen {
    match Command::from_u8(command) {
        Some(cmd) => cmd.payload_len(),
        None => PayloadLen::Fixed(0),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SendParams => "SendParams",
            Self::RequestEgram => "RequestEgram",
            Self::Ack => "Ack",
            Self::EgramData => "EgramData",
        };
        write!(f, "{name}")
    }
}
