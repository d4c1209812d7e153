//! pacelink - serial wire protocol for a pacemaker emulator console
//!
//! This library implements the console side of the UART link to a
//! pacemaker emulator: building and validating frames, packing the
//! programmable parameter block, reassembling frames from a noisy byte
//! stream and dispatching acknowledgements and electrogram samples.
//!
//! # Quick Start
//!
//! ```rust
//! use pacelink::{Command, Frame, PacingMode, ParameterField, ParameterSet};
//!
//! // Build a parameter block
//! let params = ParameterSet::new()
//!     .with_mode(PacingMode::Vvi)
//!     .with(ParameterField::LowerRateLimit, 60)
//!     .with(ParameterField::UpperRateLimit, 120);
//!
//! // Encode to wire bytes
//! let frame = Frame::new(Command::SendParams, params.encode().to_vec())?;
//! let bytes = frame.encode();
//!
//! // Decode from wire bytes
//! let decoded = Frame::decode(bytes)?;
//! assert_eq!(ParameterSet::decode(decoded.payload())?, params);
//! # Ok::<(), pacelink::Error>(())
//! ```
//!
//! # Wire format
//!
//! ```text
//! START(0x16) CMD PAYLOAD(N) CHECKSUM END(0x04)
//! ```
//!
//! `N` is fixed per command, and the checksum is the XOR of `CMD` and the
//! payload. See [`protocol`] for the command table.
//!
//! # Talking to a device
//!
//! ```rust,no_run
//! use pacelink::transport::{SerialConfig, SerialTransport};
//! use pacelink::{Link, LinkConfig, ParameterSet};
//!
//! let mut link = Link::new(LinkConfig::default());
//! link.on_ack(|| println!("ack"));
//! link.on_egram_sample(|channel, value| println!("ch{channel} {value}"));
//!
//! link.connect(SerialTransport::open("/dev/ttyACM0", &SerialConfig::default())?)?;
//! link.send_parameters(&ParameterSet::new())?;
//! link.send_request_egram()?;
//! link.disconnect();
//! # Ok::<(), pacelink::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    Command, DecodeError, EgramBuffer, EgramChannel, EgramSample, END_BYTE, Error, Frame,
    MAX_PAYLOAD_LEN, PacingMode, ParameterField, ParameterSet, Reassembler, ReassemblyEvent,
    Result, START_BYTE, StatsSnapshot, checksum, decode, encode,
};
pub use transport::{Link, LinkConfig};

/// Default UART speed of the device
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
