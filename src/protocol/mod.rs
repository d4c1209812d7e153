//! pacelink protocol core
//!
//! This module provides the wire format, frame codec, parameter packing and
//! stream reassembly. It does no I/O.

mod codec;
mod egram;
mod error;
mod frame;
pub(crate) mod metrics;
mod modes;
mod params;
mod reassembler;
mod types;

pub use codec::{checksum, decode, encode};
pub use egram::{EgramBuffer, EgramChannel, EgramSample, RecordedSample, SAMPLE_LEN, samples};
pub use error::{DecodeError, Error, Result};
pub use frame::Frame;
pub use metrics::{LinkStats, StatsSnapshot};
pub use modes::{Chamber, ModeInfo, PacingMode, Response};
pub use params::{PARAMETER_COUNT, PARAMS_PAYLOAD_LEN, ParameterField, ParameterSet};
pub use reassembler::{Reassembler, ReassemblyEvent};
pub use types::{Command, PayloadLen, payload_len};

/// Start-of-frame marker
pub const START_BYTE: u8 = 0x16;

/// End-of-frame marker
pub const END_BYTE: u8 = 0x04;

/// Largest payload a single frame may carry
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Bytes a frame adds around its payload: start, command, checksum, end
pub const FRAME_OVERHEAD: usize = 4;
