//! Transport-level error types covering port and I/O failures.

use std::io;

/// Failure on the channel underneath the protocol.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Read or write on an open channel failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Opening or configuring the serial port failed.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}
