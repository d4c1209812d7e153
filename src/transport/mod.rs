//! Device link: transports, dispatch and the reader thread.

mod dispatcher;
mod error;
mod link;
mod mock;
mod serial;
mod writer;

use std::io::{Read, Write};

pub use dispatcher::{AckCallback, Dispatched, Dispatcher, EgramCallback};
pub use error::TransportError;
pub use link::{Link, LinkConfig};
pub use mock::{MockHandle, MockReader, MockTransport, MockWriter};
pub use serial::{SerialConfig, SerialTransport};
pub use writer::FrameWriter;

/// Byte channel to the device.
///
/// A link reads on its own thread while callers write from theirs, so a
/// transport has to come apart into independent halves.
pub trait Transport: Send + 'static {
    /// Half moved into the reader thread.
    type Reader: Read + Send + 'static;
    /// Half shared by senders.
    type Writer: Write + Send + 'static;

    /// Separate the read and write halves.
    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError>;
}
