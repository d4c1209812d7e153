//! Shared write half of a link.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{instrument, trace};

use crate::protocol::{Command, Frame, LinkStats, Result, encode};

use super::TransportError;

/// Encodes frames and writes them to the transport.
///
/// Clones share one underlying writer; each frame is written under a lock so
/// concurrent senders never interleave bytes.
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
    stats: Arc<LinkStats>,
}

impl FrameWriter {
    /// Wrap the write half of a transport.
    pub fn new(writer: impl Write + Send + 'static, stats: Arc<LinkStats>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
            stats,
        }
    }

    /// Encode and write one frame.
    #[instrument(level = "trace", skip(self, payload), fields(len = payload.len()))]
    pub fn send(&self, command: Command, payload: &[u8]) -> Result<()> {
        let bytes = encode(command.as_u8(), payload)?;
        self.write_all(&bytes)?;
        trace!(%command, "frame sent");
        self.stats.record_sent();
        Ok(())
    }

    /// Write an already built frame.
    pub fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send(frame.command(), frame.payload())
    }

    fn write_all(&self, bytes: &[u8]) -> std::result::Result<(), TransportError> {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter").finish_non_exhaustive()
    }
}
