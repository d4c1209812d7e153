//! In-memory transport for driving a link without hardware.
//!
//! [`MockTransport`] plays the device: bytes pushed through a [`MockHandle`]
//! come out of the link's read half, in exactly the chunks they were fed,
//! and every write the link makes is recorded.
//!
//! ```
//! use pacelink::transport::MockTransport;
//! use pacelink::{Link, LinkConfig};
//!
//! let (transport, device) = MockTransport::new();
//! let mut link = Link::new(LinkConfig::default());
//! link.connect(transport)?;
//! link.send_request_egram()?;
//! assert_eq!(device.sent(), vec![vec![0x16, 0x22, 0x22, 0x04]]);
//! # Ok::<(), pacelink::Error>(())
//! ```

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::{Transport, TransportError};

const READ_WAIT: Duration = Duration::from_millis(5);

enum Incoming {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<Vec<Vec<u8>>>,
    fail_writes: AtomicBool,
}

/// Device side of a [`MockTransport`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MockHandle {
    incoming: Sender<Incoming>,
    shared: Arc<Shared>,
}

/// Loopback transport backed by a channel.
#[derive(Debug)]
pub struct MockTransport {
    incoming: Receiver<Incoming>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Incoming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(bytes) => write!(f, "Data({} bytes)", bytes.len()),
            Self::Error(kind) => write!(f, "Error({kind:?})"),
        }
    }
}

impl MockTransport {
    /// Create a transport and the handle that feeds it.
    #[must_use]
    pub fn new() -> (Self, MockHandle) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        (
            Self {
                incoming: rx,
                shared: Arc::clone(&shared),
            },
            MockHandle {
                incoming: tx,
                shared,
            },
        )
    }
}

impl MockHandle {
    /// Deliver bytes to the link as a single read.
    pub fn feed(&self, bytes: &[u8]) {
        // The reader may already be gone; nothing to deliver to then.
        let _ = self.incoming.send(Incoming::Data(bytes.to_vec()));
    }

    /// Make the next read fail with the given error kind.
    pub fn fail_read(&self, kind: io::ErrorKind) {
        let _ = self.incoming.send(Incoming::Error(kind));
    }

    /// Make every write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Release);
    }

    /// Every buffer written so far, one entry per write.
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget recorded writes.
    pub fn clear_sent(&self) {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Wait until at least `count` writes were recorded.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.sent().len() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Read half of a [`MockTransport`].
#[derive(Debug)]
pub struct MockReader {
    incoming: Receiver<Incoming>,
    pending: Vec<u8>,
}

/// Write half of a [`MockTransport`].
#[derive(Debug)]
pub struct MockWriter {
    shared: Arc<Shared>,
}

impl Read for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.incoming.recv_timeout(READ_WAIT) {
                Ok(Incoming::Data(bytes)) => self.pending = bytes,
                Ok(Incoming::Error(kind)) => return Err(io::Error::new(kind, "injected read failure")),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }

        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.shared.fail_writes.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure"));
        }
        self.shared
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError> {
        Ok((
            MockReader {
                incoming: self.incoming,
                pending: Vec::new(),
            },
            MockWriter {
                shared: self.shared,
            },
        ))
    }
}
