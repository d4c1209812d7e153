//! Connection to the device: reader thread plus the public send/subscribe
//! surface.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};

use crate::protocol::{
    Command, DecodeError, Error, Frame, LinkStats, ParameterField, ParameterSet, Reassembler,
    ReassemblyEvent, Result, StatsSnapshot,
};

use super::{Dispatched, Dispatcher, FrameWriter, Transport};

/// Link configuration options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// Largest single read from the transport, in bytes.
    pub read_chunk_size: usize,
    /// Pause after a read that returned no data without blocking.
    pub poll_interval: Duration,
    /// First pause after a failed read.
    pub retry_backoff: Duration,
    /// Upper bound for the doubling retry pause.
    pub max_retry_backoff: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 256,
            poll_interval: Duration::from_millis(1),
            retry_backoff: Duration::from_millis(10),
            max_retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Console side of the device link.
///
/// Register callbacks with [`on_ack`](Self::on_ack) and
/// [`on_egram_sample`](Self::on_egram_sample), then [`connect`](Self::connect)
/// a transport. Callbacks run on the link's reader thread.
#[derive(Debug)]
pub struct Link {
    config: LinkConfig,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<LinkStats>,
    session: Option<Session>,
}

#[derive(Debug)]
struct Session {
    writer: FrameWriter,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Link {
    /// Create a disconnected link.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            stats: Arc::new(LinkStats::default()),
            session: None,
        }
    }

    /// Register the acknowledgement callback.
    pub fn on_ack<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.dispatcher.set_ack_callback(callback);
    }

    /// Register the electrogram callback, called with `(channel, value)`.
    pub fn on_egram_sample<F>(&self, callback: F)
    where
        F: Fn(u8, u16) + Send + Sync + 'static,
    {
        self.dispatcher.set_egram_callback(callback);
    }

    /// Take ownership of a transport and start the reader thread.
    #[instrument(level = "info", skip_all)]
    pub fn connect<T: Transport>(&mut self, transport: T) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let (read_half, write_half) = transport.split()?;
        let writer = FrameWriter::new(write_half, Arc::clone(&self.stats));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = ReaderLoop {
            reader: read_half,
            reassembler: Reassembler::new(),
            dispatcher: Arc::clone(&self.dispatcher),
            writer: writer.clone(),
            stats: Arc::clone(&self.stats),
            stop: Arc::clone(&stop),
            config: self.config.clone(),
        };
        let reader = thread::Builder::new()
            .name("pacelink-reader".into())
            .spawn(move || worker.run())?;

        self.session = Some(Session {
            writer,
            stop,
            reader: Some(reader),
        });
        info!("link connected");
        Ok(())
    }

    /// Stop the reader thread and release the transport.
    ///
    /// Safe to call repeatedly or on a link that never connected.
    pub fn disconnect(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.stop.store(true, Ordering::Release);
        if let Some(reader) = session.reader.take() {
            // A callback on the reader thread may end up here; it can't join itself.
            if reader.thread().id() == thread::current().id() {
                debug!("disconnect requested from reader thread");
            } else if reader.join().is_err() {
                warn!("reader thread panicked");
            }
        }
        info!("link disconnected");
    }

    /// Whether a transport is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Send a parameter block to the device.
    #[instrument(level = "debug", skip_all, fields(mode = params.get(ParameterField::Mode)))]
    pub fn send_parameters(&self, params: &ParameterSet) -> Result<()> {
        self.writer()?.send(Command::SendParams, &params.encode())
    }

    /// Ask the device to start streaming electrogram samples.
    #[instrument(level = "debug", skip_all)]
    pub fn send_request_egram(&self) -> Result<()> {
        self.writer()?.send(Command::RequestEgram, &[])
    }

    /// Send an arbitrary frame.
    pub fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.writer()?.send_frame(frame)
    }

    /// Current link counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Configuration this link was created with.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    fn writer(&self) -> Result<&FrameWriter> {
        self.session
            .as_ref()
            .map(|session| &session.writer)
            .ok_or(Error::NotConnected)
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State owned by the reader thread. The reassembler never leaves it.
struct ReaderLoop<R> {
    reader: R,
    reassembler: Reassembler,
    dispatcher: Arc<Dispatcher>,
    writer: FrameWriter,
    stats: Arc<LinkStats>,
    stop: Arc<AtomicBool>,
    config: LinkConfig,
}

impl<R: Read> ReaderLoop<R> {
    fn run(mut self) {
        debug!("reader started");
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        let mut backoff = self.config.retry_backoff;

        while !self.stop.load(Ordering::Acquire) {
            match self.reader.read(&mut chunk) {
                Ok(0) => thread::sleep(self.config.poll_interval),
                Ok(n) => {
                    backoff = self.config.retry_backoff;
                    self.process(&chunk[..n]);
                }
                Err(err) => match err.kind() {
                    // blocking read hit its timeout
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {}
                    io::ErrorKind::WouldBlock => thread::sleep(self.config.poll_interval),
                    _ => {
                        self.stats.record_read_error();
                        warn!(error = %err, retry_in = ?backoff, "read failed");
                        thread::sleep(backoff);
                        backoff = (backoff * 2).min(self.config.max_retry_backoff);
                    }
                },
            }
        }

        self.reassembler.clear();
        debug!("reader stopped");
    }

    fn process(&mut self, chunk: &[u8]) {
        for event in self.reassembler.push(chunk) {
            match event {
                ReassemblyEvent::Frame(frame) => self.handle_frame(&frame),
                ReassemblyEvent::Rejected(err) => {
                    self.stats.record_rejected(err);
                    match err {
                        DecodeError::UnknownCommand { .. } => debug!(error = %err, "dropped frame"),
                        _ => warn!(error = %err, "dropped frame"),
                    }
                }
                ReassemblyEvent::Noise { discarded } => {
                    self.stats.record_noise(discarded);
                    trace!(discarded, "dropped noise");
                }
            }
        }
    }

    fn handle_frame(&self, frame: &Frame) {
        self.stats.record_received(frame.command());
        trace!(command = %frame.command(), len = frame.payload().len(), "frame received");

        match self.dispatcher.dispatch(frame, &self.writer) {
            Ok(Dispatched::AckSent) => self.stats.record_ack_reply(),
            Ok(Dispatched::Samples(count)) => self.stats.record_samples(count),
            Ok(Dispatched::Acknowledged | Dispatched::Ignored(_)) => {}
            Err(err) => warn!(error = %err, command = %frame.command(), "dispatch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_send_requires_connection() {
        let link = Link::default();
        assert!(matches!(link.send_request_egram(), Err(Error::NotConnected)));
        assert!(matches!(
            link.send_parameters(&ParameterSet::new()),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_connect_twice_fails() {
        let mut link = Link::default();
        let (first, _device) = MockTransport::new();
        let (second, _other) = MockTransport::new();

        link.connect(first).unwrap();
        assert!(matches!(link.connect(second), Err(Error::AlreadyConnected)));
        assert!(link.is_connected());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut link = Link::default();
        link.disconnect();

        let (transport, _device) = MockTransport::new();
        link.connect(transport).unwrap();
        link.disconnect();
        link.disconnect();
        assert!(!link.is_connected());
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let mut link = Link::default();
        let (first, _device) = MockTransport::new();
        link.connect(first).unwrap();
        link.disconnect();

        let (second, device) = MockTransport::new();
        link.connect(second).unwrap();
        link.send_request_egram().unwrap();
        assert_eq!(device.sent(), vec![vec![0x16, 0x22, 0x22, 0x04]]);
    }
}
