//! Routing of validated frames to registered callbacks.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::protocol::{Command, Frame, Result, samples};

use super::FrameWriter;

/// Callback invoked for every received `Ack`.
pub type AckCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback invoked once per electrogram sample with `(channel, value)`.
pub type EgramCallback = Arc<dyn Fn(u8, u16) + Send + Sync>;

/// What the dispatcher did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// `Ack` received; the ack callback (if any) ran
    Acknowledged,
    /// `SendParams` received; an `Ack` was written back
    AckSent,
    /// `EgramData` received; this many samples were delivered
    Samples(usize),
    /// Valid frame with no handler
    Ignored(Command),
}

/// Holds the callbacks and routes frames by command.
///
/// Callbacks can be swapped while a reader is running; each frame sees the
/// callbacks registered at the moment it is dispatched.
#[derive(Default)]
pub struct Dispatcher {
    on_ack: RwLock<Option<AckCallback>>,
    on_egram: RwLock<Option<EgramCallback>>,
}

impl Dispatcher {
    /// Create a dispatcher with no callbacks
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the acknowledgement callback, replacing any previous one
    pub fn set_ack_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_ack.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Register the electrogram callback, replacing any previous one
    pub fn set_egram_callback<F>(&self, callback: F)
    where
        F: Fn(u8, u16) + Send + Sync + 'static,
    {
        *self.on_egram.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Route one frame.
    ///
    /// A received `SendParams` doubles as an acknowledgement request, so the
    /// reply is written through `writer` before returning.
    ///
    /// # Errors
    ///
    /// Only the `Ack` reply can fail, with the writer's transport error.
    pub fn dispatch(&self, frame: &Frame, writer: &FrameWriter) -> Result<Dispatched> {
        match frame.command() {
            Command::Ack => {
                if let Some(callback) = self.ack_callback() {
                    callback();
                }
                Ok(Dispatched::Acknowledged)
            }
            Command::SendParams => {
                writer.send(Command::Ack, &[])?;
                debug!("acknowledged device parameter frame");
                Ok(Dispatched::AckSent)
            }
            Command::EgramData => {
                let callback = self.egram_callback();
                let mut count = 0;
                for sample in samples(frame.payload()) {
                    if let Some(callback) = &callback {
                        callback(sample.channel, sample.value);
                    }
                    count += 1;
                }
                Ok(Dispatched::Samples(count))
            }
            command @ Command::RequestEgram => {
                debug!(%command, "no handler for received command");
                Ok(Dispatched::Ignored(command))
            }
        }
    }

    // Clone out of the lock so a callback may re-register without deadlock
    fn ack_callback(&self) -> Option<AckCallback> {
        self.on_ack
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn egram_callback(&self) -> Option<EgramCallback> {
        self.on_egram
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("on_ack", &self.ack_callback().is_some())
            .field("on_egram", &self.egram_callback().is_some())
            .finish()
    }
}
