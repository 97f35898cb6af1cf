//! Serial transport
//!
//! Owns one [`LineChannel`] over a serial port. All port I/O runs on the
//! tokio blocking pool; the channel itself sits behind a mutex so only one
//! exchange is in flight at a time.

use super::line_channel::LineChannel;
use super::serial::{open_port, ReadWrite, SerialSettings};
use super::{GcodeReply, GcodeTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use printscope_core::TransportError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

type SharedChannel = Arc<Mutex<Option<LineChannel<Box<dyn ReadWrite>>>>>;

/// G-code transport over a serial port
pub struct SerialTransport {
    settings: SerialSettings,
    channel: SharedChannel,
    abort: Option<Arc<AtomicBool>>,
}

impl SerialTransport {
    /// Create a closed transport
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            channel: Arc::new(Mutex::new(None)),
            abort: None,
        }
    }

    /// Create a transport over an already open stream
    ///
    /// Used for ports opened elsewhere and for scripted streams.
    pub fn with_port(settings: SerialSettings, port: Box<dyn ReadWrite>) -> Self {
        let transport = Self::new(settings);
        *transport.channel.lock() = Some(LineChannel::new(port));
        transport
    }

    /// Abandon in-flight exchanges when `flag` is raised
    ///
    /// Applies to the current channel and to channels opened later.
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        {
            let mut guard = self.channel.lock();
            *guard = guard.take().map(|ch| ch.with_abort_flag(flag.clone()));
        }
        self.abort = Some(flag);
        self
    }

    /// Link settings
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

#[async_trait]
impl GcodeTransport for SerialTransport {
    async fn open(&self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }

        let settings = self.settings.clone();
        let port = run_blocking(move || open_port(&settings)).await?;

        let mut channel = LineChannel::new(port);
        if let Some(flag) = &self.abort {
            channel = channel.with_abort_flag(flag.clone());
        }
        *self.channel.lock() = Some(channel);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let channel = self.channel.clone();
        let closed = run_blocking(move || Ok(channel.lock().take().is_some())).await?;
        if closed {
            tracing::info!(port = %self.settings.port, "Serial port closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channel.lock().is_some()
    }

    async fn send_and_await(
        &self,
        line: &str,
        timeout: Duration,
    ) -> Result<GcodeReply, TransportError> {
        let channel = self.channel.clone();
        let line = line.to_string();
        run_blocking(move || match channel.lock().as_mut() {
            Some(ch) => ch.exchange(&line, timeout),
            None => Err(TransportError::NotConnected),
        })
        .await
    }

    async fn send_unacknowledged(&self, line: &str) -> Result<(), TransportError> {
        let channel = self.channel.clone();
        let line = line.trim().to_string();
        run_blocking(move || match channel.lock().as_mut() {
            Some(ch) => ch.write_line(&line),
            None => Err(TransportError::NotConnected),
        })
        .await
    }

    async fn discard_input(&self) -> Result<Vec<String>, TransportError> {
        let channel = self.channel.clone();
        run_blocking(move || match channel.lock().as_mut() {
            Some(ch) => ch.discard_input(),
            None => Err(TransportError::NotConnected),
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, TransportError>
where
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransportError::Io {
            reason: format!("serial worker failed: {}", e),
        })?
}
