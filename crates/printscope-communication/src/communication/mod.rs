//! G-code transport layer
//!
//! Line-oriented request/acknowledgment exchange with the printer mainboard.
//! Every command line is answered by zero or more informational lines and
//! then exactly one terminal line: `ok` on success, or a line carrying
//! `error`/`resend` on failure.
//!
//! The blocking exchange lives in [`LineChannel`]; [`SerialTransport`] owns a
//! channel over a real serial port and runs it on the blocking thread pool so
//! the async command executor and telemetry readers are never stalled.

pub mod line_channel;
pub mod serial;
pub mod transport;

use async_trait::async_trait;
use printscope_core::TransportError;
use std::time::Duration;

pub use line_channel::{classify_line, LineChannel, LineClass};
pub use serial::{list_ports, open_port, ReadWrite, SerialPortInfo, SerialSettings};
pub use transport::SerialTransport;

/// Acknowledged reply to one command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcodeReply {
    /// The command line that was sent, without terminator
    pub command: String,
    /// Every line received up to and including the terminal `ok`
    pub lines: Vec<String>,
}

impl GcodeReply {
    /// Informational lines, without the terminal `ok`
    pub fn data_lines(&self) -> &[String] {
        match self.lines.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// All received lines joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Request/acknowledgment transport to a G-code device
///
/// Callers choose the timeout per command class; the transport never infers
/// it from the command text.
#[async_trait]
pub trait GcodeTransport: Send + Sync {
    /// Open the underlying link
    async fn open(&self) -> Result<(), TransportError>;

    /// Close the link; closing an already closed link is a no-op
    async fn close(&self) -> Result<(), TransportError>;

    /// Whether the link is open
    fn is_open(&self) -> bool;

    /// Send one command line and wait for its terminal response
    async fn send_and_await(
        &self,
        line: &str,
        timeout: Duration,
    ) -> Result<GcodeReply, TransportError>;

    /// Send one command line without waiting for any response
    async fn send_unacknowledged(&self, line: &str) -> Result<(), TransportError>;

    /// Drop unsolicited input such as a boot banner, returning it
    async fn discard_input(&self) -> Result<Vec<String>, TransportError> {
        Ok(Vec::new())
    }
}
