//! Blocking line exchange
//!
//! Implements the acknowledgment protocol on top of any byte stream. The
//! stream is expected to return `TimedOut` or `WouldBlock` when no data is
//! available, which is how a serial port configured with a read timeout
//! behaves.

use super::GcodeReply;
use printscope_core::TransportError;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Back-off between polls when the stream has no data
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Classification of one response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Terminal success (`ok`, `ok T:...`)
    Ok,
    /// Terminal failure (`Error:...`, `Resend: 12`)
    Failure,
    /// Anything else (`echo:`, `busy:`, query data)
    Info,
}

/// Classify a response line, case-insensitively
pub fn classify_line(line: &str) -> LineClass {
    let lower = line.trim().to_ascii_lowercase();
    if lower.starts_with("ok") {
        LineClass::Ok
    } else if lower.contains("error") || lower.contains("resend") {
        LineClass::Failure
    } else {
        LineClass::Info
    }
}

/// Line-oriented request/acknowledgment channel over a byte stream
pub struct LineChannel<P> {
    port: P,
    pending: Vec<u8>,
    abort: Option<Arc<AtomicBool>>,
    /// Set when an exchange ended without its terminal line, so late
    /// replies may still be in flight
    stale: bool,
}

impl<P: Read + Write> LineChannel<P> {
    /// Wrap a stream
    pub fn new(port: P) -> Self {
        Self {
            port,
            pending: Vec::with_capacity(256),
            abort: None,
            stale: false,
        }
    }

    /// Abandon exchanges as soon as `flag` is raised
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Borrow the underlying stream
    pub fn get_ref(&self) -> &P {
        &self.port
    }

    /// Consume the channel, returning the stream
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Read and drop input until the stream reports no more data
    ///
    /// Returns the discarded lines.
    pub fn discard_input(&mut self) -> Result<Vec<String>, TransportError> {
        let mut chunk = [0u8; 256];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if is_idle(e.kind()) => break,
                Err(e) => return Err(io_error(e)),
            }
        }

        let mut discarded = Vec::new();
        while let Some(line) = self.take_line() {
            discarded.push(line);
        }
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
            if !rest.is_empty() {
                discarded.push(rest);
            }
            self.pending.clear();
        }
        self.stale = false;

        if !discarded.is_empty() {
            tracing::debug!("Discarded {} unsolicited line(s)", discarded.len());
        }
        Ok(discarded)
    }

    /// Write one line without waiting for a response
    pub fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');
        self.port.write_all(&framed).map_err(io_error)?;
        self.port.flush().map_err(io_error)
    }

    /// Send `line` and read responses until a terminal line or the deadline
    pub fn exchange(&mut self, line: &str, timeout: Duration) -> Result<GcodeReply, TransportError> {
        let command = line.trim().to_string();

        if self.stale {
            self.discard_input()?;
        } else {
            self.pending.clear();
        }

        tracing::debug!(command = %command, "Sending");
        self.write_line(&command)?;

        let deadline = Instant::now() + timeout;
        let mut lines = Vec::new();
        let mut chunk = [0u8; 256];

        loop {
            while let Some(received) = self.take_line() {
                tracing::trace!(command = %command, line = %received, "Received");
                match classify_line(&received) {
                    LineClass::Ok => {
                        lines.push(received);
                        return Ok(GcodeReply { command, lines });
                    }
                    LineClass::Failure => {
                        self.stale = true;
                        return Err(TransportError::Device {
                            command,
                            line: received,
                        });
                    }
                    LineClass::Info => lines.push(received),
                }
            }

            if self.is_aborted() {
                self.stale = true;
                return Err(TransportError::Aborted { command });
            }

            if Instant::now() >= deadline {
                self.stale = true;
                return Err(TransportError::Timeout {
                    command,
                    timeout_ms: timeout.as_millis() as u64,
                    received: lines,
                });
            }

            match self.port.read(&mut chunk) {
                Ok(0) => std::thread::sleep(IDLE_POLL),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if is_idle(e.kind()) => std::thread::sleep(IDLE_POLL),
                Err(e) => return Err(io_error(e)),
            }
        }
    }

    fn is_aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Pop the next complete, non-empty line from the pending buffer
    fn take_line(&mut self) -> Option<String> {
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

fn is_idle(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
    )
}

fn io_error(e: std::io::Error) -> TransportError {
    TransportError::Io {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("ok"), LineClass::Ok);
        assert_eq!(classify_line("OK T:21.0 /0.0"), LineClass::Ok);
        assert_eq!(classify_line("Error:Printer halted. kill() called!"), LineClass::Failure);
        assert_eq!(classify_line("Resend: 4"), LineClass::Failure);
        assert_eq!(classify_line("!! MAXTEMP error, system stopped"), LineClass::Failure);
        assert_eq!(classify_line("echo:busy: processing"), LineClass::Info);
        assert_eq!(classify_line("X:0.00 Y:0.00 Z:0.00 E:0.00"), LineClass::Info);
    }
}
