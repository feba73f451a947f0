//! Serial transport layer for Modbus RTU communication.
//!
//! The transport owns the serial handle and the byte-level request/response
//! mechanics: it appends the CRC trailer, flushes stale input, writes the
//! frame and acquires the response with byte-exact, timeout-bounded reads.
//!
//! Reading byte-exact matters on a shared RS-485 bus: the line may already
//! carry a subsequent, unrelated frame, and reading "whatever is available"
//! would desynchronize framing for the next transaction. Every read phase
//! therefore asks for an exact count and fails with a communication error if
//! the count does not arrive within the timeout.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};
use tracing::debug;

use crate::constants::{CRC_LEN, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use crate::error::{RtuError, RtuResult};
use crate::frame::{crc16, RtuFrame};

/// Serial line parameters. The MXR6020B is fixed at 9600 baud, 8N1.
///
/// Immutable once a connection is opened; changing parameters requires
/// closing and reopening the port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    /// Response timeout per read phase.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Byte stream with the extra capability of dropping stale input.
///
/// Implemented by [`SerialStream`] for real hardware and by
/// [`crate::mock_serial::MockSerial`] in tests.
pub trait SerialLink: AsyncRead + AsyncWrite + Unpin + Send {
    /// Discard any unread bytes buffered by the driver.
    fn discard_input(&mut self) -> RtuResult<()>;
}

impl SerialLink for SerialStream {
    fn discard_input(&mut self) -> RtuResult<()> {
        self.clear(ClearBuffer::Input)
            .map_err(|e| RtuError::io(format!("failed to flush input buffer: {e}")))
    }
}

/// Transport layer statistics.
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Format raw bytes as a hex string for frame logging.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Modbus RTU transport over a serial link.
///
/// One transport owns one serial handle; at most one request/response
/// exchange may be in flight at a time, which the `&mut self` receivers
/// enforce at compile time for a single owner. Sharing a transport across
/// tasks requires external serialization (e.g. a mutex around the whole
/// driver).
pub struct RtuTransport<L: SerialLink = SerialStream> {
    link: L,
    response_timeout: Duration,
    stats: TransportStats,
    /// Enable frame hex dumps for debugging
    packet_logging: bool,
}

impl RtuTransport<SerialStream> {
    /// Open a serial port and build a transport on it.
    pub fn open(port: &str, config: &SerialConfig) -> RtuResult<Self> {
        let builder = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity)
            .timeout(config.timeout);

        let link = SerialStream::open(&builder)
            .map_err(|e| RtuError::port_open(port, e.to_string()))?;

        debug!(
            "RS485 open: port={}, baud={}, timeout={:?}",
            port, config.baud_rate, config.timeout
        );

        Ok(Self::from_link(link, config.timeout))
    }
}

impl<L: SerialLink> RtuTransport<L> {
    /// Build a transport over an already-open link.
    pub fn from_link(link: L, response_timeout: Duration) -> Self {
        Self {
            link,
            response_timeout,
            stats: TransportStats::default(),
            packet_logging: false,
        }
    }

    /// Enable or disable frame hex dumps via `tracing`.
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.packet_logging = enabled;
    }

    /// The configured per-phase response timeout.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Communication statistics for this connection.
    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }

    /// Access the underlying link (used by tests to inspect written frames).
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub(crate) fn record_response(&mut self) {
        self.stats.responses_received += 1;
    }

    /// Append the CRC trailer to a request frame and write it to the line.
    ///
    /// Any input already buffered by the driver is discarded first; it can
    /// only be a stale remnant of an earlier, failed exchange.
    pub async fn send_frame(&mut self, frame: &RtuFrame) -> RtuResult<()> {
        let payload = frame.as_slice();
        let crc = crc16(payload);

        let mut wire = Vec::with_capacity(payload.len() + CRC_LEN);
        wire.extend_from_slice(payload);
        wire.extend_from_slice(&crc.to_le_bytes());

        self.link.discard_input()?;

        if self.packet_logging {
            debug!(">> RS485 {}", format_hex(&wire));
        }

        match timeout(self.response_timeout, self.link.write_all(&wire)).await {
            Ok(Ok(())) => {
                let _ = timeout(self.response_timeout, self.link.flush()).await;
            }
            Ok(Err(e)) => {
                self.stats.errors += 1;
                return Err(RtuError::io(format!("failed to send frame: {e}")));
            }
            Err(_) => {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(RtuError::timeout(
                    "send request",
                    self.response_timeout.as_millis() as u64,
                ));
            }
        }

        self.stats.requests_sent += 1;
        self.stats.bytes_sent += wire.len() as u64;
        Ok(())
    }

    /// Read exactly `count` bytes within `deadline`.
    ///
    /// Never reads beyond `count`. Fails with a timeout error when the
    /// deadline elapses, or a short-response error if the stream ends first.
    pub async fn read_exact(
        &mut self,
        count: usize,
        operation: &str,
        deadline: Duration,
    ) -> RtuResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let mut filled = 0usize;
        let deadline_at = Instant::now() + deadline;

        while filled < count {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.stats.timeouts += 1;
                self.stats.errors += 1;
                return Err(RtuError::timeout(operation, deadline.as_millis() as u64));
            }

            match timeout(remaining, self.link.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => {
                    self.stats.errors += 1;
                    return Err(RtuError::ShortResponse {
                        expected: count,
                        actual: filled,
                    });
                }
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => {
                    self.stats.errors += 1;
                    return Err(RtuError::io(format!("serial read error: {e}")));
                }
                Err(_) => {
                    self.stats.timeouts += 1;
                    self.stats.errors += 1;
                    return Err(RtuError::timeout(operation, deadline.as_millis() as u64));
                }
            }
        }

        self.stats.bytes_received += count as u64;

        if self.packet_logging {
            debug!("<< RS485 {}", format_hex(&buf));
        }

        Ok(buf)
    }
}
