//! Scripted serial double used by unit and integration tests.
//!
//! Emulates a quiescent RS-485 bus: reads serve exactly the queued response
//! bytes, then park (the mock never invents data), so timeout behavior can be
//! exercised with tokio's paused clock. Every byte the driver writes is
//! recorded for frame-level assertions.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::RtuResult;
use crate::transport::SerialLink;

/// In-memory serial port double.
pub struct MockSerial {
    /// Bytes served to the driver, in order
    read_data: VecDeque<u8>,
    /// Everything the driver wrote
    written: Vec<u8>,
    /// When set, an exhausted read queue reads as end-of-stream instead of
    /// a silent (pending) bus
    eof_when_empty: bool,
    /// Number of discard_input calls observed
    input_flushes: usize,
}

impl MockSerial {
    /// Create a mock with empty buffers.
    pub fn new() -> Self {
        Self {
            read_data: VecDeque::new(),
            written: Vec::new(),
            eof_when_empty: false,
            input_flushes: 0,
        }
    }

    /// Queue response bytes to be served on subsequent reads.
    ///
    /// May be called repeatedly; responses for several transactions can be
    /// queued up front since the driver consumes exactly the bytes each
    /// transaction needs.
    pub fn queue_read_data(&mut self, data: &[u8]) {
        self.read_data.extend(data.iter().copied());
    }

    /// After the queued data is consumed, report end-of-stream instead of
    /// blocking. Simulates a link that drops mid-response.
    pub fn close_after_data(&mut self) {
        self.eof_when_empty = true;
    }

    /// Everything the driver has written so far.
    pub fn written_data(&self) -> &[u8] {
        &self.written
    }

    /// How many times the driver flushed stale input.
    pub fn input_flushes(&self) -> usize {
        self.input_flushes
    }
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for MockSerial {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.read_data.is_empty() {
            if self.eof_when_empty {
                // Zero bytes filled signals end-of-stream
                return Poll::Ready(Ok(()));
            }
            // Silent bus; callers bound every read with a timeout
            return Poll::Pending;
        }

        let count = buf.remaining().min(self.read_data.len());
        for _ in 0..count {
            let byte = self.read_data.pop_front().unwrap();
            buf.put_slice(&[byte]);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerial {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl SerialLink for MockSerial {
    fn discard_input(&mut self) -> RtuResult<()> {
        self.input_flushes += 1;
        Ok(())
    }
}
