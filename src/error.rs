//! Core error types and result handling.
//!
//! Every fallible operation in this crate returns [`RtuResult`]. The error
//! variants are deliberately fine-grained (CRC mismatch, short read, timeout,
//! ...) so that log output stays precise, while [`RtuError::kind`] collapses
//! them onto three coarse categories callers can branch on:
//!
//! | [`ErrorKind`] | Meaning |
//! |---------------|---------|
//! | `Configuration` | The caller built an invalid request or used the API while disconnected |
//! | `Communication` | The serial line failed: port open error, timeout, short or broken read |
//! | `Protocol` | The device answered, but the frame is inconsistent: bad CRC, wrong address/function/length, exception |

use thiserror::Error;

/// Result type used throughout the crate.
pub type RtuResult<T> = Result<T, RtuError>;

/// Coarse error category, mirroring how callers are expected to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid parameters or API misuse; no I/O was attempted.
    Configuration,
    /// The serial line failed before a complete frame arrived.
    Communication,
    /// A complete-looking frame arrived but failed validation.
    Protocol,
}

/// Errors raised by the RS-485 transport, the RTU driver and the device wrapper.
#[derive(Error, Debug)]
pub enum RtuError {
    /// Invalid parameters (slave address, register count) or operation while disconnected.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The serial port could not be opened.
    #[error("failed to open serial port {port}: {message}")]
    PortOpen { port: String, message: String },

    /// Low-level serial read/write failure.
    #[error("serial I/O error: {message}")]
    Io { message: String },

    /// A read phase did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The stream ended before the expected number of bytes arrived.
    #[error("short response: expected {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    /// The received CRC trailer does not match the frame contents.
    #[error("CRC mismatch: calculated {calculated:#06X}, received {received:#06X}")]
    CrcMismatch { calculated: u16, received: u16 },

    /// The device answered with a Modbus exception frame.
    #[error("device exception for function {function:#04X}: {description} (code {code:#04X})")]
    Exception {
        function: u8,
        code: u8,
        description: &'static str,
    },

    /// The response echo does not match the request (address, function, byte count).
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// A higher-level operation failed; wraps the underlying error with context.
    #[error("{operation} failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<RtuError>,
    },
}

impl RtuError {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a port-open error.
    pub fn port_open<P: Into<String>, S: Into<String>>(port: P, message: S) -> Self {
        Self::PortOpen {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a serial I/O error.
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a protocol error.
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Wrap an error with the logical operation that was being attempted.
    pub fn operation<S: Into<String>>(operation: S, source: RtuError) -> Self {
        Self::Operation {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// The coarse category of this error.
    ///
    /// Wrapped errors report the category of the underlying failure, so a
    /// timeout inside `read_status` still reads as `Communication`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::PortOpen { .. }
            | Self::Io { .. }
            | Self::Timeout { .. }
            | Self::ShortResponse { .. } => ErrorKind::Communication,
            Self::CrcMismatch { .. } | Self::Exception { .. } | Self::Protocol { .. } => {
                ErrorKind::Protocol
            }
            Self::Operation { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RtuError::configuration("bad address").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            RtuError::timeout("read response header", 1000).kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            RtuError::ShortResponse {
                expected: 8,
                actual: 3
            }
            .kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            RtuError::CrcMismatch {
                calculated: 0xCDC5,
                received: 0x0000
            }
            .kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn test_operation_context_preserves_kind() {
        let inner = RtuError::timeout("read response data", 500);
        let wrapped = RtuError::operation("read V/I (registers 302-305)", inner);

        assert_eq!(wrapped.kind(), ErrorKind::Communication);
        let text = wrapped.to_string();
        assert!(text.contains("read V/I"));
        assert!(text.contains("timed out"));
    }
}
