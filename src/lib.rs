//! # Maxwell RTU - MXR6020B DC-DC Converter Control
//!
//! An async Modbus RTU driver for controlling Maxwell MXR6020B DC-DC
//! converter modules over a shared RS-485 bus, built on Tokio.
//!
//! ## Features
//!
//! - **Byte-exact framing**: two-phase, timeout-bounded response acquisition
//!   that never over-reads a shared half-duplex bus
//! - **Full validation**: CRC16, echoed address, function code and byte count
//!   checked before any value is returned
//! - **Typed failures**: configuration, communication and protocol errors are
//!   distinct, inspectable kinds instead of stringly-typed failures
//! - **Physical units**: the device wrapper speaks volts and amps and hides
//!   the milli-scaled 32-bit register encoding
//! - **Testable to the byte**: generic over the serial link, with a scripted
//!   mock for driving the whole stack without hardware
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Used for |
//! |------|----------|----------|
//! | 0x03 | Read Holding Registers | power flag, V/I, alarm bitmap |
//! | 0x06 | Write Single Register | stop command |
//! | 0x10 | Write Multiple Registers | atomic set-point + start |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use maxwell_rtu::{DcConverter, RtuResult};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> RtuResult<()> {
//!     let mut dc = DcConverter::new(Duration::from_millis(500));
//!     dc.connect("/dev/ttyUSB0", 1)?;
//!
//!     // Set 48.0 V / 10.0 A and switch the output on, atomically
//!     dc.start_output(48.0, 10.0).await?;
//!
//!     let status = dc.read_status().await?;
//!     println!(
//!         "power_on={} {:.3} V / {:.3} A alarms={:?}",
//!         status.power_on, status.voltage_v, status.current_a, status.active_alarms
//!     );
//!
//!     dc.stop_output().await?;
//!     dc.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Bus Discipline
//!
//! RS-485 is half-duplex and shared: at most one request/response exchange
//! may be in flight per connection. All operations take `&mut self`, which
//! enforces serialization for a single owner; wrap the driver in a mutex if
//! several tasks must share one connection.

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Protocol constants: register map, limits, serial defaults
pub mod constants;

/// RTU frame construction and CRC16 validation
pub mod frame;

/// Function codes, slave addressing, exception decoding
pub mod protocol;

/// 16-bit word packing for multi-register values
pub mod words;

/// Serial transport: byte-exact, timeout-bounded frame exchange
pub mod transport;

/// Modbus RTU driver (FC03 / FC06 / FC10)
pub mod client;

/// High-level converter wrapper and status aggregation
pub mod device;

/// Alarm bitmap decoding
pub mod alarm;

/// Scripted serial double for tests
pub mod mock_serial;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use maxwell_rtu::tokio) ===
pub use tokio;

// === High-level device API ===
pub use device::{DcConverter, DcStatus};

// === Driver API ===
pub use client::RtuClient;

// === Error handling ===
pub use error::{ErrorKind, RtuError, RtuResult};

// === Core types ===
pub use protocol::{ModbusFunction, SlaveAddress};
pub use transport::{RtuTransport, SerialConfig, SerialLink, TransportStats};

// === Alarm decoding ===
pub use alarm::decode_alarms;

// === Protocol limits (commonly needed constants) ===
pub use constants::{MAX_REGISTERS_PER_READ, MAX_REGISTERS_PER_WRITE, MAX_SLAVE_ADDRESS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
