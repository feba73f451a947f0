//! Protocol constants for the MXR6020B RS-485 interface.
//!
//! Register addresses and transaction limits come from the
//! "MXR6020B RS485 Communication Protocol" manual (V1.01.01); frame size
//! constants are derived from the Modbus RTU specification.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum ADU (Application Data Unit) size for Modbus RTU
/// Format: Slave Address (1) + PDU (up to 253) + CRC (2) = 256 bytes
pub const MAX_ADU_SIZE: usize = 256;

/// CRC trailer length (low byte first on the wire)
pub const CRC_LEN: usize = 2;

/// Fixed header read for an FC03 response: address + function + byte count
pub const READ_RESPONSE_HEADER_LEN: usize = 3;

/// Fixed total length of an FC06/FC10 echo response
/// Format: address (1) + function (1) + register/start (2) + value/quantity (2) + CRC (2)
pub const ECHO_RESPONSE_LEN: usize = 8;

/// Exception response length: address (1) + function|0x80 (1) + code (1) + CRC (2)
pub const EXCEPTION_RESPONSE_LEN: usize = 5;

// ============================================================================
// Transaction Limits
// ============================================================================

/// Maximum registers per FC03 read transaction
///
/// The MXR6020B manual limits register block size per transaction to 30,
/// well below the 125 allowed by the Modbus specification. Enforcing it
/// locally prevents building frames the device would reject or mis-parse.
pub const MAX_REGISTERS_PER_READ: u16 = 30;

/// Maximum registers per FC10 write transaction (same manual limit)
pub const MAX_REGISTERS_PER_WRITE: u16 = 30;

/// Highest valid RS-485 slave address for this device family
pub const MAX_SLAVE_ADDRESS: u8 = 62;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Exception flag bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Serial Line Defaults (fixed by the device: 9600 baud, 8N1)
// ============================================================================

/// Fixed baud rate of the MXR6020B RS-485 port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default response timeout per read phase, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Register Map (decimal addresses, per manual)
// ============================================================================

/// Control register: 1 = output on (adopt set point), 0 = output off
pub const REG_CONTROL: u16 = 101;

/// Set-voltage high word (millivolts, INT32 across 102-103)
pub const REG_SET_VOLTAGE_HI: u16 = 102;

/// Set-voltage low word
pub const REG_SET_VOLTAGE_LO: u16 = 103;

/// Set-current high word (milliamps, INT32 across 104-105)
pub const REG_SET_CURRENT_HI: u16 = 104;

/// Set-current low word
pub const REG_SET_CURRENT_LO: u16 = 105;

/// Read-only power flag: 0 = shutdown, nonzero = power on
pub const REG_POWER_ON: u16 = 301;

/// Measured voltage high word (millivolts, INT32 across 302-303)
pub const REG_VOLTAGE_HI: u16 = 302;

/// Measured voltage low word
pub const REG_VOLTAGE_LO: u16 = 303;

/// Measured current high word (milliamps, INT32 across 304-305)
pub const REG_CURRENT_HI: u16 = 304;

/// Measured current low word
pub const REG_CURRENT_LO: u16 = 305;

/// Alarm bitmap high word (UINT32 across 306-307)
pub const REG_ALARM_HI: u16 = 306;

/// Alarm bitmap low word
pub const REG_ALARM_LO: u16 = 307;

// ============================================================================
// Control Register Values
// ============================================================================

/// Control value: output on; re-sending keeps the output on with new set point
pub const CONTROL_OUTPUT_ON: u16 = 1;

/// Control value: output off
pub const CONTROL_OUTPUT_OFF: u16 = 0;

/// Scale factor between physical units (V, A) and wire units (mV, mA)
pub const MILLIUNITS_PER_UNIT: f64 = 1000.0;
