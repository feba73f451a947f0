//! Modbus protocol definitions for the subset the MXR6020B speaks.
//!
//! The device uses exactly three function codes: FC03 to poll state, FC06 for
//! the stop command and FC10 for the atomic set-point-and-start write.

use std::fmt;

use crate::constants::MAX_SLAVE_ADDRESS;
use crate::error::{RtuError, RtuResult};

/// Modbus function codes supported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
}

impl ModbusFunction {
    /// Convert from the wire byte.
    pub fn from_u8(value: u8) -> RtuResult<Self> {
        match value {
            0x03 => Ok(ModbusFunction::ReadHoldingRegisters),
            0x06 => Ok(ModbusFunction::WriteSingleRegister),
            0x10 => Ok(ModbusFunction::WriteMultipleRegisters),
            _ => Err(RtuError::protocol(format!(
                "unsupported function code {value:#04X}"
            ))),
        }
    }

    /// Convert to the wire byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusFunction::ReadHoldingRegisters => "Read Holding Registers",
            ModbusFunction::WriteSingleRegister => "Write Single Register",
            ModbusFunction::WriteMultipleRegisters => "Write Multiple Registers",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// Validated RS-485 slave address (0-62 for this device family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlaveAddress(u8);

impl SlaveAddress {
    /// Create a slave address, rejecting values above [`MAX_SLAVE_ADDRESS`].
    pub fn new(address: u8) -> RtuResult<Self> {
        if address > MAX_SLAVE_ADDRESS {
            return Err(RtuError::configuration(format!(
                "slave address {address} out of range 0-{MAX_SLAVE_ADDRESS}"
            )));
        }
        Ok(Self(address))
    }

    /// The raw address byte.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable description for a Modbus exception code.
pub fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "server device failure",
        0x05 => "acknowledge",
        0x06 => "server device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target device failed to respond",
        _ => "unknown exception",
    }
}
