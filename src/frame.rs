//! RTU frame construction and CRC16 validation.
//!
//! An RTU request frame is built into a fixed-size stack buffer to avoid heap
//! allocation on the hot path. The CRC trailer is appended by the transport
//! just before the frame hits the wire; incoming frames are checked with
//! [`check_crc`] before any field is interpreted.

use crc::{Crc, CRC_16_MODBUS};

use crate::constants::{
    CRC_LEN, FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
    MAX_ADU_SIZE,
};
use crate::error::{RtuError, RtuResult};

/// CRC calculator for Modbus RTU (poly 0xA001, init 0xFFFF, reflected)
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the Modbus CRC16 over a byte sequence.
///
/// Used identically for generating outgoing trailers and validating incoming
/// ones. The 16-bit result is transmitted low byte first.
///
/// # Example
///
/// ```rust
/// use maxwell_rtu::frame::crc16;
///
/// let crc = crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]);
/// assert_eq!(crc.to_le_bytes(), [0xC5, 0xCD]);
/// ```
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Verify the CRC trailer of a complete received frame.
///
/// The CRC covers every byte except the trailing two.
pub fn check_crc(frame: &[u8]) -> RtuResult<()> {
    if frame.len() < CRC_LEN + 2 {
        return Err(RtuError::ShortResponse {
            expected: CRC_LEN + 2,
            actual: frame.len(),
        });
    }

    let body_len = frame.len() - CRC_LEN;
    let received = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);
    let calculated = crc16(&frame[..body_len]);

    if received != calculated {
        return Err(RtuError::CrcMismatch {
            calculated,
            received,
        });
    }

    Ok(())
}

/// Request frame under construction, CRC not yet appended.
///
/// Backed by a fixed-size buffer; the ADU of every request this crate issues
/// is far below [`MAX_ADU_SIZE`], so capacity errors only indicate a bug in
/// the builder functions below.
#[derive(Debug, Clone)]
pub struct RtuFrame {
    data: [u8; MAX_ADU_SIZE],
    len: usize,
}

impl RtuFrame {
    /// Create an empty frame.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_ADU_SIZE],
            len: 0,
        }
    }

    /// Push a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) -> RtuResult<()> {
        if self.len + CRC_LEN >= MAX_ADU_SIZE {
            return Err(RtuError::protocol("frame buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push a u16 in big-endian byte order.
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> RtuResult<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)?;
        Ok(())
    }

    /// Get the frame contents (without CRC).
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Current length (without CRC).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for RtuFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an FC03 read request: `[address, 0x03, start, quantity]`.
pub fn read_request(slave_address: u8, start: u16, quantity: u16) -> RtuResult<RtuFrame> {
    let mut frame = RtuFrame::new();
    frame.push(slave_address)?;
    frame.push(FC_READ_HOLDING_REGISTERS)?;
    frame.push_u16(start)?;
    frame.push_u16(quantity)?;
    Ok(frame)
}

/// Build an FC06 write request: `[address, 0x06, register, value]`.
pub fn write_single_request(slave_address: u8, register: u16, value: u16) -> RtuResult<RtuFrame> {
    let mut frame = RtuFrame::new();
    frame.push(slave_address)?;
    frame.push(FC_WRITE_SINGLE_REGISTER)?;
    frame.push_u16(register)?;
    frame.push_u16(value)?;
    Ok(frame)
}

/// Build an FC10 write request:
/// `[address, 0x10, start, quantity, byte_count, values...]`.
pub fn write_multiple_request(
    slave_address: u8,
    start: u16,
    values: &[u16],
) -> RtuResult<RtuFrame> {
    let mut frame = RtuFrame::new();
    frame.push(slave_address)?;
    frame.push(FC_WRITE_MULTIPLE_REGISTERS)?;
    frame.push_u16(start)?;
    frame.push_u16(values.len() as u16)?;
    frame.push((values.len() * 2) as u8)?;
    for &value in values {
        frame.push_u16(value)?;
    }
    Ok(frame)
}
