//! Modbus RTU driver: the three function codes the MXR6020B speaks.
//!
//! Each operation is a single blocking request/response round trip with no
//! internal retry. Responses are validated in full before any value is
//! returned: CRC over every byte except the trailing two, echoed slave
//! address, function code, and (for FC03) the declared byte count.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use maxwell_rtu::{RtuClient, SerialConfig, SlaveAddress, RtuResult};
//!
//! #[tokio::main]
//! async fn main() -> RtuResult<()> {
//!     let config = SerialConfig::default();
//!     let mut client = RtuClient::connect("/dev/ttyUSB0", &config, SlaveAddress::new(1)?)?;
//!
//!     // Poll measured voltage/current (registers 302-305)
//!     let registers = client.read_holding_registers(302, 4).await?;
//!     println!("raw registers: {registers:?}");
//!
//!     // Stop the output
//!     client.write_single_register(101, 0).await?;
//!     Ok(())
//! }
//! ```

use tokio_serial::SerialStream;

use crate::constants::{
    CRC_LEN, ECHO_RESPONSE_LEN, EXCEPTION_FLAG, EXCEPTION_RESPONSE_LEN, MAX_REGISTERS_PER_READ,
    MAX_REGISTERS_PER_WRITE, READ_RESPONSE_HEADER_LEN,
};
use crate::error::{RtuError, RtuResult};
use crate::frame::{self, check_crc};
use crate::protocol::{exception_description, ModbusFunction, SlaveAddress};
use crate::transport::{RtuTransport, SerialConfig, SerialLink, TransportStats};
use crate::words;

/// Modbus RTU driver bound to one slave address on one serial connection.
pub struct RtuClient<L: SerialLink = SerialStream> {
    transport: RtuTransport<L>,
    address: SlaveAddress,
}

impl RtuClient<SerialStream> {
    /// Open a serial port and bind a driver to `address`.
    pub fn connect(port: &str, config: &SerialConfig, address: SlaveAddress) -> RtuResult<Self> {
        Ok(Self::new(RtuTransport::open(port, config)?, address))
    }
}

impl<L: SerialLink> RtuClient<L> {
    /// Build a driver over an existing transport.
    pub fn new(transport: RtuTransport<L>, address: SlaveAddress) -> Self {
        Self { transport, address }
    }

    /// The slave address this driver talks to.
    pub fn slave_address(&self) -> SlaveAddress {
        self.address
    }

    /// Communication statistics for this connection.
    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Enable or disable frame hex dumps.
    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.transport.set_packet_logging(enabled);
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut RtuTransport<L> {
        &mut self.transport
    }

    /// Read holding registers (FC03).
    ///
    /// `quantity` must be 1-30 (device manual limit per transaction).
    /// Returns `quantity` 16-bit values, most-significant register first.
    pub async fn read_holding_registers(
        &mut self,
        start: u16,
        quantity: u16,
    ) -> RtuResult<Vec<u16>> {
        if quantity == 0 || quantity > MAX_REGISTERS_PER_READ {
            return Err(RtuError::configuration(format!(
                "read quantity {quantity} out of range 1-{MAX_REGISTERS_PER_READ}"
            )));
        }

        let request = frame::read_request(self.address.get(), start, quantity)?;
        self.transport.send_frame(&request).await?;

        // Phase 1: fixed header [address, function, byte_count]
        let deadline = self.transport.response_timeout();
        let head = self
            .transport
            .read_exact(READ_RESPONSE_HEADER_LEN, "read response header", deadline)
            .await?;

        if head[1] & EXCEPTION_FLAG != 0 {
            return Err(self.read_exception_trailer(&head).await);
        }

        // Phase 2: declared data plus CRC, and not a byte more
        let byte_count = head[2] as usize;
        let rest = self
            .transport
            .read_exact(byte_count + CRC_LEN, "read response data", deadline)
            .await?;

        let mut full = Vec::with_capacity(head.len() + rest.len());
        full.extend_from_slice(&head);
        full.extend_from_slice(&rest);
        check_crc(&full)?;

        self.check_response_header(head[0], head[1], ModbusFunction::ReadHoldingRegisters)?;
        if byte_count != quantity as usize * 2 {
            return Err(RtuError::protocol(format!(
                "byte count mismatch: expected {}, got {}",
                quantity * 2,
                byte_count
            )));
        }

        self.transport.record_response();
        words::registers_from_bytes(&rest[..byte_count])
    }

    /// Write a single register (FC06).
    ///
    /// The device echoes the write; nothing is decoded beyond validation.
    pub async fn write_single_register(&mut self, register: u16, value: u16) -> RtuResult<()> {
        let request = frame::write_single_request(self.address.get(), register, value)?;
        self.transport.send_frame(&request).await?;
        self.read_write_echo(ModbusFunction::WriteSingleRegister).await
    }

    /// Write a block of registers (FC10).
    ///
    /// `values` must hold 1-30 registers (device manual limit per
    /// transaction). The device echoes address, function, start and quantity.
    pub async fn write_multiple_registers(&mut self, start: u16, values: &[u16]) -> RtuResult<()> {
        let quantity = values.len();
        if quantity == 0 || quantity > MAX_REGISTERS_PER_WRITE as usize {
            return Err(RtuError::configuration(format!(
                "write quantity {quantity} out of range 1-{MAX_REGISTERS_PER_WRITE}"
            )));
        }

        let request = frame::write_multiple_request(self.address.get(), start, values)?;
        self.transport.send_frame(&request).await?;
        self.read_write_echo(ModbusFunction::WriteMultipleRegisters)
            .await
    }

    /// Acquire and validate the fixed 8-byte echo of an FC06/FC10 write.
    async fn read_write_echo(&mut self, function: ModbusFunction) -> RtuResult<()> {
        let deadline = self.transport.response_timeout();
        let echo = self
            .transport
            .read_exact(ECHO_RESPONSE_LEN, "read write echo", deadline)
            .await?;

        check_crc(&echo)?;
        self.check_response_header(echo[0], echo[1], function)?;

        self.transport.record_response();
        Ok(())
    }

    /// Consume the CRC trailer of an exception response and turn it into an
    /// error.
    ///
    /// The exception code sits where a normal FC03 response carries its byte
    /// count, so the two remaining bytes on the wire are the CRC; reading
    /// them keeps the line in sync for the next transaction.
    async fn read_exception_trailer(&mut self, head: &[u8]) -> RtuError {
        let deadline = self.transport.response_timeout();
        let trailer = match self
            .transport
            .read_exact(
                EXCEPTION_RESPONSE_LEN - READ_RESPONSE_HEADER_LEN,
                "read exception trailer",
                deadline,
            )
            .await
        {
            Ok(trailer) => trailer,
            Err(e) => return e,
        };

        let mut full = head.to_vec();
        full.extend_from_slice(&trailer);
        if let Err(e) = check_crc(&full) {
            return e;
        }

        let code = head[2];
        RtuError::Exception {
            function: head[1] & !EXCEPTION_FLAG,
            code,
            description: exception_description(code),
        }
    }

    fn check_response_header(
        &self,
        address: u8,
        function_byte: u8,
        expected: ModbusFunction,
    ) -> RtuResult<()> {
        if address != self.address.get() {
            return Err(RtuError::protocol(format!(
                "response address mismatch: expected {}, got {}",
                self.address, address
            )));
        }
        if function_byte != expected.to_u8() {
            return Err(RtuError::protocol(format!(
                "response function mismatch: expected {expected}, got {function_byte:#04X}"
            )));
        }
        Ok(())
    }
}
