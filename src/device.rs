//! High-level wrapper for the Maxwell MXR6020B DC-DC converter.
//!
//! [`DcConverter`] owns one [`RtuClient`] bound to one open connection and
//! exposes the device in physical units: volts and amps in, a coherent
//! [`DcStatus`] snapshot out. Unit conversion (milli-scaling, 32-bit word
//! splitting) and register-map knowledge live here; the wire mechanics stay
//! in the layers below.
//!
//! The wrapper is a two-state machine: `Disconnected` until [`connect`]
//! succeeds, `Connected` until [`close`]. Control and read operations require
//! `Connected` and fail with a configuration error otherwise, without
//! touching the line.
//!
//! [`connect`]: DcConverter::connect
//! [`close`]: DcConverter::close

use std::time::Duration;

use tokio_serial::SerialStream;
use tracing::info;

use crate::alarm;
use crate::client::RtuClient;
use crate::constants::{
    CONTROL_OUTPUT_OFF, CONTROL_OUTPUT_ON, MILLIUNITS_PER_UNIT, REG_ALARM_HI, REG_CONTROL,
    REG_POWER_ON, REG_VOLTAGE_HI,
};
use crate::error::{RtuError, RtuResult};
use crate::protocol::SlaveAddress;
use crate::transport::{RtuTransport, SerialConfig, SerialLink, TransportStats};
use crate::words::{combine_u32_be, split_u32_be};

/// Snapshot of the converter's observable state.
///
/// Constructed fresh on every [`DcConverter::read_status`] call and owned by
/// the caller; the device's own run/alarm state stays authoritative on the
/// hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct DcStatus {
    /// Register 301: output stage powered on
    pub power_on: bool,
    /// Registers 302-303, volts
    pub voltage_v: f64,
    /// Registers 304-305, amps
    pub current_a: f64,
    /// Registers 306-307, raw bitmap
    pub alarm_mask: u32,
    /// Decoded alarms, ascending bit order
    pub active_alarms: Vec<String>,
}

/// High-level control interface for one converter module.
pub struct DcConverter<L: SerialLink = SerialStream> {
    config: SerialConfig,
    client: Option<RtuClient<L>>,
}

impl DcConverter<SerialStream> {
    /// Open the serial port and bind to `slave_address` (0-62).
    ///
    /// Any prior connection is closed first, so reconnecting with different
    /// parameters never leaks a port handle.
    pub fn connect(&mut self, port: &str, slave_address: u8) -> RtuResult<()> {
        self.close();

        let address = SlaveAddress::new(slave_address)?;
        let client = RtuClient::connect(port, &self.config, address)?;

        info!("connected to {port} (slave {address})");
        self.client = Some(client);
        Ok(())
    }
}

impl<L: SerialLink> DcConverter<L> {
    /// Create a disconnected wrapper with the given per-phase response timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            config: SerialConfig {
                timeout,
                ..SerialConfig::default()
            },
            client: None,
        }
    }

    /// Bind to `slave_address` over an already-open link.
    ///
    /// Used with [`crate::mock_serial::MockSerial`] in tests and with custom
    /// link implementations; [`DcConverter::connect`] is the serial-port path.
    pub fn attach(&mut self, link: L, slave_address: u8) -> RtuResult<()> {
        self.close();

        let address = SlaveAddress::new(slave_address)?;
        let transport = RtuTransport::from_link(link, self.config.timeout);
        self.client = Some(RtuClient::new(transport, address));
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            info!("RS-485 connection closed");
        }
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Communication statistics, if connected.
    pub fn stats(&self) -> Option<TransportStats> {
        self.client.as_ref().map(|client| client.stats())
    }

    /// Enable or disable frame hex dumps on the open connection.
    pub fn set_packet_logging(&mut self, enabled: bool) {
        if let Some(client) = self.client.as_mut() {
            client.set_packet_logging(enabled);
        }
    }

    /// Access the underlying driver, if connected.
    pub fn driver_mut(&mut self) -> Option<&mut RtuClient<L>> {
        self.client.as_mut()
    }

    fn client_mut(&mut self) -> RtuResult<&mut RtuClient<L>> {
        self.client
            .as_mut()
            .ok_or_else(|| RtuError::configuration("RS-485 port is not open; call connect() first"))
    }

    /// Set the operating point and command the output on, in one atomic
    /// FC10 write spanning registers 101-105: `[1, V_hi, V_lo, I_hi, I_lo]`.
    ///
    /// Calling this while already running updates the set point without a
    /// separate stop/start; the manual defines control=1 as "stay on, adopt
    /// new set point".
    pub async fn start_output(&mut self, voltage_v: f64, current_a: f64) -> RtuResult<()> {
        let (v_hi, v_lo) = split_u32_be(to_milliunits(voltage_v, "voltage")?);
        let (i_hi, i_lo) = split_u32_be(to_milliunits(current_a, "current")?);
        let values = [CONTROL_OUTPUT_ON, v_hi, v_lo, i_hi, i_lo];

        self.client_mut()?
            .write_multiple_registers(REG_CONTROL, &values)
            .await
            .map_err(|e| RtuError::operation("set V/I and start output (registers 101-105)", e))?;

        info!("output on: {voltage_v:.3} V / {current_a:.3} A");
        Ok(())
    }

    /// Re-send the set point while the output is running.
    ///
    /// Same wire operation as [`start_output`](DcConverter::start_output);
    /// named separately for callers adjusting a live output.
    pub async fn update_setpoint(&mut self, voltage_v: f64, current_a: f64) -> RtuResult<()> {
        self.start_output(voltage_v, current_a).await
    }

    /// Command the output off (FC06, register 101 = 0).
    pub async fn stop_output(&mut self) -> RtuResult<()> {
        self.client_mut()?
            .write_single_register(REG_CONTROL, CONTROL_OUTPUT_OFF)
            .await
            .map_err(|e| RtuError::operation("stop output (register 101)", e))?;

        info!("output off");
        Ok(())
    }

    /// Read measured output voltage and current, in volts and amps.
    pub async fn read_vi(&mut self) -> RtuResult<(f64, f64)> {
        let registers = self
            .client_mut()?
            .read_holding_registers(REG_VOLTAGE_HI, 4)
            .await
            .map_err(|e| RtuError::operation("read V/I (registers 302-305)", e))?;

        let [v_hi, v_lo, i_hi, i_lo]: [u16; 4] = registers
            .try_into()
            .map_err(|_| RtuError::protocol("V/I read returned fewer than 4 registers"))?;

        Ok((
            combine_u32_be(v_hi, v_lo) as f64 / MILLIUNITS_PER_UNIT,
            combine_u32_be(i_hi, i_lo) as f64 / MILLIUNITS_PER_UNIT,
        ))
    }

    /// Read the 32-bit alarm bitmap.
    pub async fn read_alarm_mask(&mut self) -> RtuResult<u32> {
        let registers = self
            .client_mut()?
            .read_holding_registers(REG_ALARM_HI, 2)
            .await
            .map_err(|e| RtuError::operation("read alarm mask (registers 306-307)", e))?;

        let [hi, lo]: [u16; 2] = registers
            .try_into()
            .map_err(|_| RtuError::protocol("alarm read returned fewer than 2 registers"))?;

        Ok(combine_u32_be(hi, lo))
    }

    /// Read the power-on flag (register 301, nonzero = on).
    pub async fn read_power_on_flag(&mut self) -> RtuResult<bool> {
        let registers = self
            .client_mut()?
            .read_holding_registers(REG_POWER_ON, 1)
            .await
            .map_err(|e| RtuError::operation("read power flag (register 301)", e))?;

        Ok(registers.first().copied().unwrap_or(0) != 0)
    }

    /// Read power flag, V/I and alarms sequentially and aggregate them.
    ///
    /// The three reads are separate bus transactions, so the snapshot is not
    /// atomic against the device. A failed sub-read is surfaced as an error
    /// naming the register block; no field is silently substituted with zero.
    pub async fn read_status(&mut self) -> RtuResult<DcStatus> {
        let power_on = self.read_power_on_flag().await?;
        let (voltage_v, current_a) = self.read_vi().await?;
        let alarm_mask = self.read_alarm_mask().await?;

        Ok(DcStatus {
            power_on,
            voltage_v,
            current_a,
            alarm_mask,
            active_alarms: alarm::decode_alarms(alarm_mask),
        })
    }

    /// Decode an alarm bitmap into human-readable findings.
    pub fn decode_alarms(&self, mask: u32) -> Vec<String> {
        alarm::decode_alarms(mask)
    }
}

/// Convert a physical value (V or A) to wire milli-units with rounding.
fn to_milliunits(value: f64, quantity: &str) -> RtuResult<u32> {
    let scaled = (value * MILLIUNITS_PER_UNIT).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u32::MAX as f64 {
        return Err(RtuError::configuration(format!(
            "{quantity} value {value} is out of range"
        )));
    }
    Ok(scaled as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock_serial::MockSerial;

    fn connected(mock: MockSerial) -> DcConverter<MockSerial> {
        let mut dc = DcConverter::new(Duration::from_millis(100));
        dc.attach(mock, 1).unwrap();
        dc
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut dc: DcConverter<MockSerial> = DcConverter::new(Duration::from_millis(100));
        assert!(!dc.is_connected());

        let err = dc.start_output(48.0, 10.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = dc.read_status().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_attach_rejects_invalid_slave_address() {
        let mut dc: DcConverter<MockSerial> = DcConverter::new(Duration::from_millis(100));
        let err = dc.attach(MockSerial::new(), 63).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!dc.is_connected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut dc = connected(MockSerial::new());
        assert!(dc.is_connected());

        dc.close();
        assert!(!dc.is_connected());
        dc.close();
        assert!(!dc.is_connected());
    }

    #[tokio::test]
    async fn test_start_output_writes_control_block() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(&[0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x10, 0x15]);
        let mut dc = connected(mock);

        dc.start_output(48.0, 10.0).await.unwrap();

        // FC10 at register 101 with values [1, 0, 48000, 0, 10000]
        let client = dc.client.as_mut().unwrap();
        assert_eq!(
            client.transport_mut().link_mut().written_data(),
            &[
                0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x0A, 0x00, 0x01, 0x00, 0x00, 0xBB, 0x80,
                0x00, 0x00, 0x27, 0x10, 0x69, 0xA4
            ]
        );
    }

    #[tokio::test]
    async fn test_start_output_rejects_negative_setpoint() {
        let mut dc = connected(MockSerial::new());

        let err = dc.start_output(-1.0, 10.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_stop_output_writes_control_zero() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(&[0x01, 0x06, 0x00, 0x65, 0x00, 0x00, 0x99, 0xD5]);
        let mut dc = connected(mock);

        dc.stop_output().await.unwrap();

        let client = dc.client.as_mut().unwrap();
        assert_eq!(
            client.transport_mut().link_mut().written_data(),
            &[0x01, 0x06, 0x00, 0x65, 0x00, 0x00, 0x99, 0xD5]
        );
    }

    #[tokio::test]
    async fn test_read_vi_converts_milliunits() {
        let mut mock = MockSerial::new();
        // 12000 mV, 10000 mA across registers 302-305
        mock.queue_read_data(&[
            0x01, 0x03, 0x08, 0x00, 0x00, 0x2E, 0xE0, 0x00, 0x00, 0x27, 0x10, 0x08, 0x73,
        ]);
        let mut dc = connected(mock);

        let (voltage_v, current_a) = dc.read_vi().await.unwrap();
        assert_eq!(voltage_v, 12.0);
        assert_eq!(current_a, 10.0);
    }

    #[tokio::test]
    async fn test_read_status_aggregates_all_blocks() {
        let mut mock = MockSerial::new();
        // Power flag on
        mock.queue_read_data(&[0x01, 0x03, 0x02, 0x00, 0x01, 0x79, 0x84]);
        // 12 V / 10 A
        mock.queue_read_data(&[
            0x01, 0x03, 0x08, 0x00, 0x00, 0x2E, 0xE0, 0x00, 0x00, 0x27, 0x10, 0x08, 0x73,
        ]);
        // Alarm bits 0 and 17
        mock.queue_read_data(&[0x01, 0x03, 0x04, 0x00, 0x02, 0x00, 0x01, 0x9A, 0x33]);
        let mut dc = connected(mock);

        let status = dc.read_status().await.unwrap();
        assert!(status.power_on);
        assert_eq!(status.voltage_v, 12.0);
        assert_eq!(status.current_a, 10.0);
        assert_eq!(status.alarm_mask, 0x0002_0001);
        assert_eq!(
            status.active_alarms,
            vec![
                "bit0: Power failure".to_string(),
                "bit17: Output overvoltage".to_string()
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_status_names_failed_block() {
        let mut mock = MockSerial::new();
        // Power flag answers, then the bus goes silent for the V/I read
        mock.queue_read_data(&[0x01, 0x03, 0x02, 0x00, 0x01, 0x79, 0x84]);
        let mut dc = connected(mock);

        let err = dc.read_status().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Communication);
        assert!(err.to_string().contains("302-305"));
    }

    #[test]
    fn test_to_milliunits_rounding() {
        assert_eq!(to_milliunits(48.0, "voltage").unwrap(), 48_000);
        assert_eq!(to_milliunits(12.3456, "voltage").unwrap(), 12_346);
        assert_eq!(to_milliunits(0.4, "current").unwrap(), 400);
        assert!(to_milliunits(f64::NAN, "voltage").is_err());
        assert!(to_milliunits(-0.001, "current").is_err());
    }
}
