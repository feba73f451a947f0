//! Full-stack session tests: device wrapper -> driver -> transport -> scripted
//! serial link, asserting the exact bytes that would hit the RS-485 bus.

use std::time::Duration;

use maxwell_rtu::mock_serial::MockSerial;
use maxwell_rtu::{DcConverter, ErrorKind, RtuError};

fn converter_with(mock: MockSerial) -> DcConverter<MockSerial> {
    let mut dc = DcConverter::new(Duration::from_millis(100));
    dc.attach(mock, 1).unwrap();
    dc
}

#[tokio::test]
async fn full_session_produces_expected_byte_stream() {
    let mut mock = MockSerial::new();

    // Echo for the FC10 set-point-and-start write
    mock.queue_read_data(&[0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x10, 0x15]);
    // Power flag (register 301): on
    mock.queue_read_data(&[0x01, 0x03, 0x02, 0x00, 0x01, 0x79, 0x84]);
    // V/I (registers 302-305): 12.000 V / 10.000 A
    mock.queue_read_data(&[
        0x01, 0x03, 0x08, 0x00, 0x00, 0x2E, 0xE0, 0x00, 0x00, 0x27, 0x10, 0x08, 0x73,
    ]);
    // Alarm bitmap (registers 306-307): clear
    mock.queue_read_data(&[0x01, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00, 0xFA, 0x33]);
    // Echo for the FC06 stop write
    mock.queue_read_data(&[0x01, 0x06, 0x00, 0x65, 0x00, 0x00, 0x99, 0xD5]);

    let mut dc = converter_with(mock);

    dc.start_output(48.0, 10.0).await.unwrap();

    let status = dc.read_status().await.unwrap();
    assert!(status.power_on);
    assert_eq!(status.voltage_v, 12.0);
    assert_eq!(status.current_a, 10.0);
    assert_eq!(status.alarm_mask, 0);
    assert!(status.active_alarms.is_empty());

    dc.stop_output().await.unwrap();

    // Every request frame, in order, byte for byte
    let mut expected: Vec<u8> = Vec::new();
    // FC10: control block [1, V_hi, V_lo, I_hi, I_lo] at register 101
    expected.extend_from_slice(&[
        0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x0A, 0x00, 0x01, 0x00, 0x00, 0xBB, 0x80, 0x00, 0x00,
        0x27, 0x10, 0x69, 0xA4,
    ]);
    // FC03: power flag at 301
    expected.extend_from_slice(&[0x01, 0x03, 0x01, 0x2D, 0x00, 0x01, 0x15, 0xFF]);
    // FC03: V/I block at 302
    expected.extend_from_slice(&[0x01, 0x03, 0x01, 0x2E, 0x00, 0x04, 0x25, 0xFC]);
    // FC03: alarm block at 306
    expected.extend_from_slice(&[0x01, 0x03, 0x01, 0x32, 0x00, 0x02, 0x64, 0x38]);
    // FC06: control register 101 = 0
    expected.extend_from_slice(&[0x01, 0x06, 0x00, 0x65, 0x00, 0x00, 0x99, 0xD5]);

    let driver = dc.driver_mut().unwrap();
    assert_eq!(driver.transport_mut().link_mut().written_data(), &expected[..]);

    let stats = driver.stats();
    assert_eq!(stats.requests_sent, 5);
    assert_eq!(stats.responses_received, 5);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn update_setpoint_reissues_control_block() {
    let mut mock = MockSerial::new();
    mock.queue_read_data(&[0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x10, 0x15]);
    mock.queue_read_data(&[0x01, 0x10, 0x00, 0x65, 0x00, 0x05, 0x10, 0x15]);

    let mut dc = converter_with(mock);
    dc.start_output(48.0, 10.0).await.unwrap();
    // Adjusting a live output is the same atomic write with control=1
    dc.update_setpoint(48.0, 10.0).await.unwrap();

    let stats = dc.stats().unwrap();
    assert_eq!(stats.requests_sent, 2);
}

#[tokio::test]
async fn corrupted_response_crc_surfaces_as_protocol_error() {
    let mut mock = MockSerial::new();
    // Valid 12 V / 10 A response with the last CRC byte flipped
    mock.queue_read_data(&[
        0x01, 0x03, 0x08, 0x00, 0x00, 0x2E, 0xE0, 0x00, 0x00, 0x27, 0x10, 0x08, 0x72,
    ]);

    let mut dc = converter_with(mock);
    let err = dc.read_vi().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("302-305"));
}

#[tokio::test(start_paused = true)]
async fn silent_bus_surfaces_as_communication_error() {
    let mut dc = converter_with(MockSerial::new());

    let err = dc.read_alarm_mask().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Communication);
    assert!(err.to_string().contains("306-307"));
}

#[tokio::test]
async fn operations_while_disconnected_fail_without_io() {
    let mut dc: DcConverter<MockSerial> = DcConverter::new(Duration::from_millis(100));

    for err in [
        dc.stop_output().await.unwrap_err(),
        dc.read_vi().await.unwrap_err(),
        dc.read_power_on_flag().await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, RtuError::Configuration { .. }));
    }
}

#[tokio::test]
async fn reconnect_replaces_previous_link() {
    let mut dc = converter_with(MockSerial::new());
    assert!(dc.is_connected());

    // Re-attaching closes the old connection first
    let mut second = MockSerial::new();
    second.queue_read_data(&[0x01, 0x06, 0x00, 0x65, 0x00, 0x00, 0x99, 0xD5]);
    dc.attach(second, 1).unwrap();

    dc.stop_output().await.unwrap();
    assert_eq!(dc.stats().unwrap().requests_sent, 1);
}
