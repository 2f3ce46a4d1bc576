//! Client Tests
//!
//! Tests verify:
//! - Every operation returns what the fake driver produced
//! - Connection failures name the target and drop the socket
//! - The call after a broken exchange reconnects and succeeds
//! - Remote errors and missing payload fields are told apart
//! - The smbus-style facade delegates to the same client

#[path = "../common/mod.rs"]
mod common;

use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use common::{client_for, shared_bus, start_server, stub_server, FakeDriver, FakeOpener, Recorded};
use i2c_bridge::protocol::{read_command, read_frame, write_frame, write_response, Command, Response};
use i2c_bridge::{BridgeError, Client, ClientConfig, I2cBus, SmBus};

// =============================================================================
// Helper Functions
// =============================================================================

fn loopback(present: &[u8]) -> (FakeOpener, Client) {
    let opener = FakeOpener::new(FakeDriver::new(present));
    let (addr, _shutdown) = start_server(shared_bus(opener.clone()));
    (opener, client_for(addr))
}

/// A port nothing listens on
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn expect_connection_error<T: std::fmt::Debug>(result: i2c_bridge::Result<T>) -> String {
    match result {
        Err(BridgeError::Connection(msg)) => msg,
        other => panic!("Expected connection error, got {:?}", other),
    }
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_reads_return_driver_values() {
    let (_, mut client) = loopback(&[0x50]);

    assert_eq!(client.read_byte(0x50).unwrap(), 0x42);
    assert_eq!(client.read_byte_data(0x50, 0x01).unwrap(), 0x42);
    assert_eq!(client.read_word_data(0x50, 0x01).unwrap(), 0xBEEF);
    assert_eq!(
        client.read_i2c_block_data(0x50, 0x00, 5).unwrap(),
        vec![0, 1, 2, 3, 4]
    );
    assert_eq!(client.scan().unwrap(), vec![0x50]);
}

#[test]
fn test_writes_reach_driver() {
    let (opener, mut client) = loopback(&[0x50]);

    client.write_byte(0x50, 0x0A).unwrap();
    client.write_byte_data(0x50, 0x01, 0x0B).unwrap();
    client.write_word_data(0x50, 0x02, 0x0C0D).unwrap();
    client.write_i2c_block_data(0x50, 0x03, &[0x0E, 0x0F]).unwrap();

    assert_eq!(
        opener.state().writes(),
        vec![
            Recorded::Byte { address: 0x50, value: 0x0A },
            Recorded::ByteData { address: 0x50, register: 0x01, value: 0x0B },
            Recorded::WordData { address: 0x50, register: 0x02, value: 0x0C0D },
            Recorded::Block { address: 0x50, register: 0x03, data: vec![0x0E, 0x0F] },
        ]
    );
}

#[test]
fn test_connection_is_lazy_and_reused() {
    let (_, mut client) = loopback(&[0x50]);
    assert!(!client.is_connected());

    client.scan().unwrap();
    assert!(client.is_connected());
    client.scan().unwrap();
    assert!(client.is_connected());

    client.close();
    assert!(!client.is_connected());
    client.scan().unwrap();
    assert!(client.is_connected());
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[test]
fn test_remote_error_keeps_connection() {
    let (_, mut client) = loopback(&[0x50]);

    match client.read_byte_data(0x21, 0) {
        Err(BridgeError::Remote(msg)) => {
            assert_eq!(msg, "no acknowledgment from device at address 0x21")
        }
        other => panic!("Expected remote error, got {:?}", other),
    }
    assert!(client.is_connected());
}

#[test]
fn test_invalid_argument_never_connects() {
    let (_, mut client) = loopback(&[0x50]);

    assert!(matches!(
        client.read_byte(0x80),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.write_i2c_block_data(0x50, 0, &[0; 33]),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert!(!client.is_connected());
}

#[test]
fn test_connect_failure_names_target() {
    let port = closed_port();
    let mut client = Client::new(
        ClientConfig::builder()
            .host("127.0.0.1")
            .port(port)
            .timeout_ms(500)
            .build(),
    );

    let msg = expect_connection_error(client.scan());
    assert!(
        msg.contains(&format!("127.0.0.1:{}", port)),
        "message: {}",
        msg
    );
    assert!(!client.is_connected());
}

#[test]
fn test_truncated_response_then_reconnect() {
    let addr = stub_server(|listener| {
        // First session: promise 100 bytes, deliver 10, hang up
        let (mut stream, _) = listener.accept().unwrap();
        read_frame(&mut stream).unwrap();
        let mut partial = 100u32.to_be_bytes().to_vec();
        partial.extend_from_slice(b"{\"status\":");
        std::io::Write::write_all(&mut stream, &partial).unwrap();
        drop(stream);

        // Second session: answer properly
        let (mut stream, _) = listener.accept().unwrap();
        let command = read_command(&mut stream).unwrap();
        assert_eq!(command, Command::Scan);
        write_response(&mut stream, &Response::with_devices(vec![0x50, 0x60])).unwrap();
    });
    let mut client = client_for(addr);

    let msg = expect_connection_error(client.scan());
    assert!(msg.contains("connection closed while receiving"), "message: {}", msg);
    assert!(!client.is_connected());

    assert_eq!(client.scan().unwrap(), vec![0x50, 0x60]);
}

#[test]
fn test_short_length_prefix_is_connection_error() {
    let addr = stub_server(|listener| {
        let (mut stream, _) = listener.accept().unwrap();
        read_frame(&mut stream).unwrap();
        std::io::Write::write_all(&mut stream, &[0, 0]).unwrap();
    });
    let mut client = client_for(addr);

    let msg = expect_connection_error(client.read_byte(0x50));
    assert!(msg.contains("length prefix"), "message: {}", msg);
    assert!(!client.is_connected());
}

#[test]
fn test_timeout_is_connection_error() {
    let addr = stub_server(|listener| {
        let (mut stream, _) = listener.accept().unwrap();
        read_frame(&mut stream).unwrap();
        // Never answer; wait for the client to give up
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink);
    });
    let mut client = Client::new(
        ClientConfig::builder()
            .host("127.0.0.1")
            .port(addr.port())
            .timeout_ms(200)
            .build(),
    );

    let msg = expect_connection_error(client.scan());
    assert!(msg.contains("timed out"), "message: {}", msg);
    assert!(!client.is_connected());
}

#[test]
fn test_non_json_response_is_protocol_error() {
    let addr = stub_server(|listener| {
        let (mut stream, _) = listener.accept().unwrap();
        read_frame(&mut stream).unwrap();
        write_frame(&mut stream, b"<html>").unwrap();
        thread::sleep(Duration::from_millis(100));
    });
    let mut client = client_for(addr);

    assert!(matches!(client.scan(), Err(BridgeError::Protocol(_))));
    // Stream state is unknown after a bad body
    assert!(!client.is_connected());
}

#[test]
fn test_missing_field_is_protocol_error() {
    let addr = stub_server(|listener| {
        let (mut stream, _) = listener.accept().unwrap();
        for _ in 0..2 {
            read_frame(&mut stream).unwrap();
            write_response(&mut stream, &Response::success()).unwrap();
        }
    });
    let mut client = client_for(addr);

    match client.read_byte(0x50) {
        Err(BridgeError::Protocol(msg)) => assert!(msg.contains("'value'"), "message: {}", msg),
        other => panic!("Expected protocol error, got {:?}", other),
    }
    assert!(matches!(client.scan(), Err(BridgeError::Protocol(_))));
}

// =============================================================================
// Reset Tests
// =============================================================================

#[test]
fn test_reset_interface_failure_then_success() {
    let (opener, mut client) = loopback(&[0x50]);

    opener.fail_next(1);
    match client.reset_interface() {
        Err(BridgeError::Remote(msg)) => assert!(msg.starts_with("Reset failed:"), "message: {}", msg),
        other => panic!("Expected remote error, got {:?}", other),
    }

    assert_eq!(client.reset_interface().unwrap(), "I2C interface reset");
    assert_eq!(client.read_byte(0x50).unwrap(), 0x42);
}

#[test]
fn test_reset_interface_default_message() {
    let addr = stub_server(|listener| {
        let (mut stream, _) = listener.accept().unwrap();
        read_frame(&mut stream).unwrap();
        write_response(&mut stream, &Response::success()).unwrap();
    });
    let mut client = client_for(addr);

    assert_eq!(client.reset_interface().unwrap(), "Interface reset successful");
}

// =============================================================================
// SmBus Facade Tests
// =============================================================================

#[test]
fn test_smbus_facade_delegates() {
    let (opener, client) = loopback(&[0x50]);
    let mut bus = SmBus::wrap(1, client);

    assert_eq!(bus.bus_number(), 1);
    assert_eq!(bus.read_byte_data(0x50, 0).unwrap(), 0x42);
    bus.write_word_data(0x50, 4, 0x1122).unwrap();
    assert_eq!(bus.scan().unwrap(), vec![0x50]);
    assert!(bus.inner_mut().is_connected());

    bus.close();
    assert!(!bus.inner_mut().is_connected());
    assert_eq!(
        opener.state().writes(),
        vec![Recorded::WordData { address: 0x50, register: 4, value: 0x1122 }]
    );
}

#[test]
fn test_smbus_new_targets_host_and_port() {
    let opener = FakeOpener::new(FakeDriver::new(&[0x68]));
    let (addr, _shutdown) = start_server(shared_bus(opener));

    let mut bus = SmBus::new(0, "127.0.0.1", addr.port());
    assert_eq!(bus.scan().unwrap(), vec![0x68]);
}

#[test]
fn test_smbus_reset_interface() {
    let (opener, client) = loopback(&[0x50]);
    let mut bus = SmBus::wrap(1, client);

    assert_eq!(bus.reset_interface().unwrap(), "I2C interface reset");
    assert_eq!(opener.opens(), 2);

    opener.fail_next(1);
    assert!(matches!(bus.reset_interface(), Err(BridgeError::Remote(_))));

    // The failed reopen leaves the bus closed until the next reset
    match bus.read_byte(0x50) {
        Err(BridgeError::Remote(msg)) => assert!(msg.contains("not open"), "message: {}", msg),
        other => panic!("Expected remote error, got {:?}", other),
    }
    assert_eq!(bus.reset_interface().unwrap(), "I2C interface reset");
    assert_eq!(opener.opens(), 4);
}
