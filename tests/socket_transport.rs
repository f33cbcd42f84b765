//! TCP and UDP transports against loopback servers

mod common;

use std::io::{Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::thread;
use std::time::Duration;

use modbus_master::{
    GenericModbusClient, IpCodec, ModbusClient, ModbusError, ModbusTransport,
    SequentialTransactionIds, TcpTransport, UdpTransport,
};

const TIMEOUT: Duration = Duration::from_millis(500);

/// Answer a read of `count` registers with register values 0, 1, 2, ...
fn read_reply(request: &[u8]) -> Vec<u8> {
    let count = u16::from_be_bytes([request[10], request[11]]);
    let byte_count = (count * 2) as u8;
    let mut reply = request[..4].to_vec();
    reply.extend_from_slice(&(3 + byte_count as u16).to_be_bytes());
    reply.extend_from_slice(&[request[6], request[7], byte_count]);
    for i in 0..count {
        reply.extend_from_slice(&i.to_be_bytes());
    }
    reply
}

#[test]
fn test_tcp_read_round_trip() {
    common::init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 12];
        stream.read_exact(&mut request).unwrap();
        stream.write_all(&read_reply(&request)).unwrap();
        request
    });

    let transport = TcpTransport::connect(address, TIMEOUT).unwrap();
    assert!(transport.is_connected());
    let mut client = GenericModbusClient::new(
        transport,
        IpCodec::with_id_source(SequentialTransactionIds::starting_at(0x0100)),
    );

    let data = client.read_holding_registers(1, 0, 3, true).unwrap();
    assert_eq!(data.as_ref(), &[0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02]);

    let request = server.join().unwrap();
    assert_eq!(
        request,
        [0x01, 0x00, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x03]
    );

    let stats = client.transport().get_stats();
    assert_eq!(stats.requests_sent, 1);
    assert_eq!(stats.responses_received, 1);
    assert_eq!(stats.bytes_sent, 12);
    assert_eq!(stats.bytes_received, 15);
}

#[test]
fn test_tcp_response_split_across_segments() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_nodelay(true).unwrap();
        let mut request = [0u8; 12];
        stream.read_exact(&mut request).unwrap();
        let reply = read_reply(&request);
        // header fragment, then the rest of the frame
        stream.write_all(&reply[..4]).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&reply[4..9]).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&reply[9..]).unwrap();
    });

    let transport = TcpTransport::connect(address, TIMEOUT).unwrap();
    let mut client = GenericModbusClient::new(
        transport,
        IpCodec::with_id_source(SequentialTransactionIds::starting_at(0x0200)),
    );

    let data = client.read_holding_registers(1, 0, 4, true).unwrap();
    assert_eq!(
        data.as_ref(),
        &[0x08, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03]
    );
    assert_eq!(client.transport().get_stats().bytes_received, 17);

    server.join().unwrap();
}

#[test]
fn test_tcp_timeout_yields_empty_response() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 12];
        stream.read_exact(&mut request).unwrap();
        // keep the connection open without answering
        thread::sleep(TIMEOUT * 2);
    });

    let transport = TcpTransport::connect(address, TIMEOUT).unwrap();
    let mut client = GenericModbusClient::new(transport, IpCodec::new());
    assert!(matches!(
        client.read_input_registers(1, 0, 1, false),
        Err(ModbusError::EmptyResponse)
    ));
    assert_eq!(client.transport().get_stats().timeouts, 1);

    server.join().unwrap();
}

#[test]
fn test_tcp_peer_close_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let mut transport = TcpTransport::connect(address, TIMEOUT).unwrap();
    server.join().unwrap();

    assert!(matches!(
        transport.receive(260),
        Err(ModbusError::Connection { .. }) | Err(ModbusError::Io(_))
    ));
    transport.close().unwrap();
    assert!(!transport.is_connected());
    assert!(matches!(
        transport.send(&[0x00]),
        Err(ModbusError::Connection { .. })
    ));
}

#[test]
fn test_tcp_connect_refused() {
    // bind then drop to get a port nobody listens on
    let address = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let err = TcpTransport::connect(address, TIMEOUT).unwrap_err();
    assert!(matches!(err, ModbusError::Connection { .. }));
}

#[test]
fn test_udp_read_round_trip() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    server.set_read_timeout(Some(TIMEOUT)).unwrap();
    let address = server.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut request = [0u8; 260];
        let (n, peer) = server.recv_from(&mut request).unwrap();
        server.send_to(&read_reply(&request[..n]), peer).unwrap();
        n
    });

    let transport = UdpTransport::connect(address, TIMEOUT).unwrap();
    let mut client = GenericModbusClient::new(
        transport,
        IpCodec::with_id_source(SequentialTransactionIds::starting_at(7)),
    );
    let raw = client.read_03(9, 0x0010, 2, false).unwrap();

    assert_eq!(handle.join().unwrap(), 12);
    assert_eq!(
        raw.as_ref(),
        &[0x00, 0x07, 0x00, 0x00, 0x00, 0x07, 0x09, 0x03, 0x04, 0x00, 0x00, 0x00, 0x01]
    );
    assert_eq!(client.transport().get_stats().responses_received, 1);
}

#[test]
fn test_udp_timeout_yields_empty_buffer() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut transport =
        UdpTransport::connect(silent.local_addr().unwrap(), Duration::from_millis(100)).unwrap();

    transport.send(&[0x00, 0x01]).unwrap();
    assert!(transport.receive(260).unwrap().is_empty());
    assert_eq!(transport.get_stats().timeouts, 1);
}
