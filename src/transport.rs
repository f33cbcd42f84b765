//! # Modbus Transport Layer
//!
//! The client façades only need two blocking primitives from a transport:
//! send a whole buffer, and receive up to `max_bytes` in one read. Anything
//! implementing [`ModbusTransport`] can carry Modbus frames; this module ships
//! std-socket implementations for TCP and UDP.
//!
//! ## Timeouts
//!
//! A receive that times out returns an empty buffer instead of an error. The
//! response validator turns that into [`ModbusError::EmptyResponse`], which
//! callers treat as recoverable.
//!
//! ## Transport Statistics
//!
//! ```rust,no_run
//! use modbus_master::transport::TcpTransport;
//! use std::time::Duration;
//!
//! # fn example() -> modbus_master::ModbusResult<()> {
//! let transport = TcpTransport::connect("127.0.0.1:502", Duration::from_secs(1))?;
//! let stats = transport.get_stats();
//! println!("Requests sent: {}", stats.requests_sent);
//! println!("Timeouts: {}", stats.timeouts);
//! # Ok(())
//! # }
//! ```

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::bytes::join_be;
use crate::constants::MBAP_LENGTH_OFFSET;
use crate::error::{ModbusError, ModbusResult};
use crate::utils::format_hex;

/// Byte transport used by the client façades.
///
/// Implementations block. `send` must transmit the entire buffer; `receive`
/// returns at most `max_bytes` and yields an empty vector on timeout.
pub trait ModbusTransport {
    /// Send `data`, returning the number of bytes written.
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize>;

    /// Receive up to `max_bytes`.
    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>>;
}

impl<T: ModbusTransport + ?Sized> ModbusTransport for &mut T {
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
        (**self).send(data)
    }

    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
        (**self).receive(max_bytes)
    }
}

impl<T: ModbusTransport + ?Sized> ModbusTransport for Box<T> {
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
        (**self).send(data)
    }

    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
        (**self).receive(max_bytes)
    }
}

/// Transport statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl TransportStats {
    fn record_sent(&mut self, bytes: usize) {
        self.requests_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    fn record_received(&mut self, bytes: usize) {
        self.responses_received += 1;
        self.bytes_received += bytes as u64;
    }
}

fn log_packet(protocol: &str, direction: &str, data: &[u8]) {
    debug!("[MODBUS-{}] {} {}", protocol, direction, format_hex(data));
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn resolve(address: impl ToSocketAddrs) -> ModbusResult<SocketAddr> {
    address
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| ModbusError::configuration("address resolved to nothing"))
}

fn check_timeout(timeout: Duration) -> ModbusResult<()> {
    if timeout.is_zero() {
        return Err(ModbusError::configuration("timeout must be non-zero"));
    }
    Ok(())
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP transport over a blocking [`TcpStream`].
///
/// `receive` keeps reading until the MBAP length field is satisfied, so a
/// response split across segments arrives as one frame.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    address: SocketAddr,
    timeout: Duration,
    stats: TransportStats,
}

impl TcpTransport {
    /// Connect to `address`; `timeout` bounds the connect, every write and every read.
    pub fn connect(address: impl ToSocketAddrs, timeout: Duration) -> ModbusResult<Self> {
        check_timeout(timeout)?;
        let address = resolve(address)?;

        debug!("Connecting to Modbus TCP server at {}", address);
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|e| {
            ModbusError::connection(format!("failed to connect to {}: {}", address, e))
        })?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        info!("Connected to Modbus TCP server at {}", address);

        Ok(Self {
            stream: Some(stream),
            address,
            timeout,
            stats: TransportStats::default(),
        })
    }

    /// Remote address
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Configured I/O timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if the stream is still open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection. Further I/O fails with a connection error.
    pub fn close(&mut self) -> ModbusResult<()> {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).or_else(|e| {
                // the peer may already have closed its side
                if e.kind() == io::ErrorKind::NotConnected {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
            info!("Closed Modbus TCP connection to {}", self.address);
        }
        Ok(())
    }

    /// Get transport statistics
    pub fn get_stats(&self) -> TransportStats {
        self.stats
    }

    /// Finish a frame that arrived split across TCP segments.
    ///
    /// Reads until the MBAP length field is satisfied or `buf` is full and
    /// returns the number of bytes now in `buf`.
    fn read_rest_of_frame(&mut self, buf: &mut [u8], mut filled: usize) -> ModbusResult<usize> {
        if buf.len() < MBAP_LENGTH_OFFSET {
            return Ok(filled);
        }
        let stream = self.stream()?;
        if filled < MBAP_LENGTH_OFFSET {
            stream.read_exact(&mut buf[filled..MBAP_LENGTH_OFFSET])?;
            filled = MBAP_LENGTH_OFFSET;
        }
        let length = join_be(buf[4], buf[5]) as usize;
        let expected = (MBAP_LENGTH_OFFSET + length).min(buf.len());
        if filled < expected {
            stream.read_exact(&mut buf[filled..expected])?;
            filled = expected;
        }
        Ok(filled)
    }

    fn stream(&mut self) -> ModbusResult<&mut TcpStream> {
        let address = self.address;
        self.stream
            .as_mut()
            .ok_or_else(|| ModbusError::connection(format!("not connected to {}", address)))
    }
}

impl ModbusTransport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
        let result = self.stream().and_then(|s| Ok(s.write_all(data)?));
        if let Err(err) = result {
            self.stats.errors += 1;
            warn!("[MODBUS-TCP] send failed: {}", err);
            return Err(err);
        }
        log_packet("TCP", "send", data);
        self.stats.record_sent(data.len());
        Ok(data.len())
    }

    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let read = self.stream().and_then(|s| Ok(s.read(&mut buf)?));
        match read {
            Ok(0) if max_bytes > 0 => {
                self.stats.errors += 1;
                self.stream = None;
                warn!("[MODBUS-TCP] connection closed by {}", self.address);
                Err(ModbusError::connection(format!(
                    "connection closed by {}",
                    self.address
                )))
            }
            Ok(first) => {
                let n = match self.read_rest_of_frame(&mut buf, first) {
                    Ok(n) => n,
                    Err(err) => {
                        self.stats.errors += 1;
                        warn!("[MODBUS-TCP] incomplete frame after {} bytes: {}", first, err);
                        return Err(err);
                    }
                };
                buf.truncate(n);
                log_packet("TCP", "recv", &buf);
                trace!("[MODBUS-TCP] received {} of at most {} bytes", n, max_bytes);
                self.stats.record_received(n);
                Ok(buf)
            }
            Err(ModbusError::Io(e)) if is_timeout(&e) => {
                self.stats.timeouts += 1;
                debug!("[MODBUS-TCP] receive timed out after {:?}", self.timeout);
                Ok(Vec::new())
            }
            Err(err) => {
                self.stats.errors += 1;
                warn!("[MODBUS-TCP] receive failed: {}", err);
                Err(err)
            }
        }
    }
}

// ============================================================================
// UDP
// ============================================================================

/// Modbus UDP transport; each frame travels in one datagram.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    address: SocketAddr,
    timeout: Duration,
    stats: TransportStats,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `address`.
    pub fn connect(address: impl ToSocketAddrs, timeout: Duration) -> ModbusResult<Self> {
        check_timeout(timeout)?;
        let address = resolve(address)?;

        let local = if address.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(address).map_err(|e| {
            ModbusError::connection(format!("failed to connect to {}: {}", address, e))
        })?;
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;
        info!("Modbus UDP socket connected to {}", address);

        Ok(Self {
            socket: Some(socket),
            address,
            timeout,
            stats: TransportStats::default(),
        })
    }

    /// Remote address
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Check if the socket is still open.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Release the socket.
    pub fn close(&mut self) -> ModbusResult<()> {
        if self.socket.take().is_some() {
            info!("Closed Modbus UDP socket for {}", self.address);
        }
        Ok(())
    }

    /// Get transport statistics
    pub fn get_stats(&self) -> TransportStats {
        self.stats
    }

    fn socket(&self) -> ModbusResult<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| ModbusError::connection(format!("not connected to {}", self.address)))
    }
}

impl ModbusTransport for UdpTransport {
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
        let sent = self.socket().and_then(|s| Ok(s.send(data)?));
        match sent {
            Ok(n) if n == data.len() => {
                log_packet("UDP", "send", data);
                self.stats.record_sent(n);
                Ok(n)
            }
            Ok(n) => {
                self.stats.errors += 1;
                Err(ModbusError::connection(format!(
                    "datagram truncated: {} of {} bytes sent",
                    n,
                    data.len()
                )))
            }
            Err(err) => {
                self.stats.errors += 1;
                warn!("[MODBUS-UDP] send failed: {}", err);
                Err(err)
            }
        }
    }

    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let received = self.socket().and_then(|s| Ok(s.recv(&mut buf)?));
        match received {
            Ok(n) => {
                buf.truncate(n);
                log_packet("UDP", "recv", &buf);
                self.stats.record_received(n);
                Ok(buf)
            }
            Err(ModbusError::Io(e)) if is_timeout(&e) => {
                self.stats.timeouts += 1;
                debug!("[MODBUS-UDP] receive timed out after {:?}", self.timeout);
                Ok(Vec::new())
            }
            Err(err) => {
                self.stats.errors += 1;
                warn!("[MODBUS-UDP] receive failed: {}", err);
                Err(err)
            }
        }
    }
}
