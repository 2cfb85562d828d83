use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

/// Datagram transport a probe sends its request through and reads replies from.
pub trait EchoSocket {
    async fn send_to(&self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize>;

    /// Waits for the next datagram. Raw IPv4 sockets deliver the IP header too.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens a fresh socket for every probe so nothing is held between probes.
pub trait SocketFactory {
    type Socket: EchoSocket;

    fn open(&self) -> io::Result<Self::Socket>;
}

/// Raw ICMPv4 socket registered with the tokio reactor.
pub struct IcmpSocket {
    inner: AsyncFd<Socket>,
}

impl IcmpSocket {
    pub fn new() -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            inner: AsyncFd::with_interest(socket, Interest::READABLE | Interest::WRITABLE)?,
        })
    }
}

impl EchoSocket for IcmpSocket {
    async fn send_to(&self, packet: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        let addr = SockAddr::from(SocketAddrV4::new(target, 0));
        log::debug!("Sending ICMP packet to {}: {} bytes", target, packet.len());
        loop {
            let mut guard = self.inner.writable().await?;
            match guard.try_io(|inner| inner.get_ref().send_to(packet, &addr)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref();
                socket.read(buf)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSocketFactory;

impl SocketFactory for RawSocketFactory {
    type Socket = IcmpSocket;

    fn open(&self) -> io::Result<IcmpSocket> {
        IcmpSocket::new()
    }
}

/// Maps a socket creation failure to the reason reported in a probe outcome.
pub fn describe_open_error(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::PermissionDenied => "insufficient privilege".to_string(),
        _ => match err.raw_os_error() {
            // EPERM is reported as PermissionDenied on most targets, but not all
            Some(1) => "insufficient privilege".to_string(),
            _ => format!("failed to create raw socket: {}", err),
        },
    }
}

/// Whether this process may open raw ICMP sockets at all.
pub fn check_raw_socket_privileges() -> bool {
    IcmpSocket::new().is_ok()
}
