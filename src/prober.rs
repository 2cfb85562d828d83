use chrono::Local;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

use crate::icmp::{self, EchoSocket, PingSample, ProbeOutcome, SocketFactory};
use crate::utils;

const RECV_BUFFER_LEN: usize = 1024;

/// A single echo round trip against one host.
pub trait Probe {
    async fn probe(&self, target: Ipv4Addr, timeout: Duration) -> ProbeOutcome;
}

impl<P: Probe> Probe for &P {
    async fn probe(&self, target: Ipv4Addr, timeout: Duration) -> ProbeOutcome {
        (**self).probe(target, timeout).await
    }
}

/// Sends one echo request per call over a socket opened for that call only.
pub struct Prober<F> {
    factory: F,
    payload_size: usize,
    sequence: AtomicU16,
}

impl<F: SocketFactory> Prober<F> {
    pub fn new(factory: F, payload_size: usize) -> Self {
        Self {
            factory,
            payload_size,
            sequence: AtomicU16::new(1),
        }
    }
}

impl<F: SocketFactory> Probe for Prober<F> {
    async fn probe(&self, target: Ipv4Addr, timeout: Duration) -> ProbeOutcome {
        let socket = match self.factory.open() {
            Ok(socket) => socket,
            Err(e) => {
                let reason = icmp::describe_open_error(&e);
                log::debug!("Socket unavailable for {}: {}", target, e);
                return ProbeOutcome::SocketError(reason);
            }
        };

        let lease = utils::acquire_identifier();
        let identifier = lease.value();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let packet = icmp::encode_echo_request(identifier, sequence, self.payload_size);

        let sent_at = Local::now();
        let started = Instant::now();
        if let Err(e) = socket.send_to(&packet, target).await {
            log::debug!("Send to {} failed: {}", target, e);
            return ProbeOutcome::SocketError(format!("send failed: {}", e));
        }

        // The budget runs from the send, not from the last datagram seen
        let deadline = started + timeout;
        let mut buffer = [0u8; RECV_BUFFER_LEN];

        loop {
            let len = match timeout_at(deadline, socket.recv(&mut buffer)).await {
                Err(_elapsed) => {
                    log::debug!("Request to {} (id {}) timed out", target, identifier);
                    return ProbeOutcome::Timeout;
                }
                Ok(Err(e)) => {
                    log::debug!("Receive from {} failed: {}", target, e);
                    return ProbeOutcome::SocketError(format!("receive failed: {}", e));
                }
                Ok(Ok(len)) => len,
            };
            let elapsed = started.elapsed();

            match icmp::decode_icmp_header(&buffer[..len]) {
                Ok(header) if header.is_echo_reply() && header.identifier == identifier => {
                    log::debug!("Reply from {} (id {} seq {}) after {:?}", target, identifier, header.sequence, elapsed);
                    return ProbeOutcome::Sample(PingSample::from_elapsed(sent_at, elapsed));
                }
                Ok(header) => {
                    log::debug!(
                        "Discarding ICMP type {} code {} id {} while waiting for id {}",
                        header.icmp_type,
                        header.code,
                        header.identifier,
                        identifier
                    );
                }
                Err(e) => log::debug!("Discarding datagram: {}", e),
            }
        }
    }
}
