pub mod checksum;
pub mod packet;
pub mod socket;

pub use packet::*;
pub use socket::*;

use chrono::{DateTime, Local};

/// One completed echo request/reply pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingSample {
    pub sent_at: DateTime<Local>,
    pub received_at: DateTime<Local>,
}

impl PingSample {
    /// `received_at` is derived from a monotonic elapsed time, so it can
    /// never precede `sent_at` even if the wall clock steps backwards.
    pub fn from_elapsed(sent_at: DateTime<Local>, elapsed: std::time::Duration) -> Self {
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
        Self {
            sent_at,
            received_at: sent_at + elapsed,
        }
    }

    pub fn rtt_ms(&self) -> f64 {
        let rtt = self.received_at - self.sent_at;
        match rtt.num_microseconds() {
            Some(us) => us as f64 / 1000.0,
            None => rtt.num_milliseconds() as f64,
        }
    }
}

/// Result of a single probe. Every probe produces exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Sample(PingSample),
    Timeout,
    SocketError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    Malformed { len: usize },
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::Malformed { len } => {
                write!(f, "Malformed packet: {} bytes, need at least {}", len, IPV4_HEADER_LEN + ICMP_HEADER_LEN)
            }
        }
    }
}

impl std::error::Error for PacketError {}
