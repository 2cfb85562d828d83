use std::time::{Duration, Instant};

use crate::dns;
use crate::icmp::ProbeOutcome;
use crate::prober::Probe;
use crate::region::{EndpointDescriptor, RegionResult};
use crate::utils::Shutdown;

/// Reference per-probe reply timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs sequential probes against one endpoint.
pub struct SampleCollector<P> {
    probe: P,
    timeout: Duration,
    shutdown: Shutdown,
}

impl<P: Probe> SampleCollector<P> {
    pub fn new(probe: P, timeout: Duration, shutdown: Shutdown) -> Self {
        Self {
            probe,
            timeout,
            shutdown,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Probe `endpoint` `sample_count` times, keeping only completed round trips.
    ///
    /// The returned sample count may be lower than requested. Frequency is
    /// the requested count over the wall time of the whole loop; if the run
    /// is cancelled part way, the attempts actually made are used instead.
    pub async fn collect(&self, endpoint: &EndpointDescriptor, sample_count: u32) -> RegionResult {
        let mut result = RegionResult::empty(endpoint.clone());

        let target = match dns::resolve_ipv4(&endpoint.host).await {
            Ok(ip) => ip,
            Err(e) => {
                log::warn!("Cannot resolve {} ({}): {}", endpoint.name, endpoint.host, e);
                result.fault = Some(format!("cannot resolve {}: {}", endpoint.host, e));
                return result;
            }
        };

        let started = Instant::now();
        let mut attempts = 0u32;
        let mut socket_errors = 0u32;

        for _ in 0..sample_count {
            if self.shutdown.is_triggered() {
                log::info!("Collection for {} cancelled after {} probes", endpoint.name, attempts);
                break;
            }
            attempts += 1;

            match self.probe.probe(target, self.timeout).await {
                ProbeOutcome::Sample(sample) => result.samples.push(sample),
                ProbeOutcome::Timeout => result.timeouts += 1,
                ProbeOutcome::SocketError(reason) => {
                    if socket_errors == 0 {
                        log::warn!("Probe to {} failed: {}", endpoint.name, reason);
                    }
                    socket_errors += 1;
                    result.fault = Some(reason);
                }
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        // attempts == sample_count unless cancelled
        result.frequency = if elapsed > 0.0 { attempts as f64 / elapsed } else { 0.0 };

        log::debug!(
            "{}: {} samples, {} timeouts, {} socket errors in {:.3}s",
            endpoint.name,
            result.samples.len(),
            result.timeouts,
            socket_errors,
            elapsed
        );
        result
    }
}
