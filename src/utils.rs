use std::collections::BTreeSet;
use std::process;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Echo identifiers currently in flight anywhere in this process.
static IN_FLIGHT: Mutex<BTreeSet<u16>> = Mutex::new(BTreeSet::new());

/// A random echo identifier reserved until the lease is dropped.
#[derive(Debug)]
pub struct IdentifierLease {
    value: u16,
}

impl IdentifierLease {
    pub fn value(&self) -> u16 {
        self.value
    }
}

impl Drop for IdentifierLease {
    fn drop(&mut self) {
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.value);
    }
}

/// Reserve a random identifier that no other in-flight probe is using.
pub fn acquire_identifier() -> IdentifierLease {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut in_flight = IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        let candidate = rng.gen_range(1..=u16::MAX);
        if in_flight.insert(candidate) {
            return IdentifierLease { value: candidate };
        }
    }
}

/// Cooperative cancellation flag shared by everything that loops over probes.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A handle that is never triggered.
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Handle Ctrl+C signal for graceful shutdown
pub fn setup_signal_handler() -> Shutdown {
    let (tx, shutdown) = Shutdown::new();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupt received, stopping after the current probe");
                let _ = tx.send(true);
            }
            Err(e) => log::warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    shutdown
}

/// Print error message and exit with error code
pub fn exit_with_error(message: &str, code: i32) -> ! {
    eprintln!("regionping: {}", message);
    process::exit(code);
}

/// Validate campaign parameters
pub fn validate_campaign_params(
    samples: u32,
    minutes: u64,
    timeout_ms: u64,
    size: usize,
) -> anyhow::Result<()> {
    if samples == 0 {
        return Err(anyhow::anyhow!("Sample count must be greater than 0"));
    }

    if minutes == 0 {
        return Err(anyhow::anyhow!("Duration must be at least 1 minute"));
    }

    if timeout_ms == 0 || timeout_ms > 60_000 {
        return Err(anyhow::anyhow!("Timeout must be between 1 and 60000 milliseconds"));
    }

    if size > 65500 {
        return Err(anyhow::anyhow!("Payload size too large, maximum is 65500 bytes"));
    }

    Ok(())
}

/// Format a latency in milliseconds for progress output
pub fn format_ms(ms: f64) -> String {
    format!("{:.2} milliseconds", ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_unique_while_held() {
        let leases: Vec<IdentifierLease> = (0..256).map(|_| acquire_identifier()).collect();
        let distinct: BTreeSet<u16> = leases.iter().map(|l| l.value()).collect();
        assert_eq!(distinct.len(), leases.len());
        assert!(leases.iter().all(|l| l.value() != 0));
    }

    #[test]
    fn test_identifier_released_on_drop() {
        let lease = acquire_identifier();
        let value = lease.value();
        assert!(IN_FLIGHT.lock().unwrap().contains(&value));
        drop(lease);
        assert!(!IN_FLIGHT.lock().unwrap().contains(&value));
    }

    #[test]
    fn test_shutdown_flag() {
        let (tx, shutdown) = Shutdown::new();
        let clone = shutdown.clone();
        assert!(!shutdown.is_triggered());
        tx.send(true).unwrap();
        assert!(shutdown.is_triggered());
        assert!(clone.is_triggered());
        assert!(!Shutdown::never().is_triggered());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(validate_campaign_params(10, 10, 1000, 59).is_ok());
        assert!(validate_campaign_params(0, 10, 1000, 59).is_err());
        assert!(validate_campaign_params(10, 0, 1000, 59).is_err());
        assert!(validate_campaign_params(10, 10, 0, 59).is_err());
        assert!(validate_campaign_params(10, 10, 60_001, 59).is_err());
        assert!(validate_campaign_params(10, 10, 1000, 70_000).is_err());
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(12.346), "12.35 milliseconds");
        assert_eq!(format_ms(0.0), "0.00 milliseconds");
    }
}
