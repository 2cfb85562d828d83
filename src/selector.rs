use crate::collector::SampleCollector;
use crate::prober::Probe;
use crate::region::{EndpointDescriptor, ResultSet};

/// Outcome of probing every candidate endpoint.
#[derive(Debug, Clone)]
pub struct Selection {
    pub best: Option<EndpointDescriptor>,
    pub results: ResultSet,
}

/// Probe each endpoint in order and pick the lowest mean round trip.
///
/// Every endpoint is recorded, even with no samples; those are left out of
/// the comparison. Ties go to the endpoint listed first.
pub async fn select_best<P: Probe>(
    collector: &SampleCollector<P>,
    endpoints: &[EndpointDescriptor],
    sample_count: u32,
) -> Selection {
    let mut results = ResultSet::new();
    let mut best: Option<(EndpointDescriptor, f64)> = None;

    for endpoint in endpoints {
        if collector.shutdown().is_triggered() {
            break;
        }

        println!("Pinging {}...", endpoint.name);
        let result = collector.collect(endpoint, sample_count).await;

        match result.mean_rtt_ms() {
            Some(mean) => {
                println!(
                    "{} average ping: {:.3} seconds, frequency: {:.2} pings/sec",
                    endpoint.name,
                    mean / 1000.0,
                    result.frequency
                );
                let better = match &best {
                    Some((_, current)) => mean < *current,
                    None => true,
                };
                if better {
                    best = Some((endpoint.clone(), mean));
                }
            }
            None => match &result.fault {
                Some(fault) => eprintln!("{}: no samples ({})", endpoint.name, fault),
                None => println!("{}: no replies received", endpoint.name),
            },
        }

        results.insert(result);
    }

    Selection {
        best: best.map(|(endpoint, _)| endpoint),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::{Behavior, ScriptedProbe};
    use crate::collector::DEFAULT_PROBE_TIMEOUT;
    use crate::utils::Shutdown;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(127, 0, 0, last)
    }

    fn endpoints(names: &[(&str, u8)]) -> Vec<EndpointDescriptor> {
        names
            .iter()
            .map(|(name, last)| EndpointDescriptor::new(*name, ip(*last).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_picks_lowest_mean() {
        let probe = ScriptedProbe::new(&[
            (ip(1), Behavior::Reply(Duration::from_millis(50))),
            (ip(2), Behavior::Reply(Duration::from_millis(10))),
            (ip(3), Behavior::Reply(Duration::from_millis(30))),
        ]);
        let collector = SampleCollector::new(&probe, DEFAULT_PROBE_TIMEOUT, Shutdown::never());
        let candidates = endpoints(&[("Fifty", 1), ("Ten", 2), ("Thirty", 3)]);

        let selection = select_best(&collector, &candidates, 2).await;
        assert_eq!(selection.best.unwrap().name, "Ten");
        assert_eq!(selection.results.len(), 3);
    }

    #[tokio::test]
    async fn test_tie_goes_to_first() {
        let probe = ScriptedProbe::new(&[
            (ip(1), Behavior::Reply(Duration::from_millis(5))),
            (ip(2), Behavior::Reply(Duration::from_millis(5))),
        ]);
        let collector = SampleCollector::new(&probe, DEFAULT_PROBE_TIMEOUT, Shutdown::never());
        let candidates = endpoints(&[("First", 1), ("Second", 2)]);

        // Scripted samples carry the exact configured RTT, so the means are equal
        let selection = select_best(&collector, &candidates, 3).await;
        assert_eq!(selection.best.unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_no_samples_anywhere() {
        let probe = ScriptedProbe::new(&[(ip(1), Behavior::Silent), (ip(2), Behavior::Refused)]);
        let collector = SampleCollector::new(&probe, DEFAULT_PROBE_TIMEOUT, Shutdown::never());
        let candidates = endpoints(&[("Silent", 1), ("Refused", 2)]);

        let selection = select_best(&collector, &candidates, 4).await;
        assert!(selection.best.is_none());
        assert_eq!(selection.results.len(), 2);
        assert!(selection.results.iter().all(|r| r.samples.is_empty()));
        assert!(selection.results.get("Refused").unwrap().fault.is_some());
    }

    #[tokio::test]
    async fn test_empty_endpoints_skipped_in_comparison() {
        let probe = ScriptedProbe::new(&[
            (ip(1), Behavior::Silent),
            (ip(2), Behavior::Reply(Duration::from_millis(20))),
        ]);
        let collector = SampleCollector::new(&probe, DEFAULT_PROBE_TIMEOUT, Shutdown::never());
        let candidates = endpoints(&[("Silent", 1), ("Slow", 2)]);

        let selection = select_best(&collector, &candidates, 2).await;
        assert_eq!(selection.best.unwrap().name, "Slow");
        assert_eq!(selection.results.get("Silent").unwrap().samples.len(), 0);
    }
}
