use chrono::{DateTime, Local, Timelike};
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::SampleCollector;
use crate::prober::Probe;
use crate::region::{EndpointDescriptor, RegionResult, ResultSet};
use crate::selector;
use crate::stats::{self, DistributionStats, StatsError};
use crate::storage::{self, ResultStore};
use crate::upload::{UploadOutcome, Uploader};

#[derive(Debug, Clone)]
pub struct CampaignSettings {
    /// Probes per endpoint during selection and frequency estimation.
    pub selection_samples: u32,
    /// Wall-clock length the extended run is sized for.
    pub target_duration: Duration,
    /// Measure only this region instead of selecting one.
    pub forced_region: Option<String>,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            selection_samples: 10,
            target_duration: Duration::from_secs(10 * 60),
            forced_region: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Disabled,
    /// A record for the current hour already existed before this run.
    SkippedSameHour,
    /// Forced-region runs are kept locally.
    SkippedForcedRegion,
    /// Cancelled campaigns are saved but not sent.
    SkippedCancelled,
    /// Nothing was saved, so there is nothing to send.
    NothingToSend,
    Sent(UploadOutcome),
    Failed(String),
}

#[derive(Debug)]
pub struct CampaignReport {
    pub best: Option<EndpointDescriptor>,
    pub results: ResultSet,
    pub extended: Option<RegionResult>,
    pub stats: Option<Result<DistributionStats, StatsError>>,
    pub record: Option<Result<PathBuf, String>>,
    pub upload: UploadStatus,
    pub cancelled: bool,
}

/// Number of probes expected to fill `target` at `frequency` probes per second.
pub fn extended_sample_count(frequency: f64, target: Duration) -> u32 {
    let count = frequency * target.as_secs_f64();
    if count.is_finite() && count > 0.0 {
        count.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Select the best endpoint, measure it for the target duration, store and forward.
pub struct CampaignRunner<P, S, U> {
    collector: SampleCollector<P>,
    store: S,
    uploader: Option<U>,
    settings: CampaignSettings,
    clock: fn() -> DateTime<Local>,
}

impl<P: Probe, S: ResultStore, U: Uploader> CampaignRunner<P, S, U> {
    pub fn new(
        collector: SampleCollector<P>,
        store: S,
        uploader: Option<U>,
        settings: CampaignSettings,
    ) -> Self {
        Self {
            collector,
            store,
            uploader,
            settings,
            clock: Local::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self, endpoints: &[EndpointDescriptor]) -> CampaignReport {
        let mut report = CampaignReport {
            best: None,
            results: ResultSet::new(),
            extended: None,
            stats: None,
            record: None,
            upload: UploadStatus::NothingToSend,
            cancelled: false,
        };

        let forced = self.settings.forced_region.as_deref();
        let best = match forced {
            Some(name) => {
                let endpoint = endpoints.iter().find(|e| e.name == name).cloned();
                if endpoint.is_some() {
                    println!("Testing specified region: {}", name);
                }
                endpoint
            }
            None => {
                println!("Finding lowest ping server...");
                let selection =
                    selector::select_best(&self.collector, endpoints, self.settings.selection_samples).await;
                report.results = selection.results;
                selection.best
            }
        };

        let Some(best) = best else {
            report.cancelled = self.collector.shutdown().is_triggered();
            return report;
        };
        report.best = Some(best.clone());

        if forced.is_none() {
            println!("\nBest Region Analysis:");
            println!("  - The best region is {} with the lowest average ping.", best.name);
        }

        if !self.collector.shutdown().is_triggered() {
            self.measure(&best, forced.is_some(), &mut report).await;
        }
        report.cancelled = self.collector.shutdown().is_triggered();

        // Whatever was last collected for the best region, selection samples included
        let samples = report
            .results
            .get(&best.name)
            .map(|result| result.samples.as_slice())
            .unwrap_or_default();
        report.stats = Some(stats::summarize(samples));

        let now = (self.clock)();
        // Checked before saving so this run's own record does not count
        let seen_this_hour = match self.store.has_record_for_hour(now.hour()) {
            Ok(seen) => seen,
            Err(e) => {
                log::warn!("Could not check for earlier records: {:#}", e);
                false
            }
        };

        let name = storage::record_name(&now, forced);
        let saved = self.store.persist(&name, &report.results);
        report.upload = match (&saved, &self.uploader) {
            (Err(_), _) => UploadStatus::NothingToSend,
            (Ok(_), _) if forced.is_some() => UploadStatus::SkippedForcedRegion,
            (Ok(_), None) => UploadStatus::Disabled,
            (Ok(_), Some(_)) if report.cancelled => UploadStatus::SkippedCancelled,
            (Ok(_), Some(_)) if seen_this_hour => UploadStatus::SkippedSameHour,
            (Ok(path), Some(uploader)) => match uploader.upload(path).await {
                Ok(outcome) => UploadStatus::Sent(outcome),
                Err(e) => {
                    log::warn!("Upload failed: {:#}", e);
                    UploadStatus::Failed(format!("{:#}", e))
                }
            },
        };
        report.record = Some(saved.map_err(|e| {
            log::warn!("Could not save results: {:#}", e);
            format!("{:#}", e)
        }));

        report
    }

    /// Estimate the probe frequency against `best`, then run the extended collection.
    ///
    /// Stops between the two phases on cancellation. An extended run cut off
    /// before its first reply leaves earlier samples in place.
    async fn measure(&self, best: &EndpointDescriptor, forced: bool, report: &mut CampaignReport) {
        let estimate = self.collector.collect(best, self.settings.selection_samples).await;
        println!("  - Approximate frequency: {:.2} pings/sec\n", estimate.frequency);
        if forced {
            report.results.insert(estimate.clone());
        }
        if self.collector.shutdown().is_triggered() {
            return;
        }

        let count = extended_sample_count(estimate.frequency, self.settings.target_duration);
        let started = (self.clock)();
        let estimated_end = chrono::Duration::from_std(self.settings.target_duration)
            .map(|d| started + d)
            .unwrap_or(started);
        println!(
            "Pinging {} for an approximate duration of {} minutes ({} probes)...",
            best.name,
            self.settings.target_duration.as_secs() / 60,
            count
        );
        println!("Don't do anything, but if you want to cancel, you can with Ctrl+C");
        println!("  - Start time: {}", started.format("%Y-%m-%d %H:%M:%S"));
        println!("  - Estimated end time: {}\n", estimated_end.format("%Y-%m-%d %H:%M:%S"));

        let extended = self.collector.collect(best, count).await;
        if extended.samples.is_empty() && self.collector.shutdown().is_triggered() {
            log::info!("Extended run for {} cancelled before any reply", best.name);
            return;
        }
        report.results.insert(extended.clone());
        report.extended = Some(extended);
    }
}

/// Print the end-of-campaign summary.
pub fn print_report(report: &CampaignReport) {
    let Some(best) = &report.best else {
        if report.cancelled {
            println!("\nCampaign cancelled before a region was chosen.\n");
        } else {
            println!("\nError:");
            println!("  - Could not determine the best region due to ping failures.\n");
        }
        return;
    };

    println!("\nResults Summary:");
    if report.cancelled {
        println!("  - Extended run cancelled; summarizing the samples collected so far");
    }
    match &report.record {
        Some(Ok(path)) => println!("  - All results saved to {}", path.display()),
        Some(Err(e)) => eprintln!("  - Could not save results: {}", e),
        None => {}
    }
    println!("  - Best region: {}", best.name);

    match &report.stats {
        Some(Ok(stats)) => print!("{}", stats::format_summary(stats)),
        Some(Err(e)) => println!("\n{}", e),
        None => {}
    }
    println!();

    match &report.upload {
        UploadStatus::Sent(UploadOutcome::Joke(joke)) => {
            println!("Results uploaded.");
            println!("{}", joke);
        }
        UploadStatus::Sent(UploadOutcome::Accepted) => println!("Results uploaded; the response carried no joke."),
        UploadStatus::Sent(UploadOutcome::Rejected(status)) => println!(
            "Upload was not accepted (HTTP {}); results are kept locally",
            status
        ),
        UploadStatus::Failed(e) => eprintln!("Upload failed: {}", e),
        UploadStatus::SkippedSameHour => {
            println!("Upload skipped: results for this hour were already collected.");
            println!("Run again next hour to send a new record.");
        }
        UploadStatus::SkippedCancelled => println!("Upload skipped: the campaign was cancelled."),
        UploadStatus::Disabled | UploadStatus::SkippedForcedRegion | UploadStatus::NothingToSend => {}
    }
}
