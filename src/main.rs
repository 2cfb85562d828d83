mod campaign;
mod cli;
mod collector;
mod dns;
mod icmp;
mod prober;
mod region;
mod selector;
mod stats;
mod storage;
mod upload;
mod utils;

use campaign::{CampaignRunner, CampaignSettings};
use collector::SampleCollector;
use icmp::RawSocketFactory;
use prober::Prober;
use std::time::Duration;
use storage::FileStore;
use upload::HttpUploader;

#[tokio::main]
async fn main() {
    // Enable debug logging if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    // Parse command line arguments
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            utils::exit_with_error(&format!("Invalid arguments: {}", e), 1);
        }
    };

    // Validate parameters
    if let Err(e) = utils::validate_campaign_params(args.samples, args.minutes, args.timeout_ms, args.size) {
        utils::exit_with_error(&e.to_string(), 1);
    }

    // Missing privilege is reported, not fatal: every region then ends up without samples
    if !icmp::check_raw_socket_privileges() {
        eprintln!("Warning: raw ICMP sockets are unavailable. Run as root or grant CAP_NET_RAW.");
    }

    let uploader = if args.upload {
        match HttpUploader::new(args.upload_url.clone()) {
            Ok(uploader) => Some(uploader),
            Err(e) => {
                eprintln!("Warning: uploads disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    // Setup signal handler for Ctrl+C
    let shutdown = utils::setup_signal_handler();

    let prober = Prober::new(RawSocketFactory, args.size);
    let collector = SampleCollector::new(prober, Duration::from_millis(args.timeout_ms), shutdown);
    let settings = CampaignSettings {
        selection_samples: args.samples,
        target_duration: Duration::from_secs(args.minutes * 60),
        forced_region: args.region.clone(),
    };

    log::info!(
        "Starting campaign over {} regions, results in {}",
        args.endpoints.len(),
        args.output_dir.display()
    );
    let runner = CampaignRunner::new(collector, FileStore::new(&args.output_dir), uploader, settings);
    let report = runner.run(&args.endpoints).await;

    campaign::print_report(&report);
}
