use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

use crate::icmp::DEFAULT_PAYLOAD_SIZE;
use crate::region::{self, EndpointDescriptor};
use crate::upload::DEFAULT_UPLOAD_URL;

#[derive(Debug, Clone)]
pub struct CampaignArgs {
    pub region: Option<String>,
    pub minutes: u64,
    pub samples: u32,
    pub timeout_ms: u64,
    pub size: usize,
    pub output_dir: PathBuf,
    pub endpoints: Vec<EndpointDescriptor>,
    pub upload: bool,
    pub upload_url: String,
}

impl Default for CampaignArgs {
    fn default() -> Self {
        Self {
            region: None,
            minutes: 10,
            samples: 10,
            timeout_ms: 1000,
            size: DEFAULT_PAYLOAD_SIZE,
            output_dir: PathBuf::from("."),
            endpoints: region::default_endpoints(),
            upload: true,
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
        }
    }
}

pub fn build_cli() -> Command {
    Command::new("regionping")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Finds the lowest-latency region over ICMP echo and measures it for a while")
        .arg(
            Arg::new("region")
                .short('r')
                .long("region")
                .help("Measure only this region instead of picking the fastest")
                .value_name("NAME")
        )
        .arg(
            Arg::new("time")
                .short('t')
                .long("time")
                .help("Duration of the extended measurement in minutes")
                .value_name("MINUTES")
                .value_parser(clap::value_parser!(u64))
        )
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .help("Echo requests per region while choosing the fastest")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("timeout")
                .short('w')
                .long("timeout")
                .help("Timeout in milliseconds to wait for each reply")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
        )
        .arg(
            Arg::new("size")
                .short('l')
                .long("size")
                .help("Echo payload size in bytes")
                .value_name("BYTES")
                .value_parser(clap::value_parser!(usize))
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .help("Directory result files are written to and looked up in")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
        )
        .arg(
            Arg::new("endpoint")
                .short('e')
                .long("endpoint")
                .help("Candidate region as NAME=HOST; repeat to replace the built-in list")
                .value_name("NAME=HOST")
                .action(ArgAction::Append)
        )
        .arg(
            Arg::new("no_upload")
                .long("no-upload")
                .help("Keep results local")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("upload_url")
                .long("upload-url")
                .help("Where result files are posted")
                .value_name("URL")
        )
}

pub fn parse_args() -> anyhow::Result<CampaignArgs> {
    args_from_matches(&build_cli().get_matches())
}

fn args_from_matches(matches: &ArgMatches) -> anyhow::Result<CampaignArgs> {
    let mut args = CampaignArgs::default();

    args.region = matches.get_one::<String>("region").cloned();
    args.upload = !matches.get_flag("no_upload");

    if let Some(minutes) = matches.get_one::<u64>("time") {
        args.minutes = *minutes;
    }

    if let Some(samples) = matches.get_one::<u32>("samples") {
        args.samples = *samples;
    }

    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        args.timeout_ms = *timeout;
    }

    if let Some(size) = matches.get_one::<usize>("size") {
        args.size = *size;
    }

    if let Some(dir) = matches.get_one::<PathBuf>("output_dir") {
        args.output_dir = dir.clone();
    }

    if let Some(url) = matches.get_one::<String>("upload_url") {
        args.upload_url = url.clone();
    }

    if let Some(entries) = matches.get_many::<String>("endpoint") {
        args.endpoints = entries
            .map(|entry| EndpointDescriptor::parse(entry))
            .collect::<anyhow::Result<_>>()?;
    }

    // Validation
    if let Some(region) = &args.region {
        if !args.endpoints.iter().any(|e| &e.name == region) {
            let known: Vec<&str> = args.endpoints.iter().map(|e| e.name.as_str()).collect();
            return Err(anyhow::anyhow!(
                "Unknown region '{}'. Available regions: {}",
                region,
                known.join(", ")
            ));
        }
    }

    Ok(args)
}
