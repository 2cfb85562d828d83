use crate::icmp::PingSample;
use crate::utils::format_ms;

/// Smallest sample count a summary can be computed from.
pub const MIN_SAMPLES: usize = 2;
/// Smallest sample count quartiles are reported for.
pub const MIN_QUARTILE_SAMPLES: usize = 4;

/// Descriptive statistics of round-trip times, all in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionStats {
    pub count: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub stdev: f64,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub iqr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    InsufficientSamples { required: usize, found: usize },
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::InsufficientSamples { required, found } => write!(
                f,
                "Insufficient samples: {} collected, at least {} required",
                found, required
            ),
        }
    }
}

impl std::error::Error for StatsError {}

pub fn summarize(samples: &[PingSample]) -> Result<DistributionStats, StatsError> {
    let rtts: Vec<f64> = samples.iter().map(PingSample::rtt_ms).collect();
    summarize_ms(&rtts)
}

pub fn summarize_ms(rtts: &[f64]) -> Result<DistributionStats, StatsError> {
    if rtts.len() < MIN_SAMPLES {
        return Err(StatsError::InsufficientSamples {
            required: MIN_SAMPLES,
            found: rtts.len(),
        });
    }

    let mut sorted = rtts.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

    let (q1, q3) = if n >= MIN_QUARTILE_SAMPLES {
        let [q1, _, q3] = quartiles(&sorted);
        (Some(q1), Some(q3))
    } else {
        (None, None)
    };

    Ok(DistributionStats {
        count: n,
        max: sorted[n - 1],
        min: sorted[0],
        mean,
        median: median(&sorted),
        stdev: variance.sqrt(),
        q1,
        q3,
        iqr: q1.zip(q3).map(|(q1, q3)| q3 - q1),
    })
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Quartile cut points by the "exclusive" method: the i-th cut sits at
/// position i * (n + 1) / 4, linearly interpolated, with the lower index
/// clamped to [1, n - 1]. Needs at least two sorted values.
fn quartiles(sorted: &[f64]) -> [f64; 3] {
    let len = sorted.len();
    let m = len + 1;
    let mut cuts = [0.0; 3];
    for (i, cut) in (1..4).zip(cuts.iter_mut()) {
        let j = (i * m / 4).clamp(1, len - 1);
        let delta = (i * m) as f64 - (j * 4) as f64;
        *cut = (sorted[j - 1] * (4.0 - delta) + sorted[j] * delta) / 4.0;
    }
    cuts
}

/// Human-readable summary printed at the end of a campaign.
pub fn format_summary(stats: &DistributionStats) -> String {
    let mut summary = String::from("\nPing Statistics for Main Test:\n");
    summary.push_str(&format!("  - Samples: {}\n", stats.count));
    summary.push_str(&format!("  - Max Ping: {}\n", format_ms(stats.max)));
    summary.push_str(&format!("  - Min Ping: {}\n", format_ms(stats.min)));
    summary.push_str(&format!("  - Average Ping: {}\n", format_ms(stats.mean)));
    summary.push_str(&format!("  - Median Ping: {}\n", format_ms(stats.median)));
    summary.push_str(&format!("  - Standard Deviation: {}\n", format_ms(stats.stdev)));
    match (stats.q1, stats.q3, stats.iqr) {
        (Some(q1), Some(q3), Some(iqr)) => {
            summary.push_str(&format!("  - First Quartile: {}\n", format_ms(q1)));
            summary.push_str(&format!("  - Third Quartile: {}\n", format_ms(q3)));
            summary.push_str(&format!("  - Interquartile Range: {}\n", format_ms(iqr)));
        }
        _ => summary.push_str(&format!(
            "  - Quartiles: not computed (fewer than {} samples)\n",
            MIN_QUARTILE_SAMPLES
        )),
    }
    summary
}
