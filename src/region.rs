use crate::icmp::PingSample;

/// A named network target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: String,
    pub host: String,
}

impl EndpointDescriptor {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }

    /// Parse a `NAME=HOST` command line entry.
    pub fn parse(entry: &str) -> anyhow::Result<Self> {
        let (name, host) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Endpoint '{}' must look like NAME=HOST", entry))?;
        let (name, host) = (name.trim(), host.trim());
        if name.is_empty() || host.is_empty() {
            return Err(anyhow::anyhow!("Endpoint '{}' has an empty name or host", entry));
        }
        Ok(Self::new(name, host))
    }
}

/// Built-in region table, probed in this order.
pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    [
        ("NA-East", "ping-nae.ds.on.epicgames.com"),
        ("NA-Central", "ping-nac.ds.on.epicgames.com"),
        ("NA-West", "ping-naw.ds.on.epicgames.com"),
        ("Europe", "ping-eu.ds.on.epicgames.com"),
        ("Oceania", "ping-oce.ds.on.epicgames.com"),
        ("Brazil", "ping-br.ds.on.epicgames.com"),
        ("Asia", "ping-asia.ds.on.epicgames.com"),
    ]
    .into_iter()
    .map(|(name, host)| EndpointDescriptor::new(name, host))
    .collect()
}

/// Samples gathered from one endpoint in one collection run.
#[derive(Debug, Clone)]
pub struct RegionResult {
    pub endpoint: EndpointDescriptor,
    pub samples: Vec<PingSample>,
    /// Requested probes per second of wall-clock time, 0 if no time elapsed.
    pub frequency: f64,
    pub timeouts: u32,
    /// Last socket or resolution fault seen during the run, if any.
    pub fault: Option<String>,
}

impl RegionResult {
    pub fn empty(endpoint: EndpointDescriptor) -> Self {
        Self {
            endpoint,
            samples: Vec::new(),
            frequency: 0.0,
            timeouts: 0,
            fault: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    /// Arithmetic mean RTT in milliseconds, `None` without samples.
    pub fn mean_rtt_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(PingSample::rtt_ms).sum();
        Some(total / self.samples.len() as f64)
    }
}

/// Results keyed by region name, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<RegionResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing an existing entry of the same name in place.
    pub fn insert(&mut self, result: RegionResult) {
        match self.entries.iter_mut().find(|r| r.name() == result.name()) {
            Some(existing) => *existing = result,
            None => self.entries.push(result),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegionResult> {
        self.entries.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
