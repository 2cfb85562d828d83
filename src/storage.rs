use anyhow::Context;
use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::region::ResultSet;

const RECORD_PREFIX: &str = "ping_results";
const RECORD_EXT: &str = ".txt";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;
const SAMPLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Where campaign results are persisted.
pub trait ResultStore {
    /// Whether a record whose timestamp falls in `hour` (0-23) already exists.
    fn has_record_for_hour(&self, hour: u32) -> anyhow::Result<bool>;

    /// Persist `results` under the record name `target`; returns its location.
    fn persist(&self, target: &str, results: &ResultSet) -> anyhow::Result<PathBuf>;
}

/// Name of the record written at `now`, optionally tagged with a region.
pub fn record_name(now: &DateTime<Local>, region: Option<&str>) -> String {
    let stamp = now.format(STAMP_FORMAT);
    match region {
        Some(region) => format!("{}_{}_{}{}", RECORD_PREFIX, region, stamp, RECORD_EXT),
        None => format!("{}_{}{}", RECORD_PREFIX, stamp, RECORD_EXT),
    }
}

/// Hour of the timestamp that ends a record file name, if it is one.
pub fn record_hour(file_name: &str) -> Option<u32> {
    if !file_name.contains(RECORD_PREFIX) {
        return None;
    }
    let stem = file_name.strip_suffix(RECORD_EXT)?;
    let stamp = stem.get(stem.len().checked_sub(STAMP_LEN)?..)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|parsed| parsed.hour())
}

/// Text body of a record: one block per region, blank line between blocks.
pub fn render(results: &ResultSet) -> String {
    let mut body = String::new();
    for result in results.iter() {
        body.push_str(&format!("Region: {}\n", result.name()));
        for sample in &result.samples {
            body.push_str(&format!(
                "Sent: {}, Received: {}\n",
                sample.sent_at.format(SAMPLE_TIME_FORMAT),
                sample.received_at.format(SAMPLE_TIME_FORMAT)
            ));
        }
        body.push('\n');
    }
    body
}

/// Plain text records in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResultStore for FileStore {
    fn has_record_for_hour(&self, hour: u32) -> anyhow::Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Cannot list {}", self.root.display()))?;

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(found) = name.to_str().and_then(record_hour) {
                if found == hour {
                    log::debug!("Found record {:?} for hour {:02}", name, hour);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn persist(&self, target: &str, results: &ResultSet) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Cannot create {}", self.root.display()))?;
        let path = self.root.join(target);

        let mut file = fs::File::create(&path)
            .with_context(|| format!("Cannot create {}", path.display()))?;
        file.write_all(render(results).as_bytes())
            .with_context(|| format!("Cannot write {}", path.display()))?;

        log::debug!("Saved {} regions to {}", results.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::icmp::PingSample;
    use crate::region::{EndpointDescriptor, RegionResult};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fresh, empty directory under the system temp dir.
    pub fn scratch_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "regionping-{}-{}-{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, hour, minute, 9).earliest().unwrap()
    }

    #[test]
    fn test_record_names() {
        assert_eq!(record_name(&at(14, 3), None), "ping_results_20240517_140309.txt");
        assert_eq!(
            record_name(&at(14, 3), Some("Europe")),
            "ping_results_Europe_20240517_140309.txt"
        );
    }

    #[test]
    fn test_record_hour() {
        assert_eq!(record_hour("ping_results_20240517_140309.txt"), Some(14));
        assert_eq!(record_hour("ping_results_NA-East_20240517_090000.txt"), Some(9));
        assert_eq!(record_hour("ping_results_20240517_140309.log"), None);
        assert_eq!(record_hour("notes_20240517_140309.txt"), None);
        assert_eq!(record_hour("ping_results.txt"), None);
        assert_eq!(record_hour("ping_results_garbage_here.txt"), None);
    }

    #[test]
    fn test_render_blocks() {
        let sent = at(10, 0);
        let mut results = ResultSet::new();
        results.insert(RegionResult {
            samples: vec![PingSample::from_elapsed(sent, Duration::from_micros(5_250))],
            ..RegionResult::empty(EndpointDescriptor::new("Europe", "192.0.2.1"))
        });
        results.insert(RegionResult::empty(EndpointDescriptor::new("Asia", "192.0.2.2")));

        assert_eq!(
            render(&results),
            "Region: Europe\n\
             Sent: 2024-05-17 10:00:09.000000, Received: 2024-05-17 10:00:09.005250\n\
             \n\
             Region: Asia\n\
             \n"
        );
    }

    #[test]
    fn test_persist_then_hour_check() {
        let dir = scratch_dir("store");
        let store = FileStore::new(&dir);
        assert!(!store.has_record_for_hour(14).unwrap());

        let path = store.persist(&record_name(&at(14, 3), None), &ResultSet::new()).unwrap();
        assert!(path.starts_with(&dir));
        assert!(path.exists());

        assert!(store.has_record_for_hour(14).unwrap());
        assert!(!store.has_record_for_hour(15).unwrap());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_root_has_no_records() {
        let dir = scratch_dir("missing").join("not-there");
        assert!(!FileStore::new(dir).has_record_for_hour(0).unwrap());
    }
}
