//! Client-side latency recording for the one-shot client and the
//! throughput benchmark driver. See `spec.md` §6's "Persisted outputs":
//! `msg,key,version,timestamp,latency_ns,bytes,success` CSV rows.

use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::error::Result;

/// One measured client request.
#[derive(Debug, Clone)]
pub struct Latency {
    pub msg: &'static str,
    pub key: String,
    pub version: Option<String>,
    pub latency_ns: u128,
    pub bytes: usize,
    pub success: bool,
}

impl Latency {
    pub fn new(msg: &'static str, key: impl Into<String>, version: Option<String>, latency: std::time::Duration, bytes: usize, success: bool) -> Self {
        Self {
            msg,
            key: key.into(),
            version,
            latency_ns: latency.as_nanos(),
            bytes,
            success,
        }
    }
}

/// Append-mode CSV writer for client-observed latencies. Opens the file
/// once, writes the header if the file is new, then appends one row per
/// `record` call.
pub struct ResultsWriter {
    file: std::fs::File,
}

impl ResultsWriter {
    pub fn open(path: &Path) -> Result<Self> {
        let is_new = !path.exists();
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "msg,key,version,timestamp,latency_ns,bytes,success")?;
        }
        Ok(Self { file })
    }

    pub fn record(&mut self, latency: &Latency) -> Result<()> {
        writeln!(
            self.file,
            "{},{},{},{},{},{},{}",
            latency.msg,
            latency.key,
            latency.version.as_deref().unwrap_or(""),
            Utc::now().to_rfc3339(),
            latency.latency_ns,
            latency.bytes,
            latency.success,
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn header_is_written_once_across_multiple_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latencies.csv");

        {
            let mut writer = ResultsWriter::open(&path).unwrap();
            writer
                .record(&Latency::new("get", "x", Some("1.1".into()), Duration::from_micros(50), 3, true))
                .unwrap();
        }
        {
            let mut writer = ResultsWriter::open(&path).unwrap();
            writer
                .record(&Latency::new("put", "y", Some("2.1".into()), Duration::from_micros(80), 5, true))
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "msg,key,version,timestamp,latency_ns,bytes,success");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn missing_version_renders_as_an_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latencies.csv");
        let mut writer = ResultsWriter::open(&path).unwrap();
        writer.record(&Latency::new("get", "missing", None, Duration::from_micros(1), 0, false)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert!(row.starts_with("get,missing,,"));
        assert!(row.ends_with(",0,false"));
    }
}
