#![warn(missing_docs)]
//! Deterministic trace surfaces for headless runs and tests.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use splitear_core::SimTick;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One source's rendered state at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSourceRecord {
    /// Simulation tick the record was taken at.
    pub tick: SimTick,
    /// Source name.
    pub source: String,
    /// Number of listeners folded into `rendered`.
    pub listeners: usize,
    /// Where the source really is.
    pub nominal: [f32; 3],
    /// Where the physical listener hears it.
    pub rendered: [f32; 3],
    /// Distance from the physical listener to `rendered`.
    pub distance: f32,
    /// Playback gain after rolloff and volume settings.
    pub gain: f32,
    /// Whether the source was playing after the tick.
    pub playing: bool,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    writer: BufWriter<File>,
    written: usize,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create trace directory {}", parent.display())
                })?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create trace {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append a record to the log.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read every record from a newline-delimited JSON file.
pub fn read_jsonl<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Bad record on line {} of {}", index + 1, path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_round_trip_through_a_trace_file() {
        let path = std::env::temp_dir()
            .join(format!("splitear_testkit_{}", std::process::id()))
            .join("trace.jsonl");
        let record = RenderedSourceRecord {
            tick: SimTick(3),
            source: "fire".into(),
            listeners: 2,
            nominal: [1.0, 0.0, 2.0],
            rendered: [0.0, 0.0, 4.0],
            distance: 4.0,
            gain: 0.5,
            playing: true,
        };

        let mut sink = JsonlSink::create(&path).expect("can create trace");
        sink.write(&record).expect("can write record");
        sink.write(&record).expect("can write record");
        sink.flush().expect("can flush");
        assert_eq!(sink.written(), 2);

        let records: Vec<RenderedSourceRecord> = read_jsonl(&path).expect("can read trace");
        assert_eq!(records, vec![record.clone(), record]);

        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }
}
