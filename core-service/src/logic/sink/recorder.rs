//! Transmission Recorder
//!
//! Append-only JSONL writer: one `RecordLine` per line, rotated by size.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{SinkError, TransmissionSink};
use crate::logic::engine::{CountersSnapshot, TransmissionEvent};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Maximum file size before rotation (50 MB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const LOG_PREFIX: &str = "transmissions";
const LOG_EXT: &str = "jsonl";

// ============================================================================
// RECORD FORMAT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordLine {
    Event(TransmissionEvent),
    Metrics(CountersSnapshot),
}

// ============================================================================
// RECORDER
// ============================================================================

pub struct JsonlRecorder {
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_size: u64,
    base_dir: PathBuf,
    max_file_size: u64,
    file_index: u32,
    lines_written: u64,
}

impl JsonlRecorder {
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::with_max_size(base_dir, MAX_FILE_SIZE)
    }

    pub fn with_max_size(base_dir: impl Into<PathBuf>, max_file_size: u64) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        let (current_file, file) = Self::open_new_file(&base_dir, 0)?;

        Ok(Self {
            writer: BufWriter::new(file),
            current_file,
            current_size: 0,
            base_dir,
            max_file_size,
            file_index: 0,
            lines_written: 0,
        })
    }

    fn open_new_file(base_dir: &Path, index: u32) -> std::io::Result<(PathBuf, File)> {
        let filename = format!(
            "{}_{}_{:03}.{}",
            LOG_PREFIX,
            Utc::now().format("%Y_%m_%d_%H%M%S"),
            index,
            LOG_EXT
        );
        let file_path = base_dir.join(filename);

        let file = OpenOptions::new().create(true).append(true).open(&file_path)?;

        log::info!("Opened transmission log: {}", file_path.display());
        Ok((file_path, file))
    }

    pub fn record(&mut self, line: &RecordLine) -> Result<(), SinkError> {
        let json = serde_json::to_string(line)?;
        let bytes = json.as_bytes();

        if self.current_size > 0 && self.current_size + bytes.len() as u64 + 1 > self.max_file_size {
            self.rotate()?;
        }

        self.writer.write_all(bytes)?;
        self.writer.write_all(b"\n")?;
        self.current_size += bytes.len() as u64 + 1;
        self.writer.flush()?;

        self.lines_written += 1;
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;

        self.file_index += 1;
        let (new_path, new_file) = Self::open_new_file(&self.base_dir, self.file_index)?;
        self.writer = BufWriter::new(new_file);

        log::info!("Rotated {} → {}", self.current_file.display(), new_path.display());
        self.current_file = new_path;
        self.current_size = 0;
        Ok(())
    }

    pub fn current_file(&self) -> &Path {
        &self.current_file
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

impl TransmissionSink for JsonlRecorder {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn publish(&mut self, event: &TransmissionEvent) -> Result<(), SinkError> {
        self.record(&RecordLine::Event(event.clone()))
    }

    fn publish_metrics(&mut self, snapshot: &CountersSnapshot) -> Result<(), SinkError> {
        self.record(&RecordLine::Metrics(*snapshot))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// QUERY API
// ============================================================================

/// Read every line of a recorder file; unparsable lines are skipped
pub fn read_records(file_path: &Path) -> std::io::Result<Vec<RecordLine>> {
    let reader = BufReader::new(File::open(file_path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RecordLine>(&line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping bad line in {}: {}", file_path.display(), e),
        }
    }

    Ok(records)
}

/// Only the transmission events of a recorder file
pub fn read_events(file_path: &Path) -> std::io::Result<Vec<TransmissionEvent>> {
    Ok(read_records(file_path)?
        .into_iter()
        .filter_map(|r| match r {
            RecordLine::Event(e) => Some(e),
            RecordLine::Metrics(_) => None,
        })
        .collect())
}

/// Recorder files in `dir`, oldest first
pub fn list_log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == LOG_EXT) {
                files.push(path);
            }
        }
    }

    // names embed timestamp and index
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::engine::{Reason, RunningCounters, Verdict};
    use tempfile::TempDir;

    fn event(sequence: u64, reason: Reason) -> TransmissionEvent {
        TransmissionEvent {
            sequence,
            slot_id: "slot2".into(),
            timestamp: Utc::now(),
            occupied: false,
            probability: 0.8,
            reason,
            verdict: reason.verdict(),
        }
    }

    #[test]
    fn test_recorder_creation() {
        let dir = TempDir::new().unwrap();
        let recorder = JsonlRecorder::new(dir.path()).unwrap();
        assert!(recorder.current_file().exists());
    }

    #[test]
    fn test_events_and_metrics_read_back() {
        let dir = TempDir::new().unwrap();
        let mut recorder = JsonlRecorder::new(dir.path()).unwrap();

        recorder.publish(&event(1, Reason::ActualChange)).unwrap();
        recorder.publish(&event(3, Reason::PredChange)).unwrap();
        let mut counters = RunningCounters::new();
        counters.record(Verdict::Transmit);
        recorder.publish_metrics(&counters.snapshot()).unwrap();

        let records = read_records(recorder.current_file()).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[2], RecordLine::Metrics(_)));

        let events = read_events(recorder.current_file()).unwrap();
        assert_eq!(events.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(events[1].reason, Reason::PredChange);
    }

    #[test]
    fn test_jsonl_format() {
        let dir = TempDir::new().unwrap();
        let mut recorder = JsonlRecorder::new(dir.path()).unwrap();
        recorder.publish(&event(1, Reason::ActualChange)).unwrap();

        let content = std::fs::read_to_string(recorder.current_file()).unwrap();
        let line = content.lines().next().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["reason"], "ACTUAL_CHANGE");
    }

    #[test]
    fn test_rotation_by_size() {
        let dir = TempDir::new().unwrap();
        let mut recorder = JsonlRecorder::with_max_size(dir.path(), 300).unwrap();

        for i in 0..6 {
            recorder.publish(&event(i, Reason::ActualChange)).unwrap();
        }

        let files = list_log_files(dir.path()).unwrap();
        assert!(files.len() > 1);

        let total: usize = files.iter().map(|f| read_events(f).unwrap().len()).sum();
        assert_eq!(total, 6);
        assert_eq!(recorder.lines_written(), 6);
    }

    #[test]
    fn test_list_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let _recorder = JsonlRecorder::new(dir.path()).unwrap();
        assert_eq!(list_log_files(dir.path()).unwrap().len(), 1);
    }
}
