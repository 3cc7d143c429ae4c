//! Completion recorder: the single write path of the player.
//!
//! Records are appended to a JSONL file with file locking so that several
//! processes can finish workouts at the same time.

use crate::{CompletedWorkoutRecord, Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Persists completed-workout records
pub trait CompletionRecorder {
    fn record_completion(&mut self, record: &CompletedWorkoutRecord) -> Result<()>;
}

/// Appends one JSON line per completed workout.
///
/// The whole line is written under an exclusive lock in a single call, so
/// concurrent players never interleave partial records.
pub struct JsonlRecorder {
    path: PathBuf,
}

impl JsonlRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append_line(&self, line: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = file.write_all(line).and_then(|_| file.sync_data());
        // Unlock even when the write failed; report the write error first
        let unlocked = file.unlock();
        written.and(unlocked)
    }
}

impl CompletionRecorder for JsonlRecorder {
    fn record_completion(&mut self, record: &CompletedWorkoutRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.append_line(&line).map_err(|e| {
            Error::Recording(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            "Recorded completion of {} ({}s) for session {} in {:?}",
            record.workout_id,
            record.duration,
            record.session_id,
            self.path
        );
        Ok(())
    }
}

/// Read all completion records from a JSONL file
pub fn read_records(path: &Path) -> Result<Vec<CompletedWorkoutRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CompletedWorkoutRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse record at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} completion records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn create_test_record(workout: &str, duration: u64) -> CompletedWorkoutRecord {
        CompletedWorkoutRecord {
            session_id: Uuid::new_v4(),
            workout_id: workout.into(),
            duration,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("completions.jsonl");

        let record = create_test_record("push", 1800);
        let mut recorder = JsonlRecorder::new(&path);
        recorder.record_completion(&record).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/dir/completions.jsonl");

        let mut recorder = JsonlRecorder::new(&path);
        for i in 0..3 {
            recorder
                .record_completion(&create_test_record("legs", i * 60))
                .unwrap();
        }

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].duration, 120);
    }

    #[test]
    fn test_unwritable_path_names_the_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("completions.jsonl");
        // A directory cannot be appended to
        std::fs::create_dir_all(&path).unwrap();

        let mut recorder = JsonlRecorder::new(&path);
        let err = recorder
            .record_completion(&create_test_record("push", 10))
            .unwrap_err();

        match err {
            Error::Recording(message) => assert!(message.contains("completions.jsonl")),
            other => panic!("expected recording error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("completions.jsonl");

        let good = create_test_record("push", 42);
        let mut contents = String::from("{ not json }\n\n");
        contents.push_str(&serde_json::to_string(&good).unwrap());
        contents.push('\n');
        std::fs::write(&path, contents).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![good]);
    }
}
