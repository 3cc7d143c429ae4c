//! Read-only views of a session for the presentation layer.
//!
//! Each variant carries only the fields that mean something in that mode,
//! so a view cannot read a rest countdown while a set is active.

use crate::{Exercise, Workout, WorkoutId};
use serde::Serialize;

/// Outcome of the completion write
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RecordingStatus {
    Pending,
    Saved,
    Failed(String),
}

/// Point-in-time view of a session
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Snapshot {
    Loading {
        workout_id: WorkoutId,
    },
    ActiveSet {
        workout: Workout,
        exercise: Exercise,
        exercise_index: usize,
        exercise_count: usize,
        /// 0-based index of the set being performed
        set_index: u32,
        elapsed_seconds: u64,
    },
    Resting {
        workout: Workout,
        /// The exercise whose set was just finished
        exercise: Exercise,
        exercise_index: usize,
        exercise_count: usize,
        /// Already advanced: the set that follows this rest, or
        /// `exercise.sets` when the exercise is done
        set_index: u32,
        /// What comes after the rest
        up_next: Exercise,
        rest_remaining: u32,
        elapsed_seconds: u64,
    },
    Completed {
        workout: Workout,
        elapsed_seconds: u64,
        recording: RecordingStatus,
    },
    Failed {
        workout_id: WorkoutId,
        reason: String,
    },
    Closed,
}

impl Snapshot {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Snapshot::Completed { .. } | Snapshot::Failed { .. } | Snapshot::Closed
        )
    }

    pub fn elapsed_seconds(&self) -> Option<u64> {
        match self {
            Snapshot::ActiveSet {
                elapsed_seconds, ..
            }
            | Snapshot::Resting {
                elapsed_seconds, ..
            }
            | Snapshot::Completed {
                elapsed_seconds, ..
            } => Some(*elapsed_seconds),
            _ => None,
        }
    }
}
