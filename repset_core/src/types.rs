//! Core domain types for workout playback.
//!
//! Workouts and exercises are owned by the routine store and are read-only
//! here. The only record this crate ever produces is the
//! [`CompletedWorkoutRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque workout identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkoutId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WorkoutId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Routine Types
// ============================================================================

/// A named workout (routine header)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: WorkoutId,
    pub title: String,
}

/// One exercise within a workout, in execution order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    /// Back-reference to the owning workout
    pub workout_id: WorkoutId,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: Option<f64>,
}

/// A workout together with its ordered exercise sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
}

impl Routine {
    pub fn id(&self) -> &WorkoutId {
        &self.workout.id
    }

    pub fn title(&self) -> &str {
        &self.workout.title
    }

    /// Number of "set done" intents needed to finish the routine
    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }

    /// Check the routine for structural problems
    ///
    /// Returns an empty list when the routine can be played.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.workout.id.as_str().is_empty() {
            errors.push("Workout has empty ID".to_string());
        }
        if self.workout.title.trim().is_empty() {
            errors.push(format!("Workout '{}' has empty title", self.workout.id));
        }

        for (index, exercise) in self.exercises.iter().enumerate() {
            let label = if exercise.name.is_empty() {
                format!("#{}", index + 1)
            } else {
                format!("'{}'", exercise.name)
            };

            if exercise.id.is_empty() {
                errors.push(format!("Exercise {} has empty ID", label));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise {} has empty name", label));
            }
            if exercise.workout_id != self.workout.id {
                errors.push(format!(
                    "Exercise {} belongs to workout '{}', not '{}'",
                    label, exercise.workout_id, self.workout.id
                ));
            }
            if exercise.sets == 0 {
                errors.push(format!("Exercise {} must have at least one set", label));
            }
            if exercise.reps == 0 {
                errors.push(format!("Exercise {} must have at least one rep", label));
            }
            if let Some(weight) = exercise.weight {
                if !weight.is_finite() || weight < 0.0 {
                    errors.push(format!("Exercise {} has invalid weight {}", label, weight));
                }
            }
        }

        errors
    }
}

// ============================================================================
// Completion Record
// ============================================================================

/// The persisted fact that a session reached its terminal state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedWorkoutRecord {
    pub session_id: Uuid,
    pub workout_id: WorkoutId,
    /// Whole seconds from session start to completion
    pub duration: u64,
    pub completed_at: DateTime<Utc>,
}
