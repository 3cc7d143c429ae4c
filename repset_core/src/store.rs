//! Routine store: read-only access to workouts and their exercises.
//!
//! Routines live in a TOML file of `[[workout]]` tables. Authoring them is
//! someone else's job; the player only ever fetches one routine per session.

use crate::{Error, Exercise, Result, Routine, Workout, WorkoutId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Source of routine definitions for the player
pub trait RoutineStore {
    /// Fetch a workout and its ordered exercises.
    ///
    /// Returns [`Error::WorkoutNotFound`] for an unknown id and
    /// [`Error::InvalidRoutine`] for a routine that fails validation.
    fn fetch_workout(&self, id: &WorkoutId) -> Result<Routine>;
}

/// On-disk workout entry
#[derive(Debug, Deserialize)]
struct WorkoutEntry {
    id: String,
    title: String,
    #[serde(default, rename = "exercise")]
    exercises: Vec<ExerciseEntry>,
}

/// On-disk exercise entry; `workout_id` is implied by the enclosing table
#[derive(Debug, Deserialize)]
struct ExerciseEntry {
    id: String,
    name: String,
    sets: u32,
    reps: u32,
    weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutineFile {
    #[serde(default, rename = "workout")]
    workouts: Vec<WorkoutEntry>,
}

impl From<WorkoutEntry> for Routine {
    fn from(entry: WorkoutEntry) -> Self {
        let workout_id = WorkoutId::new(entry.id);
        let exercises = entry
            .exercises
            .into_iter()
            .map(|e| Exercise {
                id: e.id,
                workout_id: workout_id.clone(),
                name: e.name,
                sets: e.sets,
                reps: e.reps,
                weight: e.weight,
            })
            .collect();

        Routine {
            workout: Workout {
                id: workout_id,
                title: entry.title,
            },
            exercises,
        }
    }
}

/// Check a fetched routine before handing it to a session
fn checked(routine: Routine) -> Result<Routine> {
    let errors = routine.validate();
    if errors.is_empty() {
        Ok(routine)
    } else {
        Err(Error::InvalidRoutine(errors.join("; ")))
    }
}

/// Routine store backed by a TOML file
pub struct FileRoutineStore {
    path: PathBuf,
}

impl FileRoutineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(&self) -> Result<RoutineFile> {
        if !self.path.exists() {
            tracing::info!("No routine file at {:?}", self.path);
            return Ok(RoutineFile::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let file: RoutineFile = toml::from_str(&contents)?;
        tracing::debug!(
            "Read {} workouts from {:?}",
            file.workouts.len(),
            self.path
        );
        Ok(file)
    }
}

impl RoutineStore for FileRoutineStore {
    fn fetch_workout(&self, id: &WorkoutId) -> Result<Routine> {
        let file = self.read_file()?;
        let entry = file
            .workouts
            .into_iter()
            .find(|w| w.id == id.as_str())
            .ok_or_else(|| Error::WorkoutNotFound(id.clone()))?;

        checked(Routine::from(entry))
    }
}

/// Routine store held in memory
#[derive(Debug, Default)]
pub struct MemoryRoutineStore {
    routines: HashMap<WorkoutId, Routine>,
}

impl MemoryRoutineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, routine: Routine) {
        self.routines.insert(routine.id().clone(), routine);
    }

    pub fn with(mut self, routine: Routine) -> Self {
        self.insert(routine);
        self
    }
}

impl RoutineStore for MemoryRoutineStore {
    fn fetch_workout(&self, id: &WorkoutId) -> Result<Routine> {
        let routine = self
            .routines
            .get(id)
            .cloned()
            .ok_or_else(|| Error::WorkoutNotFound(id.clone()))?;

        checked(routine)
    }
}
