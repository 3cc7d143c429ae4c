//! Workout session state machine.
//!
//! A [`Session`] consumes one [`Event`] at a time and answers with the
//! [`Effect`]s the host must carry out. It never performs I/O itself, so the
//! single completion write and the timer scheduling stay with the caller.
//!
//! ```text
//! Loading ──► ActiveSet ◄──► Resting
//!    │            │
//!    │            └──(last set of last exercise)──► Completed
//!    └──(no exercises)──► Completed
//!    └──(fetch failed)──► Failed
//! any ──(close)──► Closed
//! ```

use crate::clock::elapsed_seconds;
use crate::snapshot::{RecordingStatus, Snapshot};
use crate::timer::{Countdown, Tick, TimerToken};
use crate::{CompletedWorkoutRecord, Routine, WorkoutId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Input to the state machine
#[derive(Clone, Debug)]
pub enum Event {
    /// Routine fetch finished
    Loaded(Routine),
    /// Routine fetch failed
    LoadFailed(String),
    /// User finished the current set
    SetCompleted,
    /// User wants to end the rest early
    SkipRest,
    /// One second of rest elapsed
    Tick(TimerToken),
    /// Host view is going away
    Close,
}

/// Side effect requested by a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    StartTimer(TimerToken),
    CancelTimer(TimerToken),
    /// Persist the completion. Emitted at most once per session.
    Record(CompletedWorkoutRecord),
}

/// Coarse session mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Loading,
    ActiveSet,
    Resting,
    Completed,
    Failed,
    Closed,
}

#[derive(Clone, Debug, PartialEq)]
enum Phase {
    Loading,
    Active { exercise: usize, set: u32 },
    Resting { exercise: usize, set: u32 },
    Completed { recording: RecordingStatus },
    Failed { reason: String },
    Closed,
}

/// One playback of a routine
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    workout_id: WorkoutId,
    routine: Option<Routine>,
    phase: Phase,
    started_at: DateTime<Utc>,
    elapsed: u64,
    rest_seconds: u32,
    countdown: Countdown,
    completion_issued: bool,
}

impl Session {
    /// Create a session in `Loading`. A rest interval of zero is raised to
    /// one second so that a rest is always interposed between sets.
    pub fn new(workout_id: WorkoutId, rest_seconds: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workout_id,
            routine: None,
            phase: Phase::Loading,
            started_at,
            elapsed: 0,
            rest_seconds: rest_seconds.max(1),
            countdown: Countdown::new(),
            completion_issued: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workout_id(&self) -> &WorkoutId {
        &self.workout_id
    }

    pub fn routine(&self) -> Option<&Routine> {
        self.routine.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn rest_seconds(&self) -> u32 {
        self.rest_seconds
    }

    pub fn mode(&self) -> Mode {
        match self.phase {
            Phase::Loading => Mode::Loading,
            Phase::Active { .. } => Mode::ActiveSet,
            Phase::Resting { .. } => Mode::Resting,
            Phase::Completed { .. } => Mode::Completed,
            Phase::Failed { .. } => Mode::Failed,
            Phase::Closed => Mode::Closed,
        }
    }

    /// Current `(exercise_index, set_index)` while active or resting
    pub fn position(&self) -> Option<(usize, u32)> {
        match self.phase {
            Phase::Active { exercise, set } | Phase::Resting { exercise, set } => {
                Some((exercise, set))
            }
            _ => None,
        }
    }

    pub fn rest_remaining(&self) -> Option<u32> {
        match self.phase {
            Phase::Resting { .. } => self.countdown.remaining(),
            _ => None,
        }
    }

    /// Elapsed seconds as last observed; frozen once completed
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            Phase::Completed { .. } | Phase::Failed { .. } | Phase::Closed
        )
    }

    /// Apply one event at time `now`
    pub fn handle(&mut self, event: Event, now: DateTime<Utc>) -> Vec<Effect> {
        self.observe(now);

        let effects = match event {
            Event::Loaded(routine) => self.on_loaded(routine, now),
            Event::LoadFailed(reason) => self.on_load_failed(reason),
            Event::SetCompleted => self.on_set_completed(now),
            Event::SkipRest => self.on_skip_rest(),
            Event::Tick(token) => self.on_tick(token),
            Event::Close => self.on_close(),
        };

        tracing::trace!("Session {} now {:?}", self.id, self.phase);
        effects
    }

    /// Feed back the outcome of an [`Effect::Record`]
    pub fn acknowledge_recording(&mut self, result: std::result::Result<(), String>) {
        if let Phase::Completed { recording } = &mut self.phase {
            *recording = match result {
                Ok(()) => RecordingStatus::Saved,
                Err(message) => RecordingStatus::Failed(message),
            };
        }
    }

    /// Build a view of the session at time `now`
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let live_elapsed = self.elapsed.max(elapsed_seconds(self.started_at, now));

        match (&self.phase, &self.routine) {
            (Phase::Loading, _) => Snapshot::Loading {
                workout_id: self.workout_id.clone(),
            },
            (Phase::Active { exercise, set }, Some(routine)) => Snapshot::ActiveSet {
                workout: routine.workout.clone(),
                exercise: routine.exercises[*exercise].clone(),
                exercise_index: *exercise,
                exercise_count: routine.exercises.len(),
                set_index: *set,
                elapsed_seconds: live_elapsed,
            },
            (Phase::Resting { exercise, set }, Some(routine)) => {
                let current = &routine.exercises[*exercise];
                let up_next = if *set >= current.sets {
                    &routine.exercises[*exercise + 1]
                } else {
                    current
                };
                Snapshot::Resting {
                    workout: routine.workout.clone(),
                    exercise: current.clone(),
                    exercise_index: *exercise,
                    exercise_count: routine.exercises.len(),
                    set_index: *set,
                    up_next: up_next.clone(),
                    rest_remaining: self.countdown.remaining().unwrap_or(0),
                    elapsed_seconds: live_elapsed,
                }
            }
            (Phase::Completed { recording }, Some(routine)) => Snapshot::Completed {
                workout: routine.workout.clone(),
                elapsed_seconds: self.elapsed,
                recording: recording.clone(),
            },
            (Phase::Failed { reason }, _) => Snapshot::Failed {
                workout_id: self.workout_id.clone(),
                reason: reason.clone(),
            },
            // Active, resting and completed always hold a routine
            (Phase::Closed, _) | (_, None) => Snapshot::Closed,
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn observe(&mut self, now: DateTime<Utc>) {
        if matches!(self.phase, Phase::Active { .. } | Phase::Resting { .. }) {
            self.elapsed = self.elapsed.max(elapsed_seconds(self.started_at, now));
        }
    }

    fn on_loaded(&mut self, routine: Routine, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Loading {
            tracing::trace!("Ignoring routine load outside Loading");
            return Vec::new();
        }

        let errors = routine.validate();
        if !errors.is_empty() {
            return self.on_load_failed(format!("Invalid routine: {}", errors.join("; ")));
        }

        let empty = routine.exercises.is_empty();
        tracing::debug!(
            "Loaded '{}' with {} exercises ({} sets)",
            routine.title(),
            routine.exercises.len(),
            routine.total_sets()
        );
        self.routine = Some(routine);

        if empty {
            tracing::info!("Routine {} has no exercises, completing", self.workout_id);
            return self.complete(0, now);
        }

        self.phase = Phase::Active {
            exercise: 0,
            set: 0,
        };
        Vec::new()
    }

    fn on_load_failed(&mut self, reason: String) -> Vec<Effect> {
        if self.phase != Phase::Loading {
            return Vec::new();
        }

        tracing::warn!("Could not load workout {}: {}", self.workout_id, reason);
        self.phase = Phase::Failed { reason };
        Vec::new()
    }

    fn on_set_completed(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let Phase::Active { exercise, set } = self.phase else {
            tracing::trace!("Ignoring set completion in {:?}", self.mode());
            return Vec::new();
        };
        let Some(routine) = &self.routine else {
            return Vec::new();
        };

        let next_set = set + 1;
        let finished_exercise = next_set >= routine.exercises[exercise].sets;
        let last_exercise = exercise + 1 == routine.exercises.len();

        if finished_exercise && last_exercise {
            let elapsed = self.elapsed.max(elapsed_seconds(self.started_at, now));
            return self.complete(elapsed, now);
        }

        let token = self.countdown.start(self.rest_seconds);
        self.phase = Phase::Resting {
            exercise,
            set: next_set,
        };
        tracing::debug!(
            "Set {} of exercise {} done, resting {}s",
            next_set,
            exercise,
            self.rest_seconds
        );
        vec![Effect::StartTimer(token)]
    }

    fn on_tick(&mut self, token: TimerToken) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Resting { .. }) {
            tracing::trace!("Ignoring tick {:?} in {:?}", token, self.mode());
            return Vec::new();
        }

        match self.countdown.tick(token) {
            Tick::Remaining(_) => Vec::new(),
            Tick::Expired => {
                tracing::debug!("Rest expired");
                self.end_rest();
                vec![Effect::CancelTimer(token)]
            }
            Tick::Stale => {
                tracing::trace!("Ignoring stale tick {:?}", token);
                Vec::new()
            }
        }
    }

    fn on_skip_rest(&mut self) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Resting { .. }) {
            tracing::trace!("Ignoring skip rest in {:?}", self.mode());
            return Vec::new();
        }

        let cancelled = self.countdown.cancel();
        tracing::debug!("Rest skipped");
        self.end_rest();
        cancelled.map(Effect::CancelTimer).into_iter().collect()
    }

    fn on_close(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Closed {
            return Vec::new();
        }

        let effects: Vec<Effect> = self
            .countdown
            .cancel()
            .map(Effect::CancelTimer)
            .into_iter()
            .collect();

        if !matches!(self.phase, Phase::Completed { .. }) {
            tracing::info!("Session {} closed before completion", self.id);
        }
        self.phase = Phase::Closed;
        effects
    }

    /// Leave `Resting`, moving to the next exercise if this one is done
    fn end_rest(&mut self) {
        let Phase::Resting { exercise, set } = self.phase else {
            return;
        };
        let Some(routine) = &self.routine else {
            return;
        };

        self.phase = if set >= routine.exercises[exercise].sets {
            Phase::Active {
                exercise: exercise + 1,
                set: 0,
            }
        } else {
            Phase::Active { exercise, set }
        };
    }

    fn complete(&mut self, elapsed: u64, now: DateTime<Utc>) -> Vec<Effect> {
        if self.completion_issued {
            return Vec::new();
        }
        self.completion_issued = true;

        self.countdown.cancel();
        self.elapsed = elapsed;
        self.phase = Phase::Completed {
            recording: RecordingStatus::Pending,
        };
        tracing::info!(
            "Workout {} completed in {}s",
            self.workout_id,
            elapsed
        );

        vec![Effect::Record(CompletedWorkoutRecord {
            session_id: self.id,
            workout_id: self.workout_id.clone(),
            duration: elapsed,
            completed_at: now,
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exercise, Workout};
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn routine(sets: &[u32]) -> Routine {
        let exercises = sets
            .iter()
            .enumerate()
            .map(|(i, &sets)| Exercise {
                id: format!("ex{}", i),
                workout_id: "w1".into(),
                name: format!("Exercise {}", i),
                sets,
                reps: 10,
                weight: Some(20.0),
            })
            .collect();

        Routine {
            workout: Workout {
                id: "w1".into(),
                title: "Test Workout".into(),
            },
            exercises,
        }
    }

    fn loaded(sets: &[u32], rest: u32) -> Session {
        let mut session = Session::new("w1".into(), rest, t0());
        let effects = session.handle(Event::Loaded(routine(sets)), t0());
        assert!(effects.is_empty());
        session
    }

    fn records(effects: &[Effect]) -> Vec<&CompletedWorkoutRecord> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Record(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_starts_in_loading() {
        let session = Session::new("w1".into(), 30, t0());
        assert_eq!(session.mode(), Mode::Loading);
        assert_eq!(session.position(), None);
    }

    #[test]
    fn test_single_exercise_three_sets() {
        let mut session = loaded(&[3], 30);
        assert_eq!(session.mode(), Mode::ActiveSet);
        assert_eq!(session.position(), Some((0, 0)));

        // Set 1 done: rest, upcoming set already shown
        let effects = session.handle(Event::SetCompleted, t0());
        assert!(matches!(effects.as_slice(), [Effect::StartTimer(_)]));
        assert_eq!(session.mode(), Mode::Resting);
        assert_eq!(session.position(), Some((0, 1)));
        assert_eq!(session.rest_remaining(), Some(30));

        session.handle(Event::SkipRest, t0());
        assert_eq!(session.position(), Some((0, 1)));

        session.handle(Event::SetCompleted, t0());
        assert_eq!(session.mode(), Mode::Resting);
        session.handle(Event::SkipRest, t0());
        assert_eq!(session.position(), Some((0, 2)));

        // Final set: no rest
        let effects = session.handle(Event::SetCompleted, t0() + Duration::seconds(75));
        assert_eq!(session.mode(), Mode::Completed);
        let recs = records(&effects);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].duration, 75);
        assert_eq!(recs[0].workout_id.as_str(), "w1");
        assert_eq!(recs[0].session_id, session.id());
    }

    #[test]
    fn test_set_completions_equal_total_sets() {
        for sets in [vec![1], vec![2, 3], vec![4, 1, 2], vec![1, 1, 1, 1]] {
            let mut session = loaded(&sets, 5);
            let mut intents = 0;

            while session.mode() != Mode::Completed {
                match session.mode() {
                    Mode::ActiveSet => {
                        session.handle(Event::SetCompleted, t0());
                        intents += 1;
                    }
                    Mode::Resting => {
                        session.handle(Event::SkipRest, t0());
                    }
                    other => panic!("unexpected mode {:?}", other),
                }
            }

            assert_eq!(intents, sets.iter().sum::<u32>(), "sets {:?}", sets);
        }
    }

    #[test]
    fn test_exercise_advances_when_rest_ends() {
        let mut session = loaded(&[1, 2], 10);

        session.handle(Event::SetCompleted, t0());
        // Rest still refers to the exercise just finished
        assert_eq!(session.position(), Some((0, 1)));

        let snapshot = session.snapshot(t0());
        match snapshot {
            Snapshot::Resting {
                exercise, up_next, ..
            } => {
                assert_eq!(exercise.id, "ex0");
                assert_eq!(up_next.id, "ex1");
            }
            other => panic!("expected resting, got {:?}", other),
        }

        session.handle(Event::SkipRest, t0());
        assert_eq!(session.position(), Some((1, 0)));
    }

    #[test]
    fn test_rest_expires_via_ticks() {
        let mut session = loaded(&[2], 3);
        let effects = session.handle(Event::SetCompleted, t0());
        let Effect::StartTimer(token) = effects[0] else {
            panic!("expected timer start");
        };

        session.handle(Event::Tick(token), t0());
        session.handle(Event::Tick(token), t0());
        assert_eq!(session.rest_remaining(), Some(1));
        assert_eq!(session.mode(), Mode::Resting);

        let effects = session.handle(Event::Tick(token), t0());
        assert_eq!(effects, vec![Effect::CancelTimer(token)]);
        assert_eq!(session.mode(), Mode::ActiveSet);
        assert_eq!(session.position(), Some((0, 1)));
        assert_eq!(session.rest_remaining(), None);

        // Duplicate tick after expiry changes nothing
        assert!(session.handle(Event::Tick(token), t0()).is_empty());
        assert_eq!(session.mode(), Mode::ActiveSet);
        assert_eq!(session.position(), Some((0, 1)));
    }

    #[test]
    fn test_skip_rest_cancels_timer_and_ignores_late_tick() {
        let mut session = loaded(&[3], 30);
        let effects = session.handle(Event::SetCompleted, t0());
        let Effect::StartTimer(token) = effects[0] else {
            panic!("expected timer start");
        };

        let effects = session.handle(Event::SkipRest, t0());
        assert_eq!(effects, vec![Effect::CancelTimer(token)]);

        // Start the next rest, then deliver the old tick
        session.handle(Event::SetCompleted, t0());
        assert_eq!(session.rest_remaining(), Some(30));
        session.handle(Event::Tick(token), t0());
        assert_eq!(session.rest_remaining(), Some(30));
    }

    #[test]
    fn test_empty_routine_completes_immediately() {
        let mut session = Session::new("w1".into(), 30, t0());
        let effects = session.handle(Event::Loaded(routine(&[])), t0() + Duration::seconds(9));

        assert_eq!(session.mode(), Mode::Completed);
        assert_eq!(session.elapsed_seconds(), 0);
        let recs = records(&effects);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].duration, 0);
    }

    #[test]
    fn test_load_failure_is_terminal() {
        let mut session = Session::new("missing".into(), 30, t0());
        session.handle(Event::LoadFailed("Workout not found: missing".into()), t0());
        assert_eq!(session.mode(), Mode::Failed);

        // Nothing can revive it
        assert!(session.handle(Event::Loaded(routine(&[1])), t0()).is_empty());
        assert!(session.handle(Event::SetCompleted, t0()).is_empty());
        assert_eq!(session.mode(), Mode::Failed);
    }

    #[test]
    fn test_invalid_routine_fails_load() {
        let mut session = Session::new("w1".into(), 30, t0());
        session.handle(Event::Loaded(routine(&[2, 0])), t0());
        assert_eq!(session.mode(), Mode::Failed);
    }

    #[test]
    fn test_close_mid_rest_cancels_and_never_records() {
        let mut session = loaded(&[2], 30);
        let effects = session.handle(Event::SetCompleted, t0());
        let Effect::StartTimer(token) = effects[0] else {
            panic!("expected timer start");
        };

        let effects = session.handle(Event::Close, t0());
        assert_eq!(effects, vec![Effect::CancelTimer(token)]);
        assert_eq!(session.mode(), Mode::Closed);

        for event in [Event::Tick(token), Event::SkipRest, Event::SetCompleted] {
            assert!(session.handle(event, t0()).is_empty());
        }
        assert_eq!(session.mode(), Mode::Closed);
        assert_eq!(session.snapshot(t0()), Snapshot::Closed);
    }

    #[test]
    fn test_completed_ignores_further_events() {
        let mut session = loaded(&[1], 30);
        let effects = session.handle(Event::SetCompleted, t0() + Duration::seconds(40));
        assert_eq!(records(&effects).len(), 1);

        for _ in 0..3 {
            assert!(session.handle(Event::SetCompleted, t0()).is_empty());
            assert!(session.handle(Event::SkipRest, t0()).is_empty());
        }
        let later = t0() + Duration::seconds(500);
        assert_eq!(session.snapshot(later).elapsed_seconds(), Some(40));
    }

    #[test]
    fn test_elapsed_truncates_and_never_decreases() {
        let mut session = loaded(&[2], 5);
        session.handle(Event::SetCompleted, t0() + Duration::milliseconds(12_900));
        assert_eq!(session.elapsed_seconds(), 12);

        // Clock stepping backwards does not shrink elapsed time
        session.handle(Event::SkipRest, t0() + Duration::seconds(3));
        assert_eq!(session.elapsed_seconds(), 12);

        let effects = session.handle(Event::SetCompleted, t0() + Duration::seconds(8));
        assert_eq!(records(&effects)[0].duration, 12);
    }

    #[test]
    fn test_recording_status_feedback() {
        let mut session = loaded(&[1], 5);
        session.handle(Event::SetCompleted, t0());

        match session.snapshot(t0()) {
            Snapshot::Completed { recording, .. } => {
                assert_eq!(recording, RecordingStatus::Pending)
            }
            other => panic!("expected completed, got {:?}", other),
        }

        session.acknowledge_recording(Err("disk full".into()));
        assert_eq!(session.mode(), Mode::Completed);
        match session.snapshot(t0()) {
            Snapshot::Completed { recording, .. } => {
                assert_eq!(recording, RecordingStatus::Failed("disk full".into()))
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_rest_is_raised_to_one_second() {
        let mut session = loaded(&[2], 0);
        assert_eq!(session.rest_seconds(), 1);
        session.handle(Event::SetCompleted, t0());
        assert_eq!(session.rest_remaining(), Some(1));
    }
}
