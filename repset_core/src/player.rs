//! Player: hosts a [`Session`] and carries out its effects.
//!
//! The player is the only place where the session meets the outside world:
//! it fetches the routine, schedules rest ticks and performs the single
//! completion write.

use crate::clock::Clock;
use crate::recorder::CompletionRecorder;
use crate::session::{Effect, Event, Mode, Session};
use crate::snapshot::Snapshot;
use crate::store::RoutineStore;
use crate::timer::{Ticker, TimerToken};
use crate::WorkoutId;

pub struct Player<R, T> {
    session: Session,
    recorder: R,
    ticker: T,
    clock: Clock,
}

impl<R: CompletionRecorder, T: Ticker> Player<R, T> {
    /// Start playback of `workout_id`.
    ///
    /// The fetch happens here. A failed fetch leaves the player in the
    /// `Failed` mode rather than returning an error, so the host renders it
    /// like any other snapshot.
    pub fn start<S: RoutineStore + ?Sized>(
        store: &S,
        workout_id: WorkoutId,
        rest_seconds: u32,
        recorder: R,
        ticker: T,
        clock: Clock,
    ) -> Self {
        let session = Session::new(workout_id.clone(), rest_seconds, clock.now());
        tracing::debug!("Starting session {} for {}", session.id(), workout_id);

        let mut player = Self {
            session,
            recorder,
            ticker,
            clock,
        };

        let event = match store.fetch_workout(&workout_id) {
            Ok(routine) => Event::Loaded(routine),
            Err(e) => Event::LoadFailed(e.to_string()),
        };
        player.dispatch(event);
        player
    }

    /// Apply one event and carry out the resulting effects
    pub fn dispatch(&mut self, event: Event) {
        let now = self.clock.now();
        for effect in self.session.handle(event, now) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::StartTimer(token) => self.ticker.start(token),
            Effect::CancelTimer(token) => self.ticker.cancel(token),
            Effect::Record(record) => match self.recorder.record_completion(&record) {
                Ok(()) => {
                    tracing::info!(
                        "Saved completion of {} ({}s)",
                        record.workout_id,
                        record.duration
                    );
                    self.session.acknowledge_recording(Ok(()));
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to save completion of {}: {}",
                        record.workout_id,
                        e
                    );
                    self.session.acknowledge_recording(Err(e.to_string()));
                }
            },
        }
    }

    pub fn set_completed(&mut self) {
        self.dispatch(Event::SetCompleted);
    }

    pub fn skip_rest(&mut self) {
        self.dispatch(Event::SkipRest);
    }

    pub fn tick(&mut self, token: TimerToken) {
        self.dispatch(Event::Tick(token));
    }

    /// Discard the session. Cancels any rest timer; never records.
    pub fn close(&mut self) {
        self.dispatch(Event::Close);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot(self.clock.now())
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}
