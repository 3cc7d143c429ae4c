//! Rest interval countdown and the tickers that drive it.
//!
//! [`Countdown`] is the pure state: it decides whether a tick still counts.
//! A [`Ticker`] only schedules tick delivery. Every interval gets a fresh
//! [`TimerToken`], so a tick that arrives after its interval was cancelled
//! or expired is recognised as stale and ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Generation id of one rest interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Result of applying one tick to a [`Countdown`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; seconds left
    Remaining(u32),
    /// Reached zero. Reported once per interval.
    Expired,
    /// Tick belongs to an interval that is no longer running
    Stale,
}

/// One-second countdown with generation tokens
#[derive(Debug, Default)]
pub struct Countdown {
    current: Option<TimerToken>,
    remaining: u32,
    generation: u64,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new interval, replacing any running one
    pub fn start(&mut self, seconds: u32) -> TimerToken {
        self.generation += 1;
        let token = TimerToken(self.generation);
        self.current = Some(token);
        self.remaining = seconds;
        token
    }

    /// Apply a one-second tick for `token`
    pub fn tick(&mut self, token: TimerToken) -> Tick {
        if self.current != Some(token) {
            return Tick::Stale;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.current = None;
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining)
        }
    }

    /// Stop the running interval. Returns its token if one was running.
    pub fn cancel(&mut self) -> Option<TimerToken> {
        self.remaining = 0;
        self.current.take()
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.current.map(|_| self.remaining)
    }
}

/// Schedules tick delivery for a countdown
pub trait Ticker {
    fn start(&mut self, token: TimerToken);
    fn cancel(&mut self, token: TimerToken);
}

/// Ticker backed by a background thread per interval.
///
/// Each tick is sent as a message on the host's event channel, so the host
/// loop still consumes ticks one at a time alongside user input.
pub struct ThreadTicker<M> {
    sender: Sender<M>,
    wrap: fn(TimerToken) -> M,
    period: Duration,
    running: Option<(TimerToken, Arc<AtomicBool>)>,
}

impl<M: Send + 'static> ThreadTicker<M> {
    pub fn new(sender: Sender<M>, wrap: fn(TimerToken) -> M) -> Self {
        Self::with_period(sender, wrap, Duration::from_secs(1))
    }

    pub fn with_period(sender: Sender<M>, wrap: fn(TimerToken) -> M, period: Duration) -> Self {
        Self {
            sender,
            wrap,
            period,
            running: None,
        }
    }

    fn stop_running(&mut self) {
        if let Some((token, cancelled)) = self.running.take() {
            cancelled.store(true, Ordering::SeqCst);
            tracing::trace!("Stopped ticker thread for {:?}", token);
        }
    }
}

impl<M: Send + 'static> Ticker for ThreadTicker<M> {
    fn start(&mut self, token: TimerToken) {
        self.stop_running();

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let sender = self.sender.clone();
        let wrap = self.wrap;
        let period = self.period;

        thread::spawn(move || loop {
            thread::sleep(period);
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if sender.send(wrap(token)).is_err() {
                // Host loop is gone
                break;
            }
        });

        self.running = Some((token, cancelled));
    }

    fn cancel(&mut self, token: TimerToken) {
        if matches!(self.running, Some((running, _)) if running == token) {
            self.stop_running();
        }
    }
}

impl<M> Drop for ThreadTicker<M> {
    fn drop(&mut self) {
        if let Some((_, cancelled)) = self.running.take() {
            cancelled.store(true, Ordering::SeqCst);
        }
    }
}

/// Ticker that only records what it was asked to do.
///
/// Ticks are delivered by hand, which keeps tests deterministic.
#[derive(Debug, Default)]
pub struct ManualTicker {
    pub started: Vec<TimerToken>,
    pub cancelled: Vec<TimerToken>,
    active: Option<TimerToken>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the interval currently scheduled, if any
    pub fn active(&self) -> Option<TimerToken> {
        self.active
    }
}

impl Ticker for ManualTicker {
    fn start(&mut self, token: TimerToken) {
        self.started.push(token);
        self.active = Some(token);
    }

    fn cancel(&mut self, token: TimerToken) {
        self.cancelled.push(token);
        if self.active == Some(token) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_countdown_expires_once() {
        let mut countdown = Countdown::new();
        let token = countdown.start(3);

        assert_eq!(countdown.tick(token), Tick::Remaining(2));
        assert_eq!(countdown.tick(token), Tick::Remaining(1));
        assert_eq!(countdown.tick(token), Tick::Expired);
        assert_eq!(countdown.tick(token), Tick::Stale);
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), None);
    }

    #[test]
    fn test_cancelled_token_is_stale() {
        let mut countdown = Countdown::new();
        let token = countdown.start(10);

        assert_eq!(countdown.cancel(), Some(token));
        assert_eq!(countdown.tick(token), Tick::Stale);
        assert_eq!(countdown.cancel(), None);
    }

    #[test]
    fn test_old_token_cannot_touch_new_interval() {
        let mut countdown = Countdown::new();
        let first = countdown.start(5);
        let second = countdown.start(5);

        assert_ne!(first, second);
        assert_eq!(countdown.tick(first), Tick::Stale);
        assert_eq!(countdown.remaining(), Some(5));
        assert_eq!(countdown.tick(second), Tick::Remaining(4));
    }

    #[test]
    fn test_thread_ticker_delivers_and_stops() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = ThreadTicker::with_period(tx, |t| t, Duration::from_millis(5));

        let mut countdown = Countdown::new();
        let token = countdown.start(100);
        ticker.start(token);

        let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(received, token);

        ticker.cancel(token);
        // Drain anything queued before the cancel landed
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_manual_ticker_tracks_active() {
        let mut countdown = Countdown::new();
        let mut ticker = ManualTicker::new();
        let token = countdown.start(1);

        ticker.start(token);
        assert_eq!(ticker.active(), Some(token));
        ticker.cancel(token);
        assert_eq!(ticker.active(), None);
        assert_eq!(ticker.cancelled, vec![token]);
    }
}
