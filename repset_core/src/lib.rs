#![forbid(unsafe_code)]

//! Core of the repset workout player.
//!
//! This crate provides:
//! - Routine types and a read-only routine store
//! - A cancellable rest countdown and tickers
//! - The session state machine and its snapshots
//! - The player that hosts a session
//! - Completion recording (JSONL)

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod timer;
pub mod store;
pub mod recorder;
pub mod snapshot;
pub mod session;
pub mod player;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::Clock;
pub use config::Config;
pub use timer::{Countdown, ManualTicker, ThreadTicker, Tick, Ticker, TimerToken};
pub use store::{FileRoutineStore, MemoryRoutineStore, RoutineStore};
pub use recorder::{read_records, CompletionRecorder, JsonlRecorder};
pub use snapshot::{RecordingStatus, Snapshot};
pub use session::{Effect, Event, Mode, Session};
pub use player::Player;
