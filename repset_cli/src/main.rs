use clap::{Parser, Subcommand};
use repset_core::config::{completions_path, routines_path};
use repset_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

#[derive(Parser)]
#[command(name = "repset")]
#[command(about = "Workout routine player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a workout routine set by set
    Play {
        /// Id of the workout in routines.toml
        workout_id: String,

        /// Rest between sets, in seconds
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        rest_seconds: Option<u32>,

        /// Auto-complete (for testing) - mark every set done and skip every rest
        #[arg(long)]
        auto_complete: bool,
    },
}

/// Everything the event loop reacts to, in arrival order
enum Message {
    Input(String),
    InputClosed,
    Tick(TimerToken),
}

type CliPlayer = Player<JsonlRecorder, ThreadTicker<Message>>;

fn main() -> Result<()> {
    // Keep the terminal for the workout; RUST_LOG still wins
    repset_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Play {
            workout_id,
            rest_seconds,
            auto_complete,
        } => cmd_play(
            data_dir,
            WorkoutId::new(workout_id),
            rest_seconds.unwrap_or(config.player.rest_seconds),
            auto_complete,
        ),
    }
}

fn cmd_play(
    data_dir: PathBuf,
    workout_id: WorkoutId,
    rest_seconds: u32,
    auto_complete: bool,
) -> Result<()> {
    let store = FileRoutineStore::new(routines_path(&data_dir));
    let recorder = JsonlRecorder::new(completions_path(&data_dir));

    let (tx, rx) = mpsc::channel();
    let ticker = ThreadTicker::new(tx.clone(), Message::Tick);

    let mut player = Player::start(
        &store,
        workout_id,
        rest_seconds,
        recorder,
        ticker,
        Clock::System,
    );

    if auto_complete {
        drop(tx);
        run_auto(&mut player);
    } else {
        spawn_input_reader(tx);
        run_interactive(&mut player, &rx)?;
    }

    finish(&player.snapshot())
}

/// Drive the session without user input
fn run_auto(player: &mut CliPlayer) {
    loop {
        println!("{}", render(&player.snapshot()));

        match player.mode() {
            Mode::ActiveSet => player.set_completed(),
            Mode::Resting => player.skip_rest(),
            _ => break,
        }
    }
}

fn spawn_input_reader(tx: Sender<Message>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(Message::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Message::InputClosed);
    });
}

/// Single event loop: one message at a time until the session ends
fn run_interactive(player: &mut CliPlayer, rx: &Receiver<Message>) -> Result<()> {
    show(&player.snapshot())?;

    while !player.session().is_terminal() {
        let message = rx.recv().unwrap_or(Message::InputClosed);

        match message {
            Message::Tick(token) => {
                let before = player.mode();
                player.tick(token);

                match (before, player.snapshot()) {
                    // Countdown still running: rewrite the rest line only
                    (Mode::Resting, Snapshot::Resting { rest_remaining, .. }) => {
                        print!("\r  Rest: {:>4}s ", rest_remaining);
                        io::stdout().flush()?;
                    }
                    // Rest just ran out
                    (Mode::Resting, snapshot) => {
                        println!();
                        show(&snapshot)?;
                    }
                    // Stale tick queued before a skip or close
                    _ => {}
                }
            }
            Message::Input(line) => {
                match line.trim().to_lowercase().as_str() {
                    "q" | "quit" => player.close(),
                    _ => match player.mode() {
                        Mode::ActiveSet => player.set_completed(),
                        Mode::Resting => player.skip_rest(),
                        _ => {}
                    },
                }
                if !player.session().is_terminal() {
                    show(&player.snapshot())?;
                }
            }
            Message::InputClosed => player.close(),
        }
    }

    Ok(())
}

fn show(snapshot: &Snapshot) -> Result<()> {
    println!("{}", render(snapshot));
    match snapshot {
        Snapshot::ActiveSet { .. } => {
            println!("Press Enter when the set is done, 'q' + Enter to quit")
        }
        Snapshot::Resting { .. } => println!("Press Enter to skip the rest, 'q' + Enter to quit"),
        _ => {}
    }
    io::stdout().flush()?;
    Ok(())
}

fn finish(snapshot: &Snapshot) -> Result<()> {
    match snapshot {
        Snapshot::Completed {
            workout,
            elapsed_seconds,
            recording,
        } => {
            println!(
                "\n✓ {} complete in {}",
                workout.title,
                format_duration(*elapsed_seconds)
            );
            match recording {
                RecordingStatus::Saved => println!("  Workout logged!"),
                RecordingStatus::Failed(message) => {
                    eprintln!("⚠ Could not save this workout: {}", message)
                }
                RecordingStatus::Pending => {}
            }
            Ok(())
        }
        Snapshot::Failed { reason, .. } => {
            eprintln!("Could not start workout: {}", reason);
            Err(Error::Other(reason.clone()))
        }
        _ => {
            println!("\nWorkout abandoned - nothing recorded.");
            Ok(())
        }
    }
}

/// Render a snapshot as text
fn render(snapshot: &Snapshot) -> String {
    match snapshot {
        Snapshot::Loading { workout_id } => format!("Loading {}...", workout_id),
        Snapshot::ActiveSet {
            workout,
            exercise,
            exercise_index,
            exercise_count,
            set_index,
            elapsed_seconds,
        } => format!(
            "\n[{}] {}\n  Exercise {}/{}: {}\n  Set {} of {}: {}",
            workout.title,
            format_duration(*elapsed_seconds),
            exercise_index + 1,
            exercise_count,
            exercise.name,
            set_index + 1,
            exercise.sets,
            describe_load(exercise),
        ),
        Snapshot::Resting {
            workout,
            exercise,
            set_index,
            up_next,
            rest_remaining,
            elapsed_seconds,
            ..
        } => {
            let next = if up_next.id == exercise.id {
                format!("set {} of {}", set_index + 1, exercise.sets)
            } else {
                format!("{}, set 1 of {}", up_next.name, up_next.sets)
            };
            format!(
                "\n[{}] {}  (resting)\n  Finished: {}\n  Up next: {}\n  Rest: {:>4}s",
                workout.title,
                format_duration(*elapsed_seconds),
                exercise.name,
                next,
                rest_remaining,
            )
        }
        Snapshot::Completed {
            workout,
            elapsed_seconds,
            ..
        } => format!(
            "\n[{}] {}  (completed)",
            workout.title,
            format_duration(*elapsed_seconds)
        ),
        Snapshot::Failed { workout_id, reason } => {
            format!("Workout {} unavailable: {}", workout_id, reason)
        }
        Snapshot::Closed => "Session closed".to_string(),
    }
}

fn describe_load(exercise: &Exercise) -> String {
    match exercise.weight {
        Some(weight) => format!("{} reps @ {}", exercise.reps, weight),
        None => format!("{} reps", exercise.reps),
    }
}

fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
