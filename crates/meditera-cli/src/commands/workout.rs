use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use meditera_core::{CompletionSink, Config, Event, SessionHandle, SessionTimer, TrackerSink};
use tokio::sync::mpsc;

use super::{CommandResult, Context};

#[derive(Subcommand)]
pub enum WorkoutAction {
    /// Run a session, printing events as JSON lines.
    ///
    /// While running, type `p` to pause, `r` to resume and `q` to quit.
    Start {
        /// Seconds per exercise
        #[arg(long)]
        exercise_secs: Option<u64>,
        /// Seconds of rest after each exercise (0 disables rest)
        #[arg(long)]
        rest_secs: Option<u64>,
        /// Full passes through the routine
        #[arg(long)]
        laps: Option<u32>,
        /// Total session length, overrides --laps
        #[arg(long)]
        total_secs: Option<u64>,
        /// Clock period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
    },
}

enum Intent {
    Pause,
    Resume,
    Quit,
}

pub fn run(action: WorkoutAction, config: &Config) -> CommandResult {
    match action {
        WorkoutAction::Start {
            exercise_secs,
            rest_secs,
            laps,
            total_secs,
            tick_ms,
        } => {
            let mut config = config.clone();
            let workout = &mut config.workout;
            if let Some(v) = exercise_secs {
                workout.exercise_secs = v;
            }
            if let Some(v) = rest_secs {
                workout.rest_secs = v;
            }
            if let Some(v) = laps {
                workout.laps = v;
                workout.total_secs = None;
            }
            if total_secs.is_some() {
                workout.total_secs = total_secs;
            }
            if let Some(v) = tick_ms {
                workout.tick_ms = v;
            }
            if config.workout.tick_ms == 0 {
                return Err("tick_ms must be positive".into());
            }

            let timer = SessionTimer::start(config.session_config()?)?;
            let ctx = Context::open(&config)?;
            let period = Duration::from_millis(config.workout.tick_ms);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(drive(ctx, timer, period))
        }
    }
}

async fn drive(ctx: Context, timer: SessionTimer, period: Duration) -> CommandResult {
    let (sink, mut progress) = match ctx.auth.current_user() {
        Some(user_id) => {
            let (tx, rx) = mpsc::unbounded_channel();
            let sink: Arc<dyn CompletionSink> =
                Arc::new(TrackerSink::new(Arc::clone(&ctx.tracker), user_id, Some(tx)));
            (Some(sink), Some(rx))
        }
        None => {
            tracing::warn!("not signed in; this workout will not be recorded");
            (None, None)
        }
    };

    let (mut handle, mut events) = SessionHandle::spawn(timer, period, sink);
    let mut intents = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    print_event(&event)?;
                    if matches!(event, Event::SessionFinished { .. }) {
                        break;
                    }
                }
                None => break,
            },
            intent = intents.recv(), if stdin_open => match intent {
                Some(Intent::Pause) => {
                    handle.pause();
                }
                Some(Intent::Resume) => {
                    handle.resume();
                }
                Some(Intent::Quit) => {
                    handle.cancel();
                    break;
                }
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break;
            }
        }
    }

    drop(handle);
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }

    // Closes once the session task and any in-flight store writes are done.
    if let Some(progress) = progress.as_mut() {
        while let Some(event) = progress.recv().await {
            print_event(&event)?;
        }
    }
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<Intent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let intent = match line.trim() {
                "p" | "pause" => Intent::Pause,
                "r" | "resume" => Intent::Resume,
                "q" | "quit" => Intent::Quit,
                "" => continue,
                other => {
                    tracing::warn!(input = other, "unknown command, expected p, r or q");
                    continue;
                }
            };
            if tx.send(intent).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_event(event: &Event) -> CommandResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
