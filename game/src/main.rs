use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farm_engine::HeadlessRunner;
use farm_engine::profiling::WorstStep;
use tracing::info;

use zombie_farm::config::{ConfigStore, GameConfig};
use zombie_farm::events::{EngineEvent, Severity};
use zombie_farm::input::{KeyCommand, key_command};
use zombie_farm::session::{FarmGame, FarmInput, FarmState, IntentReport};
use zombie_farm::telemetry::init_tracing;
use zombie_farm::view::Screen;

#[derive(Debug, Parser)]
#[command(name = "zombie-farm")]
#[command(about = "Zombie Farm riddle adventure in the terminal")]
struct Cli {
    /// Config file; defaults to $ZOMBIE_FARM_CONFIG_PATH or the XDG location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play interactively; the countdown follows the wall clock.
    Play,
    /// Print the stage table.
    Stages {
        #[arg(long, default_value_t = false)]
        answers: bool,
    },
    /// Solve every stage with its known answer and report the final score.
    Walkthrough {
        /// Seconds to let run off the clock before the first answer.
        #[arg(long, default_value_t = 0)]
        idle_secs: u32,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env(),
    };
    let config = store.load();
    info!(path = %store.path().display(), "config loaded");
    let game = FarmGame::with_config(&config).context("load stage catalog")?;

    match cli.command {
        Commands::Play => cmd_play(game, &config),
        Commands::Stages { answers } => cmd_stages(&game, answers),
        Commands::Walkthrough { idle_secs } => cmd_walkthrough(game, idle_secs),
    }
}

fn cmd_stages(game: &FarmGame, answers: bool) -> Result<()> {
    let catalog = game.engine().catalog();
    for stage in catalog.iter() {
        let props: Vec<&str> = stage.props.iter().map(|p| p.kind.name()).collect();
        println!(
            "{:>2}. [{:>3}] {} ({})",
            stage.index,
            stage.points,
            stage.task,
            props.join(", ")
        );
        if answers {
            println!("      -> {}", stage.answer);
        }
    }
    println!("total: {} points", catalog.total_points());
    Ok(())
}

fn cmd_walkthrough(game: FarmGame, idle_secs: u32) -> Result<()> {
    let mut runner = HeadlessRunner::new(game.clone());
    let mut profiler = WorstStep::default();

    let mut opening = vec![FarmInput::LoadingProgress(100.0), FarmInput::StartGame];
    if idle_secs > 0 {
        opening.push(FarmInput::TickBy(idle_secs));
    }
    for input in opening {
        runner.step_profiled(input, &mut profiler);
        print_step(&game, runner.state());
    }

    for stage in game.engine().catalog().iter() {
        if !runner.state().progress.is_running() {
            break;
        }
        for symbol in stage.egg_symbols() {
            runner.step_profiled(FarmInput::CollectSymbol(symbol), &mut profiler);
            print_step(&game, runner.state());
        }
        runner.step_profiled(FarmInput::SubmitAnswer(stage.answer.clone()), &mut profiler);
        print_step(&game, runner.state());
    }

    let snapshot = game.snapshot(runner.state());
    println!(
        "outcome: {:?}, score {}, {} frames",
        snapshot.phase,
        snapshot.score,
        runner.frame()
    );
    println!(
        "slowest step: frame {} ({:?})",
        profiler.frame, profiler.timings.total
    );
    Ok(())
}

fn cmd_play(game: FarmGame, config: &GameConfig) -> Result<()> {
    let tick = Duration::from_millis(config.rules.tick_interval_ms.max(1));
    let mut runner = HeadlessRunner::new(game.clone());

    while runner.state().screen == Screen::Loading {
        println!("{}", runner.state().loading.tip());
        runner.step(FarmInput::LoadingProgress(20.0));
    }
    print_help();

    // Stdin blocks, so lines arrive over a channel and the countdown keeps running meanwhile.
    let (lines_tx, lines_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut last_tick = Instant::now();
    prompt()?;
    loop {
        let line = match lines_rx.recv_timeout(tick.saturating_sub(last_tick.elapsed())) {
            Ok(line) => Some(line.context("read stdin")?),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if run_due_ticks(&mut runner, &mut last_tick, tick) {
            if line.is_none() {
                println!();
            }
            print_step(&game, runner.state());
            print_results(runner.state());
            if line.is_none() {
                prompt()?;
            }
        }
        let Some(line) = line else {
            continue;
        };

        match parse_command(line.trim()) {
            Some(ShellCommand::Quit) => break,
            Some(ShellCommand::Help) => print_help(),
            Some(ShellCommand::Inputs(inputs)) => {
                for input in inputs {
                    runner.step(input);
                }
                print_step(&game, runner.state());
                print_results(runner.state());
            }
            None => println!("unknown command, type 'help'"),
        }
        prompt()?;
    }
    Ok(())
}

/// Steps the countdown by every whole period since `last_tick`. Returns true when the ticks
/// raised events worth showing.
fn run_due_ticks(
    runner: &mut HeadlessRunner<FarmGame>,
    last_tick: &mut Instant,
    tick: Duration,
) -> bool {
    let due = last_tick.elapsed().as_millis() / tick.as_millis().max(1);
    if due == 0 {
        return false;
    }
    let due = u32::try_from(due).unwrap_or(u32::MAX);
    *last_tick += tick * due;
    runner.step(FarmInput::TickBy(due));
    !runner.state().events.is_empty()
}

fn print_results(state: &FarmState) {
    if let Screen::Results { victory } = state.screen {
        let verdict = if victory { "ПОБЕДА" } else { "ПОРАЖЕНИЕ" };
        println!(
            "=== {verdict}: {} очков. 'start' для новой игры, 'menu' для меню ===",
            state.progress.score()
        );
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("flush stdout")
}

fn print_help() {
    println!("commands:");
    println!("  start | menu | howto | close     screens");
    println!("  w|a|s|d [n]                      walk n steps");
    println!("  e                                interact with the nearest prop");
    println!("  answer <text>                    submit an answer");
    println!("  collect <symbol>                 pick up an egg symbol");
    println!("  p | h | wait [secs]              pause, hint, let time pass");
    println!("  help | quit");
}

fn print_step(game: &FarmGame, state: &FarmState) {
    for event in &state.events {
        match event {
            EngineEvent::Notification(note) => {
                let tag = match note.severity {
                    Severity::Info => "i",
                    Severity::Success => "+",
                    Severity::Warning => "!",
                    Severity::Error => "x",
                };
                println!("[{tag}] {}", note.message);
            }
            EngineEvent::Dialog(dialog) => {
                println!("--- {} ---", dialog.title);
                println!("{}", dialog.body);
            }
            _ => {}
        }
    }
    if let IntentReport::Rejected(err) = &state.last_report {
        println!("[x] {err}");
    }
    if state.screen == Screen::Playing {
        println!("{}", game.hud(state).status_line());
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Help,
    Quit,
    Inputs(Vec<FarmInput>),
}

fn parse_command(line: &str) -> Option<ShellCommand> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let count = || rest.parse::<u32>().unwrap_or(1).clamp(1, 1_000);

    let inputs = match head {
        "help" | "?" => return Some(ShellCommand::Help),
        "quit" | "exit" => return Some(ShellCommand::Quit),
        "start" => vec![FarmInput::StartGame],
        "menu" => vec![FarmInput::ReturnToMenu],
        "howto" => vec![FarmInput::ShowHowToPlay],
        "close" => vec![FarmInput::CloseDialog],
        "e" | "use" => vec![FarmInput::Interact],
        "p" | "pause" => vec![FarmInput::TogglePause],
        "h" | "hint" => vec![FarmInput::Hint],
        "wait" => vec![FarmInput::TickBy(count())],
        "answer" if !rest.is_empty() => vec![FarmInput::SubmitAnswer(rest.to_string())],
        "collect" => vec![FarmInput::CollectSymbol(rest.chars().next()?)],
        key => match key_command(key)? {
            KeyCommand::Move(direction) => vec![FarmInput::Move(direction); count() as usize],
            _ => return None,
        },
    };
    Some(ShellCommand::Inputs(inputs))
}
