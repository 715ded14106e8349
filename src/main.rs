//! Command-line driver for MiniASM.
//!
//! `miniasm check FILE` reports whether a program loads,
//! and `miniasm run FILE` steps through it, printing every step.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use miniasm::asm::SUCCESS_MESSAGE;
use miniasm::ast::StoreName;
use miniasm::session::Session;
use miniasm::sim::mem::MemStore;
use miniasm::sim::SimFlags;

#[derive(Parser, Debug)]
#[command(name = "miniasm", version, about = "MiniASM syntax checker and step-by-step simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Maximum number of steps to execute before giving up.
    #[arg(long, global = true, default_value_t = SimFlags::default().max_steps)]
    max_steps: u64,

    /// Record an undo entry every time an instruction executes,
    /// not only on its first visit.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    refresh_undo: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks a program for syntax errors.
    Check {
        /// The program file.
        file: PathBuf,
    },
    /// Runs a program, printing every step.
    Run {
        /// The program file.
        file: PathBuf,

        /// Sets an initial value, as STORE:ADDR=VALUE (e.g., memory:100=5 or registers:r1=0).
        #[arg(long = "preset", value_name = "STORE:ADDR=VALUE", value_parser = parse_preset)]
        presets: Vec<Preset>,

        /// Stops after this many steps, even if the program has not halted.
        #[arg(long)]
        steps: Option<u64>,
    },
}

#[derive(Clone, Debug)]
struct Preset {
    store: StoreName,
    addr: String,
    value: String,
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    let (store, rest) = s.split_once(':')
        .ok_or_else(|| format!("expected STORE:ADDR=VALUE, got {s:?}"))?;
    let (addr, value) = rest.split_once('=')
        .ok_or_else(|| format!("expected STORE:ADDR=VALUE, got {s:?}"))?;
    let store = store.parse::<StoreName>()
        .map_err(|()| format!("unknown store {store:?} (expected registers, memory, or disk)"))?;
    if addr.is_empty() {
        return Err(format!("missing address in {s:?}"));
    }

    Ok(Preset { store, addr: addr.to_string(), value: value.to_string() })
}

fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_store(name: &str, store: &MemStore) {
    println!("{name}:");
    for (key, value) in store.iter() {
        println!("  {key} -> {value}");
    }
}

fn main() -> anyhow::Result<ExitCode> {
    init_logger();
    let cli = Cli::parse();

    let flags = SimFlags {
        refresh_undo_on_revisit: cli.refresh_undo,
        max_steps: cli.max_steps,
    };
    let mut session = Session::new(flags);

    match cli.command {
        Command::Check { file } => {
            let (message, _) = session.load_program(&file);
            println!("{message}");

            Ok(match message == SUCCESS_MESSAGE {
                true => ExitCode::SUCCESS,
                false => ExitCode::FAILURE,
            })
        },
        Command::Run { file, presets, steps } => {
            for Preset { store, addr, value } in presets {
                session.set_preset(store, &addr, value);
            }

            let (message, lines) = session.load_program(&file);
            if lines.is_empty() {
                println!("{message}");
                return Ok(ExitCode::FAILURE);
            }

            let limit = steps.unwrap_or(flags.max_steps).min(flags.max_steps);
            let mut index = 0;
            let mut halted = false;
            for _ in 0..limit {
                let next = session.step(index)
                    .with_context(|| format!("failed to execute line {}", index + 1))?;
                session.record_visited_index(index);

                if let Some(header) = session.step_header(index) {
                    println!("{header}");
                }
                if let Some(tokens) = session.program().line(index) {
                    println!("String Line: {}", tokens.join(" "));
                }
                for line in session.describe_step(index).unwrap_or_default() {
                    println!("{line}");
                }
                println!();

                if session.is_halt(index) {
                    halted = true;
                    break;
                }
                index = next;
            }

            print_store("Registers", session.registers());
            print_store("Memory", session.memory());
            print_store("Disk", session.disk());

            if !halted {
                if steps.is_some_and(|n| n < flags.max_steps) {
                    println!("stopped after {limit} steps");
                } else {
                    anyhow::bail!("program did not halt within {} steps", flags.max_steps);
                }
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}
