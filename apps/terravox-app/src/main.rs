//! Terravox launcher.
//!
//! ## Usage
//!
//! ```bash
//! terravox-app create <world-dir> [--seed N] [--ticks N]
//! terravox-app load <world-dir> [--ticks N]
//! ```
//!
//! Creates or opens a world folder, runs the streaming engine headless
//! for a bounded number of ticks, and saves on exit. The windowing and GL
//! layers are external collaborators; this binary drives everything
//! behind them.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: log filter (e.g. info, terravox_world=debug)

mod engine;
mod sink;

use std::path::PathBuf;

use anyhow::bail;
use tracing_subscriber::EnvFilter;

use crate::engine::Engine;

enum Action {
    Create,
    Load,
}

struct Args {
    action: Action,
    dir: PathBuf,
    seed: u32,
    ticks: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let args = parse_args()?;
    let mut engine = match args.action {
        Action::Create => Engine::create(&args.dir, args.seed)?,
        Action::Load => Engine::load(&args.dir)?,
    };
    engine.run(args.ticks)?;
    engine.save()
}

fn parse_args() -> anyhow::Result<Args> {
    let mut argv = std::env::args().skip(1);
    let action = match argv.next().as_deref() {
        Some("create") => Action::Create,
        Some("load") => Action::Load,
        Some(other) => bail!("unknown action '{other}'; expected 'create' or 'load'"),
        None => bail!("missing action; run with --help"),
    };
    let Some(dir) = argv.next() else {
        bail!("missing world directory; run with --help");
    };

    let mut args = Args {
        action,
        dir: PathBuf::from(dir),
        seed: 1,
        ticks: 600,
    };
    while let Some(flag) = argv.next() {
        match flag.as_str() {
            "--seed" => {
                let Some(value) = argv.next() else {
                    bail!("--seed needs a value");
                };
                args.seed = value.parse()?;
            }
            "--ticks" => {
                let Some(value) = argv.next() else {
                    bail!("--ticks needs a value");
                };
                args.ticks = value.parse()?;
            }
            other => bail!("unknown flag '{other}'"),
        }
    }
    Ok(args)
}

fn print_help() {
    eprintln!(
        "Terravox voxel world engine

USAGE:
    terravox-app create <world-dir> [--seed N] [--ticks N]
    terravox-app load <world-dir> [--ticks N]

ACTIONS:
    create              Start a new world folder (writes world.json)
    load                Open an existing world folder

OPTIONS:
    --seed <N>          World generation seed for 'create' (default: 1)
    --ticks <N>         Fixed 16 ms steps to simulate (default: 600)
    -h, --help          Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log filter (e.g. info, terravox_world=debug)"
    );
}
