//! Kilo - raw-mode terminal substrate
//!
//! Prints the code of every key pressed until `q`.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use kilo::{config::Config, logging, FdByteSource, InputLoop, TerminalModeController, Tty};

#[derive(Parser)]
#[command(name = "kilo")]
#[command(about = "Read keypresses in raw mode and print their codes (q quits)")]
#[command(version)]
struct Cli {
    /// Write a log to this file (filter from KILO_LOG, default "info")
    #[arg(long, env = "KILO_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    show_config: bool,
}

fn main() {
    // run() has returned, so the terminal is already restored
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.log_file);

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.log)?;

    let mut controller = TerminalModeController::capture(Tty::new(io::stdin()))?;
    controller.enter_raw_mode(config.timing)?;

    let mut input = InputLoop::new(FdByteSource::new(io::stdin()), io::stdout().lock())
        .with_quit_byte(config.quit_byte);
    let outcome = input.run();
    drop(input);

    let restored = controller.restore();
    match (outcome, restored) {
        (Err(e), Err(restore_err)) => {
            eprintln!("error: {}", restore_err);
            Err(e.into())
        }
        (outcome, restored) => {
            outcome?;
            restored?;
            Ok(())
        }
    }
}
