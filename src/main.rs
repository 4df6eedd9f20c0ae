use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use miette::IntoDiagnostic;

use lc3vm::{
    loader, tty, Controller, Debugger, Memory, Options, RunLevel, RunState, SourceMode, TtyKeyboard,
};

/// Emulator and interactive single-step debugger for the LC-3.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Object images to load, in order; later images win at overlaps
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Debugger commands to run instead of reading them from the terminal
    #[arg(long)]
    command: Option<String>,

    /// Leave condition codes untouched on LEA (2009 ISA revision)
    #[arg(long)]
    no_lea_cc: bool,
}

fn main() -> miette::Result<ExitCode> {
    let args = Args::parse();

    let control = Arc::new(Controller::new());
    {
        let control = Arc::clone(&control);
        // The handler only performs an atomic decrement and a bounded print;
        // the fetch loop observes the new level before its next fetch.
        ctrlc::set_handler(move || {
            if control.interrupt() == RunLevel::Step {
                eprintln!("\nDropped into single-step mode. Press ^C again to quit.");
            }
        })
        .into_diagnostic()?;
    }

    let mut mem = Memory::new(Box::new(TtyKeyboard));
    for (index, path) in args.images.iter().enumerate() {
        println!(
            "{:>12} image #{}: {}",
            "Loading".green().bold(),
            index + 1,
            path.display()
        );
        let origin = loader::load_image(path, &mut mem)?;
        println!("{:>12} at 0x{:04X}", "Placed".green().bold(), origin);
    }

    let source = match SourceMode::new(args.command) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{:?}", lc3vm::error::history_alloc(&err));
            return Ok(ExitCode::from(71));
        }
    };

    println!("You are in single-step mode. Type (h)elp for help.");

    // Raw mode is restored by the guard on every path out of this scope.
    let _raw = tty::RawModeGuard::acquire();

    let options = Options {
        lea_sets_cc: !args.no_lea_cc,
    };
    let mut state = RunState::new(mem, Arc::clone(&control), options);
    let mut debugger = Debugger::new(source, control);
    state.run(&mut debugger);

    Ok(ExitCode::SUCCESS)
}
