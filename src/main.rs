use std::io;
use std::ops::Range;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use z16sim::memory::StdMem;
use z16sim::processor::{Processor, StdConsole};

/// The first instruction is placed here.
const ENTRYPOINT: u16 = 0x0000;

/// Simulates a raw Z16 binary image, tracing every executed instruction.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Raw binary image, loaded at address 0x0000
    image: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show program output, no instruction trace
    #[arg(short = 'q', long)]
    no_trace: bool,

    /// Print the register file after the simulation halts
    #[arg(long)]
    dump_regs: bool,

    /// Hex dump a memory range after the simulation halts, e.g. `0x0100..0x0140`
    #[arg(long, value_name = "START..END", value_parser = parse_range)]
    dump: Option<Range<usize>>,
}

/// Parses an address like `0x0100` or `256`
fn parse_address(text: &str) -> Result<usize, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    };

    match parsed {
        Ok(address) if address <= 0x10000 => Ok(address),
        Ok(address) => Err(format!("address `0x{:X}` is outside of memory", address)),
        Err(_) => Err(format!("invalid address `{}`", text)),
    }
}

/// Parses a half-open memory range `START..END`
fn parse_range(text: &str) -> Result<Range<usize>, String> {
    let (start, end) = text
        .split_once("..")
        .ok_or_else(|| format!("expected `START..END`, got `{}`", text))?;
    let range = parse_address(start)?..parse_address(end)?;

    if range.start > range.end {
        return Err(format!("range `{}` ends before it starts", text));
    }
    Ok(range)
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Usage errors exit with 1, help and version output with 0
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .wrap_err("failed to initialize logging")?; // logging

    let mut mem = StdMem::from_file(&args.image)?;
    let mut cpu = Processor::new(ENTRYPOINT);

    let stdout = io::stdout();
    let mut console = StdConsole::new(stdout.lock()).with_trace(!args.no_trace);
    cpu.execute_until_halt(&mut mem, &mut console)
        .wrap_err_with(|| format!("simulation of `{}` aborted", args.image.display()))?;
    drop(console);

    if args.dump_regs {
        print!("{}", cpu.regs);
    }
    if let Some(range) = args.dump {
        print!("{}", mem.dump(range));
    }

    Ok(())
}
