//! cellgraph - Run spreadsheet command scripts against a reactive sheet

mod commands;
mod config;
mod error;
mod render;

use anyhow::Context;
use log::{Log, Metadata, Record};
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;

use cellgraph_core::Spreadsheet;

fn print_usage() {
    eprintln!("Usage: cellgraph [OPTIONS] [SCRIPT]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [SCRIPT]              Command script to run (default: stdin)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <FILE>       Load configuration from FILE");
    eprintln!("  --no-config           Ignore the user configuration file");
    eprintln!("  -v, --verbose         Log sheet activity to stderr");
    eprintln!("  -h, --help            Print help");
}

/// Writes sheet log records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

struct Options {
    script: Option<PathBuf>,
    config: Option<PathBuf>,
    search_config: bool,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        script: None,
        config: None,
        search_config: true,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-v" | "--verbose" => options.verbose = true,
            "--no-config" => options.search_config = false,
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                options.config = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') && arg != "-" => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if options.script.is_none() {
                    options.script = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }
    options
}

fn read_script(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display())),
        None => {
            let mut script = String::new();
            io::stdin()
                .read_to_string(&mut script)
                .context("failed to read script from stdin")?;
            Ok(script)
        }
    }
}

fn run(options: Options) -> anyhow::Result<usize> {
    let (config, warnings) = config::load_config(options.config.as_deref(), options.search_config);
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    let mut sheet = Spreadsheet::with_config(config.sheet);
    if options.verbose {
        sheet.set_logger(Box::new(StderrLogger));
    }

    let script = read_script(options.script.as_ref())?;
    let failures = commands::run_script(
        &mut sheet,
        &script,
        config.display.column_width,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    Ok(failures)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    match run(options) {
        Ok(0) => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
