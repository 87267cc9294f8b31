//! Application definition.

extern crate simplelog;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Error, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use simdrive::host::memory::MemoryHost;
use simdrive::{Batch, BatchReport, CancelToken, ParallelRunner, SequentialRunner, Simulator};

use crate::util;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("simdrive")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .version(VERSION)
        .author(AUTHORS)
        .about("Run batches of simulation experiments from the command line.")
        .arg(Arg::with_name("verbosity")
            .long("verbosity")
            .short("v")
            .takes_value(true)
            .default_value("info")
            .value_name("verb")
            .global(true)
            .help("Set the verbosity of the log output"))

        // run subcommand
        .subcommand(SubCommand::with_name("run")
            .display_order(10)
            .about("Run all experiments of a batch file")
            .arg(Arg::with_name("batch")
                .required(true)
                .value_name("path")
                .help("Path to the batch file (toml or yaml)"))
            .arg(Arg::with_name("jobs")
                .long("jobs")
                .short("j")
                .takes_value(true)
                .value_name("n")
                .help("Maximum number of sessions used at once, overrides the batch config"))
            .arg(Arg::with_name("sequential")
                .long("sequential")
                .short("s")
                .help("Run experiments one after another on a single session"))
            .arg(Arg::with_name("seats")
                .long("seats")
                .takes_value(true)
                .value_name("n")
                .help("Number of license seats available on the host (defaults to jobs)"))
            .arg(Arg::with_name("output")
                .long("output")
                .short("o")
                .takes_value(true)
                .value_name("path")
                .help("Write a toml report of the batch to the given file")))

        // check subcommand
        .subcommand(SubCommand::with_name("check")
            .display_order(11)
            .about("Validate a batch file without running it")
            .arg(Arg::with_name("batch")
                .required(true)
                .value_name("path")))

        // table subcommand
        .subcommand(SubCommand::with_name("table")
            .display_order(12)
            .about("Print a table from the model used by a batch file")
            .arg(Arg::with_name("batch")
                .required(true)
                .value_name("path"))
            .arg(Arg::with_name("table")
                .required(true)
                .value_name("name")
                .help("Table name, relative to the path context")))
}

pub fn init() -> ArgMatches<'static> {
    app().get_matches()
}

/// Runs based on specified subcommand.
pub fn start(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("run", Some(m)) => start_run(m),
        ("check", Some(m)) => start_check(m),
        ("table", Some(m)) => start_table(m),
        _ => Ok(()),
    }
}

fn start_run(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);
    let path = batch_path(matches)?;
    let mut batch = read_batch(&path)?;

    if let Some(jobs) = matches.value_of("jobs") {
        batch.config.max_concurrency = jobs
            .parse()
            .with_context(|| format!("invalid number of jobs: {}", jobs))?;
    }
    let seats = match matches.value_of("seats") {
        Some(s) => s
            .parse()
            .with_context(|| format!("invalid number of seats: {}", s))?,
        None => batch.config.max_concurrency,
    };
    let host = MemoryHost::new(seats);

    // cancel the batch on ctrl-c, letting in-flight runs finish
    let cancel = CancelToken::new();
    let c = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("cancelling batch, waiting for running experiments");
        c.cancel();
    })?;

    let started_at = chrono::Utc::now();
    let timer = Instant::now();
    let results = match matches.is_present("sequential") {
        true => SequentialRunner::new(&host, batch.config.clone())
            .with_cancel_token(cancel)
            .run(&batch.experiments),
        false => ParallelRunner::new(&host, batch.config.clone())
            .with_cancel_token(cancel)
            .run(&batch.experiments),
    };
    let results = results.with_context(|| format!("batch {} failed", path.to_string_lossy()))?;
    debug!("batch finished in {:?}", timer.elapsed());

    let report = BatchReport::new(started_at, chrono::Utc::now(), &results);
    util::print_results(&batch.experiments, &results);
    println!("{}", report.summary());

    if let Some(output) = matches.value_of("output") {
        fs::write(output, report.to_toml_string()?)
            .with_context(|| format!("failed writing report to {}", output))?;
        info!("report written to {}", output);
    }
    Ok(())
}

fn start_check(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);
    let path = batch_path(matches)?;
    let batch = read_batch(&path)?;
    util::print_batch_summary(&batch);
    Ok(())
}

fn start_table(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);
    let path = batch_path(matches)?;
    let batch = read_batch(&path)?;
    let name = matches
        .value_of("table")
        .ok_or(Error::msg("table name not provided"))?;

    let mut sim = Simulator::new(MemoryHost::new(1), batch.config)?;
    let table = sim
        .get_table(name)
        .with_context(|| format!("failed reading table {}", name))?;
    sim.quit()?;
    util::print_table(&table);
    Ok(())
}

fn batch_path(matches: &ArgMatches) -> Result<PathBuf> {
    match matches.value_of("batch") {
        Some(p) => Ok(PathBuf::from(p)),
        None => Err(Error::msg("batch path not provided")),
    }
}

fn read_batch(path: &Path) -> Result<Batch> {
    Batch::from_path(path).with_context(|| format!("failed reading batch {}", path.to_string_lossy()))
}

fn setup_log_verbosity(matches: &ArgMatches) {
    use self::simplelog::{LevelFilter, TermLogger};
    let level_filter = match matches.value_of("verbosity") {
        Some(s) => match s {
            "0" | "none" => LevelFilter::Off,
            "1" | "err" | "error" | "min" => LevelFilter::Error,
            "2" | "warn" | "warning" | "default" => LevelFilter::Warn,
            "3" | "info" => LevelFilter::Info,
            "4" | "debug" => LevelFilter::Debug,
            "5" | "trace" | "max" | "all" => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        },
        _ => LevelFilter::Warn,
    };
    let mut config_builder = simplelog::ConfigBuilder::new();
    let logger_conf = config_builder
        .set_time_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Debug)
        .set_location_level(LevelFilter::Error)
        .set_time_format_str("%H:%M:%S%.6f")
        .build();
    let _ = TermLogger::init(level_filter, logger_conf, simplelog::TerminalMode::Mixed);
}

#[test]
fn run_args_parse() {
    let matches = app()
        .get_matches_from_safe(vec![
            "simdrive", "run", "batch.toml", "--jobs", "4", "--seats", "2", "-v", "debug",
        ])
        .unwrap();
    let (name, sub) = matches.subcommand();
    assert_eq!(name, "run");
    let sub = sub.unwrap();
    assert_eq!(sub.value_of("batch"), Some("batch.toml"));
    assert_eq!(sub.value_of("jobs"), Some("4"));
    assert_eq!(sub.value_of("verbosity"), Some("debug"));
    assert!(!sub.is_present("sequential"));
}
