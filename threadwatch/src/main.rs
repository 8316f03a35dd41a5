//! # threadwatch - Main Entry Point
//!
//! Headless driver: resolves the target, builds a [`ThreadMonitor`] over the
//! `/proc` backend, then refreshes and prints the table on a fixed interval
//! until interrupted, the duration elapses or the target exits.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::rc::Rc;
use std::time::{Duration, Instant};

use threadwatch::cli::Args;
use threadwatch::domain::{Pid, ProfilerError};
use threadwatch::export::{write_snapshots, MonitorSnapshot};
use threadwatch::monitor::{MonitorConfig, ThreadMonitor};
use threadwatch::preflight::{
    can_sample_stacks, check_binary_exists, check_debug_symbols, check_proc_access,
    check_process_exists,
};
use threadwatch::process_lookup::{find_process_by_name, resolve_exe_path};
use threadwatch::procfs::{list_threads, process_exists, ProcfsProcess, ProcfsTiming, SyscallSampler};
use threadwatch::providers::{ProcessProvider, SymbolProvider};
use threadwatch::report::format_table;
use threadwatch::symbolization::ProcSymbols;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") || msg.contains("invalid configuration") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Resolve the PID from CLI arguments.
///
/// - `threadwatch my-app` - find process by name
/// - `threadwatch --pid 1234` - explicit PID
fn resolve_pid(args: &Args) -> Result<Pid> {
    if let Some(ref name) = args.process {
        if args.pid.is_some() {
            anyhow::bail!(
                "Cannot use PROCESS argument with --pid.\n\n\
                 Use either:\n  \
                 threadwatch my-app              (auto-detect)\n  \
                 threadwatch --pid 1234          (explicit PID)"
            );
        }
        let found = find_process_by_name(name)?;
        return Ok(found.pid);
    }

    if let Some(pid) = args.pid {
        return Ok(Pid(pid));
    }

    anyhow::bail!(
        "Missing required argument: PROCESS or --pid\n\n\
         Usage:\n  \
         threadwatch my-app              Auto-detect PID\n  \
         threadwatch --pid 1234          Explicit PID\n\n\
         Run 'threadwatch --help' for more options"
    )
}

/// Config file (if any) with CLI overrides applied on top.
fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match args.config {
        Some(ref path) => MonitorConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    if let Some(interval_ms) = args.interval_ms {
        config.tick_interval_ms = interval_ms;
    }
    if let Some(max_threads) = args.max_threads {
        config.max_displayed_threads = max_threads;
    }
    if let Some(max_sampled) = args.max_sampled {
        config.max_sampled_threads = max_sampled;
    }
    if let Some(sort) = args.sort {
        config.sort = sort.into();
    }

    config.validate()?;
    Ok(config)
}

/// Symbol provider for the target; `None` leaves every location unknown.
/// Shared so that loaded symbolizers survive monitor rebuilds.
fn load_symbols(pid: Pid, exe_path: &str, target: Option<&str>) -> Option<Rc<ProcSymbols>> {
    match ProcSymbols::load(pid) {
        Ok(symbols) => {
            let symbols = match target {
                Some(binary) => symbols.with_binary(exe_path, binary),
                None => symbols,
            };
            info!("{} modules mapped", symbols.modules().modules().len());
            Some(Rc::new(symbols))
        }
        Err(e) => {
            warn!("Symbols unavailable: {e}");
            None
        }
    }
}

/// Keep the loaded symbols while the memory map is unchanged.
fn refresh_symbols(
    symbols: &mut Option<Rc<ProcSymbols>>,
    pid: Pid,
    exe_path: &str,
    target: Option<&str>,
) {
    if symbols.as_ref().is_some_and(|s| s.is_current()) {
        return;
    }
    info!("Memory map of {pid} changed, reloading symbols");
    *symbols = load_symbols(pid, exe_path, target);
}

/// Rebuild from the current state of the process. Returns false once the
/// process is gone.
///
/// The settling pause blocks, so it runs off the async worker; a Ctrl+C that
/// arrives meanwhile is picked up by the next `select!`.
fn rebuild(
    monitor: &mut ThreadMonitor,
    provider: &ProcfsProcess,
    pid: Pid,
    symbols: Option<&Rc<ProcSymbols>>,
) -> Result<bool> {
    let snapshot = provider.current_process()?;
    let symbols = symbols.map(|s| Box::new(Rc::clone(s)) as Box<dyn SymbolProvider>);
    tokio::task::block_in_place(|| monitor.rebuild(snapshot.as_ref(), symbols));
    if snapshot.is_none() {
        info!("{pid} is gone");
    }
    Ok(snapshot.is_some())
}

/// True when the thread set no longer matches the records.
fn threads_changed(monitor: &ThreadMonitor, pid: Pid) -> bool {
    let Ok(tids) = list_threads(pid) else {
        return false;
    };
    let mut current: Vec<_> = tids.into_iter().take(monitor.config().max_displayed_threads).collect();
    let mut shown: Vec<_> = monitor.records().iter().map(|r| r.tid()).collect();
    current.sort_unstable();
    shown.sort_unstable();
    current != shown
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let pid = resolve_pid(&args)?;
    let config = load_config(&args)?;

    check_process_exists(pid)?;
    check_proc_access(pid)?;

    let exe_path = resolve_exe_path(pid)?.to_string_lossy().into_owned();
    let target = args
        .target
        .as_ref()
        .map(|t| -> Result<String> {
            Ok(std::fs::canonicalize(t)
                .with_context(|| format!("Failed to resolve path: {t}"))?
                .to_string_lossy()
                .into_owned())
        })
        .transpose()?;
    let symbol_binary = target.as_deref().unwrap_or(&exe_path);
    check_binary_exists(symbol_binary)?;
    check_debug_symbols(symbol_binary, quiet)?;

    if !can_sample_stacks(pid) {
        eprintln!("warning: cannot read /proc/{}/syscall, locations unavailable", pid.0);
    }

    if !quiet {
        println!("threadwatch v{}", env!("CARGO_PKG_VERSION"));
        println!("target: {exe_path}");
        println!("pid: {}", pid.0);
        if let Some(ref export_path) = args.export {
            println!("export: {}", export_path.display());
        }
    }

    let tick_interval = config.tick_interval();
    let provider = ProcfsProcess::new(pid);
    let mut monitor =
        ThreadMonitor::new(config, Box::new(ProcfsTiming::new()), Box::new(SyscallSampler::new()));

    let mut symbols = load_symbols(pid, &exe_path, target.as_deref());
    if !rebuild(&mut monitor, &provider, pid, symbols.as_ref())? {
        return Err(ProfilerError::ProcessNotFound(pid).into());
    }

    let mut snapshots = Vec::new();
    let mut record = |monitor: &ThreadMonitor| {
        if args.export.is_some() {
            snapshots.push(MonitorSnapshot::capture(monitor));
        }
        if !quiet {
            println!("\n{}", format_table(monitor, args.rows));
        }
    };
    record(&monitor);

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    let mut exit_reason = "interrupted";
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                break;
            }
        }

        if duration_limit.is_some_and(|limit| started.elapsed() >= limit) {
            exit_reason = "duration limit reached";
            break;
        }

        if !process_exists(pid) {
            monitor.rebuild(None, None);
            record(&monitor);
            exit_reason = "process exited";
            break;
        }

        if threads_changed(&monitor, pid) {
            info!("Thread set of {pid} changed, rebuilding");
            refresh_symbols(&mut symbols, pid, &exe_path, target.as_deref());
            if !rebuild(&mut monitor, &provider, pid, symbols.as_ref())? {
                record(&monitor);
                exit_reason = "process exited";
                break;
            }
        } else {
            monitor.tick();
            monitor.resort();
        }
        record(&monitor);
    }

    if !quiet {
        eprintln!("\n{exit_reason}: {:.1}s", started.elapsed().as_secs_f64());
    }

    if let Some(ref export_path) = args.export {
        write_snapshots(export_path, &snapshots)
            .with_context(|| format!("Failed to export to {}", export_path.display()))?;
        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    Ok(())
}
