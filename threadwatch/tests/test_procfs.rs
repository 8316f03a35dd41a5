use std::sync::mpsc;
use std::time::{Duration, Instant};

use threadwatch::domain::{Pid, Tid};
use threadwatch::monitor::{MonitorConfig, SortKey, ThreadMonitor};
use threadwatch::procfs::{list_threads, ProcfsProcess, ProcfsTiming, SyscallSampler};
use threadwatch::providers::{ProcessProvider, SymbolProvider};
use threadwatch::symbolization::ProcSymbols;

fn own_pid() -> Pid {
    Pid(std::process::id())
}

/// Spawn a thread that burns CPU until the returned sender is dropped.
fn spinner() -> (mpsc::Sender<()>, std::thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<()>();
    let handle = std::thread::spawn(move || {
        let mut x: u64 = 0;
        while matches!(rx.try_recv(), Err(mpsc::TryRecvError::Empty)) {
            x = std::hint::black_box(x.wrapping_add(1));
        }
    });
    (tx, handle)
}

#[test]
fn test_own_process_snapshot() {
    let snapshot = ProcfsProcess::new(own_pid())
        .current_process()
        .unwrap()
        .expect("own process must exist");

    assert_eq!(snapshot.handle.pid, own_pid());
    assert!(!snapshot.name.is_empty());
    assert!(snapshot.threads.iter().any(|t| t.tid == Tid(std::process::id())));
    assert!(snapshot.threads.iter().all(|t| t.handle.is_some()));
}

#[test]
fn test_missing_process_snapshot() {
    let snapshot = ProcfsProcess::new(Pid(999_999_999)).current_process().unwrap();
    assert!(snapshot.is_none());
}

#[test]
fn test_monitor_over_own_process() {
    let (stop, handle) = spinner();

    let config = MonitorConfig { settle_delay_ms: 300, ..MonitorConfig::default() };
    let mut monitor =
        ThreadMonitor::new(config, Box::new(ProcfsTiming::new()), Box::new(SyscallSampler::new()));
    let snapshot = ProcfsProcess::new(own_pid()).current_process().unwrap();
    let symbols = ProcSymbols::load(own_pid()).ok().map(|s| Box::new(s) as Box<dyn SymbolProvider>);

    monitor.rebuild(snapshot.as_ref(), symbols);
    assert!(!monitor.is_empty());
    assert!(list_threads(own_pid()).unwrap().contains(&Tid(std::process::id())));
    assert_eq!(monitor.ordering().key(), SortKey::CpuUsage);

    // The spinner is the busiest thread
    let busiest = &monitor.records()[0];
    assert!(busiest.cpu_usage() > 20, "busiest thread at {}%", busiest.cpu_usage());
    assert!(busiest.total_cpu_ms() >= 0);

    let started = Instant::now();
    std::thread::sleep(Duration::from_millis(200));
    monitor.tick();
    assert!(monitor.last_refresh_ms() >= i64::try_from(started.elapsed().as_millis()).unwrap());

    drop(stop);
    handle.join().unwrap();
}
