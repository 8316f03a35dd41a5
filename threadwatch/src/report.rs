//! Plain-text rendering of the record collection for the headless driver

// Column widths are small constants
#![allow(clippy::format_push_string)]

use crate::monitor::{SortDirection, SortKey, ThreadMonitor, ThreadRecord};

const LOCATION_WIDTH: usize = 40;

/// Arrow shown next to the active column.
fn marker(monitor: &ThreadMonitor, key: SortKey) -> &'static str {
    let ordering = monitor.ordering();
    match (ordering.key() == key, ordering.direction()) {
        (false, _) => "",
        (true, SortDirection::Ascending) => "^",
        (true, SortDirection::Descending) => "v",
    }
}

/// Cut `text` to `width` characters, marking the cut with `~`.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn format_row(record: &ThreadRecord) -> String {
    format!(
        "{:>8}  {:>5}  {:>9}  {:<width$}  {}",
        record.tid().0,
        record.cpu_usage_display(),
        record.total_cpu_display(),
        fit(record.location(), LOCATION_WIDTH),
        record.modules(),
        width = LOCATION_WIDTH
    )
}

/// Header plus the first `rows` records (all of them when `rows` is 0).
#[must_use]
pub fn format_table(monitor: &ThreadMonitor, rows: usize) -> String {
    let mut output = String::new();

    match monitor.process() {
        Some(process) => output.push_str(&format!("{} - {} threads\n", process.pid, monitor.len())),
        None => {
            output.push_str("no process\n");
            return output;
        }
    }

    output.push_str(&format!(
        "{:>8}  {:>5}  {:>9}  {:<width$}  {}\n",
        format!("TID{}", marker(monitor, SortKey::ThreadId)),
        format!("CPU{}", marker(monitor, SortKey::CpuUsage)),
        format!("TOTAL{}", marker(monitor, SortKey::TotalCpu)),
        format!("LOCATION{}", marker(monitor, SortKey::Location)),
        "MODULES",
        width = LOCATION_WIDTH
    ));

    let limit = if rows == 0 { monitor.len() } else { rows };
    for record in monitor.records().iter().take(limit) {
        output.push_str(&format_row(record));
        output.push('\n');
    }

    if monitor.len() > limit {
        output.push_str(&format!("... {} more\n", monitor.len() - limit));
    }
    output
}
