//! Snapshot export
//!
//! The driver captures a [`MonitorSnapshot`] after every refresh and writes the
//! series as one JSON document on exit:
//!
//! ```json
//! { "snapshots": [ { "pid": 4242, "captured_at_ms": 1000, "sort_key": "cpu_usage",
//!   "direction": "descending", "threads": [ { "tid": 4243, "cpu_usage": 97, ... } ] } ] }
//! ```

pub mod snapshot;

pub use snapshot::{MonitorSnapshot, ThreadSnapshot};

use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ExportError;

#[derive(Serialize)]
struct SnapshotFile<'a> {
    snapshots: &'a [MonitorSnapshot],
}

/// Write `snapshots` to `path` as pretty-printed JSON.
///
/// # Errors
/// Returns [`ExportError::WriteFailed`] if the file cannot be created, or an
/// I/O or serialization error while writing it.
pub fn write_snapshots(path: impl AsRef<Path>, snapshots: &[MonitorSnapshot]) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &SnapshotFile { snapshots })?;
    writeln!(writer)?;
    writer.flush()?;

    info!("Exported {} snapshots to {}", snapshots.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{SortDirection, SortKey};

    fn snapshot(at: i64) -> MonitorSnapshot {
        MonitorSnapshot {
            pid: Some(42),
            captured_at_ms: at,
            sort_key: SortKey::CpuUsage,
            direction: SortDirection::Descending,
            threads: vec![ThreadSnapshot {
                tid: 43,
                cpu_usage: Some(97),
                total_cpu_ms: Some(1500),
                location: Some("spin".to_string()),
                modules: None,
            }],
        }
    }

    #[test]
    fn test_write_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        write_snapshots(&path, &[snapshot(1000), snapshot(2000)]).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let snapshots = json["snapshots"].as_array().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1]["captured_at_ms"], 2000);
        assert_eq!(snapshots[0]["sort_key"], "cpu_usage");
        assert_eq!(snapshots[0]["threads"][0]["cpu_usage"], 97);
        assert!(snapshots[0]["threads"][0]["modules"].is_null());
    }

    #[test]
    fn test_unwritable_path() {
        let result = write_snapshots("/nonexistent/dir/out.json", &[]);
        assert!(matches!(result, Err(ExportError::WriteFailed(_))));
    }
}
