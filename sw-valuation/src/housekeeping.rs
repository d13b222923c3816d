//! Removal of stale CSV artifacts.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use sw_common::Result;

use crate::report::list_artifacts;

/// Delete artifacts in `dir` last modified more than `days` days ago.
///
/// Returns the deleted paths. A missing directory deletes nothing.
pub fn cleanup_old_files(dir: &Path, days: u32) -> Result<Vec<PathBuf>> {
    let window = Duration::from_secs(u64::from(days) * 86_400);
    let cutoff = SystemTime::now()
        .checked_sub(window)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    cleanup_before(dir, cutoff)
}

/// Delete artifacts in `dir` last modified before `cutoff`.
pub fn cleanup_before(dir: &Path, cutoff: SystemTime) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();

    for (path, modified) in list_artifacts(dir, None)? {
        if modified < cutoff {
            std::fs::remove_file(&path)?;
            debug!(path = %path.display(), "Deleted stale artifact");
            deleted.push(path);
        }
    }

    info!(dir = %dir.display(), deleted = deleted.len(), "Artifact cleanup finished");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_days: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "\u{feff}index_code\n").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_days * 86_400))
            .unwrap();
        path
    }

    #[test]
    fn test_removes_only_stale_artifacts() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();

        let stale = touch(dir, "industry_pe_pb_sw_L1_20230101_150000.csv", 400);
        let fresh = touch(dir, "industry_pe_pb_sw_L1_20240101_150000.csv", 3);
        let unrelated = touch(dir, "valuation_report_20230101.md", 400);
        let other_csv = touch(dir, "prices.csv", 400);

        let deleted = cleanup_old_files(dir, 365).unwrap();

        assert_eq!(deleted, vec![stale.clone()]);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
        assert!(other_csv.exists());
    }

    #[test]
    fn test_missing_directory_is_ok() {
        let tmp = TempDir::new().unwrap();
        let deleted = cleanup_old_files(&tmp.path().join("nope"), 7).unwrap();
        assert!(deleted.is_empty());
    }

    #[test]
    fn test_zero_days_removes_everything_older_than_now() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "industry_pe_pb_sw_L2_20240101_150000.csv", 1);
        touch(tmp.path(), "industry_pe_pb_sw_L3_20240101_150000.csv", 2);

        assert_eq!(cleanup_old_files(tmp.path(), 0).unwrap().len(), 2);
    }
}
