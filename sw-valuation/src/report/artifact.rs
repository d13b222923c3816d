//! Per-level CSV artifacts.
//!
//! One file per level and run, named
//! `industry_pe_pb_sw_{level}_{YYYYmmdd_HHMMSS}.csv`. Files start with a
//! UTF-8 BOM so spreadsheet tools pick the right encoding. Older files are
//! read back for trend comparison.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use sw_common::{Error, Result};

use crate::data::IndustryLevel;
use crate::valuation::{sort_by_pe_percentile, IndexValuation};

/// Prefix shared by every artifact file name.
pub const ARTIFACT_PREFIX: &str = "industry_pe_pb_sw_";

/// Column order of every artifact.
pub const COLUMNS: [&str; 8] = [
    "index_code",
    "index_name",
    "pe",
    "pe_percentile",
    "pb",
    "pb_percentile",
    "sample_count",
    "latest_date",
];

const BOM: &str = "\u{feff}";
const DATE_FORMAT: &str = "%Y%m%d";

/// File name for a level's artifact written at `timestamp`.
pub fn artifact_file_name(level: IndustryLevel, timestamp: NaiveDateTime) -> String {
    format!(
        "{}{}_{}.csv",
        ARTIFACT_PREFIX,
        level.code(),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// One CSV row. Missing values are written as empty cells.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRow {
    index_code: String,
    index_name: String,
    pe: Option<f64>,
    pe_percentile: Option<f64>,
    pb: Option<f64>,
    pb_percentile: Option<f64>,
    sample_count: usize,
    latest_date: Option<String>,
}

impl From<&IndexValuation> for ArtifactRow {
    fn from(v: &IndexValuation) -> Self {
        Self {
            index_code: v.index_code.clone(),
            index_name: v.index_name.clone(),
            pe: v.pe,
            pe_percentile: v.pe_percentile,
            pb: v.pb,
            pb_percentile: v.pb_percentile,
            sample_count: v.sample_count,
            latest_date: v.latest_date.map(|d| d.format(DATE_FORMAT).to_string()),
        }
    }
}

impl From<ArtifactRow> for IndexValuation {
    fn from(row: ArtifactRow) -> Self {
        Self {
            index_code: row.index_code,
            index_name: row.index_name,
            pe: row.pe,
            pe_percentile: row.pe_percentile,
            pb: row.pb,
            pb_percentile: row.pb_percentile,
            sample_count: row.sample_count,
            latest_date: row
                .latest_date
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()),
        }
    }
}

/// Write a level's results to `dir`, creating it if needed.
pub fn write_results(
    dir: &Path,
    level: IndustryLevel,
    results: &[IndexValuation],
    timestamp: NaiveDateTime,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::from(e).with_context(format!("create {}", dir.display())))?;

    let path = dir.join(artifact_file_name(level, timestamp));
    let mut file = fs::File::create(&path)?;
    file.write_all(BOM.as_bytes())?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(COLUMNS)?;
    for result in results {
        writer.serialize(ArtifactRow::from(result))?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = results.len(), "Artifact written");
    Ok(path)
}

/// Read an artifact back, sorted by PE percentile with missing last.
pub fn read_results(path: &Path) -> Result<Vec<IndexValuation>> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::from(e).with_context(format!("read {}", path.display())))?;
    let text = text.strip_prefix(BOM).unwrap_or(&text);

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let mut results = Vec::new();
    for row in reader.deserialize::<ArtifactRow>() {
        results.push(IndexValuation::from(row?));
    }

    sort_by_pe_percentile(&mut results);
    Ok(results)
}

/// Artifacts in `dir` with their modification times.
///
/// `level = None` lists every level. A missing directory yields nothing.
pub fn list_artifacts(
    dir: &Path,
    level: Option<IndustryLevel>,
) -> Result<Vec<(PathBuf, SystemTime)>> {
    let prefix = match level {
        Some(level) => format!("{}{}_", ARTIFACT_PREFIX, level.code()),
        None => ARTIFACT_PREFIX.to_string(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(&prefix) || !name.ends_with(".csv") {
            continue;
        }

        let meta = entry.metadata()?;
        if meta.is_file() {
            found.push((entry.path(), meta.modified()?));
        }
    }

    Ok(found)
}

/// Newest artifact for a level by modification time.
pub fn latest_file(dir: &Path, level: IndustryLevel) -> Result<Option<PathBuf>> {
    Ok(list_artifacts(dir, Some(level))?
        .into_iter()
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path))
}

/// Newest artifact for a level modified strictly before `cutoff`.
pub fn find_baseline(
    dir: &Path,
    level: IndustryLevel,
    cutoff: SystemTime,
) -> Result<Option<PathBuf>> {
    Ok(list_artifacts(dir, Some(level))?
        .into_iter()
        .filter(|(_, modified)| *modified < cutoff)
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, 30, 5)
            .unwrap()
    }

    fn valuation(code: &str, pe_pct: Option<f64>) -> IndexValuation {
        IndexValuation {
            index_code: code.into(),
            index_name: format!("申万{}", code),
            pe: Some(12.5),
            pe_percentile: pe_pct,
            pb: None,
            pb_percentile: None,
            sample_count: 240,
            latest_date: NaiveDate::from_ymd_opt(2024, 5, 31),
        }
    }

    fn set_mtime(path: &Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            artifact_file_name(IndustryLevel::L2, ts(9)),
            "industry_pe_pb_sw_L2_20240603_093005.csv"
        );
    }

    #[test]
    fn test_write_creates_dir_and_bom() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/output");

        let results = [valuation("801780.SI", Some(3.5))];
        let path = write_results(&dir, IndustryLevel::L1, &results, ts(9)).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM.as_bytes()));

        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.trim_start_matches(BOM).lines();
        assert_eq!(
            lines.next(),
            Some(
                "index_code,index_name,pe,pe_percentile,pb,pb_percentile,sample_count,latest_date"
            )
        );
        assert_eq!(lines.next(), Some("801780.SI,申万801780.SI,12.5,3.5,,,240,20240531"));
    }

    #[test]
    fn test_read_back_sorted_with_missing_values() {
        let tmp = TempDir::new().unwrap();
        let results = vec![
            valuation("a", None),
            valuation("b", Some(90.0)),
            valuation("c", Some(10.0)),
        ];
        let path = write_results(tmp.path(), IndustryLevel::L3, &results, ts(9)).unwrap();

        let read = read_results(&path).unwrap();
        let codes: Vec<_> = read.iter().map(|r| r.index_code.as_str()).collect();
        assert_eq!(codes, vec!["c", "b", "a"]);
        assert_eq!(read[2].pe_percentile, None);
        assert_eq!(read[0].pb, None);
        assert_eq!(read[0].latest_date, NaiveDate::from_ymd_opt(2024, 5, 31));
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        assert!(list_artifacts(&missing, None).unwrap().is_empty());
        assert_eq!(latest_file(&missing, IndustryLevel::L1).unwrap(), None);
    }

    #[test]
    fn test_empty_results_keep_header() {
        let tmp = TempDir::new().unwrap();
        let path = write_results(tmp.path(), IndustryLevel::L2, &[], ts(9)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_start_matches(BOM).trim_end(), COLUMNS.join(","));
        assert!(read_results(&path).unwrap().is_empty());
    }

    #[test]
    fn test_latest_and_baseline_by_mtime() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();

        let old = write_results(dir, IndustryLevel::L1, &[], ts(1)).unwrap();
        let older = write_results(dir, IndustryLevel::L1, &[], ts(2)).unwrap();
        let fresh = write_results(dir, IndustryLevel::L1, &[], ts(3)).unwrap();
        let other_level = write_results(dir, IndustryLevel::L2, &[], ts(4)).unwrap();
        fs::write(dir.join("notes.csv"), "x").unwrap();

        set_mtime(&old, Duration::from_secs(8 * 86_400));
        set_mtime(&older, Duration::from_secs(20 * 86_400));
        set_mtime(&fresh, Duration::from_secs(60));
        set_mtime(&other_level, Duration::from_secs(10));

        assert_eq!(latest_file(dir, IndustryLevel::L1).unwrap(), Some(fresh));

        let cutoff = SystemTime::now() - Duration::from_secs(7 * 86_400);
        assert_eq!(find_baseline(dir, IndustryLevel::L1, cutoff).unwrap(), Some(old));
        assert_eq!(find_baseline(dir, IndustryLevel::L2, cutoff).unwrap(), None);
        assert_eq!(list_artifacts(dir, None).unwrap().len(), 4);
    }
}
