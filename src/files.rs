//! Helpers for locating daily AIS dumps on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use walkdir::WalkDir;

use crate::error::CleanError;

/// Maps daily dump files named like `aisdk-2023-09-20.csv` to their date.
/// Paths whose name does not follow the pattern are ignored.
pub fn files_by_date<P: AsRef<Path>>(paths: &[P]) -> BTreeMap<NaiveDate, PathBuf> {
    paths
        .iter()
        .filter_map(|p| {
            let path = p.as_ref();
            let name = path.file_name()?.to_str()?;
            let stem = name.split('.').next()?;
            let (_, date) = stem.split_once('-')?;
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            Some((date, path.to_path_buf()))
        })
        .collect()
}

fn entries(dir: &Path) -> impl Iterator<Item = Result<walkdir::DirEntry, walkdir::Error>> {
    WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name().into_iter()
}

/// Immediate subdirectories of `dir`.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, CleanError> {
    let mut out = Vec::new();
    for entry in entries(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Regular files directly inside `dir`.
pub fn files_in(dir: &Path) -> Result<Vec<PathBuf>, CleanError> {
    let mut out = Vec::new();
    for entry in entries(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// The most recently modified entry of `dir`, `None` when it is empty.
pub fn last_file(dir: &Path) -> Result<Option<PathBuf>, CleanError> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        let modified = entry
            .metadata()
            .map_err(std::io::Error::from)?
            .modified()?;
        if latest.as_ref().map_or(true, |(t, _)| modified >= *t) {
            latest = Some((modified, entry.into_path()));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn test_files_by_date() {
        let paths = [
            "data/raw/aisdk-2023-09-20.csv",
            "aisdk-2023-09-16.zip",
            "data/notes.txt",
            "aisdk-2023-13-01.csv",
        ];
        let dated = files_by_date(&paths);
        assert_eq!(dated.len(), 2);
        let first = dated.iter().next().unwrap();
        assert_eq!(*first.0, NaiveDate::from_ymd_opt(2023, 9, 16).unwrap());
        assert_eq!(first.1, &PathBuf::from("aisdk-2023-09-16.zip"));
    }

    #[test]
    fn test_listings() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("raw")).unwrap();
        fs::create_dir(dir.path().join("cleaned")).unwrap();
        fs::write(dir.path().join("b.csv"), "x").unwrap();
        fs::write(dir.path().join("raw").join("nested.csv"), "x").unwrap();

        let subdirs = subdirectories(dir.path()).unwrap();
        assert_eq!(
            subdirs,
            vec![dir.path().join("cleaned"), dir.path().join("raw")]
        );
        assert_eq!(files_in(dir.path()).unwrap(), vec![dir.path().join("b.csv")]);
    }

    #[test]
    fn test_last_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(last_file(dir.path()).unwrap(), None);

        let old = dir.path().join("old.csv");
        let new = dir.path().join("new.csv");
        fs::write(&old, "x").unwrap();
        fs::write(&new, "x").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(last_file(dir.path()).unwrap(), Some(new));
    }
}
