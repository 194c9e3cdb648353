//! Dataset discovery, ordering and dummy-file generation.

use crate::error::{BenchError, BenchResult};
use crate::utils::format_bytes;
use rand::RngCore;
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const MIB: usize = 1024 * 1024;

/// Labels of the files produced by `generate` when no sizes are given.
pub const DEFAULT_SIZES: [&str; 4] = ["1MB", "10MB", "100MB", "1GB"];

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+)(MB|GB)").expect("valid regex"))
}

/// Size in MB encoded in a filename such as `test_10MB.dat`; `GB` counts as
/// 1024 MB and names without a size sort as 0.
pub fn size_from_filename(name: &str) -> u64 {
    let Some(caps) = size_pattern().captures(name) else {
        return 0;
    };
    let Ok(size) = caps[1].parse::<u64>() else {
        return 0;
    };
    if caps[2].eq_ignore_ascii_case("GB") {
        size.saturating_mul(1024)
    } else {
        size
    }
}

/// A file of the dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Lists the regular files directly inside `dir`, ordered by the size in
/// their names and then by name.
pub fn list_dataset<P: AsRef<Path>>(dir: P) -> BenchResult<Vec<DatasetFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(BenchError::missing(format!(
            "dataset directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            BenchError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|e| BenchError::io(entry.path(), e.into()))?;
        files.push(DatasetFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(|a, b| {
        size_from_filename(&a.name)
            .cmp(&size_from_filename(&b.name))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(files)
}

/// A dummy file to generate: its label (e.g. `10MB`) and size in MiB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummySize {
    pub label: String,
    pub size_mb: u64,
}

impl DummySize {
    pub fn parse(label: &str) -> BenchResult<Self> {
        let label = label.trim();
        let valid = size_pattern()
            .find(label)
            .is_some_and(|m| m.start() == 0 && m.end() == label.len());
        let size_mb = size_from_filename(label);
        if !valid || size_mb == 0 {
            return Err(BenchError::config(format!(
                "invalid size '{}', expected e.g. 10MB or 1GB",
                label
            )));
        }
        Ok(Self {
            label: label.to_uppercase(),
            size_mb,
        })
    }

    pub fn file_name(&self) -> String {
        format!("test_{}.dat", self.label)
    }
}

/// Outcome of generating one dummy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Created(PathBuf),
    Skipped(PathBuf),
}

/// Writes `test_<label>.dat` for every size, filling each with one random
/// MiB repeated. Existing files are left alone.
pub fn generate_dummy_files<P: AsRef<Path>>(
    dir: P,
    sizes: &[DummySize],
) -> BenchResult<Vec<Generated>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| BenchError::io(dir, e))?;

    let mut outcomes = Vec::with_capacity(sizes.len());
    for size in sizes {
        let path = dir.join(size.file_name());
        if path.exists() {
            println!("  [{}] Already exists, skipping.", size.label);
            outcomes.push(Generated::Skipped(path));
            continue;
        }

        println!(
            "  [{}] Writing {}...",
            size.label,
            format_bytes(size.size_mb * MIB as u64)
        );

        let mut chunk = vec![0u8; MIB];
        rand::thread_rng().fill_bytes(&mut chunk);

        let file = File::create(&path).map_err(|e| BenchError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        for _ in 0..size.size_mb {
            writer
                .write_all(&chunk)
                .map_err(|e| BenchError::io(&path, e))?;
        }
        writer.flush().map_err(|e| BenchError::io(&path, e))?;

        outcomes.push(Generated::Created(path));
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_size_from_filename() {
        assert_eq!(size_from_filename("test_1MB.dat"), 1);
        assert_eq!(size_from_filename("test_10mb.dat"), 10);
        assert_eq!(size_from_filename("test_1GB.dat"), 1024);
        assert_eq!(size_from_filename("test_2Gb.bin"), 2048);
        assert_eq!(size_from_filename("notes.txt"), 0);
    }

    #[test]
    fn test_dataset_sorted_by_filename_size() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["test_1GB.dat", "test_10MB.dat", "readme.txt", "test_1MB.dat"] {
            File::create(dir.path().join(name))?.write_all(b"x")?;
        }
        fs::create_dir(dir.path().join("nested"))?;

        let names: Vec<String> = list_dataset(dir.path())?
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(
            names,
            vec!["readme.txt", "test_1MB.dat", "test_10MB.dat", "test_1GB.dat"]
        );
        Ok(())
    }

    #[test]
    fn test_missing_dataset_dir() {
        let err = list_dataset("no_such_dataset_dir").unwrap_err();
        assert!(matches!(err, BenchError::MissingArtifact(_)));
    }

    #[test]
    fn test_dummy_size_parse() {
        assert_eq!(
            DummySize::parse("1gb").unwrap(),
            DummySize {
                label: "1GB".to_string(),
                size_mb: 1024
            }
        );
        assert_eq!(DummySize::parse("10MB").unwrap().file_name(), "test_10MB.dat");
        assert!(DummySize::parse("0MB").is_err());
        assert!(DummySize::parse("10KB").is_err());
        assert!(DummySize::parse("big10MB").is_err());
    }

    #[test]
    fn test_generate_creates_then_skips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset = dir.path().join("dataset");
        let sizes = vec![DummySize::parse("1MB")?, DummySize::parse("2MB")?];

        let first = generate_dummy_files(&dataset, &sizes)?;
        assert!(first.iter().all(|g| matches!(g, Generated::Created(_))));
        assert_eq!(fs::metadata(dataset.join("test_2MB.dat"))?.len(), 2 * MIB as u64);

        let second = generate_dummy_files(&dataset, &sizes)?;
        assert!(second.iter().all(|g| matches!(g, Generated::Skipped(_))));
        Ok(())
    }
}
