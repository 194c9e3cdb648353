use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Formats byte count in human-readable form (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Short size label for chart axes: whole GB from 1024 MB up, whole MB below.
pub fn size_label(bytes: u64) -> String {
    let size_mb = bytes as f64 / (1024.0 * 1024.0);
    if size_mb >= 1024.0 {
        format!("{} GB", (size_mb / 1024.0) as u64)
    } else {
        format!("{} MB", size_mb as u64)
    }
}

/// Local timestamp used in logs and the specs file.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Append-only audit log with one timestamped line per event.
pub struct Logger {
    file_path: PathBuf,
}

impl Logger {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        writeln!(file, "[{}] {}", timestamp(), message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_logger() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_path = dir.path().join("hashbench.log");

        let logger = Logger::new(&log_path);
        logger.log("Test message 1")?;
        logger.log("Test message 2")?;

        let content = fs::read_to_string(&log_path)?;
        assert!(content.contains("Test message 1"));
        assert!(content.contains("Test message 2"));
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with('[')); // Timestamp check
        Ok(())
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_size_label() {
        assert_eq!(size_label(1024 * 1024), "1 MB");
        assert_eq!(size_label(100 * 1024 * 1024), "100 MB");
        assert_eq!(size_label(1024 * 1024 * 1024), "1 GB");
        assert_eq!(size_label(512), "0 MB");
    }
}
