//! Best-effort snapshot of the host the benchmark runs on.

use crate::error::{BenchError, BenchResult};
use crate::utils::timestamp;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use sysinfo::System;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const UNKNOWN: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct SystemSpecs {
    pub os: Option<String>,
    pub processor: Option<String>,
    pub architecture: String,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub cpu_frequency_mhz: Option<u64>,
    pub ram_total_bytes: u64,
    pub ram_available_bytes: u64,
}

impl SystemSpecs {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let os = match (System::name(), System::os_version(), System::kernel_version()) {
            (Some(name), Some(version), Some(kernel)) => {
                Some(format!("{} {} (Kernel {})", name, version, kernel))
            }
            (Some(name), Some(version), None) => Some(format!("{} {}", name, version)),
            (Some(name), None, _) => Some(name),
            _ => None,
        };

        let processor = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());

        let cpu_frequency_mhz = sys
            .cpus()
            .first()
            .map(|cpu| cpu.frequency())
            .filter(|mhz| *mhz > 0);

        let logical_cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };

        Self {
            os,
            processor,
            architecture: std::env::consts::ARCH.to_string(),
            physical_cores: sys.physical_core_count(),
            logical_cores,
            cpu_frequency_mhz,
            ram_total_bytes: sys.total_memory(),
            ram_available_bytes: sys.available_memory(),
        }
    }

    /// Short host description stored with archived runs.
    pub fn host_summary(&self) -> String {
        format!(
            "{} / {} / {} cores",
            self.os.as_deref().unwrap_or(UNKNOWN),
            self.processor.as_deref().unwrap_or(UNKNOWN),
            self.logical_cores
        )
    }

    /// Labelled fields in display order, with placeholders for missing data.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let ram = |bytes: u64| {
            if bytes == 0 {
                NOT_AVAILABLE.to_string()
            } else {
                format!("{:.2} GB", bytes as f64 / GIB)
            }
        };
        let usage = if self.ram_total_bytes == 0 {
            NOT_AVAILABLE.to_string()
        } else {
            let used = self.ram_total_bytes.saturating_sub(self.ram_available_bytes);
            format!("{:.1}%", used as f64 / self.ram_total_bytes as f64 * 100.0)
        };

        vec![
            ("OS", self.os.clone().unwrap_or_else(|| UNKNOWN.to_string())),
            (
                "Processor",
                self.processor.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            ),
            ("Architecture", self.architecture.clone()),
            ("Harness Version", env!("CARGO_PKG_VERSION").to_string()),
            (
                "CPU Cores (Physical)",
                self.physical_cores
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string()),
            ),
            ("CPU Cores (Logical)", self.logical_cores.to_string()),
            (
                "CPU Frequency",
                self.cpu_frequency_mhz
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |mhz| format!("{} MHz", mhz)),
            ),
            ("RAM Total", ram(self.ram_total_bytes)),
            ("RAM Available", ram(self.ram_available_bytes)),
            ("RAM Usage", usage),
        ]
    }

    pub fn print(&self) {
        println!("\n{}", "=".repeat(65));
        println!("  SYSTEM SPECIFICATIONS");
        println!("{}", "=".repeat(65));
        for (key, value) in self.entries() {
            println!("  {}: {}", key, value);
        }
        println!("{}", "=".repeat(65));
    }

    /// Renders the specs file body. `extra` lines (run settings) are appended
    /// before the timestamp.
    pub fn render(&self, extra: &[(&str, String)]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SYSTEM SPECIFICATIONS");
        let _ = writeln!(out, "{}", "=".repeat(50));
        for (key, value) in self.entries() {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        for (key, value) in extra {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        let _ = writeln!(out, "{}", "=".repeat(50));
        let _ = writeln!(out, "Timestamp: {}", timestamp());
        out
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, extra: &[(&str, String)]) -> BenchResult<()> {
        let path = path.as_ref();
        fs::write(path, self.render(extra)).map_err(|e| BenchError::io(path, e))
    }
}
