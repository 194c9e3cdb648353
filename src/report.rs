//! Summary and raw-iteration tables: CSV export, CSV import and the console
//! summary.

use crate::error::{BenchError, BenchResult};
use crate::hasher::HashAlgorithm;
use crate::probe::Sample;
use crate::runner::BenchmarkRun;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const SUMMARY_HEADER: [&str; 9] = [
    "Filename",
    "Size_Bytes",
    "Algorithm",
    "Mean_Time_Sec",
    "Stdev_Time",
    "Throughput_MBps",
    "CPU_Usage_Pct",
    "Peak_Memory_MB",
    "Avalanche_Pct",
];

pub const RAW_HEADER: [&str; 7] = [
    "Filename",
    "Algorithm",
    "Iteration",
    "Time_Sec",
    "Time_Ms",
    "Memory_MB",
    "CPU_Pct",
];

/// One (file, algorithm) line of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub filename: String,
    pub size_bytes: u64,
    pub algorithm: HashAlgorithm,
    pub mean_time: f64,
    pub stdev_time: f64,
    pub throughput_mbps: f64,
    pub cpu_percent: f64,
    pub peak_memory_mb: f64,
    pub avalanche_pct: f64,
}

impl ResultRow {
    pub fn new(filename: &str, algorithm: HashAlgorithm, run: &BenchmarkRun, avalanche_pct: f64) -> Self {
        Self {
            filename: filename.to_string(),
            size_bytes: run.file_size,
            algorithm,
            mean_time: run.result.mean_time,
            stdev_time: run.result.stdev_time,
            throughput_mbps: run.result.throughput_mbps,
            cpu_percent: run.result.cpu_percent,
            peak_memory_mb: run.result.peak_memory_mb,
            avalanche_pct,
        }
    }

    fn csv_fields(&self) -> [String; 9] {
        [
            escape_field(&self.filename),
            self.size_bytes.to_string(),
            self.algorithm.name().to_string(),
            format!("{:.6}", self.mean_time),
            format!("{:.6}", self.stdev_time),
            format!("{:.2}", self.throughput_mbps),
            format!("{:.1}", self.cpu_percent),
            format!("{:.4}", self.peak_memory_mb),
            format!("{:.2}", self.avalanche_pct),
        ]
    }
}

/// One measured iteration of one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub filename: String,
    pub algorithm: HashAlgorithm,
    pub iteration: usize,
    pub time_secs: f64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl RawRow {
    fn from_sample(filename: &str, algorithm: HashAlgorithm, iteration: usize, sample: &Sample) -> Self {
        Self {
            filename: filename.to_string(),
            algorithm,
            iteration,
            time_secs: sample.wall_time.as_secs_f64(),
            memory_mb: sample.peak_memory_mb(),
            cpu_percent: sample.cpu_percent as f64,
        }
    }

    fn csv_fields(&self) -> [String; 7] {
        [
            escape_field(&self.filename),
            self.algorithm.name().to_string(),
            self.iteration.to_string(),
            format!("{:.9}", self.time_secs),
            format!("{:.6}", self.time_secs * 1000.0),
            format!("{:.4}", self.memory_mb),
            format!("{:.1}", self.cpu_percent),
        ]
    }
}

/// Raw rows for every sample of a run, numbered from 1.
pub fn raw_rows(filename: &str, algorithm: HashAlgorithm, run: &BenchmarkRun) -> Vec<RawRow> {
    run.samples
        .iter()
        .enumerate()
        .map(|(i, sample)| RawRow::from_sample(filename, algorithm, i + 1, sample))
        .collect()
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits one CSV line, honouring double-quoted fields.
fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

fn render<const N: usize>(header: [&str; N], rows: impl Iterator<Item = [String; N]>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", header.join(","));
    for fields in rows {
        let _ = writeln!(out, "{}", fields.join(","));
    }
    out
}

pub fn render_summary_csv(rows: &[ResultRow]) -> String {
    render(SUMMARY_HEADER, rows.iter().map(ResultRow::csv_fields))
}

pub fn render_raw_csv(rows: &[RawRow]) -> String {
    render(RAW_HEADER, rows.iter().map(RawRow::csv_fields))
}

/// Writes the complete summary table in one pass.
pub fn write_summary<P: AsRef<Path>>(path: P, rows: &[ResultRow]) -> BenchResult<()> {
    let path = path.as_ref();
    fs::write(path, render_summary_csv(rows)).map_err(|e| BenchError::io(path, e))
}

pub fn write_raw<P: AsRef<Path>>(path: P, rows: &[RawRow]) -> BenchResult<()> {
    let path = path.as_ref();
    fs::write(path, render_raw_csv(rows)).map_err(|e| BenchError::io(path, e))
}

pub fn parse_summary_csv(content: &str) -> BenchResult<Vec<ResultRow>> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| BenchError::Malformed {
            line: 1,
            reason: "empty summary table".to_string(),
        })?;
    let header = split_line(header).map_err(|reason| BenchError::Malformed { line: 1, reason })?;
    if header != SUMMARY_HEADER {
        return Err(BenchError::Malformed {
            line: 1,
            reason: format!("unexpected header {:?}", header),
        });
    }

    let mut rows = Vec::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let malformed = |reason: String| BenchError::Malformed {
            line: line_no,
            reason,
        };

        let fields = split_line(line).map_err(malformed)?;
        if fields.len() != SUMMARY_HEADER.len() {
            return Err(malformed(format!(
                "expected {} fields, found {}",
                SUMMARY_HEADER.len(),
                fields.len()
            )));
        }

        let number = |i: usize| -> BenchResult<f64> {
            fields[i].trim().parse::<f64>().map_err(|e| BenchError::Malformed {
                line: line_no,
                reason: format!("{}: {}", SUMMARY_HEADER[i], e),
            })
        };

        rows.push(ResultRow {
            filename: fields[0].clone(),
            size_bytes: fields[1].trim().parse().map_err(|e| BenchError::Malformed {
                line: line_no,
                reason: format!("Size_Bytes: {}", e),
            })?,
            algorithm: fields[2].parse()?,
            mean_time: number(3)?,
            stdev_time: number(4)?,
            throughput_mbps: number(5)?,
            cpu_percent: number(6)?,
            peak_memory_mb: number(7)?,
            avalanche_pct: number(8)?,
        });
    }
    Ok(rows)
}

/// Loads a summary table written by [`write_summary`].
pub fn read_summary<P: AsRef<Path>>(path: P) -> BenchResult<Vec<ResultRow>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BenchError::missing(format!(
            "summary file '{}' not found, run the benchmark first",
            path.display()
        )));
    }
    let content = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    parse_summary_csv(&content)
}

/// Prints the summary table to stdout.
pub fn print_summary_table(rows: &[ResultRow]) {
    let width = 120;
    println!("\n{}", "=".repeat(width));
    println!("Benchmark Results Summary");
    println!("{}", "=".repeat(width));
    println!(
        "{:<24} {:<10} {:<12} {:<12} {:<14} {:<8} {:<12} {:<10}",
        "File", "Algorithm", "Mean (s)", "Stdev (s)", "Throughput", "CPU", "Peak Mem", "Avalanche"
    );
    println!(
        "{:<24} {:<10} {:<12} {:<12} {:<14} {:<8} {:<12} {:<10}",
        "", "", "", "", "(MB/s)", "(%)", "(MB)", "(%)"
    );
    println!("{}", "-".repeat(width));

    for row in rows {
        println!(
            "{:<24} {:<10} {:<12.6} {:<12.6} {:<14.2} {:<8.1} {:<12.4} {:<10.2}",
            row.filename,
            row.algorithm.name(),
            row.mean_time,
            row.stdev_time,
            row.throughput_mbps,
            row.cpu_percent,
            row.peak_memory_mb,
            row.avalanche_pct,
        );
    }
    println!("{}", "=".repeat(width));
}
