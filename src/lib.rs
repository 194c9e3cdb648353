pub mod avalanche;
pub mod chart;
pub mod dataset;
pub mod db;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod probe;
pub mod report;
pub mod runner;
pub mod specs;
pub mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use avalanche::avalanche_file;
use dataset::{generate_dummy_files, list_dataset, DummySize, Generated, DEFAULT_SIZES};
use db::Database;
use error::BenchError;
use hasher::{digest_file_hex, HashAlgorithm, CHUNK_SIZE};
use memory::TrackingAllocator;
use report::{print_summary_table, raw_rows, ResultRow};
use runner::{BenchConfig, BenchmarkRunner, ReadMode, BENCHMARK_ITERATIONS, WARMUP_ITERATIONS};
use specs::SystemSpecs;
use utils::{format_bytes, timestamp, Logger};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new();

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the dummy dataset files
    Generate(GenerateArgs),
    /// Benchmark every dataset file with every algorithm
    Bench(BenchArgs),
    /// Render charts from a summary table
    Chart(ChartArgs),
    /// Print the digest of a file with each algorithm
    Hash(HashArgs),
    /// Print and save the system specification snapshot
    Specs(SpecsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Dataset directory to populate
    #[arg(long, default_value = "dataset")]
    pub dataset: PathBuf,

    /// File sizes to create (e.g., 1MB,10MB,1GB)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_SIZES.map(String::from))]
    pub sizes: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Dataset directory holding the files to hash
    #[arg(long, default_value = "dataset")]
    pub dataset: PathBuf,

    /// Summary table output path
    #[arg(long, default_value = "benchmark_results.csv")]
    pub output: PathBuf,

    /// Per-iteration table output path
    #[arg(long, default_value = "benchmark_raw.csv")]
    pub raw_output: PathBuf,

    /// System specification output path
    #[arg(long, default_value = "specs_info.txt")]
    pub specs: PathBuf,

    /// Audit log file path
    #[arg(long, default_value = "hashbench.log")]
    pub log: PathBuf,

    /// Discarded warm-up runs per file and algorithm
    #[arg(long, default_value_t = WARMUP_ITERATIONS)]
    pub warmup: usize,

    /// Measured runs per file and algorithm
    #[arg(long, default_value_t = BENCHMARK_ITERATIONS)]
    pub iterations: usize,

    /// Algorithms to benchmark
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = HashAlgorithm::ALL)]
    pub algorithms: Vec<HashAlgorithm>,

    /// Read block size in bytes
    #[arg(long, default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Re-read the file from storage every iteration, or hash a cached copy
    #[arg(long, value_enum, default_value_t = ReadMode::Stream)]
    pub read_mode: ReadMode,

    /// SQLite archive to append this run to
    #[arg(long)]
    pub archive: Option<PathBuf>,
}

impl BenchArgs {
    pub fn config(&self) -> BenchConfig {
        BenchConfig {
            algorithms: self.algorithms.clone(),
            warmup_iterations: self.warmup,
            iterations: self.iterations,
            chunk_size: self.chunk_size,
            read_mode: self.read_mode,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    /// Summary table produced by `bench`
    #[arg(long, default_value = "benchmark_results.csv")]
    pub input: PathBuf,

    /// Directory for the chart files
    #[arg(long, default_value = "charts")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct HashArgs {
    /// File to hash
    pub file: PathBuf,

    /// Algorithms to use (all when omitted)
    #[arg(long, value_enum)]
    pub algorithm: Vec<HashAlgorithm>,
}

#[derive(Args, Debug, Clone)]
pub struct SpecsArgs {
    /// System specification output path
    #[arg(long, default_value = "specs_info.txt")]
    pub output: PathBuf,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => run_generate(&args),
        Command::Bench(args) => run_bench(&args).map(|_| ()),
        Command::Chart(args) => run_chart(&args).map(|_| ()),
        Command::Hash(args) => run_hash(&args),
        Command::Specs(args) => run_specs(&args),
    }
}

pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let sizes = args
        .sizes
        .iter()
        .map(|s| DummySize::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    println!("=== Creating dummy files ===\n");
    let outcomes = generate_dummy_files(&args.dataset, &sizes)
        .with_context(|| format!("Failed to populate {:?}", args.dataset))?;

    let created = outcomes
        .iter()
        .filter(|g| matches!(g, Generated::Created(_)))
        .count();
    println!(
        "\nDummy files ready in '{}' ({} created, {} skipped).",
        args.dataset.display(),
        created,
        outcomes.len() - created
    );
    Ok(())
}

/// Runs the whole benchmark and returns the summary rows that were written.
pub fn run_bench(args: &BenchArgs) -> Result<Vec<ResultRow>> {
    let config = args.config();
    config.validate()?;
    let logger = Logger::new(&args.log);

    println!("\n{}", "=".repeat(65));
    println!("  BENCHMARK: SHA-256 vs SHA3-256 vs BLAKE2");
    println!("{}", "=".repeat(65));

    let started_at = timestamp();
    let specs = SystemSpecs::collect();
    specs.print();

    if !args.dataset.exists() {
        std::fs::create_dir_all(&args.dataset)
            .with_context(|| format!("Failed to create {:?}", args.dataset))?;
        return Err(BenchError::missing(format!(
            "dataset directory '{}' did not exist and was created empty; run `hashbench generate` first",
            args.dataset.display()
        ))
        .into());
    }

    let files = list_dataset(&args.dataset)?;
    if files.is_empty() {
        return Err(BenchError::missing(format!(
            "dataset directory '{}' is empty; run `hashbench generate` first",
            args.dataset.display()
        ))
        .into());
    }

    specs
        .save(&args.specs, &run_settings(&config))
        .context("Failed to save system specifications")?;

    let algo_names: Vec<&str> = config.algorithms.iter().map(|a| a.name()).collect();
    println!("\n  Files: {}", files.len());
    println!(
        "  Iterations: {}x (+ {} warm-up)",
        config.iterations, config.warmup_iterations
    );
    println!("  Algorithms: {}", algo_names.join(", "));
    println!("  Read mode: {}", config.read_mode);
    println!("\n{}", "-".repeat(65));
    logger.log(&format!(
        "Benchmark started: {} files, {} algorithms, {} iterations (+{} warm-up), read mode {}",
        files.len(),
        config.algorithms.len(),
        config.iterations,
        config.warmup_iterations,
        config.read_mode
    ))?;

    let mut runner = BenchmarkRunner::new(&config)?;
    let mut rows = Vec::new();
    let mut raw = Vec::new();

    let total_tests = (files.len() * config.algorithms.len()) as u64;
    let pb = ProgressBar::new(total_tests);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Benchmarking {msg}\n[{bar:40.cyan/blue}] {pos}/{len} [{elapsed}<{eta}]")?
            .progress_chars("=>-"),
    );

    for file in &files {
        for &algo in &config.algorithms {
            pb.set_message(format!("{} ({}) - {}", file.name, format_bytes(file.size_bytes), algo));

            let outcome = runner
                .run(&file.path, algo)
                .and_then(|run| avalanche_file(&file.path, algo).map(|pct| (run, pct)));

            match outcome {
                Ok((run, avalanche)) => {
                    let row = ResultRow::new(&file.name, algo, &run, avalanche);
                    logger.log(&format!(
                        "Benchmarked {} [{}]: mean {:.6}s, stdev {:.6}s, {:.2} MB/s, CPU {:.1}%, peak {:.4} MB, avalanche {:.2}%",
                        row.filename,
                        algo,
                        row.mean_time,
                        row.stdev_time,
                        row.throughput_mbps,
                        row.cpu_percent,
                        row.peak_memory_mb,
                        row.avalanche_pct
                    ))?;
                    raw.extend(raw_rows(&file.name, algo, &run));
                    rows.push(row);
                }
                Err(e) => {
                    pb.println(format!("[ERROR] {} - {}: {}", file.name, algo, e));
                    logger.log(&format!("Failed {} [{}]: {}", file.name, algo, e))?;
                }
            }

            pb.inc(1);
        }
    }
    pb.finish_with_message("done");

    println!("\n{}", "-".repeat(65));

    report::write_summary(&args.output, &rows)?;
    report::write_raw(&args.raw_output, &raw)?;
    logger.log(&format!(
        "Wrote {} summary rows to {:?} and {} iteration rows to {:?}",
        rows.len(),
        args.output,
        raw.len(),
        args.raw_output
    ))?;

    if let Some(archive) = &args.archive {
        let db = Database::new(archive)
            .with_context(|| format!("Failed to open archive {:?}", archive))?;
        let run_id = db.record_run(&started_at, &config, &specs.host_summary(), &rows)?;
        println!("  Archived as run #{} in '{}'", run_id, archive.display());
        logger.log(&format!("Archived run #{} in {:?}", run_id, archive))?;
    }

    print_summary_table(&rows);

    println!("\n  Results saved to '{}'", args.output.display());
    println!("  Iteration samples saved to '{}'", args.raw_output.display());
    println!("  System specs saved to '{}'", args.specs.display());
    println!("  Total: {} of {} tests completed.", rows.len(), total_tests);
    println!("\n{}", "=".repeat(65));
    println!("  BENCHMARK COMPLETE");
    println!("{}\n", "=".repeat(65));

    Ok(rows)
}

fn run_settings(config: &BenchConfig) -> Vec<(&'static str, String)> {
    let names: Vec<&str> = config.algorithms.iter().map(|a| a.name()).collect();
    vec![
        ("Algorithms", names.join(", ")),
        ("Warm-up Iterations", config.warmup_iterations.to_string()),
        ("Benchmark Iterations", config.iterations.to_string()),
        ("Chunk Size", format!("{} bytes", config.chunk_size)),
        ("Read Mode", config.read_mode.to_string()),
    ]
}

/// Renders the three charts and returns their paths.
pub fn run_chart(args: &ChartArgs) -> Result<Vec<PathBuf>> {
    println!("\n{}", "=".repeat(50));
    println!("  CHARTS");
    println!("{}", "=".repeat(50));

    let rows = report::read_summary(&args.input)?;
    println!("\n  Loaded {} records from '{}'", rows.len(), args.input.display());

    let written = chart::render_charts(&rows, &args.out_dir)?;
    for path in &written {
        println!("  [OK] {}", path.display());
    }

    println!("\n  Charts saved to '{}' (SVG)", args.out_dir.display());
    println!("{}\n", "=".repeat(50));
    Ok(written)
}

pub fn run_hash(args: &HashArgs) -> Result<()> {
    let algorithms = if args.algorithm.is_empty() {
        HashAlgorithm::ALL.to_vec()
    } else {
        args.algorithm.clone()
    };

    println!("=== Hash Comparison ===\n");
    for algo in algorithms {
        let digest = digest_file_hex(algo, &args.file)?;
        println!("{:10} : {}", algo.name(), digest);
    }
    Ok(())
}

pub fn run_specs(args: &SpecsArgs) -> Result<()> {
    let specs = SystemSpecs::collect();
    specs.print();
    specs
        .save(&args.output, &[])
        .context("Failed to save system specifications")?;
    println!("\n  System specs saved to '{}'", args.output.display());
    Ok(())
}
