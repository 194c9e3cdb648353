//! Warm-up then measure benchmark protocol for one (file, algorithm) pair.
//!
//! Each pair moves through `Warmup -> Measuring -> Reduced`. Iterations run
//! strictly one after another on the calling thread: the CPU and memory
//! probes observe the whole process, so nothing else measured may overlap a
//! sample window.

use crate::error::{BenchError, BenchResult, Phase};
use crate::hasher::{digest_reader, HashAlgorithm, CHUNK_SIZE};
use crate::probe::{measure, CpuSampler, Sample};
use clap::ValueEnum;
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

pub const WARMUP_ITERATIONS: usize = 2;
pub const BENCHMARK_ITERATIONS: usize = 30;

const MIB: f64 = 1024.0 * 1024.0;

/// Where each measured digest reads the file from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReadMode {
    /// Reopen and stream the file from storage on every iteration.
    Stream,
    /// Load the file once per pair and stream the in-memory copy.
    Cached,
}

impl ReadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadMode::Stream => "stream",
            ReadMode::Cached => "cached",
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings shared by every pair in one execution.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub algorithms: Vec<HashAlgorithm>,
    pub warmup_iterations: usize,
    pub iterations: usize,
    pub chunk_size: usize,
    pub read_mode: ReadMode,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            algorithms: HashAlgorithm::ALL.to_vec(),
            warmup_iterations: WARMUP_ITERATIONS,
            iterations: BENCHMARK_ITERATIONS,
            chunk_size: CHUNK_SIZE,
            read_mode: ReadMode::Stream,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> BenchResult<()> {
        if self.algorithms.is_empty() {
            return Err(BenchError::config("at least one algorithm is required"));
        }
        if self.iterations == 0 {
            return Err(BenchError::config("iteration count must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(BenchError::config("chunk size must be at least 1 byte"));
        }
        Ok(())
    }
}

/// Per-iteration samples of one pair, in iteration order.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

/// Summary statistics of one pair. Times in seconds, memory in MiB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkResult {
    pub mean_time: f64,
    pub stdev_time: f64,
    pub throughput_mbps: f64,
    pub cpu_percent: f64,
    pub peak_memory_mb: f64,
}

/// Outcome of a completed pair: the reduction plus the samples behind it.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub file_size: u64,
    pub result: BenchmarkResult,
    pub samples: SampleSet,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; 0 for fewer than two values.
fn sample_stdev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Reduces a sample set to its summary statistics.
pub fn reduce(samples: &SampleSet, file_size: u64) -> BenchmarkResult {
    let times: Vec<f64> = samples.iter().map(|s| s.wall_time.as_secs_f64()).collect();
    let memories: Vec<f64> = samples.iter().map(Sample::peak_memory_mb).collect();
    let cpus: Vec<f64> = samples.iter().map(|s| s.cpu_percent as f64).collect();

    let mean_time = mean(&times);
    let stdev_time = sample_stdev(&times, mean_time);

    let file_size_mb = file_size as f64 / MIB;
    let throughput_mbps = if mean_time > 0.0 {
        file_size_mb / mean_time
    } else {
        0.0
    };

    BenchmarkResult {
        mean_time,
        stdev_time,
        throughput_mbps,
        cpu_percent: mean(&cpus),
        peak_memory_mb: mean(&memories),
    }
}

enum Source {
    Disk,
    Memory(Vec<u8>),
}

pub struct BenchmarkRunner<'a> {
    config: &'a BenchConfig,
    cpu: CpuSampler,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(config: &'a BenchConfig) -> BenchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cpu: CpuSampler::new(),
        })
    }

    pub fn config(&self) -> &BenchConfig {
        self.config
    }

    /// Runs the full protocol for one pair. Any failure aborts this pair only
    /// and reports the phase it happened in.
    pub fn run<P: AsRef<Path>>(&mut self, path: P, algo: HashAlgorithm) -> BenchResult<BenchmarkRun> {
        let path = path.as_ref();
        let file_size = fs::metadata(path)
            .map_err(|e| BenchError::aborted(Phase::Warmup, BenchError::io(path, e)))?
            .len();

        let source = match self.config.read_mode {
            ReadMode::Stream => Source::Disk,
            ReadMode::Cached => Source::Memory(
                fs::read(path)
                    .map_err(|e| BenchError::aborted(Phase::Warmup, BenchError::io(path, e)))?,
            ),
        };

        for _ in 0..self.config.warmup_iterations {
            self.hash_once(path, &source, algo)
                .map_err(|e| BenchError::aborted(Phase::Warmup, e))?;
        }

        let mut samples = SampleSet::with_capacity(self.config.iterations);
        for _ in 0..self.config.iterations {
            let chunk_size = self.config.chunk_size;
            let (outcome, sample) =
                measure(&mut self.cpu, || hash_source(path, &source, algo, chunk_size));
            outcome.map_err(|e| BenchError::aborted(Phase::Measuring, e))?;
            samples.push(sample);
        }

        let result = reduce(&samples, file_size);
        Ok(BenchmarkRun {
            file_size,
            result,
            samples,
        })
    }

    fn hash_once(&self, path: &Path, source: &Source, algo: HashAlgorithm) -> BenchResult<Vec<u8>> {
        hash_source(path, source, algo, self.config.chunk_size)
    }
}

fn hash_source(
    path: &Path,
    source: &Source,
    algo: HashAlgorithm,
    chunk_size: usize,
) -> BenchResult<Vec<u8>> {
    match source {
        Source::Disk => {
            let file = File::open(path).map_err(|e| BenchError::io(path, e))?;
            digest_reader(algo, file, chunk_size).map_err(|e| BenchError::io(path, e))
        }
        Source::Memory(data) => {
            digest_reader(algo, data.as_slice(), chunk_size).map_err(|e| BenchError::io(path, e))
        }
    }
}
