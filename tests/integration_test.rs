use anyhow::Result;
use hashbench::avalanche::avalanche_file;
use hashbench::chart::{AVALANCHE_CHART, EFFICIENCY_CHART, THROUGHPUT_CHART};
use hashbench::db::Database;
use hashbench::error::BenchError;
use hashbench::hasher::{digest_bytes, digest_file, HashAlgorithm, CHUNK_SIZE};
use hashbench::report::read_summary;
use hashbench::runner::{BenchConfig, BenchmarkRunner, ReadMode};
use hashbench::{run, BenchArgs, ChartArgs, Cli, Command, HashArgs};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const MIB: usize = 1024 * 1024;

// SHA-256 of 1 MiB of zero bytes.
const ZERO_MIB_SHA256: &str = "30e14955ebf1352266dc2ff8067e68104607e750abb9d3b36582b8af909fcb58";

fn bench_args(root: &Path, iterations: usize) -> BenchArgs {
    BenchArgs {
        dataset: root.join("dataset"),
        output: root.join("benchmark_results.csv"),
        raw_output: root.join("benchmark_raw.csv"),
        specs: root.join("specs_info.txt"),
        log: root.join("hashbench.log"),
        warmup: 1,
        iterations,
        algorithms: HashAlgorithm::ALL.to_vec(),
        chunk_size: CHUNK_SIZE,
        read_mode: ReadMode::Stream,
        archive: Some(root.join("archive.db")),
    }
}

#[test]
fn test_single_iteration_sha256_on_one_mib() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test_1MB.dat");
    File::create(&path)?.write_all(&vec![0u8; MIB])?;

    let digest = digest_file(HashAlgorithm::Sha256, &path, CHUNK_SIZE)?;
    assert_eq!(hex::encode(digest), ZERO_MIB_SHA256);

    let config = BenchConfig {
        algorithms: vec![HashAlgorithm::Sha256],
        warmup_iterations: 0,
        iterations: 1,
        ..BenchConfig::default()
    };
    let mut runner = BenchmarkRunner::new(&config)?;
    let run = runner.run(&path, HashAlgorithm::Sha256)?;

    assert_eq!(run.samples.len(), 1);
    assert_eq!(run.file_size, MIB as u64);
    assert!(run.result.mean_time > 0.0);
    assert_eq!(run.result.stdev_time, 0.0);
    let expected = 1.0 / run.result.mean_time;
    assert!((run.result.throughput_mbps - expected).abs() <= expected * 1e-9);

    let avalanche = avalanche_file(&path, HashAlgorithm::Sha256)?;
    assert!((0.0..=100.0).contains(&avalanche));
    Ok(())
}

#[test]
fn test_integration_full_flow() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let dataset = root.join("dataset");
    fs::create_dir_all(&dataset)?;

    File::create(dataset.join("test_1MB.dat"))?.write_all(&vec![0u8; MIB])?;
    File::create(dataset.join("test_10KB.dat"))?.write_all(&vec![0x5Au8; 10 * 1024])?;
    // Empty file: hashing works but the avalanche check must reject it.
    File::create(dataset.join("empty.dat"))?;

    let args = bench_args(root, 2);
    run(Cli {
        command: Command::Bench(args.clone()),
    })?;

    // 2 usable files x 3 algorithms; the empty file fails per pair only.
    let rows = read_summary(&args.output)?;
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.filename != "empty.dat"));
    assert!(rows.iter().all(|r| (0.0..=100.0).contains(&r.avalanche_pct)));
    // Unmatched names sort as size 0 and come first.
    assert_eq!(rows[0].filename, "test_10KB.dat");
    assert_eq!(rows[5].filename, "test_1MB.dat");

    let raw = fs::read_to_string(&args.raw_output)?;
    assert_eq!(raw.lines().count(), 1 + 6 * 2);
    assert!(raw.starts_with("Filename,Algorithm,Iteration,Time_Sec,Time_Ms,Memory_MB,CPU_Pct"));

    let log = fs::read_to_string(&args.log)?;
    assert!(log.contains("Failed empty.dat"));
    assert!(log.contains("Benchmarked test_1MB.dat [SHA3-256]"));

    let specs = fs::read_to_string(&args.specs)?;
    assert!(specs.contains("Benchmark Iterations: 2"));
    assert!(specs.contains("Read Mode: stream"));

    let db = Database::new(root.join("archive.db"))?;
    assert_eq!(db.run_count()?, 1);
    assert_eq!(db.results_for_run(1)?.len(), 6);

    // Charts from the summary just written.
    let chart_args = ChartArgs {
        input: args.output.clone(),
        out_dir: root.join("charts"),
    };
    run(Cli {
        command: Command::Chart(chart_args),
    })?;
    for name in [THROUGHPUT_CHART, EFFICIENCY_CHART, AVALANCHE_CHART] {
        assert!(root.join("charts").join(name).exists());
    }

    // A second run with a cached read mode appends to the archive.
    let mut cached = bench_args(root, 1);
    cached.read_mode = ReadMode::Cached;
    cached.algorithms = vec![HashAlgorithm::Blake2];
    run(Cli {
        command: Command::Bench(cached.clone()),
    })?;
    assert_eq!(read_summary(&cached.output)?.len(), 2);
    assert_eq!(db.run_count()?, 2);

    run(Cli {
        command: Command::Hash(HashArgs {
            file: dataset.join("test_1MB.dat"),
            algorithm: vec![],
        }),
    })?;

    Ok(())
}

#[test]
fn test_missing_dataset_is_fatal_and_keeps_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let args = bench_args(root, 1);

    fs::write(&args.output, "previous results\n")?;

    let err = run(Cli {
        command: Command::Bench(args.clone()),
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::MissingArtifact(_))
    ));

    // The directory is created for the next attempt; earlier outputs stay.
    assert!(args.dataset.is_dir());
    assert_eq!(fs::read_to_string(&args.output)?, "previous results\n");
    assert!(!args.specs.exists());

    // Still empty: fails the same way.
    assert!(run(Cli {
        command: Command::Bench(args),
    })
    .is_err());
    Ok(())
}

#[test]
fn test_chart_without_summary_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("charts");
    let err = run(Cli {
        command: Command::Chart(ChartArgs {
            input: dir.path().join("missing.csv"),
            out_dir: out_dir.clone(),
        }),
    })
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::MissingArtifact(_))
    ));
    assert!(!out_dir.exists());
    Ok(())
}

#[test]
fn test_streamed_digest_matches_whole_buffer_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pattern.bin");
    let data: Vec<u8> = (0..(3 * CHUNK_SIZE + 123)).map(|i| (i % 256) as u8).collect();
    File::create(&path)?.write_all(&data)?;

    for algo in HashAlgorithm::ALL {
        for chunk_size in [1, 512, CHUNK_SIZE, 64 * 1024] {
            assert_eq!(digest_file(algo, &path, chunk_size)?, digest_bytes(algo, &data));
        }
    }
    Ok(())
}
