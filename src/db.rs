use crate::hasher::HashAlgorithm;
use crate::report::ResultRow;
use crate::runner::BenchConfig;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result};
use std::path::Path;

/// Metadata of one archived benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub warmup: u32,
    pub iterations: u32,
    pub read_mode: String,
    pub host: String,
}

/// Archive of benchmark runs across executions and machines
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                warmup INTEGER NOT NULL,
                iterations INTEGER NOT NULL,
                read_mode TEXT NOT NULL,
                host TEXT
            );
            CREATE TABLE IF NOT EXISTS results (
                run_id INTEGER NOT NULL REFERENCES runs(id),
                filename TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                algorithm TEXT NOT NULL,
                mean_time REAL NOT NULL,
                stdev_time REAL NOT NULL,
                throughput_mbps REAL NOT NULL,
                cpu_pct REAL NOT NULL,
                peak_memory_mb REAL NOT NULL,
                avalanche_pct REAL NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Store a run and all of its summary rows in a single transaction.
    /// Returns the new run id.
    pub fn record_run(
        &self,
        started_at: &str,
        config: &BenchConfig,
        host: &str,
        rows: &[ResultRow],
    ) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO runs (started_at, warmup, iterations, read_mode, host)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                started_at,
                config.warmup_iterations as i64,
                config.iterations as i64,
                config.read_mode.as_str(),
                host
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO results (
                    run_id, filename, size_bytes, algorithm, mean_time, stdev_time,
                    throughput_mbps, cpu_pct, peak_memory_mb, avalanche_pct
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for row in rows {
                stmt.execute(params![
                    run_id,
                    row.filename,
                    row.size_bytes as i64,
                    row.algorithm.name(),
                    row.mean_time,
                    row.stdev_time,
                    row.throughput_mbps,
                    row.cpu_percent,
                    row.peak_memory_mb,
                    row.avalanche_pct
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Get count of archived runs
    pub fn run_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn get_run(&self, run_id: i64) -> Result<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, warmup, iterations, read_mode, host FROM runs WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![run_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(RunRecord {
                id: row.get(0)?,
                started_at: row.get(1)?,
                warmup: row.get(2)?,
                iterations: row.get(3)?,
                read_mode: row.get(4)?,
                host: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Summary rows of one run, in insertion order
    pub fn results_for_run(&self, run_id: i64) -> Result<Vec<ResultRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT filename, size_bytes, algorithm, mean_time, stdev_time,
                    throughput_mbps, cpu_pct, peak_memory_mb, avalanche_pct
             FROM results WHERE run_id = ?1 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            let algorithm: String = row.get(2)?;
            let algorithm = algorithm.parse::<HashAlgorithm>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })?;
            Ok(ResultRow {
                filename: row.get(0)?,
                size_bytes: row.get::<_, i64>(1)? as u64,
                algorithm,
                mean_time: row.get(3)?,
                stdev_time: row.get(4)?,
                throughput_mbps: row.get(5)?,
                cpu_percent: row.get(6)?,
                peak_memory_mb: row.get(7)?,
                avalanche_pct: row.get(8)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ReadMode;

    fn row(filename: &str, algorithm: HashAlgorithm) -> ResultRow {
        ResultRow {
            filename: filename.to_string(),
            size_bytes: 10 * 1024 * 1024,
            algorithm,
            mean_time: 0.025,
            stdev_time: 0.001,
            throughput_mbps: 400.0,
            cpu_percent: 12.5,
            peak_memory_mb: 0.0078,
            avalanche_pct: 50.39,
        }
    }

    #[test]
    fn test_record_and_read_back() -> Result<()> {
        let db = Database::new(":memory:")?;
        let config = BenchConfig {
            read_mode: ReadMode::Cached,
            ..BenchConfig::default()
        };
        let rows = vec![
            row("test_10MB.dat", HashAlgorithm::Sha256),
            row("test_10MB.dat", HashAlgorithm::Blake2),
        ];

        let run_id = db.record_run("2026-01-01 10:00:00", &config, "test-host", &rows)?;
        assert_eq!(db.run_count()?, 1);

        let run = db.get_run(run_id)?.unwrap();
        assert_eq!(run.iterations, 30);
        assert_eq!(run.warmup, 2);
        assert_eq!(run.read_mode, "cached");
        assert_eq!(run.host, "test-host");

        assert_eq!(db.results_for_run(run_id)?, rows);
        Ok(())
    }

    #[test]
    fn test_runs_are_kept_apart() -> Result<()> {
        let db = Database::new(":memory:")?;
        let config = BenchConfig::default();

        let first = db.record_run("t1", &config, "", &[row("a.dat", HashAlgorithm::Sha256)])?;
        let second = db.record_run(
            "t2",
            &config,
            "",
            &[
                row("a.dat", HashAlgorithm::Sha3_256),
                row("b.dat", HashAlgorithm::Sha3_256),
            ],
        )?;

        assert_eq!(db.run_count()?, 2);
        assert_eq!(db.results_for_run(first)?.len(), 1);
        assert_eq!(db.results_for_run(second)?.len(), 2);
        assert!(db.get_run(second + 1)?.is_none());
        Ok(())
    }
}
