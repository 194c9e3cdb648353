use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stage of a (file, algorithm) benchmark in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Measuring,
    Reduced,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => write!(f, "warm-up"),
            Phase::Measuring => write!(f, "measurement"),
            Phase::Reduced => write!(f, "reduction"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("unsupported algorithm '{0}'")]
    UnknownAlgorithm(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("missing prerequisite: {0}")]
    MissingArtifact(String),
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("aborted during {phase}: {source}")]
    Aborted {
        phase: Phase,
        #[source]
        source: Box<BenchError>,
    },
}

impl BenchError {
    pub fn io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        BenchError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        BenchError::Validation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        BenchError::Config(msg.into())
    }

    pub fn missing<T: Into<String>>(msg: T) -> Self {
        BenchError::MissingArtifact(msg.into())
    }

    pub fn aborted(phase: Phase, source: BenchError) -> Self {
        BenchError::Aborted {
            phase,
            source: Box::new(source),
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
