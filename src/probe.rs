//! Scoped per-iteration measurement.
//!
//! A measurement scope records the memory start marker, a CPU sample and a
//! monotonic start time, runs the timed operation, then closes with the end
//! time, a second CPU sample and the peak memory seen since the marker. The
//! sample is produced whether the operation succeeded or not.

use crate::memory::MemoryWindow;
use std::time::{Duration, Instant};
use sysinfo::System;

/// One measured iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub wall_time: Duration,
    pub peak_memory_bytes: usize,
    pub cpu_percent: f32,
}

impl Sample {
    pub fn peak_memory_mb(&self) -> f64 {
        self.peak_memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Coarse system-wide CPU utilization, measured between consecutive calls.
pub struct CpuSampler {
    sys: System,
}

impl CpuSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        // The first reading has nothing to compare against; prime it here.
        sys.refresh_cpu_usage();
        Self { sys }
    }

    /// Utilization in percent since the previous call.
    pub fn sample(&mut self) -> f32 {
        self.sys.refresh_cpu_usage();
        let usage = self.sys.global_cpu_usage();
        if usage.is_finite() {
            usage.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

struct Scope<'a> {
    cpu: &'a mut CpuSampler,
    memory: MemoryWindow,
    cpu_before: f32,
    start: Instant,
}

impl<'a> Scope<'a> {
    fn open(cpu: &'a mut CpuSampler) -> Self {
        let memory = MemoryWindow::open();
        let cpu_before = cpu.sample();
        let start = Instant::now();
        Scope {
            cpu,
            memory,
            cpu_before,
            start,
        }
    }

    fn close(self) -> Sample {
        let wall_time = self.start.elapsed();
        let cpu_after = self.cpu.sample();
        let peak_memory_bytes = self.memory.close();
        Sample {
            wall_time,
            peak_memory_bytes,
            cpu_percent: (self.cpu_before + cpu_after) / 2.0,
        }
    }
}

/// Runs `op` inside a measurement scope and returns its outcome together
/// with the sample taken around it.
pub fn measure<T, E, F>(cpu: &mut CpuSampler, op: F) -> (Result<T, E>, Sample)
where
    F: FnOnce() -> Result<T, E>,
{
    let scope = Scope::open(cpu);
    let outcome = op();
    let sample = scope.close();
    (outcome, sample)
}
