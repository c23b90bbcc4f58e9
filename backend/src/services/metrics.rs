use std::time::Instant;
use sysinfo::System;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Wall-clock timer for request and probe latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Memory and uptime of the current process at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    pub memory_bytes: u64,
    pub peak_memory_bytes: u64,
    pub uptime_seconds: Option<u64>,
}

impl ProcessSample {
    /// Sample the running process. Unavailable values read as zero (memory)
    /// or `None` (uptime) rather than failing the caller.
    pub fn current() -> Self {
        let (memory_bytes, uptime_seconds) = match sysinfo::get_current_pid() {
            Ok(pid) => {
                let mut system = System::new();
                system.refresh_process(pid);
                system
                    .process(pid)
                    .map(|process| (process.memory(), Some(process.run_time())))
                    .unwrap_or((0, None))
            }
            Err(e) => {
                tracing::debug!("Unable to resolve current pid: {}", e);
                (0, None)
            }
        };

        let peak_memory_bytes = peak_resident_bytes().unwrap_or(0).max(memory_bytes);

        Self {
            memory_bytes,
            peak_memory_bytes,
            uptime_seconds,
        }
    }

    pub fn memory_mb(&self) -> f64 {
        to_mb(self.memory_bytes)
    }

    pub fn peak_memory_mb(&self) -> f64 {
        to_mb(self.peak_memory_bytes)
    }
}

/// Bytes to MiB, rounded to 2 decimals
pub fn to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Peak resident set size (`VmHWM`), Linux only
fn peak_resident_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_hwm(&status)
}

fn parse_vm_hwm(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmHWM:"))?;
    let kb: u64 = line
        .trim_start_matches("VmHWM:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    Some(kb * 1024)
}
