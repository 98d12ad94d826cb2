//! Process memory probes.
//!
//! The slide buffer never measures memory itself. It asks an injected
//! [`MemoryProbe`], which keeps the eviction logic deterministic under test.

use parking_lot::Mutex;
use sysinfo::{Pid, System};
use tracing::warn;

/// Reports current memory usage as a fraction in `[0, 1]`.
///
/// Implementations must be cheap enough to call once per buffer insertion
/// and once per display frame.
pub trait MemoryProbe: Send + Sync {
    fn usage_fraction(&self) -> f64;
}

/// Resident memory of this process relative to total system memory.
pub struct ProcessMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
    total_memory: u64,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total_memory = system.total_memory();

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(error = %e, "Cannot determine current pid; memory usage will read as 0");
                None
            }
        };

        Self {
            system: Mutex::new(system),
            pid,
            total_memory,
        }
    }

    /// Resident set size of this process in bytes.
    pub fn resident_bytes(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return 0;
        }
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_memory
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn usage_fraction(&self) -> f64 {
        if self.total_memory == 0 {
            return 0.0;
        }
        (self.resident_bytes() as f64 / self.total_memory as f64).clamp(0.0, 1.0)
    }
}
