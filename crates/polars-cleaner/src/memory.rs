//! Process and system memory counters

use sysinfo::{Pid, ProcessesToUpdate, System};

const MIB: f64 = 1024.0 * 1024.0;

/// Thin wrapper over `sysinfo` reporting sizes in MiB
pub struct MemoryProbe {
    system: System,
    pid: Option<Pid>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Resident set size of the current process
    pub fn process_rss_mb(&mut self) -> f64 {
        let Some(pid) = self.pid else {
            return 0.0;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system
            .process(pid)
            .map(|p| p.memory() as f64 / MIB)
            .unwrap_or(0.0)
    }

    /// Memory available for new allocations
    pub fn available_mb(&mut self) -> f64 {
        self.system.refresh_memory();
        self.system.available_memory() as f64 / MIB
    }

    pub fn total_mb(&mut self) -> f64 {
        self.system.refresh_memory();
        self.system.total_memory() as f64 / MIB
    }

    /// Share of total memory in use, 0.0 - 1.0
    pub fn memory_ratio(&mut self) -> f64 {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.system.used_memory() as f64 / total as f64
    }

    pub fn cpu_count(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Log CPU and memory figures for the host
pub fn log_system_info() {
    let mut probe = MemoryProbe::new();
    let total_gb = probe.total_mb() / 1024.0;
    let available_gb = probe.available_mb() / 1024.0;

    tracing::info!("🖥️  SYSTEM INFORMATION");
    tracing::info!("   CPU: {} cores", probe.cpu_count());
    tracing::info!(
        "   Memory: {:.1}GB available / {:.1}GB total ({:.1}% used)",
        available_gb,
        total_gb,
        probe.memory_ratio() * 100.0
    );
}
