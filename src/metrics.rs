use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

lazy_static! {
    /// Registry holding every emulator metric
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        // Registration only fails on duplicate names, which a fresh registry cannot have
        register_metrics(&registry).expect("Failed to register emulator metrics");
        registry
    };

    /// Counter for instructions executed by opcode
    pub static ref CPU_INSTRUCTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cpu_instructions_total", "Total number of CPU instructions executed by opcode"),
        &["opcode", "instruction"]
    ).expect("Failed to create CPU instructions counter");

    /// Counter for illegal opcodes that halted the CPU
    pub static ref ILLEGAL_OPCODES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cpu_illegal_opcodes_total", "Undefined opcodes encountered"),
        &["opcode"]
    ).expect("Failed to create illegal opcodes counter");

    /// Histogram for instruction execution time
    pub static ref INSTRUCTION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("instruction_duration_seconds", "Time spent executing instructions")
            .buckets(vec![0.0000001, 0.0000005, 0.000001, 0.000005, 0.00001, 0.0001, 0.001]),
    ).expect("Failed to create instruction duration histogram");

    pub static ref CPU_RESETS_TOTAL: Counter = Counter::new(
        "cpu_resets_total", "Total number of CPU resets"
    ).expect("Failed to create CPU resets counter");

    /// Counter for snapshot captures and restores
    pub static ref SNAPSHOT_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("snapshot_operations_total", "Snapshot captures and restores"),
        &["operation"]
    ).expect("Failed to create snapshot operations counter");
}

/// Registers the emulator metrics with `registry`, e.g. an exporter's own.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(CPU_INSTRUCTIONS_TOTAL.clone()))?;
    registry.register(Box::new(ILLEGAL_OPCODES_TOTAL.clone()))?;
    registry.register(Box::new(INSTRUCTION_DURATION.clone()))?;
    registry.register(Box::new(CPU_RESETS_TOTAL.clone()))?;
    registry.register(Box::new(SNAPSHOT_OPERATIONS_TOTAL.clone()))?;
    Ok(())
}

/// Renders [`REGISTRY`] in the Prometheus text exposition format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a CPU instruction execution
pub fn record_instruction(opcode: u8, instruction_name: &str, duration: Duration) {
    CPU_INSTRUCTIONS_TOTAL
        .with_label_values(&[&format!("0x{:02X}", opcode), instruction_name])
        .inc();

    INSTRUCTION_DURATION.observe(duration.as_secs_f64());
}

pub fn record_illegal_opcode(opcode: u8) {
    ILLEGAL_OPCODES_TOTAL
        .with_label_values(&[&format!("0x{:02X}", opcode)])
        .inc();
}

pub fn record_reset() {
    CPU_RESETS_TOTAL.inc();
}

/// `operation` is `"capture"` or `"restore"`.
pub fn record_snapshot(operation: &str) {
    SNAPSHOT_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Helper struct for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_counter_by_label() {
        let before = CPU_INSTRUCTIONS_TOTAL
            .with_label_values(&["0xEA", "NOP"])
            .get();
        record_instruction(0xEA, "NOP", Duration::from_nanos(50));
        record_instruction(0xEA, "NOP", Duration::from_nanos(50));

        let after = CPU_INSTRUCTIONS_TOTAL
            .with_label_values(&["0xEA", "NOP"])
            .get();
        assert!(after - before >= 2.0);
    }

    #[test]
    fn test_gather_text_lists_metrics() {
        record_reset();
        record_illegal_opcode(0x02);
        record_snapshot("capture");

        let text = gather_text();
        assert!(text.contains("cpu_resets_total"));
        assert!(text.contains("cpu_illegal_opcodes_total{opcode=\"0x02\"}"));
        assert!(text.contains("snapshot_operations_total{operation=\"capture\"}"));
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();
        assert!(register_metrics(&registry).is_err());
    }

    #[test]
    fn test_timer_monotonic() {
        let timer = Timer::new();
        let first = timer.elapsed();
        assert!(timer.elapsed() >= first);
    }
}
