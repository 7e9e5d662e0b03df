//! # Metrics Collection
//!
//! Rotation metrics through the `metrics` facade. The binary installs no
//! exporter, so these are no-ops unless a host process installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Duration;

pub const PHASE_TOTAL: &str = "rotation_phase_total";
pub const PHASE_DURATION: &str = "rotation_phase_duration_seconds";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(PHASE_TOTAL, Unit::Count, "Rotation phases handled, by phase and outcome");
    describe_histogram!(PHASE_DURATION, Unit::Seconds, "Time spent handling one rotation phase");
}

/// Record one handled phase. `outcome` is `applied`, `noop` or `error`.
pub fn record_phase(phase: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(PHASE_TOTAL, "phase" => phase, "outcome" => outcome).increment(1);
    histogram!(PHASE_DURATION, "phase" => phase).record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_phase("create", "applied", Duration::from_millis(12));
        record_phase("set", "error", Duration::from_millis(3));
    }
}
