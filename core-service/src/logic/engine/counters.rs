//! Running transmission counters

use serde::{Deserialize, Serialize};

use super::decision::Verdict;

/// Accumulator passed to the engine by reference
///
/// `transmitted + suppressed == total` after every `record`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningCounters {
    total: u64,
    transmitted: u64,
    suppressed: u64,
}

impl RunningCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Transmit => self.transmitted += 1,
            Verdict::Suppress => self.suppressed += 1,
        }
    }

    /// Fold in counters from an engine that handled other slots
    pub fn merge(&mut self, other: &RunningCounters) {
        self.total += other.total;
        self.transmitted += other.transmitted;
        self.suppressed += other.suppressed;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Share of readings not transmitted, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.transmitted as f64 / self.total as f64)
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            total: self.total,
            transmitted: self.transmitted,
            suppressed: self.suppressed,
            reduction_percent: self.reduction_percent(),
        }
    }
}

/// Read-only view for logs and dashboards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub total: u64,
    pub transmitted: u64,
    pub suppressed: u64,
    pub reduction_percent: f64,
}

impl std::fmt::Display for CountersSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // baseline system transmits every reading
        write!(
            f,
            "Traditional={}, EdgeAI={}, Reduction={:.2}%",
            self.total, self.transmitted, self.reduction_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_totals_consistent() {
        let mut counters = RunningCounters::new();
        counters.record(Verdict::Transmit);
        counters.record(Verdict::Suppress);
        counters.record(Verdict::Suppress);

        assert_eq!(counters.total(), 3);
        assert_eq!(counters.transmitted() + counters.suppressed(), counters.total());
    }

    #[test]
    fn test_reduction_percent() {
        let mut counters = RunningCounters::new();
        assert_eq!(counters.reduction_percent(), 0.0);

        for _ in 0..3 {
            counters.record(Verdict::Transmit);
        }
        for _ in 0..2 {
            counters.record(Verdict::Suppress);
        }
        assert!((counters.reduction_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = RunningCounters::new();
        a.record(Verdict::Transmit);
        let mut b = RunningCounters::new();
        b.record(Verdict::Suppress);
        b.record(Verdict::Suppress);

        a.merge(&b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.suppressed(), 2);
    }

    #[test]
    fn test_snapshot_display_matches_metrics_payload() {
        let mut counters = RunningCounters::new();
        for _ in 0..483 {
            counters.record(Verdict::Transmit);
        }
        for _ in 0..517 {
            counters.record(Verdict::Suppress);
        }
        assert_eq!(
            counters.snapshot().to_string(),
            "Traditional=1000, EdgeAI=483, Reduction=51.70%"
        );
    }
}
