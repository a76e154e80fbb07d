//! Per-file timing samples and the throughput report computed from them.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

const MIB: f64 = 1024.0 * 1024.0;
const RULE: &str = "____________________________________________________________";

/// The timing of one completed file transfer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Sample {
    /// The time between `START` and `END`.
    pub elapsed: Duration,

    /// The number of payload bytes received in between.
    pub bytes: u64,
}

/// An ordered, append-only collection of timing samples.
///
/// Only completed transfers make it in here. A transfer that was cut short
/// never produces a sample.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TimingLedger {
    samples: Vec<Sample>,
}

/// The reported numbers of a single run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Run {
    pub bytes: u64,
    pub elapsed_ms: f64,

    /// Throughput in MiB/s.
    pub throughput: f64,
}

/// Aggregate statistics over every completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub runs: Vec<Run>,
    pub mean_elapsed_ms: f64,
    pub mean_throughput: f64,
}

/// The result of `TimingLedger::report`.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    /// No transfer completed, so there is nothing to average.
    NoData,

    Summary(Summary),
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the sample of a completed transfer.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// The number of completed transfers.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples in the order they were appended.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Computes per-run throughput and the averages over all runs.
    pub fn report(&self) -> Report {
        if self.samples.is_empty() {
            return Report::NoData;
        }

        let runs = self.samples.iter().map(Run::from).collect::<Vec<_>>();
        let n = runs.len() as f64;
        let mean_elapsed_ms = runs.iter().map(|r| r.elapsed_ms).sum::<f64>() / n;
        let mean_throughput = runs.iter().map(|r| r.throughput).sum::<f64>() / n;

        Report::Summary(Summary {
            runs,
            mean_elapsed_ms,
            mean_throughput,
        })
    }
}

impl From<&Sample> for Run {
    fn from(sample: &Sample) -> Self {
        let secs = sample.elapsed.as_secs() as f64
            + f64::from(sample.elapsed.subsec_nanos()) / 1e9;
        let throughput = if secs > 0.0 {
            sample.bytes as f64 / MIB / secs
        } else {
            // Below the clock's resolution
            std::f64::INFINITY
        };

        Run {
            bytes: sample.bytes,
            elapsed_ms: secs * 1000.0,
            throughput,
        }
    }
}

impl Report {
    pub fn is_no_data(&self) -> bool {
        match self {
            Report::NoData => true,
            _ => false,
        }
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        writeln!(fmt, "{}", RULE)?;
        writeln!(fmt, "-                     *  statistics  *                     -")?;
        writeln!(fmt, "-")?;

        match self {
            Report::NoData => writeln!(fmt, "- No data: no transfer was completed.")?,
            Report::Summary(summary) => {
                for (i, run) in summary.runs.iter().enumerate() {
                    writeln!(
                        fmt,
                        "- Run   #{}  Data: Time = {:.2} ms;    speed = {:.2} MB/s",
                        i + 1,
                        run.elapsed_ms,
                        run.throughput,
                    )?;
                }

                writeln!(fmt, "-")?;
                writeln!(fmt, "- Average time:   {:.2} ms", summary.mean_elapsed_ms)?;
                writeln!(fmt, "- Average bandwidth:  {:.2} MB/s", summary.mean_throughput)?;
            }
        }

        write!(fmt, "{}", RULE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64, bytes: u64) -> Sample {
        Sample {
            elapsed: Duration::from_millis(ms),
            bytes,
        }
    }

    #[test]
    fn empty_ledger_has_no_data() {
        let ledger = TimingLedger::new();

        assert_eq!(ledger.count(), 0);
        assert!(ledger.report().is_no_data());
        assert!(ledger.report().to_string().contains("No data"));
    }

    #[test]
    fn averages() {
        let mut ledger = TimingLedger::new();
        ledger.append(sample(500, 1024 * 1024));
        ledger.append(sample(1000, 4 * 1024 * 1024));

        let summary = match ledger.report() {
            Report::Summary(s) => s,
            Report::NoData => panic!("expected a summary"),
        };

        assert_eq!(summary.runs.len(), 2);
        assert!((summary.runs[0].throughput - 2.0).abs() < 1e-9);
        assert!((summary.runs[1].throughput - 4.0).abs() < 1e-9);
        assert!((summary.mean_elapsed_ms - 750.0).abs() < 1e-9);
        assert!((summary.mean_throughput - 3.0).abs() < 1e-9);
    }

    #[test]
    fn keeps_insertion_order() {
        let mut ledger = TimingLedger::new();
        ledger.append(sample(30, 1));
        ledger.append(sample(10, 2));
        ledger.append(sample(20, 3));

        let bytes = ledger.samples().iter().map(|s| s.bytes).collect::<Vec<_>>();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn report_is_idempotent() {
        let mut ledger = TimingLedger::new();
        ledger.append(sample(12, 2_500_000));
        ledger.append(sample(7, 2_500_000));

        let first = ledger.report();
        let second = ledger.report();

        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(ledger.count(), 2);
    }

    #[test]
    fn zero_elapsed_does_not_panic() {
        let mut ledger = TimingLedger::new();
        ledger.append(sample(0, 10));

        match ledger.report() {
            Report::Summary(s) => assert!(s.runs[0].throughput.is_infinite()),
            Report::NoData => panic!("expected a summary"),
        }
    }

    #[test]
    fn table_lists_every_run() {
        let mut ledger = TimingLedger::new();
        ledger.append(sample(100, 1024 * 1024));
        ledger.append(sample(200, 1024 * 1024));

        let table = ledger.report().to_string();
        assert!(table.contains("Run   #1  Data: Time = 100.00 ms;    speed = 10.00 MB/s"));
        assert!(table.contains("Run   #2  Data: Time = 200.00 ms;    speed = 5.00 MB/s"));
        assert!(table.contains("Average time:   150.00 ms"));
        assert!(table.contains("Average bandwidth:  7.50 MB/s"));
    }
}
