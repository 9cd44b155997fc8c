//! Per-thread wait times and the summary built from them.

use serde_derive::Serialize;

use std::{
    io::{self, Write},
    time::Duration,
};

use crate::{Policy, Role};

/// Wait samples of one worker, in seconds. Owned by that worker until it
/// is joined.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadWaitRecord {
    pub role: Role,
    pub id: usize,
    waits: Vec<f64>,
}

impl ThreadWaitRecord {
    pub fn new(role: Role, id: usize) -> Self {
        Self {
            role,
            id,
            waits: vec![],
        }
    }

    pub fn push(&mut self, wait: Duration) {
        self.waits.push(wait.as_secs_f64());
    }

    #[cfg(test)]
    pub(crate) fn waits(&self) -> &[f64] {
        &self.waits
    }

    /// `None` when the thread never entered the critical section.
    pub fn average(&self) -> Option<f64> {
        mean(self.waits.iter().copied())
    }

    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            role: self.role,
            id: self.id,
            samples: self.waits.len(),
            average: self.average(),
        }
    }
}

impl FromIterator<f64> for ThreadWaitRecord {
    /// Anonymous reader record, handy for feeding raw samples.
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            role: Role::Reader,
            id: 0,
            waits: iter.into_iter().collect(),
        }
    }
}

fn mean(xs: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = xs.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadSummary {
    pub role: Role,
    pub id: usize,
    pub samples: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub policy: Policy,
    pub readers: Vec<ThreadSummary>,
    pub writers: Vec<ThreadSummary>,
    /// Mean of the per-thread reader averages that exist.
    pub reader_average: Option<f64>,
    pub writer_average: Option<f64>,
}

impl Report {
    pub fn new(policy: Policy, records: &[ThreadWaitRecord]) -> Self {
        let pick = |role| {
            let mut v = records
                .iter()
                .filter(|r| r.role == role)
                .map(ThreadWaitRecord::summary)
                .collect::<Vec<_>>();
            v.sort_by_key(|s| s.id);
            v
        };
        let readers = pick(Role::Reader);
        let writers = pick(Role::Writer);

        Self {
            policy,
            reader_average: mean(readers.iter().filter_map(|s| s.average)),
            writer_average: mean(writers.iter().filter_map(|s| s.average)),
            readers,
            writers,
        }
    }

    pub fn write_text(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Average Waiting Time for Reader Threads:")?;
        for s in self.readers.iter() {
            writeln!(out, "Reader Thread {}: {}", s.id, seconds(s.average))?;
        }
        writeln!(out)?;

        writeln!(out, "Average Waiting Time for Writer Threads:")?;
        for s in self.writers.iter() {
            writeln!(out, "Writer Thread {}: {}", s.id, seconds(s.average))?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "Overall Average Waiting Time for All Reader Threads: {}",
            seconds(self.reader_average)
        )?;
        writeln!(
            out,
            "Overall Average Waiting Time for All Writer Threads: {}",
            seconds(self.writer_average)
        )
    }
}

fn seconds(x: Option<f64>) -> String {
    match x {
        Some(x) => format!("{:.6} seconds", x),
        None => "no data".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn average_of_samples() {
        let r = [0.1, 0.2, 0.3].into_iter().collect::<ThreadWaitRecord>();
        assert!((r.average().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn no_samples_no_average() {
        let r = ThreadWaitRecord::new(Role::Writer, 1);
        assert_eq!(r.average(), None);
        assert_eq!(r.summary().samples, 0);
    }

    #[test]
    fn push_converts_to_seconds() {
        let mut r = ThreadWaitRecord::new(Role::Reader, 1);
        r.push(Duration::from_millis(250));
        assert_eq!(r.waits(), &[0.25]);
    }

    fn record(role: Role, id: usize, waits: &[f64]) -> ThreadWaitRecord {
        let mut r = ThreadWaitRecord::new(role, id);
        for w in waits {
            r.push(Duration::from_secs_f64(*w));
        }
        r
    }

    #[test]
    fn report_text() {
        let report = Report::new(
            Policy::Fair,
            &[
                record(Role::Writer, 1, &[0.5, 1.5]),
                record(Role::Reader, 2, &[0.25]),
                record(Role::Reader, 1, &[0.5]),
            ],
        );
        assert_eq!(report.reader_average, Some(0.375));
        assert_eq!(report.writer_average, Some(1.0));

        let mut out = vec![];
        report.write_text(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Average Waiting Time for Reader Threads:\n\
             Reader Thread 1: 0.500000 seconds\n\
             Reader Thread 2: 0.250000 seconds\n\
             \n\
             Average Waiting Time for Writer Threads:\n\
             Writer Thread 1: 1.000000 seconds\n\
             \n\
             Overall Average Waiting Time for All Reader Threads: 0.375000 seconds\n\
             Overall Average Waiting Time for All Writer Threads: 1.000000 seconds\n"
        );
    }

    #[test]
    fn report_without_writers() {
        let report = Report::new(Policy::WriterPreference, &[record(Role::Reader, 1, &[0.1])]);
        assert_eq!(report.writer_average, None);

        let mut out = vec![];
        report.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("All Writer Threads: no data\n"));
    }

    #[test]
    fn report_json_uses_null_for_missing() {
        let report = Report::new(Policy::Fair, &[record(Role::Writer, 1, &[])]);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["policy"], "Fair");
        assert!(v["writers"][0]["average"].is_null());
        assert!(v["reader_average"].is_null());
    }

    proptest! {
        #[test]
        fn average_within_sample_bounds(xs in proptest::collection::vec(0.0f64..10.0, 1..50)) {
            let r = xs.iter().copied().collect::<ThreadWaitRecord>();
            let avg = r.average().unwrap();
            let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(avg >= lo - 1e-9 && avg <= hi + 1e-9);
        }
    }
}
