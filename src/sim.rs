use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use tracing::{info, warn};

use crate::{
    delay::Exponential,
    lock::RwProtocol,
    log::EventLog,
    wait::{Report, ThreadWaitRecord},
    worker::worker,
    Error, Params, Result, Role,
};

/// `nw` writers and `nr` readers sharing one lock and one event log.
pub struct Simulation<L> {
    params: Params,
    lock: Arc<L>,
    log: Arc<EventLog>,
}

impl<L: RwProtocol + 'static> Simulation<L> {
    pub fn new(params: Params, lock: L, log: EventLog) -> Self {
        Self {
            params,
            lock: Arc::new(lock),
            log: Arc::new(log),
        }
    }

    fn spawn(&self, role: Role, id: usize) -> Result<JoinHandle<Result<ThreadWaitRecord>>> {
        let name = format!("{}-{}", role.to_string().to_lowercase(), id);
        let k = self.params.repetitions(role);
        let params = self.params;
        let lock = self.lock.clone();
        let log = self.log.clone();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut delay = Exponential::new(&params);
                worker(role, id, k, lock.as_ref(), &log, &mut delay)
            })
            .map_err(|source| Error::ThreadInit {
                thread: name,
                source,
            })
    }

    /// Spawns every worker (writers first), joins them all and summarises.
    pub fn run(self) -> Result<Report> {
        self.run_with(Self::spawn)
    }

    fn run_with<S>(self, mut spawn: S) -> Result<Report>
    where
        S: FnMut(&Self, Role, usize) -> Result<JoinHandle<Result<ThreadWaitRecord>>>,
    {
        let init = Instant::now();

        // A refused spawn stops further spawning, but whoever is already
        // running still gets joined below.
        let mut first_err = None;
        let mut handles = vec![];
        'spawn: for role in [Role::Writer, Role::Reader] {
            for id in 1..=self.params.threads(role) {
                match spawn(&self, role, id) {
                    Ok(h) => handles.push((role, id, h)),
                    Err(e) => {
                        first_err = Some(e);
                        break 'spawn;
                    }
                }
            }
        }

        // Join everything before reporting the first failure so no worker
        // is left running against a dropped log.
        let mut records = vec![];
        for (role, id, h) in handles {
            let res = h
                .join()
                .unwrap_or_else(|_| Err(Error::WorkerPanicked(format!("{role} thread {id}"))));
            match res {
                Ok(r) => {
                    if r.average().is_none() {
                        warn!(%role, id, "no completed requests, average undefined");
                    }
                    records.push(r);
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        let flushed = self.log.flush();
        if let Some(e) = first_err {
            return Err(e);
        }
        flushed?;

        let report = Report::new(self.lock.policy(), &records);
        info!(
            elapsed_ms = init.elapsed().as_millis() as u64,
            readers = ?report.reader_average,
            writers = ?report.writer_average,
            "all workers joined"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{log::Clock, Fair, Policy, WriterPreference};
    use std::{io, sync::mpsc, time::Duration};

    fn params(nw: usize, nr: usize, kw: usize, kr: usize) -> Params {
        Params {
            nw,
            nr,
            kw,
            kr,
            mu_cs: 1.0,
            mu_rem: 2.0,
        }
    }

    fn log(dir: &tempfile::TempDir) -> EventLog {
        EventLog::with_clock(dir.path().join("log.txt"), Clock::utc()).unwrap()
    }

    /// Runs on a helper thread so a deadlock fails the test instead of
    /// hanging it.
    fn run_bounded<L: RwProtocol + 'static>(sim: Simulation<L>) -> Report {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(sim.run());
        });
        rx.recv_timeout(Duration::from_secs(10))
            .expect("workers did not finish in time")
            .unwrap()
    }

    #[test]
    fn every_thread_reports() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_bounded(Simulation::new(params(2, 3, 3, 3), Fair::new(), log(&dir)));

        assert_eq!(report.policy, Policy::Fair);
        assert_eq!(report.writers.len(), 2);
        assert_eq!(report.readers.len(), 3);
        assert!(report.readers.iter().all(|s| s.samples == 3));
        assert!(report.reader_average.is_some());
        assert!(report.writer_average.is_some());

        let lines = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(lines.lines().count(), (2 * 3 + 3 * 3) * 3);
    }

    #[test]
    fn writer_preference_completes() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulation::new(params(2, 3, 3, 3), WriterPreference::new(), log(&dir));
        let report = run_bounded(sim);
        assert_eq!(report.policy, Policy::WriterPreference);
        assert!(report.writers.iter().all(|s| s.samples == 3));
    }

    #[test]
    fn refused_spawn_still_joins_started_workers() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulation::new(params(2, 3, 2, 3), Fair::new(), log(&dir));

        let err = sim
            .run_with(|sim, role, id| {
                if role == Role::Reader {
                    return Err(Error::ThreadInit {
                        thread: format!("reader-{id}"),
                        source: io::Error::new(io::ErrorKind::Other, "no more threads"),
                    });
                }
                sim.spawn(role, id)
            })
            .unwrap_err();
        assert!(matches!(err, Error::ThreadInit { ref thread, .. } if thread == "reader-1"));

        // Both writers ran to completion before the error came back.
        let text = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(text.lines().count(), 2 * 2 * 3);
        assert!(text.lines().all(|l| l.contains("by Writer")));
    }

    #[test]
    fn no_readers() {
        let dir = tempfile::tempdir().unwrap();
        let report = Simulation::new(params(2, 0, 2, 5), WriterPreference::new(), log(&dir))
            .run()
            .unwrap();
        assert!(report.readers.is_empty());
        assert_eq!(report.reader_average, None);
        assert!(report.writer_average.is_some());
    }

    #[test]
    fn zero_repetitions() {
        let dir = tempfile::tempdir().unwrap();
        let report = Simulation::new(params(1, 1, 0, 0), Fair::new(), log(&dir))
            .run()
            .unwrap();
        assert_eq!(report.reader_average, None);
        assert_eq!(report.writer_average, None);
    }
}
