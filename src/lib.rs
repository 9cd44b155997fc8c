use serde_derive::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::{
    fmt,
    fs::{self, File},
    path::{Path, PathBuf},
};

pub mod delay;
pub mod error;
pub mod lock;
pub mod log;
pub mod sem;
pub mod sim;
pub mod wait;
pub mod worker;

pub use error::{Error, Result};
pub use lock::{Fair, RwProtocol, WriterPreference};
pub use sim::Simulation;
pub use wait::{Report, ThreadWaitRecord};

pub const DEFAULT_PARAMS: &str = "inp-params.txt";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Params {
    pub nw: usize,
    pub nr: usize,
    pub kw: usize,
    pub kr: usize,
    /// Mean time inside the critical section, in milliseconds.
    pub mu_cs: f64,
    /// Mean time in the remainder section, in milliseconds.
    pub mu_rem: f64,
}

impl Params {
    /// Reads `nw nr kw kr muCS muRem` separated by whitespace, or a JSON
    /// object with the same fields when the file ends in `.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buf = fs::read_to_string(path).map_err(|source| Error::ConfigUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let params = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&buf).map_err(|e| Error::InvalidConfig(e.to_string()))?
        } else {
            buf.parse()?
        };
        Self::validate(params)
    }

    fn validate(self) -> Result<Self> {
        for (name, mu) in [("muCS", self.mu_cs), ("muRem", self.mu_rem)] {
            if !mu.is_finite() || mu < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a non-negative number of milliseconds, got {mu}"
                )));
            }
        }
        Ok(self)
    }

    pub fn mean(&self, which: Region) -> f64 {
        match which {
            Region::In => self.mu_cs,
            Region::Out => self.mu_rem,
        }
    }

    pub fn threads(&self, role: Role) -> usize {
        match role {
            Role::Reader => self.nr,
            Role::Writer => self.nw,
        }
    }

    pub fn repetitions(&self, role: Role) -> usize {
        match role {
            Role::Reader => self.kr,
            Role::Writer => self.kw,
        }
    }
}

impl std::str::FromStr for Params {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let q = s.split_whitespace().collect::<Vec<_>>();
        if q.len() != 6 {
            return Err(Error::InvalidConfig(format!(
                "expected 6 values (nw nr kw kr muCS muRem), found {}",
                q.len()
            )));
        }

        let count = |i: usize| {
            q[i].parse::<usize>().map_err(|e| Error::InvalidConfig(format!("{:?}: {e}", q[i])))
        };
        let mean = |i: usize| {
            q[i].parse::<f64>().map_err(|e| Error::InvalidConfig(format!("{:?}: {e}", q[i])))
        };

        Ok(Self {
            nw: count(0)?,
            nr: count(1)?,
            kw: count(2)?,
            kr: count(3)?,
            mu_cs: mean(4)?,
            mu_rem: mean(5)?,
        })
    }
}

/// Which side of the critical section a thread is sleeping on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Reader,
    Writer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Reader => "Reader",
            Role::Writer => "Writer",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Policy {
    WriterPreference,
    Fair,
}

impl Policy {
    pub fn log_file(&self) -> &'static str {
        match self {
            Policy::WriterPreference => "RW-log.txt",
            Policy::Fair => "FairRW-log.txt",
        }
    }

    pub fn report_file(&self) -> &'static str {
        match self {
            Policy::WriterPreference => "Average_time_rw.txt",
            Policy::Fair => "Average_time_frw.txt",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Policy::WriterPreference => "writer-preference",
            Policy::Fair => "fair",
        })
    }
}

/// Runs one policy end to end: opens every output first, simulates, then
/// writes the text and JSON reports into `out_dir`.
pub fn run(policy: Policy, params: Params, out_dir: impl AsRef<Path>) -> Result<Report> {
    let out_dir = out_dir.as_ref();
    let log = log::EventLog::create(out_dir.join(policy.log_file()))?;
    let report_path = out_dir.join(policy.report_file());
    let json_path = report_path.with_extension("json");
    let mut report_file = create(&report_path)?;
    let mut json_file = create(&json_path)?;

    info!(%policy, ?params, "starting simulation");
    let report = match policy {
        Policy::WriterPreference => Simulation::new(params, WriterPreference::new(), log).run()?,
        Policy::Fair => Simulation::new(params, Fair::new(), log).run()?,
    };

    report
        .write_text(&mut report_file)
        .map_err(|e| Error::output(&report_path, e))?;
    serde_json::to_writer_pretty(&mut json_file, &report)
        .map_err(|e| Error::output(&json_path, e.into()))?;
    info!(%policy, report = %report_path.display(), "simulation finished");

    Ok(report)
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::output(path, e))
}

/// Parameter path and output directory from the command line.
pub fn args() -> (PathBuf, PathBuf) {
    let mut args = std::env::args().skip(1);
    let params = args.next().unwrap_or_else(|| DEFAULT_PARAMS.into());
    let out = args.next().unwrap_or_else(|| ".".into());
    (params.into(), out.into())
}

/// `RUST_LOG` controls the filter, `info` by default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .init();
}
