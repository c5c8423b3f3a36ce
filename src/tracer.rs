use crate::support::CandidateSupport;
use log::{info, warn};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    time::Duration,
};

/// A newly accepted candidate.
#[derive(Debug, Clone, Copy)]
pub struct Accepted<'a> {
    /// index among accepted candidates
    pub iteration: usize,
    /// index among all probes, rejected ones included
    pub probe: usize,
    /// time spent in this probe
    pub elapsed: Duration,
    pub support: &'a CandidateSupport,
    /// whether the candidate replaced the best support
    pub best: bool,
}

/// Why a probe did not count as progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Duplicate,
    Timeout,
    Unparsable,
    Failed,
}

pub trait TracerIf {
    fn trace_accept(&mut self, _acc: &Accepted) -> anyhow::Result<()> {
        Ok(())
    }

    /// `consecutive` counts rejections since the last accepted candidate.
    fn trace_reject(&mut self, _rej: Rejection, _consecutive: usize) {}
}

#[derive(Default)]
pub struct Tracer {
    tracers: Vec<Box<dyn TracerIf>>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tracer(&mut self, tracer: Box<dyn TracerIf>) {
        self.tracers.push(tracer);
    }

    pub fn trace_accept(&mut self, acc: &Accepted) -> anyhow::Result<()> {
        for t in self.tracers.iter_mut() {
            t.trace_accept(acc)?;
        }
        Ok(())
    }

    pub fn trace_reject(&mut self, rej: Rejection, consecutive: usize) {
        for t in self.tracers.iter_mut() {
            t.trace_reject(rej, consecutive);
        }
    }
}

pub struct LogTracer {
    verbose: bool,
}

impl LogTracer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TracerIf for LogTracer {
    fn trace_accept(&mut self, acc: &Accepted) -> anyhow::Result<()> {
        info!(
            "iteration {}: support of {} variables in {:.2}s{}",
            acc.iteration,
            acc.support.len(),
            acc.elapsed.as_secs_f64(),
            if acc.best { ", new best" } else { "" }
        );
        if self.verbose {
            println!("{}", acc.support.cind());
            println!("num independent vars: {}", acc.support.len());
        }
        Ok(())
    }

    fn trace_reject(&mut self, rej: Rejection, consecutive: usize) {
        match rej {
            Rejection::Duplicate => info!("duplicate support ({consecutive} in a row)"),
            Rejection::Timeout => warn!("extraction timed out ({consecutive} in a row)"),
            Rejection::Unparsable => warn!("no support in extractor output ({consecutive} in a row)"),
            Rejection::Failed => warn!("extraction failed ({consecutive} in a row)"),
        }
    }
}

/// Appends `<iteration>:<probe>:<seconds>` per accepted candidate.
pub struct TimingLog {
    file: File,
}

impl TimingLog {
    /// Truncates the log.
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        File::create(path.as_ref())?;
        let file = OpenOptions::new().append(true).open(path.as_ref())?;
        Ok(Self { file })
    }
}

impl TracerIf for TimingLog {
    fn trace_accept(&mut self, acc: &Accepted) -> anyhow::Result<()> {
        writeln!(
            self.file,
            "{}:{}:{}",
            acc.iteration,
            acc.probe,
            acc.elapsed.as_secs_f64()
        )?;
        Ok(())
    }
}
