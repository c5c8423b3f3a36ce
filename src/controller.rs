//! Repeated sampling of the group-MUS extractor.
//!
//! Each probe asks the extractor for some locally minimal support. New
//! supports are remembered and the smallest one kept; repeats, timeouts and
//! unusable output are rejected. The run ends once the iteration budget is
//! spent, too many probes in a row are rejected, or an empty support shows
//! up. Nothing here guarantees the true minimum: the result is the best of a
//! bounded number of samples.

use crate::{
    config::RunBudget,
    extractor::{Extraction, Extractor},
    support::{self, CandidateSupport},
    tracer::{Accepted, Rejection, Tracer},
    transformer::{Transformer, ensure_grouped},
};
use log::{error, info, warn};
use std::{collections::HashSet, path::Path, time::Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// an empty support was found, nothing smaller exists
    Converged(CandidateSupport),
    ExhaustedIterations(Option<CandidateSupport>),
    ExhaustedDuplicateAttempts(Option<CandidateSupport>),
    /// the grouped formula could not be produced
    ExtractionFailed,
}

impl Outcome {
    /// `None` means no viable support.
    pub fn support(&self) -> Option<&CandidateSupport> {
        match self {
            Outcome::Converged(s) => Some(s),
            Outcome::ExhaustedIterations(s) | Outcome::ExhaustedDuplicateAttempts(s) => s.as_ref(),
            Outcome::ExtractionFailed => None,
        }
    }

    pub fn into_support(self) -> Option<CandidateSupport> {
        match self {
            Outcome::Converged(s) => Some(s),
            Outcome::ExhaustedIterations(s) | Outcome::ExhaustedDuplicateAttempts(s) => s,
            Outcome::ExtractionFailed => None,
        }
    }
}

/// Result of one extractor call after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Candidate(CandidateSupport),
    Timeout,
    Unparsable,
    Failed,
}

impl From<Extraction> for Probe {
    fn from(e: Extraction) -> Self {
        match e {
            Extraction::Output(text) => match support::parse_output(&text) {
                Some(s) => Probe::Candidate(s),
                None => Probe::Unparsable,
            },
            Extraction::Timeout => Probe::Timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Accepted {
        iteration: usize,
        best: bool,
        support: CandidateSupport,
    },
    Rejected(Rejection),
}

/// State of one run. Lives exactly as long as the run.
#[derive(Debug)]
pub struct Run {
    budget: RunBudget,
    seen: HashSet<CandidateSupport>,
    best: Option<CandidateSupport>,
    iterations: usize,
    consecutive_rejected: usize,
    probes: usize,
    outcome: Option<Outcome>,
}

impl Run {
    pub fn new(budget: RunBudget) -> Self {
        let outcome = (budget.max_iterations == 0).then_some(Outcome::ExhaustedIterations(None));
        Self {
            budget,
            seen: HashSet::new(),
            best: None,
            iterations: 0,
            consecutive_rejected: 0,
            probes: 0,
            outcome,
        }
    }

    pub fn observe(&mut self, probe: Probe) -> Step {
        debug_assert!(self.outcome.is_none());
        self.probes += 1;
        let rejection = match probe {
            Probe::Candidate(s) => {
                if !self.seen.contains(&s) {
                    return self.accept(s);
                }
                Rejection::Duplicate
            }
            Probe::Timeout => Rejection::Timeout,
            Probe::Unparsable => Rejection::Unparsable,
            Probe::Failed => Rejection::Failed,
        };
        self.consecutive_rejected += 1;
        if self.consecutive_rejected >= self.budget.max_duplicate_attempts {
            self.outcome = Some(Outcome::ExhaustedDuplicateAttempts(self.best.clone()));
        }
        Step::Rejected(rejection)
    }

    fn accept(&mut self, s: CandidateSupport) -> Step {
        let iteration = self.iterations;
        self.iterations += 1;
        self.consecutive_rejected = 0;
        let best = self.best.as_ref().is_none_or(|b| s.len() <= b.len());
        if s.is_empty() {
            self.outcome = Some(Outcome::Converged(s.clone()));
        } else if self.iterations >= self.budget.max_iterations {
            let kept = if best { Some(s.clone()) } else { self.best.clone() };
            self.outcome = Some(Outcome::ExhaustedIterations(kept));
        }
        if best {
            self.best = Some(s.clone());
        }
        self.seen.insert(s.clone());
        Step::Accepted {
            iteration,
            best,
            support: s,
        }
    }

    #[inline]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn best(&self) -> Option<&CandidateSupport> {
        self.best.as_ref()
    }

    pub fn num_seen(&self) -> usize {
        self.seen.len()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn probes(&self) -> usize {
        self.probes
    }

    pub fn consecutive_rejected(&self) -> usize {
        self.consecutive_rejected
    }
}

pub struct Controller<T: Transformer, E: Extractor> {
    budget: RunBudget,
    transformer: T,
    extractor: E,
    tracer: Tracer,
}

impl<T: Transformer, E: Extractor> Controller<T, E> {
    pub fn new(budget: RunBudget, transformer: T, extractor: E, tracer: Tracer) -> Self {
        Self {
            budget,
            transformer,
            extractor,
            tracer,
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    fn probe(&mut self, gcnf: &Path) -> Probe {
        match self.extractor.extract(gcnf) {
            Ok(e) => e.into(),
            Err(e) => {
                warn!("{e:#}");
                Probe::Failed
            }
        }
    }

    /// Transforms `cnf` into `gcnf` and samples supports until the budget
    /// is spent. Errors come only from writing tracer artifacts.
    pub fn run(&mut self, cnf: &Path, gcnf: &Path) -> anyhow::Result<Outcome> {
        if let Err(e) = self
            .transformer
            .transform(cnf, gcnf)
            .and_then(|()| ensure_grouped(gcnf))
        {
            error!("{e:#}");
            return Ok(Outcome::ExtractionFailed);
        }
        let mut run = Run::new(self.budget);
        while run.outcome().is_none() {
            let start = Instant::now();
            let probe = self.probe(gcnf);
            let elapsed = start.elapsed();
            match run.observe(probe) {
                Step::Accepted {
                    iteration,
                    best,
                    support,
                } => {
                    self.tracer.trace_accept(&Accepted {
                        iteration,
                        probe: run.probes() - 1,
                        elapsed,
                        support: &support,
                        best,
                    })?;
                }
                Step::Rejected(rej) => self.tracer.trace_reject(rej, run.consecutive_rejected()),
            }
        }
        let outcome = run.outcome.take().unwrap_or(Outcome::ExtractionFailed);
        info!(
            "{} distinct supports in {} probes",
            run.num_seen(),
            run.probes()
        );
        Ok(outcome)
    }
}
