#![allow(non_snake_case)]

pub mod artifact;
pub mod config;
pub mod controller;
pub mod extractor;
pub mod scratch;
pub mod support;
pub mod tracer;
pub mod transformer;

use crate::{
    artifact::ArtifactWriter,
    config::Config,
    controller::{Controller, Outcome},
    extractor::Muser2,
    scratch::Scratch,
    tracer::{LogTracer, TimingLog, Tracer},
    transformer::Togmus,
};
use log::info;
use std::process::exit;

/// Runs the whole pipeline for one input. Returns false when no viable
/// support was found; scratch files are gone by the time this returns
/// unless retention was requested.
pub fn mis_main(cfg: &Config) -> anyhow::Result<bool> {
    if !cfg.input.is_file() {
        anyhow::bail!("input file {} does not exist", cfg.input.display());
    }
    info!("computing independent support of {}", cfg.input.display());
    let scratch = Scratch::new(&cfg.input, cfg.no_clean)?;
    info!("grouped formula: {}", scratch.gcnf().display());
    let extractor = Muser2::new(&cfg.extract, cfg.budget.timeout, scratch.output());
    let child = extractor.child_slot();
    let paths = scratch.paths();
    ctrlc::set_handler(move || {
        child.kill();
        paths.remove();
        exit(124);
    })?;
    let writer = ArtifactWriter::create(cfg.output.clone(), cfg.all)?;
    let mut tracer = Tracer::new();
    tracer.add_tracer(Box::new(LogTracer::new(cfg.verbose)));
    if cfg.logging {
        tracer.add_tracer(Box::new(TimingLog::create(&cfg.log)?));
    }
    if let Some(t) = writer.incremental() {
        tracer.add_tracer(t);
    }
    let transformer = Togmus::new(&cfg.transform);
    let mut controller = Controller::new(cfg.budget, transformer, extractor, tracer);
    let outcome = controller.run(&cfg.input, scratch.gcnf())?;
    report(&outcome);
    drop(scratch);
    writer.commit(&outcome)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Converged(_) => info!("found an empty independent support"),
        Outcome::ExhaustedIterations(_) => info!("iteration budget exhausted"),
        Outcome::ExhaustedDuplicateAttempts(_) => info!("too many rejected extractions in a row"),
        Outcome::ExtractionFailed => info!("no grouped formula, extraction skipped"),
    }
    if let Some(s) = outcome.support() {
        info!("best independent support has {} variables", s.len());
    }
}
