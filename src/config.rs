use clap::{Args, Parser, ValueEnum};
use std::{path::PathBuf, time::Duration};

/// rMIS minimal independent support extractor
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = "Computes a minimal independent support of a CNF formula by repeatedly \
        sampling group-MUS extractions and keeping the smallest support seen.\n\n\
        If both --useind and --firstinds are given, the union of both supports is the \
        starting point. If --useind is set but the input has no 'c ind' annotation and \
        --firstinds is absent, all variables are considered."
)]
pub struct Config {
    /// input formula in DIMACS CNF format
    pub input: PathBuf,

    /// output file for the chosen support, printed as 'c ind' line on stdout when absent
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// write every accepted support to the output instead of only the best one
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// enable the per-iteration timing log
    #[arg(long, default_value_t = false)]
    pub logging: bool,

    /// timing log destination
    #[arg(long = "log", default_value = "log.txt")]
    pub log: PathBuf,

    /// keep the grouped formula and raw extractor output next to the input
    #[arg(long = "no-clean", default_value_t = false)]
    pub no_clean: bool,

    /// print every accepted support
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub budget: RunBudget,

    #[command(flatten)]
    pub transform: TransformOptions,

    #[command(flatten)]
    pub extract: ExtractOptions,
}

#[derive(Args, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunBudget {
    /// number of distinct supports to sample
    #[arg(long = "max", default_value_t = 1)]
    pub max_iterations: usize,

    /// consecutive rejected probes (duplicate, timeout or unparsable) before giving up
    #[arg(long = "max-dup", default_value_t = 10)]
    pub max_duplicate_attempts: usize,

    /// timeout for a single extraction in seconds, 0 for none
    #[arg(long, default_value_t = 3000)]
    pub timeout: u64,
}

impl RunBudget {
    pub fn new(max_iterations: usize, max_duplicate_attempts: usize, timeout: u64) -> Self {
        Self {
            max_iterations,
            max_duplicate_attempts,
            timeout,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct TransformOptions {
    /// use the independent support given in the input in 'c ind' format
    #[arg(long, default_value_t = false)]
    pub useind: bool,

    /// use variables 1 to firstinds as the a-priori independent support
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub firstinds: Option<u64>,

    /// path of the CNF to GCNF converter
    #[arg(long, default_value = "togmus")]
    pub togmus: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct ExtractOptions {
    /// SAT backend of the group-MUS extractor
    #[arg(long, value_enum, default_value_t = Backend::Minisat)]
    pub backend: Backend,

    /// verbosity passed to the extractor
    #[arg(long = "muser-verbosity", default_value_t = 0)]
    pub verbosity: u32,

    /// wall-clock slack in seconds on top of the timeout before the extractor is killed
    #[arg(long, default_value_t = 10)]
    pub grace: u64,

    /// path of the group-MUS extractor
    #[arg(long, default_value = "muser2")]
    pub muser2: PathBuf,
}

impl ExtractOptions {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace)
    }
}

#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq, Default)]
pub enum Backend {
    /// minisat-style solver
    #[default]
    Minisat,
    /// glucose-style incremental-learning solver
    Glucose,
}

impl Backend {
    pub fn flag(self) -> &'static str {
        match self {
            Backend::Minisat => "-minisats",
            Backend::Glucose => "-glucoses",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["", "input.cnf"])
    }
}
