use crate::{
    controller::Outcome,
    support::CandidateSupport,
    tracer::{Accepted, TracerIf},
};
use log::info;
use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Writes the chosen support. With a file destination the file is truncated
/// once at creation and only appended to afterwards; without one the support
/// goes to stdout as a `c ind` line.
pub struct ArtifactWriter {
    output: Option<PathBuf>,
    all: bool,
    /// last support printed to stdout by the incremental tracer
    printed: Rc<RefCell<Option<CandidateSupport>>>,
}

impl ArtifactWriter {
    pub fn create(output: Option<PathBuf>, all: bool) -> anyhow::Result<Self> {
        if let Some(p) = &output {
            File::create(p)?;
        }
        Ok(Self {
            output,
            all,
            printed: Rc::default(),
        })
    }

    /// Tracer appending every accepted support, only in incremental mode.
    pub fn incremental(&self) -> Option<Box<dyn TracerIf>> {
        self.all.then(|| {
            Box::new(IncrementalOutput {
                output: self.output.clone(),
                printed: self.printed.clone(),
            }) as Box<dyn TracerIf>
        })
    }

    /// Returns false when the run produced no viable support, in which case
    /// nothing is written.
    pub fn commit(&self, outcome: &Outcome) -> anyhow::Result<bool> {
        let Some(support) = outcome.support() else {
            return Ok(false);
        };
        match &self.output {
            Some(p) => {
                if !self.all {
                    append_line(p, &support.to_string())?;
                }
                info!(
                    "independent support of {} variables written to {}",
                    support.len(),
                    p.display()
                );
            }
            None => {
                if self.prints_final(support) {
                    println!("{}", support.cind());
                }
            }
        }
        Ok(true)
    }

    /// Whether stdout still needs the final `c ind` line, i.e. it is not
    /// already the last line printed in incremental mode.
    fn prints_final(&self, support: &CandidateSupport) -> bool {
        !(self.all && self.printed.borrow().as_ref() == Some(support))
    }
}

fn append_line(path: &Path, line: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

struct IncrementalOutput {
    output: Option<PathBuf>,
    printed: Rc<RefCell<Option<CandidateSupport>>>,
}

impl TracerIf for IncrementalOutput {
    fn trace_accept(&mut self, acc: &Accepted) -> anyhow::Result<()> {
        match &self.output {
            Some(p) => append_line(p, &acc.support.to_string()),
            None => {
                println!("{}", acc.support.cind());
                *self.printed.borrow_mut() = Some(acc.support.clone());
                Ok(())
            }
        }
    }
}
