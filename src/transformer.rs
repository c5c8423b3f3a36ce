use crate::config::TransformOptions;
use anyhow::Context;
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

/// Converts a flat CNF into the grouped CNF consumed by the extractor.
/// Callers check the produced file with [`ensure_grouped`].
pub trait Transformer {
    fn transform(&mut self, cnf: &Path, gcnf: &Path) -> anyhow::Result<()>;
}

/// The `togmus` converter: one group per variable, optionally restricted to
/// a seed support.
pub struct Togmus {
    bin: PathBuf,
    useind: bool,
    firstinds: Option<u64>,
}

impl Togmus {
    pub fn new(opts: &TransformOptions) -> Self {
        Self {
            bin: opts.togmus.clone(),
            useind: opts.useind,
            firstinds: opts.firstinds,
        }
    }

    fn command(&self, cnf: &Path, gcnf: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(cnf).arg(gcnf);
        cmd.arg(if self.useind { "True" } else { "False" });
        if let Some(n) = self.firstinds {
            cmd.arg(n.to_string());
        }
        cmd
    }
}

impl Transformer for Togmus {
    fn transform(&mut self, cnf: &Path, gcnf: &Path) -> anyhow::Result<()> {
        // a stale file must not pass for fresh output
        if gcnf.exists() {
            fs::remove_file(gcnf)?;
        }
        info!("togmus: converting {} into grouped cnf", cnf.display());
        let output = self
            .command(cnf, gcnf)
            .output()
            .with_context(|| format!("failed to run {}", self.bin.display()))?;
        if !output.status.success() {
            info!("{}", String::from_utf8_lossy(&output.stdout));
            info!("{}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }
}

/// The exit code of the converter carries no contract, only the produced
/// file does.
pub fn ensure_grouped(gcnf: &Path) -> anyhow::Result<()> {
    match fs::metadata(gcnf) {
        Ok(m) if m.is_file() => Ok(()),
        _ => anyhow::bail!("grouped formula {} was not produced", gcnf.display()),
    }
}
