use crate::config::{Backend, ExtractOptions};
use anyhow::Context;
use log::{debug, warn};
use process_control::{ChildExt, Control};
use std::{
    collections::VecDeque,
    fs::{self, File},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{Arc, Mutex},
    time::Duration,
};

/// Raw result of one extractor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Output(String),
    Timeout,
}

/// A group-MUS oracle. Identical calls may return different supports, each
/// locally minimal but not necessarily globally minimum.
pub trait Extractor {
    fn extract(&mut self, gcnf: &Path) -> anyhow::Result<Extraction>;
}

/// Pid of the extractor child currently running, shared with the interrupt
/// handler so it can kill the child before exiting.
#[derive(Clone, Debug, Default)]
pub struct ChildSlot(Arc<Mutex<Option<u32>>>);

impl ChildSlot {
    fn set(&self, pid: u32) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(pid);
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.0.lock().ok().and_then(|slot| *slot)
    }

    /// Kills the running child, if any.
    pub fn kill(&self) {
        let Some(pid) = self.0.lock().ok().and_then(|mut slot| slot.take()) else {
            return;
        };
        debug!("killing muser2 (pid {pid})");
        let _ = Command::new("kill").arg("-9").arg(pid.to_string()).output();
    }
}

/// The `muser2` group-MUS extractor, its stdout redirected into a scratch
/// file that is overwritten on every call.
pub struct Muser2 {
    bin: PathBuf,
    backend: Backend,
    verbosity: u32,
    timeout: u64,
    grace: Duration,
    output: PathBuf,
    child: ChildSlot,
}

impl Muser2 {
    pub fn new(opts: &ExtractOptions, timeout: u64, output: impl Into<PathBuf>) -> Self {
        Self {
            bin: opts.muser2.clone(),
            backend: opts.backend,
            verbosity: opts.verbosity,
            timeout,
            grace: opts.grace(),
            output: output.into(),
            child: ChildSlot::default(),
        }
    }

    pub fn child_slot(&self) -> ChildSlot {
        self.child.clone()
    }

    fn command(&self, gcnf: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-v").arg(self.verbosity.to_string());
        cmd.args(["-grp", "-comp", self.backend.flag(), "-order", "4"]);
        if self.timeout > 0 {
            cmd.arg("-T").arg(self.timeout.to_string());
        }
        cmd.arg(gcnf);
        cmd
    }

    /// Wall-clock limit after which the child is killed. A limit too large
    /// to represent is treated as no limit.
    fn time_limit(&self) -> Option<Duration> {
        if self.timeout == 0 {
            return None;
        }
        Duration::from_secs(self.timeout).checked_add(self.grace)
    }
}

impl Extractor for Muser2 {
    fn extract(&mut self, gcnf: &Path) -> anyhow::Result<Extraction> {
        let out = File::create(&self.output)
            .with_context(|| format!("failed to create {}", self.output.display()))?;
        let mut cmd = self.command(gcnf);
        let mut child = cmd
            .stdout(Stdio::from(out))
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to run {}", self.bin.display()))?;
        self.child.set(child.id());
        let control = child.controlled();
        let status = match self.time_limit() {
            Some(limit) => control.time_limit(limit).terminate_for_timeout().wait(),
            None => control.wait(),
        };
        self.child.clear();
        let status = status?;
        let Some(status) = status else {
            warn!("muser2 exceeded {}s and was killed", self.timeout);
            return Ok(Extraction::Timeout);
        };
        debug!("muser2 exited with {status:?}");
        let text = fs::read_to_string(&self.output)?;
        Ok(Extraction::Output(text))
    }
}

/// Replays a fixed sequence of extractions, then reports timeouts.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    script: VecDeque<anyhow::Result<Extraction>>,
    calls: usize,
}

impl ScriptedExtractor {
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: outputs
                .into_iter()
                .map(|s| Ok(Extraction::Output(s.into())))
                .collect(),
            calls: 0,
        }
    }

    pub fn push(&mut self, e: anyhow::Result<Extraction>) {
        self.script.push_back(e);
    }

    /// Number of extract calls served so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Extractor for ScriptedExtractor {
    fn extract(&mut self, _gcnf: &Path) -> anyhow::Result<Extraction> {
        self.calls += 1;
        self.script.pop_front().unwrap_or(Ok(Extraction::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn opts(backend: Backend, bin: PathBuf) -> ExtractOptions {
        ExtractOptions {
            backend,
            verbosity: 0,
            grace: 0,
            muser2: bin,
        }
    }

    #[test]
    fn command_line() {
        let m = Muser2::new(&opts(Backend::Minisat, "muser2".into()), 3010, "out");
        let cmd = m.command(Path::new("f.gcnf"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            ["-v", "0", "-grp", "-comp", "-minisats", "-order", "4", "-T", "3010", "f.gcnf"]
        );
        let m = Muser2::new(&opts(Backend::Glucose, "muser2".into()), 0, "out");
        let cmd = m.command(Path::new("f.gcnf"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            ["-v", "0", "-grp", "-comp", "-glucoses", "-order", "4", "f.gcnf"]
        );
        assert_eq!(m.time_limit(), None);
    }

    #[test]
    fn huge_timeout_is_unbounded() {
        let mut o = opts(Backend::Minisat, "muser2".into());
        o.grace = 10;
        let m = Muser2::new(&o, u64::MAX, "out");
        assert_eq!(m.time_limit(), None);
        let m = Muser2::new(&o, 3000, "out");
        assert_eq!(m.time_limit(), Some(Duration::from_secs(3010)));
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Muser2::new(
            &opts(Backend::Minisat, dir.path().join("no-such-muser2")),
            1,
            dir.path().join("out"),
        );
        assert!(m.extract(Path::new("f.gcnf")).is_err());
    }

    #[test]
    fn scripted_replay() {
        let mut s = ScriptedExtractor::new(["v 1 0"]);
        s.push(Err(anyhow::anyhow!("boom")));
        let p = Path::new("f.gcnf");
        assert_eq!(s.extract(p).unwrap(), Extraction::Output("v 1 0".into()));
        assert!(s.extract(p).is_err());
        assert_eq!(s.extract(p).unwrap(), Extraction::Timeout);
        assert_eq!(s.calls(), 3);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("muser2");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        #[test]
        fn output_is_captured() {
            let dir = tempfile::tempdir().unwrap();
            let bin = script(dir.path(), "echo 'c muser2'\necho 'v 2 3 0'\nexit 20");
            let out = dir.path().join("muser.out");
            let mut m = Muser2::new(&opts(Backend::Minisat, bin), 5, &out);
            let e = m.extract(Path::new("f.gcnf")).unwrap();
            assert_eq!(e, Extraction::Output("c muser2\nv 2 3 0\n".into()));
            assert!(out.exists());
        }

        #[test]
        fn slow_extractor_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let bin = script(dir.path(), "sleep 30\necho 'v 1 0'");
            let mut m = Muser2::new(&opts(Backend::Minisat, bin), 1, dir.path().join("out"));
            assert_eq!(m.extract(Path::new("f.gcnf")).unwrap(), Extraction::Timeout);
            assert_eq!(m.child_slot().pid(), None);
        }

        #[test]
        fn child_slot_kills_running_child() {
            let mut child = Command::new("sleep").arg("30").spawn().unwrap();
            let slot = ChildSlot::default();
            slot.set(child.id());
            assert_eq!(slot.clone().pid(), Some(child.id()));
            slot.kill();
            assert_eq!(slot.pid(), None);
            assert!(!child.wait().unwrap().success());
            slot.kill();
        }
    }
}
