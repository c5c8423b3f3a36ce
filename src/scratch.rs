use log::{debug, warn};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Per-run scratch files: the grouped formula and the raw output of the
/// latest extractor call. Both are removed on drop unless retained.
pub struct Scratch {
    gcnf: PathBuf,
    output: PathBuf,
    retain: bool,
    dir: Option<TempDir>,
}

impl Scratch {
    /// Scratch files in a private directory under `RMIS_TMP_DIR` or the
    /// system temp dir.
    pub fn temporary() -> anyhow::Result<Self> {
        let dir = match env::var("RMIS_TMP_DIR") {
            Ok(d) => {
                fs::create_dir_all(&d)?;
                tempfile::Builder::new().prefix("rmis").tempdir_in(d)?
            }
            Err(_) => tempfile::Builder::new().prefix("rmis").tempdir()?,
        };
        Ok(Self {
            gcnf: dir.path().join("formula.gcnf"),
            output: dir.path().join("muser.out"),
            retain: false,
            dir: Some(dir),
        })
    }

    /// Scratch files next to the input, `<stem>.gcnf` and `<stem>.tcnf`,
    /// kept after the run.
    pub fn beside(input: impl AsRef<Path>) -> Self {
        let input = input.as_ref();
        let base = match input.extension() {
            Some(ext) if ext == "cnf" => input.with_extension(""),
            _ => input.to_path_buf(),
        };
        let mut gcnf = base.clone().into_os_string();
        gcnf.push(".gcnf");
        let mut output = base.into_os_string();
        output.push(".tcnf");
        Self {
            gcnf: gcnf.into(),
            output: output.into(),
            retain: true,
            dir: None,
        }
    }

    pub fn new(input: impl AsRef<Path>, retain: bool) -> anyhow::Result<Self> {
        if retain {
            Ok(Self::beside(input))
        } else {
            Self::temporary()
        }
    }

    #[inline]
    pub fn gcnf(&self) -> &Path {
        &self.gcnf
    }

    #[inline]
    pub fn output(&self) -> &Path {
        &self.output
    }

    #[inline]
    pub fn retained(&self) -> bool {
        self.retain
    }

    /// Locations to remove on interrupt, empty when retained.
    pub fn paths(&self) -> ScratchPaths {
        if self.retain {
            return ScratchPaths {
                files: Vec::new(),
                dir: None,
            };
        }
        ScratchPaths {
            files: vec![self.gcnf.clone(), self.output.clone()],
            dir: self.dir.as_ref().map(|d| d.path().to_path_buf()),
        }
    }

    pub fn clean(&self) {
        if self.retain {
            return;
        }
        for p in [&self.gcnf, &self.output] {
            match fs::remove_file(p) {
                Ok(()) => debug!("removed {}", p.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
                Err(e) => warn!("failed to remove {}: {e}", p.display()),
            }
        }
    }
}

/// Owned copy of the scratch locations, for cleanup from an interrupt handler
/// that cannot borrow the run's `Scratch`.
#[derive(Clone, Debug)]
pub struct ScratchPaths {
    files: Vec<PathBuf>,
    dir: Option<PathBuf>,
}

impl ScratchPaths {
    pub fn remove(&self) {
        for f in self.files.iter() {
            let _ = fs::remove_file(f);
        }
        if let Some(d) = &self.dir {
            let _ = fs::remove_dir_all(d);
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        self.clean();
    }
}
