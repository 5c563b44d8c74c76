//! Git collaborators — repository root and describe queries
//!
//! Every query runs against an explicit working directory; nothing here
//! consults the process-wide current directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::{debug, warn};

use crate::{Error, Result};

/// Version reported when describe yields nothing
pub const FALLBACK_VERSION: &str = "0.0.0";

/// Source of repository information for the emitter and CLI
pub trait Vcs {
    /// Directory the queries run from
    fn workdir(&self) -> &Path;

    /// Top-level directory of the repository, or `None` outside one
    fn toplevel(&self) -> Result<Option<PathBuf>>;

    /// Raw `describe` output (tags, distance, abbreviated hash)
    fn describe(&self) -> Result<String>;
}

/// `git` executable bound to a working directory
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Check that `git --version` can be run
    pub fn is_installed() -> Result<()> {
        run_git(None, &["--version"])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        run_git(Some(&self.workdir), args)
    }
}

fn run_git(workdir: Option<&Path>, args: &[&str]) -> Result<Output> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    debug!("running git {} in {:?}", args.join(" "), workdir);

    command.output().map_err(|source| Error::Git {
        command: format!("git {}", args.join(" ")),
        source,
    })
}

impl Vcs for Git {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn toplevel(&self) -> Result<Option<PathBuf>> {
        let output = self.run(&["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            debug!(
                "{} is not inside a git repository: {}",
                self.workdir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let stdout = String::from_utf8(output.stdout)?;
        let root = stdout.trim();
        if root.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(root)))
    }

    fn describe(&self) -> Result<String> {
        let output = self.run(&["describe", "--always", "--tags"])?;
        let stdout = String::from_utf8(output.stdout)?;
        let version = stdout.trim();
        if version.is_empty() {
            warn!(
                "git describe yielded nothing in {}, using {}",
                self.workdir.display(),
                FALLBACK_VERSION
            );
            return Ok(FALLBACK_VERSION.to_string());
        }
        Ok(version.to_string())
    }
}

/// Fixed answers for callers that already know the version
#[derive(Debug, Clone, Default)]
pub struct FixedVersion {
    pub root: Option<PathBuf>,
    pub describe: String,
}

impl FixedVersion {
    pub fn new(describe: impl Into<String>) -> Self {
        Self {
            root: None,
            describe: describe.into(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

impl Vcs for FixedVersion {
    fn workdir(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new("."))
    }

    fn toplevel(&self) -> Result<Option<PathBuf>> {
        Ok(self.root.clone())
    }

    fn describe(&self) -> Result<String> {
        if self.describe.is_empty() {
            return Ok(FALLBACK_VERSION.to_string());
        }
        Ok(self.describe.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_describe_tagged_repo() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), Some("2.0.1"));

        let git = Git::new(dir.path());
        assert_eq!(git.describe().unwrap(), "2.0.1");
    }

    #[test]
    fn test_describe_untagged_repo_is_abbreviated_hash() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), None);

        // --always without a reachable tag prints the bare object name, no `g`
        let raw = Git::new(dir.path()).describe().unwrap();
        assert!(raw.len() >= 4, "unexpected describe output {raw}");
        assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_describe_outside_repo_falls_back() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let git = Git::new(dir.path());
        // A temp dir nested inside some other checkout would still resolve
        if git.toplevel().unwrap().is_some() {
            return;
        }
        assert_eq!(git.describe().unwrap(), FALLBACK_VERSION);
    }

    #[test]
    fn test_toplevel_from_subdirectory() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path(), None);
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let root = Git::new(&nested).toplevel().unwrap().expect("inside repo");
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert!(root.join(".git").is_dir());
    }

    #[test]
    fn test_missing_workdir_is_git_error() {
        let git = Git::new("/nonexistent/pkgversion/workdir");
        assert!(matches!(git.describe(), Err(Error::Git { .. })));
    }

    #[test]
    fn test_fixed_version() {
        let fixed = FixedVersion::new("1.2.3-4-gabcdef0").with_root("/repo");
        assert_eq!(fixed.describe().unwrap(), "1.2.3-4-gabcdef0");
        assert_eq!(fixed.toplevel().unwrap(), Some(PathBuf::from("/repo")));
        assert_eq!(FixedVersion::default().describe().unwrap(), FALLBACK_VERSION);
    }
}
