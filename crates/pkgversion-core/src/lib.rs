//! pkgversion core - PEP 440 versions from git history
//!
//! Derives a package version from `git describe` and regenerates a minimal
//! `setup.py` carrying it. The CLI and the Python bindings are thin
//! wrappers around this crate.
//!
//! # Architecture
//!
//! ```text
//! git describe → raw string → Normalizer → canonical version
//!                                               ↓
//!                      metadata overrides → Emitter → setup.py
//! ```
//!
//! # Guarantees
//!
//! - **Total**: the normalizer answers `None` for malformed input, it never errors
//! - **Deterministic**: same describe output always yields the same version and file
//! - **Explicit**: every git query runs against a caller-supplied working directory

pub mod emitter;
pub mod error;
pub mod git;
pub mod normalizer;
pub mod requirements;

pub use emitter::{write_setup_py, Metadata, VersionPolicy};
pub use error::{Error, Result};
pub use git::{FixedVersion, Git, Vcs};
pub use normalizer::{normalize, Version};
pub use requirements::{list_requirements, Requirement};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_to_setup_py() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = FixedVersion::new("2.0.0-43-gebecdc8").with_root(dir.path());

        let path = write_setup_py(&vcs, None, Metadata::new(), VersionPolicy::Normalized).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.ends_with("setup(**{'version': '2.0.0+43.gebecdc8'})\n"));
    }

    #[test]
    fn test_determinism_100_iterations() {
        let mut data = Metadata::new();
        data.insert("name".into(), "pkg".into());
        let vcs = FixedVersion::new("1.2.3-rc1");
        let first = emitter::setup_metadata(&vcs, data.clone(), VersionPolicy::Normalized).unwrap();
        for i in 0..100 {
            let result =
                emitter::setup_metadata(&vcs, data.clone(), VersionPolicy::Normalized).unwrap();
            assert_eq!(
                emitter::render_setup_py(&first),
                emitter::render_setup_py(&result),
                "Non-determinism at iteration {}",
                i
            );
        }
    }
}
