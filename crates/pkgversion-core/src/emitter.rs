//! Descriptor emitter — writes the generated `setup.py`
//!
//! The file is a fixed template: a blank line, the setuptools import, and a
//! single `setup(**{...})` call whose argument is the metadata rendered as a
//! Python literal. Downstream tooling parses this layout, so it never
//! changes shape: the literal is always written on one line.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;

use crate::git::Vcs;
use crate::normalizer;
use crate::{Error, Result};

/// Keyword arguments passed to `setup()`
pub type Metadata = serde_json::Map<String, Value>;

/// File name written at the repository root when no destination is given
pub const SETUP_PY: &str = "setup.py";

/// How the default `version` entry is derived from describe output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// PEP 440 form; unparseable describe output is an error
    #[default]
    Normalized,
    /// Describe output as-is
    Raw,
}

/// Query `vcs` for the version `setup.py` gets when the caller supplies none
pub fn default_version(vcs: &dyn Vcs, policy: VersionPolicy) -> Result<String> {
    let raw = vcs.describe()?;
    match policy {
        VersionPolicy::Raw => Ok(raw),
        VersionPolicy::Normalized => {
            normalizer::normalize(&raw).ok_or(Error::UnparseableVersion(raw))
        }
    }
}

/// Merge caller overrides over the default metadata
///
/// The version query only runs when `overrides` has no `version` key.
pub fn setup_metadata(
    vcs: &dyn Vcs,
    overrides: Metadata,
    policy: VersionPolicy,
) -> Result<Metadata> {
    if overrides.contains_key("version") {
        return Ok(overrides);
    }

    let mut data = Metadata::new();
    data.insert(
        "version".into(),
        Value::String(default_version(vcs, policy)?),
    );
    data.extend(overrides);
    Ok(data)
}

/// Render the complete `setup.py` text
pub fn render_setup_py(metadata: &Metadata) -> String {
    let mut literal = String::new();
    write_dict(&mut literal, metadata);
    format!("\nfrom setuptools import setup\nsetup(**{})\n", literal)
}

/// Write `setup.py` and return the path written
///
/// Without `file`, the destination is `setup.py` at the repository root of
/// `vcs`.
pub fn write_setup_py(
    vcs: &dyn Vcs,
    file: Option<&Path>,
    overrides: Metadata,
    policy: VersionPolicy,
) -> Result<PathBuf> {
    let data = setup_metadata(vcs, overrides, policy)?;

    let path = match file {
        Some(path) => path.to_path_buf(),
        None => vcs
            .toplevel()?
            .ok_or_else(|| Error::NotARepository(vcs.workdir().to_path_buf()))?
            .join(SETUP_PY),
    };

    let contents = render_setup_py(&data);
    let mut out = File::create(&path).map_err(|e| Error::io(&path, e))?;
    out.write_all(contents.as_bytes())
        .map_err(|e| Error::io(&path, e))?;
    debug!("wrote {} ({} keys)", path.display(), data.len());

    Ok(path)
}

// ── Python literal rendering ───────────────────────────────

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_str(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_dict(out, map),
    }
}

// Keys are sorted explicitly, matching pprint, whatever order the map keeps.
fn write_dict(out: &mut String, map: &Metadata) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_str(out, key);
        out.push_str(": ");
        write_value(out, value);
    }
    out.push('}');
}

/// Characters `repr` escapes besides the named ones
///
/// Mirrors `str.isprintable()` without a Unicode category table;
/// unassigned code points are printed as-is.
fn is_unprintable(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{a0}'
                | '\u{ad}'
                | '\u{600}'..='\u{605}'
                | '\u{61c}'
                | '\u{6dd}'
                | '\u{70f}'
                | '\u{890}'..='\u{891}'
                | '\u{8e2}'
                | '\u{1680}'
                | '\u{180e}'
                | '\u{2000}'..='\u{200f}'
                | '\u{2028}'..='\u{202f}'
                | '\u{205f}'..='\u{2064}'
                | '\u{2066}'..='\u{206f}'
                | '\u{3000}'
                | '\u{e000}'..='\u{f8ff}'
                | '\u{feff}'
                | '\u{fff9}'..='\u{fffb}'
                | '\u{110bd}'
                | '\u{110cd}'
                | '\u{1bca0}'..='\u{1bca3}'
                | '\u{1d173}'..='\u{1d17a}'
                | '\u{e0001}'
                | '\u{e0020}'..='\u{e007f}'
                | '\u{f0000}'..='\u{10ffff}'
        )
}

/// Quote a string the way Python's `repr` does
fn write_str(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if is_unprintable(c) => {
                let code = c as u32;
                if code < 0x100 {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code < 0x10000 {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}
