//! Version normalizer — converts `git describe` output to PEP 440 form
//!
//! A describe string is reduced from the tail: each stage strips one
//! recognized suffix and records it, then whatever is left must be a plain
//! release number. The recorded pieces are reassembled in a fixed order, so
//! the order in which the stages run never shows up in the output.
//!
//! # Pipeline
//!
//! `raw → [bare hash?] → local → dev → post → pre-release → release core → assemble`
//!
//! # Guarantees
//!
//! - **Total**: malformed input yields `None`, never a panic or an error
//! - **Deterministic**: same input always produces same output
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)` whenever defined

use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;

lazy_static! {
    static ref BARE_HASH: Regex =
        Regex::new(r"\A(?P<githash>g\w+)\z").expect("valid bare hash pattern");
    // `-<distance>-g<hash>` from describe, or the `+<distance>.g<hash>` / `+g<hash>`
    // local segment this module itself emits.
    static ref LOCAL_TAIL: Regex = tail_pattern(
        r"(?:-(?P<distance>\d+)-|\+(?:(?P<local_distance>\d+)\.)?)(?P<githash>g\w+)"
    );
    static ref DEV_TAIL: Regex = tail_pattern(r"\.dev(?P<number>\d+)");
    static ref POST_TAIL: Regex = tail_pattern(r"\.post(?P<number>\d+)");
    static ref PRE_TAIL: Regex = tail_pattern(
        r"[-._]?(?P<prerelease>a|alpha|b|beta|c|rc|pre|preview)(?P<number>\d+)"
    );
    static ref RELEASE: Regex = Regex::new(r"\A\d+\.\d+(?:\.\d+)?\z").expect("valid release pattern");
}

/// Anchor `pattern` to the end of the text, leaving a non-empty head in front of it.
///
/// The head is lazy, so the tail is the longest trailing segment the pattern accepts.
fn tail_pattern(pattern: &str) -> Regex {
    Regex::new(&format!(r"\A(?P<head>.+?)(?P<tail>{pattern})\z")).expect("valid tail pattern")
}

/// Split `text` into the part before a matching tail and the tail's captures.
///
/// When the pattern does not match, the text is returned unchanged.
fn strip_tail<'t>(re: &Regex, text: &'t str) -> (&'t str, Option<Captures<'t>>) {
    match re.captures(text) {
        Some(caps) => {
            let split = caps.name("tail").map_or(text.len(), |m| m.start());
            (&text[..split], Some(caps))
        }
        None => (text, None),
    }
}

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

// ── Version model ──────────────────────────────────────────

/// Pre-release phase, written as its PEP 440 short code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreKind {
    #[serde(rename = "a")]
    Alpha,
    #[serde(rename = "b")]
    Beta,
    #[serde(rename = "rc")]
    ReleaseCandidate,
}

impl PreKind {
    /// Map a describe keyword (`alpha`, `c`, `preview`, ...) to its phase
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "a" | "alpha" => Some(PreKind::Alpha),
            "b" | "beta" => Some(PreKind::Beta),
            "c" | "rc" | "pre" | "preview" => Some(PreKind::ReleaseCandidate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::ReleaseCandidate => "rc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreRelease {
    pub kind: PreKind,
    pub number: String,
}

/// Local version segment: commits since the tag and the abbreviated commit id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Local {
    pub distance: Option<String>,
    pub hash: String,
}

/// A parsed PEP 440 version
///
/// Numeric parts are kept as the digits that appeared in the input, so
/// `Display` reproduces them exactly (leading zeros included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub release: String,
    pub pre: Option<PreRelease>,
    pub post: Option<String>,
    pub dev: Option<String>,
    pub local: Option<Local>,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.release)?;
        if let Some(pre) = &self.pre {
            write!(f, "{}{}", pre.kind.as_str(), pre.number)?;
        }
        if let Some(post) = &self.post {
            write!(f, ".post{}", post)?;
        }
        if let Some(dev) = &self.dev {
            write!(f, ".dev{}", dev)?;
        }
        match &self.local {
            Some(Local {
                distance: Some(distance),
                hash,
            }) => write!(f, "+{}.{}", distance, hash),
            Some(Local {
                distance: None,
                hash,
            }) => write!(f, "+{}", hash),
            None => Ok(()),
        }
    }
}

// ── Public API ─────────────────────────────────────────────

/// Parse a describe string into its version components
///
/// Returns `None` for empty input or when the text left after stripping
/// every recognized suffix is not `major.minor[.patch]`.
pub fn parse(raw: &str) -> Option<Version> {
    if raw.is_empty() {
        return None;
    }

    // A commit with no reachable tag: describe --always prints only the hash
    if let Some(caps) = BARE_HASH.captures(raw) {
        return Some(Version {
            release: "0.0".into(),
            pre: None,
            post: None,
            dev: None,
            local: Some(Local {
                distance: None,
                hash: group(&caps, "githash")?,
            }),
        });
    }

    let (head, caps) = strip_tail(&LOCAL_TAIL, raw);
    let local = match caps {
        Some(caps) => Some(Local {
            distance: group(&caps, "distance").or_else(|| group(&caps, "local_distance")),
            hash: group(&caps, "githash")?,
        }),
        None => None,
    };

    let (head, caps) = strip_tail(&DEV_TAIL, head);
    let dev = caps.and_then(|caps| group(&caps, "number"));

    let (head, caps) = strip_tail(&POST_TAIL, head);
    let post = caps.and_then(|caps| group(&caps, "number"));

    let (head, caps) = strip_tail(&PRE_TAIL, head);
    let pre = match caps {
        Some(caps) => Some(PreRelease {
            kind: PreKind::from_keyword(caps.name("prerelease")?.as_str())?,
            number: group(&caps, "number")?,
        }),
        None => None,
    };

    if !RELEASE.is_match(head) {
        return None;
    }

    Some(Version {
        release: head.to_string(),
        pre,
        post,
        dev,
        local,
    })
}

/// Normalize a describe string to a PEP 440 version string
///
/// ```
/// use pkgversion_core::normalizer::normalize;
///
/// assert_eq!(normalize("2.0.0-43-gebecdc8").as_deref(), Some("2.0.0+43.gebecdc8"));
/// assert_eq!(normalize("2.0.0").as_deref(), Some("2.0.0"));
/// assert_eq!(normalize("not-a-version"), None);
/// ```
pub fn normalize(raw: &str) -> Option<String> {
    parse(raw).map(|version| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: &str) -> Option<String> {
        normalize(raw)
    }

    #[test]
    fn test_release_core_passthrough() {
        assert_eq!(n("1.2").as_deref(), Some("1.2"));
        assert_eq!(n("1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(n("10.20.30").as_deref(), Some("10.20.30"));
        assert_eq!(n("0.0.0").as_deref(), Some("0.0.0"));
    }

    #[test]
    fn test_missing_input() {
        assert_eq!(n(""), None);
        assert_eq!(None::<&str>.and_then(normalize), None);
    }

    #[test]
    fn test_bare_hash() {
        assert_eq!(n("ge3b6e92").as_deref(), Some("0.0+ge3b6e92"));
        assert_eq!(n("gABC123").as_deref(), Some("0.0+gABC123"));
    }

    #[test]
    fn test_distance_and_hash() {
        assert_eq!(n("1.2.3-99-ge3b6e92").as_deref(), Some("1.2.3+99.ge3b6e92"));
        assert_eq!(n("1.2.3a4-99-ge3b6e92").as_deref(), Some("1.2.3a4+99.ge3b6e92"));
        assert_eq!(n("1.2.3-a4-99-ge3b6e92").as_deref(), Some("1.2.3a4+99.ge3b6e92"));
        assert_eq!(n("1.2.3_a4-99-ge3b6e92").as_deref(), Some("1.2.3a4+99.ge3b6e92"));
        assert_eq!(n("1.2.3.a4-99-ge3b6e92").as_deref(), Some("1.2.3a4+99.ge3b6e92"));
    }

    #[test]
    fn test_prerelease_aliases() {
        assert_eq!(n("1.2.3-a4").as_deref(), Some("1.2.3a4"));
        assert_eq!(n("1.2.3a4").as_deref(), Some("1.2.3a4"));
        assert_eq!(n("1.2.3-alpha4").as_deref(), Some("1.2.3a4"));
        assert_eq!(n("1.2.3-beta4").as_deref(), Some("1.2.3b4"));
        assert_eq!(n("1.2.3b4").as_deref(), Some("1.2.3b4"));
        assert_eq!(n("1.2.3-rc4").as_deref(), Some("1.2.3rc4"));
        assert_eq!(n("1.2.3.rc4").as_deref(), Some("1.2.3rc4"));
        assert_eq!(n("1.2.3-c4").as_deref(), Some("1.2.3rc4"));
        assert_eq!(n("1.2.3-preview4").as_deref(), Some("1.2.3rc4"));
        assert_eq!(n("1.2.3-pre4").as_deref(), Some("1.2.3rc4"));
    }

    #[test]
    fn test_alias_convergence() {
        let expected = Some("1.2.3a4".to_string());
        assert_eq!(n("1.2.3-alpha4"), expected);
        assert_eq!(n("1.2.3.a4"), expected);
        assert_eq!(n("1.2.3_a4"), expected);
    }

    #[test]
    fn test_post_and_dev() {
        assert_eq!(n("1.2.3.dev4").as_deref(), Some("1.2.3.dev4"));
        assert_eq!(n("1.2.3.post1").as_deref(), Some("1.2.3.post1"));
        assert_eq!(n("1.2.3-a4.post1.dev5").as_deref(), Some("1.2.3a4.post1.dev5"));
        assert_eq!(
            n("1.2.3-rc1.post2.dev3-7-gdeadbee").as_deref(),
            Some("1.2.3rc1.post2.dev3+7.gdeadbee")
        );
    }

    #[test]
    fn test_malformed_remainder_fails() {
        assert_eq!(n("1.2.3ndev4"), None);
        assert_eq!(n("1.2.3npost1"), None);
        assert_eq!(n("non1.2.3.post1"), None);
        assert_eq!(n("1"), None);
        assert_eq!(n("v1.2.3"), None);
        assert_eq!(n("1.2.3.4"), None);
        assert_eq!(n("1.2.3-gamma4"), None);
        assert_eq!(n("-99-ge3b6e92"), None);
    }

    #[test]
    fn test_canonical_local_segment_is_accepted() {
        assert_eq!(n("1.2.3+99.ge3b6e92").as_deref(), Some("1.2.3+99.ge3b6e92"));
        assert_eq!(n("0.0+ge3b6e92").as_deref(), Some("0.0+ge3b6e92"));
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "1.2",
            "1.2.3",
            "ge3b6e92",
            "1.2.3-99-ge3b6e92",
            "1.2.3-alpha4",
            "1.2.3_b4",
            "1.2.3-preview4",
            "1.2.3.dev4",
            "1.2.3.post1",
            "1.2.3-a4.post1.dev5",
            "1.2.3.c7.post1-12-gabc1234",
        ];
        for raw in inputs {
            let once = n(raw).unwrap_or_else(|| panic!("{raw} should normalize"));
            assert_eq!(n(&once).as_deref(), Some(once.as_str()), "input {raw}");
        }
    }

    #[test]
    fn test_parse_components() {
        let version = parse("2.0.0-beta02.post1-43-gebecdc8").unwrap();
        assert_eq!(version.release, "2.0.0");
        assert_eq!(
            version.pre,
            Some(PreRelease {
                kind: PreKind::Beta,
                number: "02".into()
            })
        );
        assert_eq!(version.post.as_deref(), Some("1"));
        assert_eq!(version.dev, None);
        assert_eq!(
            version.local,
            Some(Local {
                distance: Some("43".into()),
                hash: "gebecdc8".into()
            })
        );
        assert_eq!(version.to_string(), "2.0.0b02.post1+43.gebecdc8");
    }

    #[test]
    fn test_version_serializes_short_codes() {
        let version = parse("1.0-rc2").unwrap();
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["release"], "1.0");
        assert_eq!(json["pre"]["kind"], "rc");
        assert_eq!(json["pre"]["number"], "2");
        assert!(json["local"].is_null());
    }

    #[test]
    fn test_determinism_100_iterations() {
        let first = n("1.2.3-a4.post1.dev5-99-ge3b6e92");
        for i in 0..100 {
            assert_eq!(first, n("1.2.3-a4.post1.dev5-99-ge3b6e92"), "iteration {}", i);
        }
    }
}
