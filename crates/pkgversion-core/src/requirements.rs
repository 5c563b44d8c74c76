//! Requirement-list loader — reads pip requirements files
//!
//! Produces the `install_requires` list for `setup.py`, in file order.
//! Each requirement renders the way pip prints a parsed requirement:
//! `name[extras]<specifiers>[; marker]`, with URL requirements reduced to
//! the name given by their `#egg=` fragment. A direct reference keeps its
//! URL: `name[extras]@ url ; marker`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::{Error, Result};

const OPERATORS: [&str; 8] = ["===", "~=", "==", "!=", "<=", ">=", "<", ">"];

/// One entry of a requirements file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: Vec<String>,
    pub marker: Option<String>,
    pub url: Option<String>,
    /// `name @ url` form; the URL is part of the rendered requirement
    pub direct: bool,
    pub editable: bool,
}

impl Requirement {
    fn named(name: String, extras: Vec<String>) -> Self {
        Self {
            name,
            extras,
            specifiers: Vec::new(),
            marker: None,
            url: None,
            direct: false,
            editable: false,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        f.write_str(&self.specifiers.join(","))?;
        if let (true, Some(url)) = (self.direct, &self.url) {
            write!(f, "@ {}", url)?;
            if self.marker.is_some() {
                f.write_str(" ")?;
            }
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}

/// A parsed logical line
#[derive(Debug, PartialEq)]
enum Line {
    Empty,
    Include(String),
    Requirement(Requirement),
}

// ── Public API ─────────────────────────────────────────────

/// Load every requirement from `path`, following `-r` includes in place
pub fn list_requirements(path: impl AsRef<Path>) -> Result<Vec<Requirement>> {
    let mut stack = Vec::new();
    let mut out = Vec::new();
    load(path.as_ref(), &mut stack, &mut out)?;
    Ok(out)
}

/// Parse a single requirement specification such as `pkg[extra]>=1.0`
pub fn parse_requirement(spec: &str) -> std::result::Result<Requirement, String> {
    match parse_line(spec)? {
        Line::Requirement(req) => Ok(req),
        Line::Include(_) => Err("include directives are not requirements".into()),
        Line::Empty => Err("empty requirement".into()),
    }
}

fn load(path: &Path, stack: &mut Vec<PathBuf>, out: &mut Vec<Requirement>) -> Result<()> {
    let canonical = path.canonicalize().map_err(|e| Error::io(path, e))?;
    if stack.contains(&canonical) {
        return Err(Error::IncludeCycle(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    debug!("reading requirements from {}", path.display());
    stack.push(canonical);

    for (line_no, line) in logical_lines(&text) {
        let parsed = parse_line(&line).map_err(|message| Error::Requirement {
            path: path.to_path_buf(),
            line: line_no,
            message,
        })?;
        match parsed {
            Line::Empty => {}
            Line::Include(file) => {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                load(&base.join(file), stack, out)?;
            }
            Line::Requirement(req) => out.push(req),
        }
    }

    stack.pop();
    Ok(())
}

// ── Line handling ──────────────────────────────────────────

/// Join backslash continuations; yields each logical line with its first line number
///
/// A comment line always ends the logical line, even when it ends in `\\`.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (i, raw) in text.lines().enumerate() {
        let (start, mut buf) = pending.take().unwrap_or((i + 1, String::new()));
        let is_comment = raw.trim_start().starts_with('#');
        match raw.strip_suffix('\\') {
            Some(continued) if !is_comment => {
                buf.push_str(continued);
                pending = Some((start, buf));
            }
            _ => {
                // leading space keeps the comment strippable after joining
                if is_comment {
                    buf.push(' ');
                }
                buf.push_str(raw);
                lines.push((start, buf));
            }
        }
    }
    if let Some(last) = pending {
        lines.push(last);
    }
    lines
}

/// Drop a `#` comment that starts the line or follows whitespace
fn strip_comment(line: &str) -> &str {
    let mut prev_ws = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_ws {
            return &line[..i];
        }
        prev_ws = c.is_whitespace();
    }
    line
}

fn parse_line(line: &str) -> std::result::Result<Line, String> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Ok(Line::Empty);
    }

    if line.starts_with('-') {
        let (option, value) = split_option(line);
        return match option {
            "-r" | "--requirement" => {
                if value.is_empty() {
                    Err(format!("{} needs a file name", option))
                } else {
                    Ok(Line::Include(value.to_string()))
                }
            }
            "-e" | "--editable" => {
                let mut req = parse_url(value)?;
                req.editable = true;
                Ok(Line::Requirement(req))
            }
            _ => {
                debug!("skipping option line {:?}", line);
                Ok(Line::Empty)
            }
        };
    }

    if let Some((name, reference)) = line.split_once(" @ ") {
        let (name, extras, rest) = parse_name(name.trim())?;
        if !rest.is_empty() {
            return Err(format!("unexpected {:?} before URL", rest));
        }
        // A marker after a URL must be separated from it by whitespace
        let (url, marker) = match find_url_marker(reference) {
            Some(at) => (&reference[..at], Some(&reference[at + 1..])),
            None => (reference, None),
        };
        let url = url.trim();
        if url.is_empty() {
            return Err(format!("missing URL after {:?}", name));
        }
        let mut req = Requirement::named(name, extras);
        req.url = Some(url.to_string());
        req.direct = true;
        req.marker = marker.map(normalize_marker).transpose()?.flatten();
        return Ok(Line::Requirement(req));
    }

    if is_url(line) {
        return parse_url(line).map(Line::Requirement);
    }

    parse_named(line).map(Line::Requirement)
}

/// Byte offset of a `;` that follows whitespace in a direct reference
///
/// `reference` is the text after `" @ "`, so its start counts as whitespace.
fn find_url_marker(reference: &str) -> Option<usize> {
    let mut prev_ws = true;
    for (i, c) in reference.char_indices() {
        if c == ';' && prev_ws {
            return Some(i);
        }
        prev_ws = c.is_whitespace();
    }
    None
}

/// Split `-r file`, `-rfile`, `--requirement=file` and `--requirement file`
fn split_option(line: &str) -> (&str, &str) {
    if line.starts_with("--") {
        let end = line
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(line.len());
        let value = line[end..].trim_start_matches('=').trim();
        (&line[..end], value)
    } else {
        let end = line
            .char_indices()
            .nth(2)
            .map_or(line.len(), |(i, _)| i);
        (&line[..end], line[end..].trim())
    }
}

fn is_url(line: &str) -> bool {
    line.contains("://")
        || line.starts_with('.')
        || line.starts_with('/')
        || ["git+", "hg+", "svn+", "bzr+", "file:"]
            .iter()
            .any(|scheme| line.starts_with(scheme))
}

/// URL or path requirement; the name comes from `#egg=`
fn parse_url(url: &str) -> std::result::Result<Requirement, String> {
    let egg = url
        .split_once('#')
        .and_then(|(_, fragment)| {
            fragment
                .split('&')
                .find_map(|part| part.strip_prefix("egg="))
        })
        .filter(|egg| !egg.is_empty())
        .ok_or_else(|| format!("missing #egg=<name> in {:?}", url))?;

    let (name, extras, rest) = parse_name(egg)?;
    if !rest.is_empty() {
        return Err(format!("invalid egg name {:?}", egg));
    }
    let mut req = Requirement::named(name, extras);
    req.url = Some(url.to_string());
    Ok(req)
}

/// `name[extras] specifiers ; marker`
fn parse_named(line: &str) -> std::result::Result<Requirement, String> {
    let (spec, marker) = match line.split_once(';') {
        Some((spec, marker)) => (spec, Some(marker.trim())),
        None => (line, None),
    };

    let (name, extras, rest) = parse_name(spec.trim())?;
    let mut req = Requirement::named(name, extras);

    let rest = rest.trim();
    let rest = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(rest);
    if !rest.trim().is_empty() {
        let mut specifiers = rest
            .split(',')
            .map(parse_specifier)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        specifiers.sort();
        req.specifiers = specifiers;
    }

    req.marker = marker.map(normalize_marker).transpose()?.flatten();
    Ok(req)
}

/// Re-render an environment marker the way packaging prints one
///
/// Tokens are separated by single spaces (none inside parentheses) and
/// string literals are double-quoted: `python_version<'3'` becomes
/// `python_version < "3"`. An empty marker yields `None`.
fn normalize_marker(marker: &str) -> std::result::Result<Option<String>, String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut chars = marker.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(q) if q == c => break,
                    Some(ch) => value.push(ch),
                    None => return Err(format!("unterminated string in marker {:?}", marker)),
                }
            }
            if value.contains('"') {
                tokens.push(format!("'{}'", value));
            } else {
                tokens.push(format!("\"{}\"", value));
            }
        } else if c == '(' || c == ')' {
            chars.next();
            tokens.push(c.to_string());
        } else if matches!(c, '<' | '>' | '=' | '!' | '~') {
            let mut op = String::new();
            while let Some(&ch) = chars.peek() {
                if !matches!(ch, '<' | '>' | '=' | '!' | '~') {
                    break;
                }
                op.push(ch);
                chars.next();
            }
            if !OPERATORS.contains(&op.as_str()) {
                return Err(format!("invalid marker operator {:?}", op));
            }
            tokens.push(op);
        } else if c.is_alphanumeric() || c == '_' || c == '.' {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_' || ch == '.') {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(word);
        } else {
            return Err(format!("unexpected {:?} in marker {:?}", c, marker));
        }
    }

    if tokens.is_empty() {
        return Ok(None);
    }

    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let after_open = i > 0 && tokens[i - 1] == "(";
        if i > 0 && !after_open && token != ")" {
            out.push(' ');
        }
        out.push_str(token);
    }
    Ok(Some(out))
}

/// Returns `(name, sorted extras, remaining text)`
fn parse_name(text: &str) -> std::result::Result<(String, Vec<String>, &str), String> {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(text.len());
    let name = &text[..end];
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(format!("invalid requirement name in {:?}", text));
    }

    let rest = text[end..].trim_start();
    let Some(after_bracket) = rest.strip_prefix('[') else {
        return Ok((name.to_string(), Vec::new(), rest));
    };
    let (inner, rest) = after_bracket
        .split_once(']')
        .ok_or_else(|| format!("unclosed extras in {:?}", text))?;

    let mut extras: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    extras.sort();
    Ok((name.to_string(), extras, rest))
}

fn parse_specifier(raw: &str) -> std::result::Result<String, String> {
    let spec: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let valid = OPERATORS
        .iter()
        .find(|op| spec.starts_with(*op))
        .is_some_and(|op| spec.len() > op.len());
    if !valid {
        return Err(format!("invalid version specifier {:?}", raw.trim()));
    }
    Ok(spec)
}
