//! Python bindings for pkgversion
//!
//! Thin wrapper around `pkgversion-core` — ZERO logic here.
//! All behavior comes from the Rust implementation.

use pkgversion_core::emitter::{Metadata, VersionPolicy};
use pkgversion_core::{Error, Git, Vcs};
use pyo3::exceptions::{PyOSError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use serde_json::Value;

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Io { .. } | Error::Git { .. } => PyOSError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Convert a `setup()` keyword value to JSON
fn to_json(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }
    if let Ok(b) = obj.downcast::<PyBool>() {
        return Ok(Value::Bool(b.is_true()));
    }
    if obj.downcast::<PyInt>().is_ok() {
        return Ok(Value::from(obj.extract::<i64>()?));
    }
    if let Ok(f) = obj.downcast::<PyFloat>() {
        return Ok(serde_json::Number::from_f64(f.value()).map_or(Value::Null, Value::Number));
    }
    if obj.downcast::<PyString>().is_ok() {
        return Ok(Value::String(obj.extract::<String>()?));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        return list.iter().map(|item| to_json(&item)).collect();
    }
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        return tuple.iter().map(|item| to_json(&item)).collect();
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        return Ok(Value::Object(to_metadata(dict)?));
    }
    Err(PyTypeError::new_err(format!(
        "unsupported setup() argument: {}",
        obj
    )))
}

fn to_metadata(dict: &Bound<'_, PyDict>) -> PyResult<Metadata> {
    let mut map = Metadata::new();
    for (key, value) in dict.iter() {
        map.insert(key.extract::<String>()?, to_json(&value)?);
    }
    Ok(map)
}

/// Format a describe string according to PEP 440.
///
///     >>> pep440_version('2.0.0-43-gebecdc8')
///     '2.0.0+43.gebecdc8'
///
/// Returns:
///     The normalized version, or None for missing or malformed input
#[pyfunction]
#[pyo3(signature = (version=None))]
fn pep440_version(version: Option<&str>) -> Option<String> {
    version.and_then(pkgversion_core::normalize)
}

/// Retrieve the raw version from ``git describe --always --tags``.
///
/// Returns:
///     The describe output, or ``"0.0.0"`` when git yields nothing
///
/// Raises:
///     OSError: If git cannot be run
#[pyfunction]
#[pyo3(signature = (repo="."))]
fn get_version(repo: &str) -> PyResult<String> {
    Git::new(repo).describe().map_err(to_py_err)
}

/// Top-level directory of the git repository containing ``repo``.
///
/// Returns:
///     The directory, or None outside a repository
#[pyfunction]
#[pyo3(signature = (repo="."))]
fn get_git_repo_dir(repo: &str) -> PyResult<Option<String>> {
    let root = Git::new(repo).toplevel().map_err(to_py_err)?;
    Ok(root.map(|p| p.to_string_lossy().into_owned()))
}

/// List the requirements of a pip requirements file, in file order.
///
///     >>> list_requirements('path/to/file.txt')
///     ['pytest==2.7.2', 'pytest-django==2.8.0']
///
/// Raises:
///     OSError: If the file cannot be read
///     ValueError: If a line is not a valid requirement
#[pyfunction]
fn list_requirements(path: &str) -> PyResult<Vec<String>> {
    let reqs = pkgversion_core::list_requirements(path).map_err(to_py_err)?;
    Ok(reqs.iter().map(ToString::to_string).collect())
}

/// Write setup.py with the given ``setup()`` keywords.
///
/// ``version`` defaults to the normalized git describe output of ``repo``
/// (the raw output with ``raw_version=True``). ``file`` defaults to
/// ``setup.py`` at the repository root.
///
/// Returns:
///     Path of the written file
///
/// Raises:
///     OSError: If git cannot be run or the file cannot be written
///     ValueError: If the version is unparseable or ``repo`` is not a repository
#[pyfunction]
#[pyo3(signature = (file=None, repo=".", raw_version=false, version=None, **kwargs))]
fn write_setup_py(
    file: Option<&str>,
    repo: &str,
    raw_version: bool,
    version: Option<&str>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<String> {
    let mut overrides = match kwargs {
        Some(dict) => to_metadata(dict)?,
        None => Metadata::new(),
    };
    if let Some(v) = version {
        overrides.insert("version".into(), Value::String(v.to_string()));
    }
    let policy = if raw_version {
        VersionPolicy::Raw
    } else {
        VersionPolicy::Normalized
    };

    let path = pkgversion_core::write_setup_py(
        &Git::new(repo),
        file.map(std::path::Path::new),
        overrides,
        policy,
    )
    .map_err(to_py_err)?;
    Ok(path.to_string_lossy().into_owned())
}

/// pkgversion Python module — PEP 440 versions from git
#[pymodule]
fn pkgversion(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pep440_version, m)?)?;
    m.add_function(wrap_pyfunction!(get_version, m)?)?;
    m.add_function(wrap_pyfunction!(get_git_repo_dir, m)?)?;
    m.add_function(wrap_pyfunction!(list_requirements, m)?)?;
    m.add_function(wrap_pyfunction!(write_setup_py, m)?)?;
    Ok(())
}
