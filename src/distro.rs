//! Host distribution detection from release metadata files.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const LSB_RELEASE_PATH: &str = "/etc/lsb-release";
pub const CENTOS_RELEASE_PATH: &str = "/etc/centos-release";
pub const REDHAT_RELEASE_PATH: &str = "/etc/redhat-release";

pub const RHEL_ID: &str = "Red Hat Enterprise Linux Server";
pub const CENTOS_ID: &str = "CentOS";

/// Distribution identity, e.g. `Ubuntu 14.04`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroInfo {
    pub id: String,
    pub release: String,
}

impl fmt::Display for DistroInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.release)
    }
}

/// Locations of the release metadata files probed by [`detect_from`]
#[derive(Debug, Clone)]
pub struct ReleaseFiles {
    pub lsb: PathBuf,
    pub centos: PathBuf,
    pub redhat: PathBuf,
}

/// Detect the distribution using the given release files.
///
/// The LSB file wins when present. CentOS hosts carry both
/// `centos-release` and `redhat-release`, so the CentOS file is checked first.
pub fn detect_from(files: &ReleaseFiles) -> Result<DistroInfo, DistroError> {
    if files.lsb.exists() {
        let content = read_release(&files.lsb)?;
        return parse_lsb_release(&content);
    }

    for (path, id) in [(&files.centos, CENTOS_ID), (&files.redhat, RHEL_ID)] {
        if path.exists() {
            let content = read_release(path)?;
            let version = parse_version(&content);
            if version.is_empty() {
                return Err(DistroError::NoVersion {
                    path: path.clone(),
                    content,
                });
            }
            return Ok(DistroInfo {
                id: id.to_string(),
                release: version.to_string(),
            });
        }
    }

    Err(DistroError::Undetectable)
}

fn read_release(path: &Path) -> Result<String, DistroError> {
    fs::read_to_string(path).map_err(|e| DistroError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse `DISTRIB_ID` and `DISTRIB_RELEASE` out of `/etc/lsb-release`
pub fn parse_lsb_release(content: &str) -> Result<DistroInfo, DistroError> {
    let values = parse_ini(content)?;
    let field = |key: &'static str| {
        values
            .get(key)
            .map(|v| v.trim().trim_matches('"').to_string())
            .ok_or(DistroError::MissingKey { key })
    };

    Ok(DistroInfo {
        id: field("DISTRIB_ID")?,
        release: field("DISTRIB_RELEASE")?,
    })
}

/// Parse `KEY=VALUE` lines. Blank lines are skipped, anything else without
/// exactly one `=` is rejected.
fn parse_ini(content: &str) -> Result<HashMap<&str, &str>, DistroError> {
    let mut values = HashMap::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) if !value.contains('=') => {
                values.insert(key, value);
            }
            _ => {
                return Err(DistroError::MalformedLine {
                    line: line.to_string(),
                })
            }
        }
    }
    Ok(values)
}

/// Extract the first version from a release string: a dotted `n.n[.n...]`
/// or a bare number of at least two digits. Empty when there is none.
pub fn parse_version(release: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)+|\d{2,}").expect("static regex"));
    re.find(release).map(|m| m.as_str()).unwrap_or("")
}

/// Errors related to distribution detection
#[derive(Debug, thiserror::Error)]
pub enum DistroError {
    #[error("Could not determine distro")]
    Undetectable,

    #[error("Failed to read distro info at '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Key {key} not found in LSB info")]
    MissingKey { key: &'static str },

    #[error("Unexpected line in LSB info: {line:?}")]
    MalformedLine { line: String },

    #[error("Cannot extract version from '{path}': {content:?}")]
    NoVersion { path: PathBuf, content: String },
}
