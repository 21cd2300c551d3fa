//! Single-instance guard keyed by the handler sequence number.
//!
//! The agent may invoke the handler more than once for the same (or an
//! older) settings sequence number while a run is still active. The guard
//! persists the sequence number of the active run in a plain file; a run
//! only proceeds when its number is strictly greater than the claimed one.
//!
//! This is cooperative and not atomic: check and write are separate steps,
//! and a crashed run leaves its claim behind until it is removed by hand or
//! a higher sequence number arrives.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Outcome of [`SequenceGuard::claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The sequence number is now claimed by this run
    Proceed,
    /// Another run holds an equal or higher sequence number
    Superseded { active: u64 },
}

/// File-backed claim on the current sequence number
#[derive(Debug, Clone)]
pub struct SequenceGuard {
    path: PathBuf,
}

impl SequenceGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The currently claimed sequence number, if any
    pub fn current(&self) -> Result<Option<u64>, GuardError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GuardError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        content
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| GuardError::Corrupt {
                path: self.path.clone(),
                content,
            })
    }

    /// Claim `seq` unless an equal or higher number is already claimed
    pub fn claim(&self, seq: u64) -> Result<Claim, GuardError> {
        if let Some(active) = self.current()? {
            if active >= seq {
                return Ok(Claim::Superseded { active });
            }
        }

        fs::write(&self.path, seq.to_string()).map_err(|e| GuardError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(Claim::Proceed)
    }

    /// Drop the claim; succeeds when there is none
    pub fn release(&self) -> Result<(), GuardError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GuardError::Remove {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Errors related to the sequence number file
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Failed to read seqnum file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Seqnum file '{path}' holds {content:?}, not a number")]
    Corrupt { path: PathBuf, content: String },

    #[error("Failed to write seqnum file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to delete seqnum file '{path}': {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard(dir: &TempDir) -> SequenceGuard {
        SequenceGuard::new(dir.path().join("docker-extension.seqnum"))
    }

    #[test]
    fn test_lower_or_equal_claims_are_superseded() {
        let temp_dir = TempDir::new().unwrap();
        let guard = guard(&temp_dir);

        assert_eq!(guard.claim(4).unwrap(), Claim::Proceed);
        assert_eq!(guard.claim(3).unwrap(), Claim::Superseded { active: 4 });
        assert_eq!(guard.claim(4).unwrap(), Claim::Superseded { active: 4 });
        assert_eq!(guard.current().unwrap(), Some(4));
    }

    #[test]
    fn test_higher_claim_proceeds() {
        let temp_dir = TempDir::new().unwrap();
        let guard = guard(&temp_dir);

        assert_eq!(guard.claim(4).unwrap(), Claim::Proceed);
        assert_eq!(guard.claim(5).unwrap(), Claim::Proceed);
        assert_eq!(fs::read_to_string(guard.path()).unwrap(), "5");
    }

    #[test]
    fn test_release_unblocks_any_number() {
        let temp_dir = TempDir::new().unwrap();
        let guard = guard(&temp_dir);

        guard.claim(4).unwrap();
        guard.release().unwrap();
        assert_eq!(guard.current().unwrap(), None);
        assert_eq!(guard.claim(0).unwrap(), Claim::Proceed);
    }

    #[test]
    fn test_release_without_claim() {
        let temp_dir = TempDir::new().unwrap();
        assert!(guard(&temp_dir).release().is_ok());
    }

    #[test]
    fn test_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let guard = guard(&temp_dir);
        fs::write(guard.path(), "four").unwrap();

        assert!(matches!(guard.claim(5), Err(GuardError::Corrupt { .. })));
    }
}
