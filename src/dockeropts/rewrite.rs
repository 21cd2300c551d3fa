use super::{EditError, Editor};
use std::fs;
use std::path::{Path, PathBuf};

/// Apply `editor` to the file at `path` with the desired `args`.
///
/// The file must already exist (it ships with the Docker package). The
/// result is compared byte-for-byte against what is on disk right before
/// writing; when they match nothing is written and `Ok(false)` is returned,
/// so callers can skip restarting the daemon.
pub fn rewrite_opts(editor: &dyn Editor, path: &Path, args: &str) -> Result<bool, RewriteError> {
    let current = fs::read_to_string(path).map_err(|e| RewriteError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let updated = editor
        .change_opts(&current, args)
        .map_err(|e| RewriteError::Edit {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Re-read in case another writer touched the file while we were editing.
    if path.exists() {
        let existing = fs::read(path).map_err(|e| RewriteError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        if existing == updated.as_bytes() {
            return Ok(false);
        }
    }

    fs::write(path, updated).map_err(|e| RewriteError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}

/// Errors raised while rewriting a daemon configuration file
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to update settings at '{path}': {source}")]
    Edit { path: PathBuf, source: EditError },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dockeropts::{SystemdUnitEditor, UpstartCfgEditor};
    use tempfile::TempDir;

    #[test]
    fn test_second_rewrite_needs_no_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docker.service");
        fs::write(&path, "[Service]\nExecStart=/usr/bin/docker -d\n").unwrap();

        let first = rewrite_opts(&SystemdUnitEditor, &path, "daemon -H=fd://").unwrap();
        let after_first = fs::read_to_string(&path).unwrap();
        let second = rewrite_opts(&SystemdUnitEditor, &path, "daemon -H=fd://").unwrap();
        let after_second = fs::read_to_string(&path).unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(after_first, after_second);
        assert_eq!(after_first, "[Service]\nExecStart=/usr/bin/docker daemon -H=fd://\n");
    }

    #[test]
    fn test_changed_args_trigger_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docker");
        fs::write(&path, "DOCKER_OPTS=\"-H=unix://\"").unwrap();

        assert!(!rewrite_opts(&UpstartCfgEditor, &path, "-H=unix://").unwrap());
        assert!(rewrite_opts(&UpstartCfgEditor, &path, "-H=unix:// -H=0.0.0.0:2376").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "DOCKER_OPTS=\"-H=unix:// -H=0.0.0.0:2376\""
        );
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.service");

        let err = rewrite_opts(&SystemdUnitEditor, &path, "--tlsverify").unwrap_err();
        assert!(matches!(err, RewriteError::Read { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_editor_failure_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docker.service");
        fs::write(&path, "[Service]\n").unwrap();

        let err = rewrite_opts(&SystemdUnitEditor, &path, "--tlsverify").unwrap_err();
        assert!(matches!(err, RewriteError::Edit { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[Service]\n");
    }
}
