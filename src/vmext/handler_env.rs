use super::VmExtError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Folders handed to the extension by the guest agent
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerEnvironment {
    pub log_folder: PathBuf,
    pub config_folder: PathBuf,
    pub status_folder: PathBuf,
}

#[derive(Deserialize)]
struct HandlerEnvironmentEntry {
    #[serde(rename = "handlerEnvironment")]
    handler_environment: HandlerEnvironment,
}

impl HandlerEnvironment {
    /// Load `HandlerEnvironment.json`, a single-element JSON array
    pub fn load(path: &Path) -> Result<Self, VmExtError> {
        let content = fs::read(path).map_err(|e| VmExtError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &[u8], path: &Path) -> Result<Self, VmExtError> {
        let entries: Vec<HandlerEnvironmentEntry> =
            serde_json::from_slice(content).map_err(|e| VmExtError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        entries
            .into_iter()
            .next()
            .map(|entry| entry.handler_environment)
            .ok_or_else(|| VmExtError::EmptyHandlerEnvironment {
                path: path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_handler_environment() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("HandlerEnvironment.json");
        fs::write(
            &path,
            r#"[{
  "name": "DockerExtension",
  "seqNo": "0",
  "version": 1.0,
  "handlerEnvironment": {
    "logFolder": "/var/log/azure/DockerExtension/1.2.0",
    "configFolder": "/var/lib/waagent/DockerExtension-1.2.0/config",
    "statusFolder": "/var/lib/waagent/DockerExtension-1.2.0/status",
    "heartbeatFile": "/var/lib/waagent/DockerExtension-1.2.0/heartbeat.log"
  }
}]"#,
        )
        .unwrap();

        let env = HandlerEnvironment::load(&path).unwrap();
        assert_eq!(env.log_folder, PathBuf::from("/var/log/azure/DockerExtension/1.2.0"));
        assert_eq!(
            env.config_folder,
            PathBuf::from("/var/lib/waagent/DockerExtension-1.2.0/config")
        );
        assert_eq!(
            env.status_folder,
            PathBuf::from("/var/lib/waagent/DockerExtension-1.2.0/status")
        );
    }

    #[test]
    fn test_empty_array_rejected() {
        let err = HandlerEnvironment::parse(b"[]", Path::new("HandlerEnvironment.json"))
            .unwrap_err();
        assert!(matches!(err, VmExtError::EmptyHandlerEnvironment { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = HandlerEnvironment::load(Path::new("/nonexistent/HandlerEnvironment.json"))
            .unwrap_err();
        assert!(matches!(err, VmExtError::Read { .. }));
    }
}
