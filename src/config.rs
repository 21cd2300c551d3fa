use crate::distro::{ReleaseFiles, CENTOS_RELEASE_PATH, LSB_RELEASE_PATH, REDHAT_RELEASE_PATH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/docker-extension/config.toml";

/// Environment variable overriding the location of HandlerEnvironment.json
pub const HANDLER_ENV_VAR: &str = "DOCKER_EXTENSION_HANDLER_ENV";

const SEQNUM_FILENAME: &str = "docker-extension.seqnum";

/// Configuration structure for the extension handler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub install: InstallConfig,
    pub daemon: DaemonConfig,
    pub certs: CertsConfig,
    pub compose: ComposeConfig,
    pub guard: GuardConfig,
    pub distro: DistroConfig,
}

/// Docker engine installation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Attempts before an install failure becomes fatal
    pub retries: u32,
    /// Seconds to sleep between attempts
    pub retry_interval_secs: u64,
    /// Where the install script and compose binary are fetched from
    pub mirror: Mirror,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            retries: 6,
            retry_interval_secs: 60,
            mirror: Mirror::Global,
        }
    }
}

/// Docker daemon handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Seconds to wait for the daemon to come up after (re)start
    pub settle_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { settle_secs: 3 }
    }
}

/// TLS certificate placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertsConfig {
    pub dir: PathBuf,
    /// Replace certificates that are already on disk
    pub overwrite: bool,
}

impl Default for CertsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/etc/docker"),
            overwrite: true,
        }
    }
}

/// Docker Compose bring-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub manifest_dir: PathBuf,
    /// Default for COMPOSE_HTTP_TIMEOUT
    pub timeout_secs: u64,
    /// Default for COMPOSE_PROJECT_NAME
    pub project: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("/etc/docker/compose"),
            timeout_secs: 600,
            project: "compose".to_string(),
        }
    }
}

/// Single-instance guard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub seqnum_file: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            seqnum_file: std::env::temp_dir().join(SEQNUM_FILENAME),
        }
    }
}

/// Release metadata files probed to identify the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistroConfig {
    pub lsb_release: PathBuf,
    pub centos_release: PathBuf,
    pub redhat_release: PathBuf,
}

impl Default for DistroConfig {
    fn default() -> Self {
        Self {
            lsb_release: PathBuf::from(LSB_RELEASE_PATH),
            centos_release: PathBuf::from(CENTOS_RELEASE_PATH),
            redhat_release: PathBuf::from(REDHAT_RELEASE_PATH),
        }
    }
}

impl DistroConfig {
    pub fn release_files(&self) -> ReleaseFiles {
        ReleaseFiles {
            lsb: self.lsb_release.clone(),
            centos: self.centos_release.clone(),
            redhat: self.redhat_release.clone(),
        }
    }
}

/// Download source for the engine install script and docker-compose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    #[default]
    Global,
    China,
}

impl Mirror {
    pub fn install_script_url(self) -> &'static str {
        match self {
            Mirror::Global => "https://get.docker.com/",
            // Same as get.docker.com with apt/yum repositories pointing at the mirror
            Mirror::China => "https://mirror.azure.cn/repo/install-docker-engine.sh",
        }
    }

    /// Shell invocation the install script is piped into
    pub fn script_shell(self) -> &'static str {
        match self {
            Mirror::Global => "sh",
            Mirror::China => "sh -s -- --mirror AzureChinaCloud",
        }
    }

    pub fn compose_url(self) -> &'static str {
        match self {
            Mirror::Global => {
                "https://github.com/docker/compose/releases/download/1.6.2/docker-compose-Linux-x86_64"
            }
            Mirror::China => {
                "https://mirror.azure.cn/docker-toolbox/linux/compose/1.6.2/docker-compose-Linux-x86_64"
            }
        }
    }
}

impl InstallConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl DaemonConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if file doesn't exist
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Load configuration from the default path or a custom path
    pub fn load_with_override(custom_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_path = custom_path.unwrap_or(DEFAULT_CONFIG_PATH);
        Self::load(config_path)
    }

    /// Location of HandlerEnvironment.json, checking the environment variable first.
    /// The agent places it one level above the directory holding the binary.
    pub fn handler_env_path(&self) -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(HANDLER_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let exe = std::env::current_exe().map_err(|e| ConfigError::Executable { source: e })?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("/"));
        Ok(dir.join("..").join("HandlerEnvironment.json"))
    }

    /// Save configuration to file (mainly for testing)
    #[cfg(test)]
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<(), ConfigError> {
        let path = config_path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize { source: e })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    FileWrite {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {source}")]
    Serialize { source: toml::ser::Error },

    #[error("Cannot locate the running executable: {source}")]
    Executable { source: std::io::Error },
}
