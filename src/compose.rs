//! Docker Compose: binary installation and `docker-compose up`.

use crate::config::ComposeConfig;
use crate::exec::{ExecError, Runner};
use crate::output::OutputManager;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

pub const COMPOSE_BIN: &str = "docker-compose";
pub const COMPOSE_YML: &str = "docker-compose.yml";

pub const ENV_HTTP_TIMEOUT: &str = "COMPOSE_HTTP_TIMEOUT";
pub const ENV_PROJECT_NAME: &str = "COMPOSE_PROJECT_NAME";

const OPERATION: &str = "compose";

/// Where the docker-compose binary lives inside a driver's compose directory
pub fn compose_bin_path(compose_dir: &Path) -> PathBuf {
    compose_dir.join(COMPOSE_BIN)
}

/// Download docker-compose to `path` unless it is already there.
/// Returns whether a download happened.
pub fn install_compose(path: &Path, url: &str, output: &OutputManager) -> Result<bool, ComposeError> {
    if path.exists() {
        output.info(
            OPERATION,
            &format!("docker-compose is already installed at {}", path.display()),
        );
        return Ok(false);
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| ComposeError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    output.info(OPERATION, &format!("Downloading compose from {url}"));
    let response = ureq::get(url).call().map_err(|e| ComposeError::Download {
        url: url.to_string(),
        source: e,
    })?;

    save_executable(path, response.into_body().into_reader())?;
    Ok(true)
}

/// Stream `body` into an executable at `path`.
///
/// The data lands in `<path>.part` first and is renamed into place once
/// complete; a failed transfer removes the partial file.
fn save_executable<R: Read>(path: &Path, mut body: R) -> Result<(), ComposeError> {
    let partial = path.with_extension("part");
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o755)
        .open(&partial)
        .and_then(|mut file| io::copy(&mut body, &mut file));

    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(ComposeError::Io {
            path: partial,
            source: e,
        });
    }

    fs::rename(&partial, path).map_err(|e| ComposeError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Remove the docker-compose binary; a missing binary is not an error
pub fn remove_compose(path: &Path) -> Result<(), ComposeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ComposeError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Render the compose mapping as YAML, keeping the key order it was given in
pub fn compose_yaml(compose: &Map<String, Value>) -> Result<String, ComposeError> {
    Ok(serde_yaml_ng::to_string(compose)?)
}

/// Public variables with the default timeout and project name filled in
pub fn public_env(
    vars: &BTreeMap<String, String>,
    config: &ComposeConfig,
) -> BTreeMap<String, String> {
    let mut env = vars.clone();
    env.entry(ENV_HTTP_TIMEOUT.to_string())
        .or_insert_with(|| config.timeout_secs.to_string());
    env.entry(ENV_PROJECT_NAME.to_string())
        .or_insert_with(|| config.project.clone());
    env
}

/// Inputs of one `docker-compose up` run
pub struct ComposeUp<'a> {
    pub compose: &'a Map<String, Value>,
    pub public_env: &'a BTreeMap<String, String>,
    pub protected_env: &'a BTreeMap<String, String>,
}

impl ComposeUp<'_> {
    /// Write the manifest and bring the services up in the background.
    /// Returns `Ok(false)` when no compose mapping was configured.
    pub fn run(
        &self,
        bin: &Path,
        config: &ComposeConfig,
        runner: &dyn Runner,
        output: &OutputManager,
    ) -> Result<bool, ComposeError> {
        if self.compose.is_empty() {
            output.info(OPERATION, "docker-compose config not specified, noop");
            return Ok(false);
        }

        let yaml = compose_yaml(self.compose)?;
        fs::create_dir_all(&config.manifest_dir).map_err(|e| ComposeError::Io {
            path: config.manifest_dir.clone(),
            source: e,
        })?;
        output.progress(&format!("Using compose yaml:>>>>>\n{yaml}\n<<<<<"));

        let yml_path = config.manifest_dir.join(COMPOSE_YML);
        fs::write(&yml_path, &yaml).map_err(|e| ComposeError::Io {
            path: yml_path.clone(),
            source: e,
        })?;

        let mut env = public_env(self.public_env, config);
        for (key, value) in &env {
            output.progress(&format!(
                "Setting docker-compose environment variable {key:?}={value:?}."
            ));
        }
        for (key, value) in self.protected_env {
            output.progress(&format!(
                "Setting protected docker-compose environment variable {key:?}."
            ));
            env.insert(key.clone(), value.clone());
        }

        runner.stream_with_env(
            &bin.to_string_lossy(),
            &["-f", &yml_path.to_string_lossy(), "up", "-d"],
            &env,
        )?;
        Ok(true)
    }
}

/// Errors related to Docker Compose
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Error downloading docker-compose from {url}: {source}")]
    Download { url: String, source: ureq::Error },

    #[error("I/O error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Error converting to compose.yml: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("'docker-compose up' failed: {0}")]
    Up(#[from] ExecError),
}
