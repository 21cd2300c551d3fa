//! Init-system strategies: service control and persistence of daemon args.

use super::DriverError;
use crate::dockeropts::{rewrite_opts, SystemdUnitEditor, UpstartCfgEditor};
use crate::exec::Runner;
use std::fs;
use std::path::{Path, PathBuf};

pub const SYSTEMD_UNIT_PATH: &str = "/lib/systemd/system/docker.service";
pub const UPSTART_DEFAULTS_PATH: &str = "/etc/default/docker";
pub const SYSTEMD_DROP_IN_DIR: &str = "/run/systemd/system/docker.service.d";
pub const SYSTEMD_DROP_IN_FILE: &str = "10-docker-extension.conf";

pub const SOCKET_ACTIVATION: &str = "-H=fd://";
pub const UNIX_SOCKET: &str = "-H=unix://";

/// How a driver controls the Docker service and persists its start arguments
pub trait InitSystem {
    fn start(&self, runner: &dyn Runner) -> Result<(), DriverError>;
    fn stop(&self, runner: &dyn Runner) -> Result<(), DriverError>;
    fn restart(&self, runner: &dyn Runner) -> Result<(), DriverError>;

    /// Minimal flags the daemon needs under this init system
    fn base_opts(&self) -> Vec<String>;

    /// Persist `args`; returns whether the daemon must be restarted
    fn update_args(&self, args: &str) -> Result<bool, DriverError>;
}

/// Upstart with the arguments kept in `/etc/default/docker`
#[derive(Debug, Clone)]
pub struct Upstart {
    pub defaults_file: PathBuf,
}

impl Default for Upstart {
    fn default() -> Self {
        Self {
            defaults_file: PathBuf::from(UPSTART_DEFAULTS_PATH),
        }
    }
}

impl InitSystem for Upstart {
    fn start(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(runner.stream("service", &["docker", "start"])?)
    }

    fn stop(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(runner.stream("service", &["docker", "stop"])?)
    }

    fn restart(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        runner.stream("update-rc.d", &["docker", "defaults"])?;
        Ok(runner.stream("service", &["docker", "restart"])?)
    }

    fn base_opts(&self) -> Vec<String> {
        vec![UNIX_SOCKET.to_string()]
    }

    fn update_args(&self, args: &str) -> Result<bool, DriverError> {
        Ok(rewrite_opts(&UpstartCfgEditor, &self.defaults_file, args)?)
    }
}

/// Where a systemd host keeps the daemon arguments
#[derive(Debug, Clone)]
pub enum ArgsTarget {
    /// Rewrite `ExecStart=` of the packaged unit file in place
    Unit(PathBuf),
    /// Own a drop-in file that sets `DOCKER_OPTS` for the stock unit
    DropIn(PathBuf),
}

/// systemd; `base_opts` differs between distros that ship socket activation
/// and those that do not.
#[derive(Debug, Clone)]
pub struct Systemd {
    pub base_opts: Vec<&'static str>,
    pub target: ArgsTarget,
}

impl Systemd {
    /// Unit-overwrite flavour with socket activation
    pub fn unit_overwrite() -> Self {
        Self {
            base_opts: vec!["daemon", SOCKET_ACTIVATION],
            target: ArgsTarget::Unit(PathBuf::from(SYSTEMD_UNIT_PATH)),
        }
    }

    /// Unit-overwrite flavour listening on the unix socket only; the
    /// get.docker.com packages for RHEL-family hosts ship no docker.socket.
    pub fn unit_overwrite_unix_socket() -> Self {
        Self {
            base_opts: vec![UNIX_SOCKET],
            ..Self::unit_overwrite()
        }
    }

    /// Drop-in flavour for hosts where /lib is read-only
    pub fn drop_in() -> Self {
        Self {
            base_opts: Vec::new(),
            target: ArgsTarget::DropIn(
                PathBuf::from(SYSTEMD_DROP_IN_DIR).join(SYSTEMD_DROP_IN_FILE),
            ),
        }
    }
}

impl InitSystem for Systemd {
    fn start(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(runner.stream("systemctl", &["start", "docker"])?)
    }

    fn stop(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(runner.stream("systemctl", &["stop", "docker"])?)
    }

    fn restart(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        runner.stream("systemctl", &["daemon-reload"])?;
        Ok(runner.stream("systemctl", &["restart", "docker"])?)
    }

    fn base_opts(&self) -> Vec<String> {
        self.base_opts.iter().map(|s| s.to_string()).collect()
    }

    fn update_args(&self, args: &str) -> Result<bool, DriverError> {
        match &self.target {
            ArgsTarget::Unit(path) => Ok(rewrite_opts(&SystemdUnitEditor, path, args)?),
            ArgsTarget::DropIn(path) => write_drop_in(path, args),
        }
    }
}

/// Write the drop-in unless it already holds exactly this configuration
fn write_drop_in(path: &Path, args: &str) -> Result<bool, DriverError> {
    let config = format!("[Service]\nEnvironment=\"DOCKER_OPTS={args}\"");

    if path.exists() {
        let existing = fs::read_to_string(path).map_err(|e| DriverError::DropIn {
            path: path.to_path_buf(),
            source: e,
        })?;
        if existing == config {
            return Ok(false);
        }
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| DriverError::DropIn {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, config).map_err(|e| DriverError::DropIn {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}
