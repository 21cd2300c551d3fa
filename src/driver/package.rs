//! Package strategies: installing and removing the Docker engine.

use super::DriverError;
use crate::config::Mirror;
use crate::exec::Runner;
use std::path::{Path, PathBuf};

/// How a driver installs the engine and where Docker Compose lives
pub trait PackageManager {
    fn install(&self, runner: &dyn Runner, mirror: Mirror) -> Result<(), DriverError>;
    fn uninstall(&self, runner: &dyn Runner) -> Result<(), DriverError>;

    /// Directory the docker-compose binary is installed into
    fn compose_dir(&self) -> &Path;
}

/// Debian family: install script fetched with wget, removal through apt
#[derive(Debug, Clone)]
pub struct Apt {
    pub compose_dir: PathBuf,
}

impl PackageManager for Apt {
    fn install(&self, runner: &dyn Runner, mirror: Mirror) -> Result<(), DriverError> {
        let script = format!(
            "wget -qO- {} | {}",
            mirror.install_script_url(),
            mirror.script_shell()
        );
        Ok(runner.stream("/bin/sh", &["-c", &script])?)
    }

    fn uninstall(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        runner.stream("apt-get", &["-qqy", "purge", "docker-engine"])?;
        Ok(runner.stream("apt-get", &["-qqy", "autoremove"])?)
    }

    fn compose_dir(&self) -> &Path {
        &self.compose_dir
    }
}

/// RHEL family: install script fetched with curl, removal through yum
#[derive(Debug, Clone)]
pub struct Yum {
    pub compose_dir: PathBuf,
}

impl PackageManager for Yum {
    fn install(&self, runner: &dyn Runner, mirror: Mirror) -> Result<(), DriverError> {
        let script = format!(
            "curl -sSL {} | {}",
            mirror.install_script_url(),
            mirror.script_shell()
        );
        Ok(runner.stream("/bin/sh", &["-c", &script])?)
    }

    fn uninstall(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(runner.stream("yum", &["-y", "-q", "remove", "docker-engine.x86_64"])?)
    }

    fn compose_dir(&self) -> &Path {
        &self.compose_dir
    }
}

/// Hosts that ship the engine as part of the image; nothing to install
#[derive(Debug, Clone)]
pub struct Preinstalled {
    pub compose_dir: PathBuf,
}

impl PackageManager for Preinstalled {
    fn install(&self, _runner: &dyn Runner, _mirror: Mirror) -> Result<(), DriverError> {
        Ok(())
    }

    fn uninstall(&self, _runner: &dyn Runner) -> Result<(), DriverError> {
        Ok(())
    }

    fn compose_dir(&self) -> &Path {
        &self.compose_dir
    }
}
