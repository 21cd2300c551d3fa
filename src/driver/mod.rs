//! Distro drivers.
//!
//! A driver is a fixed pairing of an [`InitSystem`] strategy (service
//! control, daemon argument persistence) with a [`PackageManager`] strategy
//! (engine install/removal, compose location). [`select`] maps a detected
//! distribution onto one of the supported pairings.

mod init;
mod package;

pub use init::{InitSystem, Systemd, Upstart};
pub use package::{Apt, PackageManager, Preinstalled, Yum};

use crate::config::Mirror;
use crate::distro::{DistroInfo, CENTOS_ID, RHEL_ID};
use crate::dockeropts::RewriteError;
use crate::exec::{ExecError, Runner};
use std::path::{Path, PathBuf};

/// Distribution ids reported by container-optimized hosts
pub const COREOS_IDS: &[&str] = &["CoreOS", "Container Linux by CoreOS"];

/// Operations every distro driver provides
pub trait DistroDriver {
    /// Human readable driver name, used in logs
    fn name(&self) -> &str;

    fn install(&self, runner: &dyn Runner, mirror: Mirror) -> Result<(), DriverError>;
    fn uninstall(&self, runner: &dyn Runner) -> Result<(), DriverError>;

    fn start(&self, runner: &dyn Runner) -> Result<(), DriverError>;
    fn stop(&self, runner: &dyn Runner) -> Result<(), DriverError>;
    fn restart(&self, runner: &dyn Runner) -> Result<(), DriverError>;

    fn base_opts(&self) -> Vec<String>;

    /// Persist the daemon arguments; `Ok(true)` when a restart is required
    fn update_args(&self, args: &str) -> Result<bool, DriverError>;

    fn compose_dir(&self) -> &Path;
}

/// A driver assembled from an init-system and a package strategy
#[derive(Debug, Clone)]
pub struct Driver<I, P> {
    name: &'static str,
    init: I,
    packages: P,
}

impl<I: InitSystem, P: PackageManager> Driver<I, P> {
    pub fn new(name: &'static str, init: I, packages: P) -> Self {
        Self {
            name,
            init,
            packages,
        }
    }
}

impl<I: InitSystem, P: PackageManager> DistroDriver for Driver<I, P> {
    fn name(&self) -> &str {
        self.name
    }

    fn install(&self, runner: &dyn Runner, mirror: Mirror) -> Result<(), DriverError> {
        self.packages.install(runner, mirror)
    }

    fn uninstall(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        self.packages.uninstall(runner)
    }

    fn start(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        self.init.start(runner)
    }

    fn stop(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        self.init.stop(runner)
    }

    fn restart(&self, runner: &dyn Runner) -> Result<(), DriverError> {
        self.init.restart(runner)
    }

    fn base_opts(&self) -> Vec<String> {
        self.init.base_opts()
    }

    fn update_args(&self, args: &str) -> Result<bool, DriverError> {
        self.init.update_args(args)
    }

    fn compose_dir(&self) -> &Path {
        self.packages.compose_dir()
    }
}

pub fn ubuntu_upstart() -> Driver<Upstart, Apt> {
    Driver::new(
        "ubuntu-upstart",
        Upstart::default(),
        Apt {
            compose_dir: PathBuf::from("/usr/local/bin"),
        },
    )
}

pub fn ubuntu_systemd() -> Driver<Systemd, Apt> {
    Driver::new(
        "ubuntu-systemd",
        Systemd::unit_overwrite(),
        Apt {
            compose_dir: PathBuf::from("/usr/local/bin"),
        },
    )
}

pub fn centos() -> Driver<Systemd, Yum> {
    Driver::new(
        "centos",
        Systemd::unit_overwrite_unix_socket(),
        Yum {
            compose_dir: PathBuf::from("/usr/local/bin"),
        },
    )
}

/// RHEL does not have /usr/local/bin on $PATH, unlike CentOS
pub fn rhel() -> Driver<Systemd, Yum> {
    Driver::new(
        "rhel",
        Systemd::unit_overwrite_unix_socket(),
        Yum {
            compose_dir: PathBuf::from("/usr/bin"),
        },
    )
}

pub fn coreos() -> Driver<Systemd, Preinstalled> {
    Driver::new(
        "coreos",
        Systemd::drop_in(),
        Preinstalled {
            compose_dir: PathBuf::from("/opt/bin"),
        },
    )
}

/// Pick the driver for a detected distribution
pub fn select(info: &DistroInfo) -> Result<Box<dyn DistroDriver>, DriverError> {
    let id = info.id.as_str();

    if COREOS_IDS.contains(&id) {
        return Ok(Box::new(coreos()));
    }

    if id == "Ubuntu" {
        let major = info
            .release
            .split('.')
            .next()
            .and_then(|m| m.parse::<u32>().ok())
            .ok_or_else(|| DriverError::InvalidVersion {
                distro: info.to_string(),
            })?;

        // 13.x and 14.x ship upstart, 15.04 onwards systemd
        return match major {
            0..=12 => Err(DriverError::UnsupportedVersion {
                distro: info.to_string(),
            }),
            13 | 14 => Ok(Box::new(ubuntu_upstart())),
            _ => Ok(Box::new(ubuntu_systemd())),
        };
    }

    match id {
        RHEL_ID => Ok(Box::new(rhel())),
        CENTOS_ID => Ok(Box::new(centos())),
        _ => Err(DriverError::UnsupportedDistro {
            distro: info.to_string(),
        }),
    }
}

/// Errors raised by distro drivers
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Distro not supported: {distro}")]
    UnsupportedDistro { distro: String },

    #[error("Ubuntu 12 or older not supported. Got: {distro}")]
    UnsupportedVersion { distro: String },

    #[error("Can't parse version number of {distro}")]
    InvalidVersion { distro: String },

    #[error(transparent)]
    Command(#[from] ExecError),

    #[error("Failed to update DOCKER_OPTS: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Failed to write systemd drop-in '{path}': {source}")]
    DropIn {
        path: PathBuf,
        source: std::io::Error,
    },
}
