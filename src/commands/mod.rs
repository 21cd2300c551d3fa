//! Handler operations invoked by the guest agent.

pub mod disable;
pub mod enable;
pub mod install;
pub mod uninstall;
pub mod update;

use crate::certs::CertsError;
use crate::compose::ComposeError;
use crate::config::Config;
use crate::driver::{DistroDriver, DriverError};
use crate::exec::{ExecError, Runner};
use crate::output::OutputManager;
use crate::vmext::{HandlerEnvironment, VmExtError};
use std::path::PathBuf;

/// Name of the run log inside the agent's log folder
pub const LOG_FILENAME: &str = "docker-extension.log";

/// Operations the agent can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Uninstall,
    Enable,
    Update,
    Disable,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Install,
        Operation::Uninstall,
        Operation::Enable,
        Operation::Update,
        Operation::Disable,
    ];

    /// Command line name
    pub fn name(self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Uninstall => "uninstall",
            Operation::Enable => "enable",
            Operation::Update => "update",
            Operation::Disable => "disable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Name shown in status reports
    pub fn description(self) -> &'static str {
        match self {
            Operation::Install => "Install Docker",
            Operation::Uninstall => "Uninstall Docker",
            Operation::Enable => "Enable Docker",
            Operation::Update => "Updating Docker",
            Operation::Disable => "Disabling Docker",
        }
    }

    /// Whether the outcome is written to the `.status` file
    pub fn reports_status(self) -> bool {
        matches!(
            self,
            Operation::Enable | Operation::Update | Operation::Disable
        )
    }

    pub fn run(self, ctx: &Context<'_>, driver: &dyn DistroDriver) -> Result<(), OpError> {
        match self {
            Operation::Install => install::run(ctx, driver),
            Operation::Uninstall => uninstall::run(ctx, driver),
            Operation::Enable => enable::run(ctx, driver),
            Operation::Update => update::run(ctx, driver),
            Operation::Disable => disable::run(ctx, driver),
        }
    }
}

/// Everything an operation needs besides the driver
pub struct Context<'a> {
    pub config: &'a Config,
    pub output: &'a OutputManager,
    pub runner: &'a dyn Runner,
    pub handler_env: &'a HandlerEnvironment,
    pub seq: u64,
    /// Directory holding the certificates that protect the settings
    pub waagent_dir: PathBuf,
    /// Provisioning document naming the VM's admin user
    pub ovf_env: PathBuf,
}

/// Errors that abort an operation
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Error installing docker after {attempts} attempts: {source}")]
    InstallExhausted { attempts: u32, source: DriverError },

    #[error("Error reading handler settings: {0}")]
    Settings(#[from] VmExtError),

    #[error("Failed to get provisioned user: {0}")]
    ProvisionedUser(VmExtError),

    #[error("Failed to add user to the docker group: {0}")]
    Usermod(ExecError),

    #[error("Error installing docker certs: {0}")]
    Certs(#[from] CertsError),

    #[error("Failed to update dockeropts: {0}")]
    DockerOpts(DriverError),

    #[error("'docker login' failed")]
    Login,

    #[error("Error installing docker-compose: {0}")]
    ComposeInstall(ComposeError),

    #[error("{source}. Check logs at {log}.")]
    ComposeUp { source: ComposeError, log: PathBuf },

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tempfile::TempDir;

    /// Handler folders, configuration and output rooted in a temporary directory
    pub struct Fixture {
        pub dir: TempDir,
        pub config: Config,
        pub output: OutputManager,
        pub handler_env: HandlerEnvironment,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            let handler_env = HandlerEnvironment {
                log_folder: root.join("log"),
                config_folder: root.join("config"),
                status_folder: root.join("status"),
            };
            for folder in [
                &handler_env.log_folder,
                &handler_env.config_folder,
                &handler_env.status_folder,
            ] {
                std::fs::create_dir_all(folder).unwrap();
            }

            let mut config = Config::default();
            config.install.retries = 3;
            config.install.retry_interval_secs = 0;
            config.daemon.settle_secs = 0;
            config.certs.dir = root.join("docker");
            config.compose.manifest_dir = root.join("compose");
            config.guard.seqnum_file = root.join("docker-extension.seqnum");

            let output = OutputManager::new(false)
                .with_log_file(&handler_env.log_folder.join(LOG_FILENAME))
                .unwrap();

            Self {
                dir,
                config,
                output,
                handler_env,
            }
        }

        pub fn context<'a>(&'a self, runner: &'a dyn Runner) -> Context<'a> {
            Context {
                config: &self.config,
                output: &self.output,
                runner,
                handler_env: &self.handler_env,
                seq: 0,
                waagent_dir: self.dir.path().join("waagent"),
                ovf_env: self.dir.path().join("waagent").join("ovf-env.xml"),
            }
        }

        pub fn log(&self) -> String {
            std::fs::read_to_string(self.handler_env.log_folder.join(LOG_FILENAME)).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("restart"), None);
    }

    #[test]
    fn test_status_reporting_operations() {
        let reporting: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| op.reports_status())
            .map(Operation::name)
            .collect();
        assert_eq!(reporting, vec!["enable", "update", "disable"]);
    }
}
