//! Guest agent handler protocol: where the agent puts our configuration,
//! how settings are delivered and where status is reported.

mod handler_env;
mod ovf;
mod settings;
mod status;

pub use handler_env::HandlerEnvironment;
pub use ovf::{provisioned_user, OVF_ENV_PATH};
pub use settings::{find_seq_num, read_settings, WAAGENT_DIR};
pub use status::{save_status, StatusType};

use crate::exec::ExecError;
use std::path::PathBuf;

/// Errors related to the handler protocol files
#[derive(Debug, thiserror::Error)]
pub enum VmExtError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Handler environment '{path}' is empty")]
    EmptyHandlerEnvironment { path: PathBuf },

    #[error("No .settings file found in '{dir}'")]
    NoSettingsFile { dir: PathBuf },

    #[error("Settings file '{path}' has no runtimeSettings")]
    NoRuntimeSettings { path: PathBuf },

    #[error("Protected settings are not valid base64: {0}")]
    ProtectedEncoding(#[from] base64::DecodeError),

    #[error("Failed to decrypt protected settings: {0}")]
    Decrypt(#[from] ExecError),

    #[error("Failed to parse {section} settings: {source}")]
    Settings {
        section: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to write status file '{path}': {source}")]
    StatusWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Xml {
        path: PathBuf,
        source: quick_xml::Error,
    },

    #[error("No provisioned user name found in '{path}'")]
    NoUserName { path: PathBuf },
}
