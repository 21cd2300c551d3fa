//! Editors for the Docker daemon start arguments (a.k.a. `DOCKER_OPTS`).
//!
//! Each init system keeps the daemon flags in a different file format. An
//! [`Editor`] knows how to rewrite one of those formats in memory; the
//! [`rewrite_opts`] coordinator applies an editor to a file on disk and only
//! touches the file when the outcome differs from what is already there.

mod rewrite;
mod systemd;
mod upstart;

pub use rewrite::{rewrite_opts, RewriteError};
pub use systemd::SystemdUnitEditor;
pub use upstart::UpstartCfgEditor;

/// Rewrites the daemon start arguments inside an init configuration document.
///
/// Implementations are pure and deterministic: applying the same `args`
/// twice yields the same document as applying them once.
pub trait Editor {
    fn change_opts(&self, contents: &str, args: &str) -> Result<String, EditError>;
}

/// Errors raised while editing a configuration document
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Directive '{directive}' not found in configuration")]
    DirectiveNotFound { directive: &'static str },
}
