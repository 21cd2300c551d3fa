//! Placement of the daemon's TLS material.

use crate::output::OutputManager;
use crate::settings::CertSettings;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

pub const CA_CERT: &str = "ca.pem";
pub const SERVER_CERT: &str = "cert.pem";
pub const SERVER_KEY: &str = "key.pem";

const OPERATION: &str = "certs";

/// Daemon flags enabling TLS verification with certificates under `dir`
pub fn tls_flags(dir: &Path) -> Vec<String> {
    vec![
        "--tlsverify".to_string(),
        format!("--tlscacert={}", dir.join(CA_CERT).display()),
        format!("--tlscert={}", dir.join(SERVER_CERT).display()),
        format!("--tlskey={}", dir.join(SERVER_KEY).display()),
    ]
}

/// Write the CA, server certificate and key into `dir`.
///
/// Nothing is written unless all three are provided. With `overwrite` off,
/// nothing is written when any of the files already exists. Returns whether
/// the files were written.
pub fn install_certs(
    certs: &CertSettings,
    dir: &Path,
    overwrite: bool,
    output: &OutputManager,
) -> Result<bool, CertsError> {
    let files = [
        (&certs.ca, dir.join(CA_CERT)),
        (&certs.cert, dir.join(SERVER_CERT)),
        (&certs.key, dir.join(SERVER_KEY)),
    ];

    if let Some((_, dst)) = files.iter().find(|(src, _)| src.is_empty()) {
        output.info(
            OPERATION,
            &format!(
                "{} is not provided in the extension settings, skipping docker certs installation",
                dst.display()
            ),
        );
        return Ok(false);
    }

    if !overwrite {
        if let Some((_, dst)) = files.iter().find(|(_, dst)| dst.exists()) {
            output.info(
                OPERATION,
                &format!("{} already exists, keeping existing certificates", dst.display()),
            );
            return Ok(false);
        }
    }

    fs::create_dir_all(dir).map_err(|e| CertsError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for (src, dst) in &files {
        write_private(dst, &decode(src))?;
    }
    Ok(true)
}

/// Base64 content is decoded; anything else is taken as the file content
fn decode(value: &str) -> Vec<u8> {
    let value = value.trim();
    STANDARD
        .decode(value)
        .unwrap_or_else(|_| value.as_bytes().to_vec())
}

fn write_private(path: &Path, content: &[u8]) -> Result<(), CertsError> {
    let write_err = |e: std::io::Error| CertsError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(write_err)?;
    file.write_all(content).map_err(write_err)
}

/// Errors related to certificate placement
#[derive(Debug, thiserror::Error)]
pub enum CertsError {
    #[error("Failed to create certificate directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write certificate '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn certs() -> CertSettings {
        CertSettings {
            ca: "Y2EtZGF0YQ==".to_string(),
            cert: "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".to_string(),
            key: "  a2V5LWRhdGE=\n".to_string(),
        }
    }

    #[test]
    fn test_install_decodes_or_keeps_raw() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("docker");
        let output = OutputManager::new(false);

        assert!(install_certs(&certs(), &dir, true, &output).unwrap());
        assert_eq!(fs::read(dir.join(CA_CERT)).unwrap(), b"ca-data");
        assert_eq!(
            fs::read_to_string(dir.join(SERVER_CERT)).unwrap(),
            "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----"
        );
        assert_eq!(fs::read(dir.join(SERVER_KEY)).unwrap(), b"key-data");

        let mode = fs::metadata(dir.join(SERVER_KEY)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_incomplete_certs_write_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let output = OutputManager::new(false);
        let mut partial = certs();
        partial.cert.clear();

        assert!(!install_certs(&partial, temp_dir.path(), true, &output).unwrap());
        assert!(!temp_dir.path().join(CA_CERT).exists());
    }

    #[test]
    fn test_existing_certs_kept_without_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let output = OutputManager::new(false);
        fs::write(temp_dir.path().join(CA_CERT), "old").unwrap();

        assert!(!install_certs(&certs(), temp_dir.path(), false, &output).unwrap());
        assert_eq!(fs::read_to_string(temp_dir.path().join(CA_CERT)).unwrap(), "old");
        assert!(!temp_dir.path().join(SERVER_KEY).exists());

        assert!(install_certs(&certs(), temp_dir.path(), true, &output).unwrap());
        assert_eq!(fs::read(temp_dir.path().join(CA_CERT)).unwrap(), b"ca-data");
    }

    #[test]
    fn test_tls_flags() {
        assert_eq!(
            tls_flags(Path::new("/etc/docker")),
            vec![
                "--tlsverify",
                "--tlscacert=/etc/docker/ca.pem",
                "--tlscert=/etc/docker/cert.pem",
                "--tlskey=/etc/docker/key.pem",
            ]
        );
    }
}
