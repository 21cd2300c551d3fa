use super::VmExtError;
use crate::exec::Runner;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory where the agent keeps the certificates protecting settings
pub const WAAGENT_DIR: &str = "/var/lib/waagent";

const SETTINGS_EXT: &str = "settings";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    runtime_settings: Vec<RuntimeSettings>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeSettings {
    handler_settings: HandlerSettingsSection,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct HandlerSettingsSection {
    protected_settings_cert_thumbprint: String,
    protected_settings: String,
    public_settings: Value,
}

/// The sequence number of the current run: the highest `N` among the
/// `N.settings` files in `config_folder`.
pub fn find_seq_num(config_folder: &Path) -> Result<u64, VmExtError> {
    let entries = fs::read_dir(config_folder).map_err(|e| VmExtError::Read {
        path: config_folder.to_path_buf(),
        source: e,
    })?;

    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension()? != SETTINGS_EXT {
                return None;
            }
            path.file_stem()?.to_str()?.parse::<u64>().ok()
        })
        .max()
        .ok_or_else(|| VmExtError::NoSettingsFile {
            dir: config_folder.to_path_buf(),
        })
}

/// Read `<config_folder>/<seq>.settings` and decode both settings sections.
///
/// Protected settings are a base64 PKCS#7 envelope encrypted for the
/// certificate named by the thumbprint; they are decrypted with openssl
/// using the key pair the agent keeps in `cert_dir`.
pub fn read_settings<Pub, Prot>(
    config_folder: &Path,
    seq: u64,
    cert_dir: &Path,
    runner: &dyn Runner,
) -> Result<(Pub, Prot), VmExtError>
where
    Pub: DeserializeOwned + Default,
    Prot: DeserializeOwned + Default,
{
    let path = config_folder.join(format!("{seq}.{SETTINGS_EXT}"));
    let content = fs::read(&path).map_err(|e| VmExtError::Read {
        path: path.clone(),
        source: e,
    })?;
    let file: SettingsFile = serde_json::from_slice(&content).map_err(|e| VmExtError::Parse {
        path: path.clone(),
        source: e,
    })?;

    let section = file
        .runtime_settings
        .into_iter()
        .next()
        .map(|rs| rs.handler_settings)
        .ok_or(VmExtError::NoRuntimeSettings { path })?;

    let public = match section.public_settings {
        Value::Null => Pub::default(),
        value => serde_json::from_value(value).map_err(|e| VmExtError::Settings {
            section: "public",
            source: e,
        })?,
    };

    let protected = if section.protected_settings.trim().is_empty() {
        Prot::default()
    } else {
        let plain = decrypt(
            &section.protected_settings,
            &section.protected_settings_cert_thumbprint,
            cert_dir,
            runner,
        )?;
        serde_json::from_slice(&plain).map_err(|e| VmExtError::Settings {
            section: "protected",
            source: e,
        })?
    };

    Ok((public, protected))
}

fn decrypt(
    encoded: &str,
    thumbprint: &str,
    cert_dir: &Path,
    runner: &dyn Runner,
) -> Result<Vec<u8>, VmExtError> {
    let envelope = STANDARD.decode(encoded.trim())?;
    let crt: PathBuf = cert_dir.join(format!("{thumbprint}.crt"));
    let prv: PathBuf = cert_dir.join(format!("{thumbprint}.prv"));

    let plain = runner.output_with_stdin(
        "openssl",
        &[
            "smime",
            "-inform",
            "DER",
            "-decrypt",
            "-recip",
            &crt.to_string_lossy(),
            "-inkey",
            &prv.to_string_lossy(),
        ],
        &envelope,
    )?;
    Ok(plain)
}
