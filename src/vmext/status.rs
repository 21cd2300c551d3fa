use super::VmExtError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const STATUS_VERSION: f64 = 1.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Status values understood by the guest agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    Transitioning,
    Error,
    Success,
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusType::Transitioning => "transitioning",
            StatusType::Error => "error",
            StatusType::Success => "success",
        };
        f.write_str(s)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport<'a> {
    version: f64,
    #[serde(rename = "timestampUTC")]
    timestamp_utc: String,
    status: StatusBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    operation: &'a str,
    status: StatusType,
    formatted_message: FormattedMessage<'a>,
}

#[derive(Serialize)]
struct FormattedMessage<'a> {
    lang: &'static str,
    message: &'a str,
}

/// Write `<dir>/<seq>.status`, replacing any previous report for `seq`
pub fn save_status(
    dir: &Path,
    seq: u64,
    status: StatusType,
    operation: &str,
    message: &str,
) -> Result<PathBuf, VmExtError> {
    save_status_at(dir, seq, status, operation, message, Utc::now())
}

fn save_status_at(
    dir: &Path,
    seq: u64,
    status: StatusType,
    operation: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<PathBuf, VmExtError> {
    let report = [StatusReport {
        version: STATUS_VERSION,
        timestamp_utc: now.format(TIMESTAMP_FORMAT).to_string(),
        status: StatusBody {
            operation,
            status,
            formatted_message: FormattedMessage {
                lang: "en",
                message,
            },
        },
    }];

    let path = dir.join(format!("{seq}.status"));
    let content = serde_json::to_vec(&report).map_err(|e| VmExtError::Parse {
        path: path.clone(),
        source: e,
    })?;
    fs::write(&path, content).map_err(|e| VmExtError::StatusWrite {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;
    use tempfile::TempDir;

    #[test]
    fn test_status_document_shape() {
        let temp_dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2016, 3, 1, 12, 30, 5).unwrap();
        let path = save_status_at(
            temp_dir.path(),
            7,
            StatusType::Error,
            "Enable Docker",
            "Enable Docker failed: boom",
            now,
        )
        .unwrap();

        assert_eq!(path, temp_dir.path().join("7.status"));
        let doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let entry = &doc.as_array().unwrap()[0];
        assert_eq!(entry["version"], 1.0);
        assert_eq!(entry["timestampUTC"], "2016-03-01T12:30:05Z");
        assert_eq!(entry["status"]["operation"], "Enable Docker");
        assert_eq!(entry["status"]["status"], "error");
        assert_eq!(entry["status"]["formattedMessage"]["lang"], "en");
        assert_eq!(
            entry["status"]["formattedMessage"]["message"],
            "Enable Docker failed: boom"
        );
    }

    #[test]
    fn test_status_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        save_status(temp_dir.path(), 1, StatusType::Transitioning, "Enable Docker", "Enable Docker").unwrap();
        let path = save_status(
            temp_dir.path(),
            1,
            StatusType::Success,
            "Enable Docker",
            "Enable Docker succeeded",
        )
        .unwrap();

        let doc: Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(doc.as_array().unwrap().len(), 1);
        assert_eq!(doc[0]["status"]["status"], "success");
    }

    #[test]
    fn test_missing_status_folder() {
        let temp_dir = TempDir::new().unwrap();
        let result = save_status(
            &temp_dir.path().join("missing"),
            0,
            StatusType::Success,
            "Disabling Docker",
            "Disabling Docker succeeded",
        );
        assert!(matches!(result, Err(VmExtError::StatusWrite { .. })));
    }

    #[test]
    fn test_status_type_display() {
        assert_eq!(StatusType::Transitioning.to_string(), "transitioning");
        assert_eq!(StatusType::Success.to_string(), "success");
    }
}
