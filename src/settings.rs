//! Typed handler settings for the Docker extension.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Settings delivered in clear text
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicSettings {
    pub docker: DockerEngineSettings,
    /// docker-compose.yml content expressed as JSON; key order is kept
    pub compose: Map<String, Value>,
    #[serde(rename = "compose-environment")]
    pub compose_environment: BTreeMap<String, String>,
}

/// Settings delivered encrypted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProtectedSettings {
    pub certs: CertSettings,
    pub login: LoginSettings,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DockerEngineSettings {
    pub port: String,
    pub options: Vec<String>,
}

/// Base64 (or PEM) encoded TLS material for the daemon
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CertSettings {
    pub ca: String,
    pub cert: String,
    pub key: String,
}

impl CertSettings {
    pub fn is_complete(&self) -> bool {
        !self.ca.is_empty() && !self.cert.is_empty() && !self.key.is_empty()
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub server: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

impl LoginSettings {
    pub fn is_present(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for LoginSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginSettings")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Both settings sections of one run
#[derive(Debug, Clone, Default)]
pub struct HandlerSettings {
    pub public: PublicSettings,
    pub protected: ProtectedSettings,
}

impl From<(PublicSettings, ProtectedSettings)> for HandlerSettings {
    fn from((public, protected): (PublicSettings, ProtectedSettings)) -> Self {
        Self { public, protected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_settings() {
        let public: PublicSettings = serde_json::from_str(
            r#"{
                "docker": {"port": "2376", "options": ["--debug", "--label=env=test"]},
                "compose": {"web": {"image": "nginx"}, "db": {"image": "postgres"}},
                "compose-environment": {"COMPOSE_PROJECT_NAME": "site"}
            }"#,
        )
        .unwrap();

        assert_eq!(public.docker.port, "2376");
        assert_eq!(public.docker.options, vec!["--debug", "--label=env=test"]);
        assert_eq!(public.compose.keys().collect::<Vec<_>>(), vec!["web", "db"]);
        assert_eq!(public.compose_environment["COMPOSE_PROJECT_NAME"], "site");
    }

    #[test]
    fn test_empty_public_settings() {
        let public: PublicSettings = serde_json::from_str("{}").unwrap();
        assert!(public.docker.port.is_empty());
        assert!(public.docker.options.is_empty());
        assert!(public.compose.is_empty());
    }

    #[test]
    fn test_certs_need_all_three() {
        let mut certs = CertSettings {
            ca: "Y2E=".to_string(),
            cert: "Y2VydA==".to_string(),
            key: String::new(),
        };
        assert!(!certs.is_complete());
        certs.key = "a2V5".to_string();
        assert!(certs.is_complete());
    }

    #[test]
    fn test_login_presence() {
        let login: LoginSettings =
            serde_json::from_str(r#"{"username": "u", "email": "u@example.com"}"#).unwrap();
        assert!(!login.is_present());

        let login: LoginSettings =
            serde_json::from_str(r#"{"username": "u", "password": "p"}"#).unwrap();
        assert!(login.is_present());
        assert!(!format!("{login:?}").contains("\"p\""));
    }

    #[test]
    fn test_protected_settings() {
        let protected: ProtectedSettings = serde_json::from_str(
            r#"{"certs": {"ca": "a", "cert": "b", "key": "c"}, "environment": {"DB_PASSWORD": "s3cret"}}"#,
        )
        .unwrap();
        assert!(protected.certs.is_complete());
        assert!(!protected.login.is_present());
        assert_eq!(protected.environment["DB_PASSWORD"], "s3cret");
    }
}
