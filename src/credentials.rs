//! Credential snapshot: the session cookies captured once after an
//! interactive login and replayed on every later run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch. Browsers report fractional values.
    #[serde(default)]
    pub expiry: Option<f64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl StoredCookie {
    /// Expiry truncated to whole seconds, as the browser expects it back.
    /// Session cookies (no expiry or a negative sentinel) stay `None`.
    pub fn normalized_expiry(&self) -> Option<i64> {
        self.expiry
            .filter(|e| e.is_finite() && *e > 0.0)
            .map(|e| e.trunc() as i64)
    }

    /// Whether this cookie may be set while the browser is on `host`.
    ///
    /// Mirrors the browser's own rule: the cookie domain (leading dot
    /// ignored) must equal the host or be a parent domain of it.
    pub fn applies_to_host(&self, host: &str) -> bool {
        if self.name.is_empty() {
            return false;
        }
        let domain = self.domain.trim_start_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to access credential snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The full set of cookies persisted to disk. Never edited in place:
/// a new login regenerates the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialSnapshot {
    pub cookies: Vec<StoredCookie>,
}

impl CredentialSnapshot {
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self { cookies }
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = fs::read(path)?;
        let snapshot = serde_json::from_slice(&content)?;
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), CredentialError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(domain: &str, expiry: Option<f64>) -> StoredCookie {
        StoredCookie {
            name: "fakku_sid".to_string(),
            value: "abc".to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            expiry,
            secure: true,
            http_only: true,
        }
    }

    #[test]
    fn test_expiry_normalized_to_seconds() {
        assert_eq!(
            cookie(".fakku.net", Some(1_700_000_000.75)).normalized_expiry(),
            Some(1_700_000_000)
        );
        assert_eq!(cookie(".fakku.net", Some(-1.0)).normalized_expiry(), None);
        assert_eq!(cookie(".fakku.net", None).normalized_expiry(), None);
    }

    #[test]
    fn test_domain_matching() {
        assert!(cookie(".fakku.net", None).applies_to_host("www.fakku.net"));
        assert!(cookie("fakku.net", None).applies_to_host("fakku.net"));
        assert!(cookie("www.fakku.net", None).applies_to_host("WWW.fakku.net"));
        assert!(!cookie(".other.net", None).applies_to_host("www.fakku.net"));
        assert!(!cookie("akku.net", None).applies_to_host("fakku.net"));
        assert!(!cookie("", None).applies_to_host("fakku.net"));
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let snapshot = CredentialSnapshot::new(vec![cookie(".fakku.net", Some(12.5))]);

        snapshot.save(&path).unwrap();
        assert!(CredentialSnapshot::exists(&path));
        assert_eq!(CredentialSnapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"[{"name":"a","value":"b","domain":"fakku.net"}]"#;
        let snapshot: CredentialSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.cookies[0].path, "/");
        assert_eq!(snapshot.cookies[0].expiry, None);
    }

    #[test]
    fn test_malformed_snapshot_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, b"\x80\x04garbage").unwrap();
        assert!(matches!(
            CredentialSnapshot::load(&path),
            Err(CredentialError::Malformed(_))
        ));
    }
}
