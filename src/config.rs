//! Run configuration: the single JSON document holding settings + sitemap.
//!
//! The document layout and key casing follow the established format
//! (`{"Settings": {...}, "Sitemap": {...}}`), so existing configuration
//! files load unchanged. Unknown-but-known-shaped fields (`Gui`, `Captcha`)
//! are accepted and preserved across a round-trip even though the scraper
//! core gives them no behavior.

use crate::error::ScrapeError;
use crate::sitemap::Sitemap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output serialization format for the root document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "json", alias = "JSON", alias = "Json")]
    Json,
    #[serde(rename = "xml", alias = "XML", alias = "Xml")]
    Xml,
    #[serde(rename = "csv", alias = "CSV", alias = "Csv")]
    Csv,
}

impl ExportFormat {
    /// File extension for `output.<ext>`.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Run-wide settings, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Settings {
    /// Accepted for compatibility; the GUI front-end is out of scope.
    pub gui: bool,
    /// Append non-fatal errors to the run's log file.
    pub log: bool,
    /// Fetch pages through a headless browser render instead of raw HTTP.
    pub java_script: bool,
    /// Worker pool size; also the job and result queue bounds.
    pub workers: usize,
    pub export: ExportFormat,
    /// Rotated per worker; empty means no `User-Agent` header.
    pub user_agents: Vec<String>,
    /// Accepted for compatibility; captcha solving is out of scope.
    pub captcha: String,
    /// Only the first entry is used; empty means a direct connection.
    pub proxy: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            gui: false,
            log: false,
            java_script: false,
            workers: 1,
            export: ExportFormat::Json,
            user_agents: Vec::new(),
            captcha: String::new(),
            proxy: Vec::new(),
        }
    }
}

impl Settings {
    /// The user agent a worker sends for its `n`-th request, cycling
    /// through the configured list. `None` means send no header.
    pub fn user_agent_for(&self, n: usize) -> Option<&str> {
        if self.user_agents.is_empty() {
            None
        } else {
            Some(self.user_agents[n % self.user_agents.len()].as_str())
        }
    }

    /// The effective proxy: the first non-empty entry, if any.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.first().map(String::as_str).filter(|p| !p.is_empty())
    }

    fn validate(&self) -> Result<(), ScrapeError> {
        if self.workers == 0 {
            return Err(ScrapeError::Config(
                "Workers must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// The full configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "Settings", default)]
    pub settings: Settings,
    #[serde(rename = "Sitemap")]
    pub sitemap: Sitemap,
}

impl ConfigDocument {
    /// Load and validate the configuration document. Any violation is fatal.
    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        let data = fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let document: ConfigDocument = serde_json::from_str(&data).map_err(|e| {
            ScrapeError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        document.settings.validate()?;
        document.sitemap.validate()?;
        Ok(document)
    }

    /// Write the document back out, pretty-printed.
    pub fn save(&self, path: &Path) -> Result<(), ScrapeError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| ScrapeError::Config(format!("cannot serialize configuration: {e}")))?;
        fs::write(path, data).map_err(|e| {
            ScrapeError::Config(format!("cannot write {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "Settings": {
            "Log": true,
            "JavaScript": false,
            "Workers": 4,
            "Export": "json",
            "UserAgents": ["agent-a", "agent-b"],
            "Proxy": ["http://127.0.0.1:8080"]
        },
        "Sitemap": {
            "startUrl": ["http://x/"],
            "selectors": [
                {"id": "title", "type": "SelectorText", "parentSelectors": ["_root"], "selector": "h1"}
            ]
        }
    }"#;

    #[test]
    fn test_load_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.json");
        std::fs::write(&path, DOC).unwrap();
        let doc = ConfigDocument::load(&path).unwrap();
        assert!(doc.settings.log);
        assert_eq!(doc.settings.workers, 4);
        assert_eq!(doc.settings.export, ExportFormat::Json);
        assert_eq!(doc.settings.proxy(), Some("http://127.0.0.1:8080"));
        assert_eq!(doc.sitemap.selectors.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.export, ExportFormat::Json);
        assert!(!settings.java_script);
        assert!(settings.user_agent_for(0).is_none());
        assert!(settings.proxy().is_none());
    }

    #[test]
    fn test_user_agent_rotation_cycles() {
        let settings: Settings =
            serde_json::from_str(r#"{"UserAgents": ["a", "b", "c"]}"#).unwrap();
        let picked: Vec<_> = (0..5).map(|n| settings.user_agent_for(n).unwrap()).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b"]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.json");
        std::fs::write(
            &path,
            r#"{"Settings": {"Workers": 0}, "Sitemap": {"startUrl": [], "selectors": []}}"#,
        )
        .unwrap();
        assert!(ConfigDocument::load(&path).is_err());
    }

    #[test]
    fn test_unknown_export_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.json");
        std::fs::write(
            &path,
            r#"{"Settings": {"Export": "yaml"}, "Sitemap": {"startUrl": [], "selectors": []}}"#,
        )
        .unwrap();
        assert!(matches!(
            ConfigDocument::load(&path),
            Err(ScrapeError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ConfigDocument::load(Path::new("/nonexistent/sitemap.json")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_round_trip_preserves_compat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitemap.json");
        std::fs::write(
            &path,
            r#"{
                "Settings": {"Gui": true, "Captcha": "manual", "Workers": 2},
                "Sitemap": {"_id": "shop", "startUrl": ["http://x/"], "selectors": []}
            }"#,
        )
        .unwrap();
        let doc = ConfigDocument::load(&path).unwrap();
        let saved = dir.path().join("saved.json");
        doc.save(&saved).unwrap();
        let back = ConfigDocument::load(&saved).unwrap();
        assert!(back.settings.gui);
        assert_eq!(back.settings.captcha, "manual");
        assert_eq!(back.settings.workers, 2);
        assert_eq!(back.sitemap.id, "shop");
    }
}
