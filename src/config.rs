//! Service configuration.
//!
//! Server settings come from environment variables (a `.env` file is loaded
//! first by `main`). Scoring constants live in [`HeuristicConfig`] and can be
//! overridden from a JSON file named by `HEURISTICS_CONFIG`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_STATIC_DIR: &str = "../frontend";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024; // 100MB
const DEFAULT_PDF_DPI: u32 = 200;

/// Runtime settings for the HTTP server and its external tools.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub pdf_dpi: u32,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
    pub ocr_lang: String,
    pub heuristics_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:5000")?;

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_BYTES is not a byte count: {:?}", raw))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let pdf_dpi = match lookup("PDF_DPI") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("PDF_DPI is not a positive integer: {:?}", raw))?,
            None => DEFAULT_PDF_DPI,
        };
        if pdf_dpi == 0 {
            anyhow::bail!("PDF_DPI must be greater than zero");
        }

        let static_dir = resolve_static_dir(
            lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        );

        Ok(Self {
            bind_addr,
            static_dir,
            max_upload_bytes,
            pdf_dpi,
            pdftoppm_bin: lookup("PDFTOPPM_BIN").unwrap_or_else(|| "pdftoppm".to_string()),
            tesseract_bin: lookup("TESSERACT_BIN").unwrap_or_else(|| "tesseract".to_string()),
            ocr_lang: lookup("OCR_LANG").unwrap_or_else(|| "eng".to_string()),
            heuristics_path: lookup("HEURISTICS_CONFIG").map(PathBuf::from),
        })
    }

    /// Load the heuristic constants, falling back to the built-in defaults.
    pub fn heuristics(&self) -> Result<HeuristicConfig> {
        match &self.heuristics_path {
            Some(path) => HeuristicConfig::load_from_file(path),
            None => Ok(HeuristicConfig::default()),
        }
    }
}

/// Use the configured asset root if it exists, otherwise the working directory.
fn resolve_static_dir(candidate: PathBuf) -> PathBuf {
    if candidate.is_dir() {
        candidate
    } else {
        PathBuf::from(".")
    }
}

/// Constants for the keyword/date heuristics and the trust score.
///
/// The defaults are the historical values of the service. They are not
/// calibrated, so they are kept verbatim and only made overridable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Case-insensitive substrings associated with credential issuers.
    pub issuer_keywords: Vec<String>,
    /// Phrases whose presence counts as a date.
    pub date_phrases: Vec<String>,
    pub year_min: u32,
    pub year_max: u32,
    pub base_score: i64,
    /// Word count that must be exceeded to earn `word_bonus`.
    pub word_bonus_threshold: usize,
    pub word_bonus: i64,
    pub per_issuer_bonus: i64,
    pub issuer_bonus_cap: i64,
    pub date_bonus: i64,
    /// Characters of `full_text` kept in the snippet.
    pub snippet_chars: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            issuer_keywords: [
                "institute",
                "university",
                "college",
                "certified",
                "certificate",
                "issued",
                "degree",
                "coursera",
                "edx",
                "udemy",
                "iit",
                "mit",
                "stanford",
                "google",
                "microsoft",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            date_phrases: ["issued on", "date of", "on:"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            year_min: 1900,
            year_max: 2100,
            base_score: 30,
            word_bonus_threshold: 50,
            word_bonus: 30,
            per_issuer_bonus: 10,
            issuer_bonus_cap: 30,
            date_bonus: 10,
            snippet_chars: 1000,
        }
    }
}

impl HeuristicConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read heuristics config: {:?}", path))?;
        let config: HeuristicConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse heuristics config: {:?}", path))?;
        info!(
            "Loaded heuristics config from {:?} ({} issuer keywords)",
            path,
            config.issuer_keywords.len()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.pdf_dpi, 200);
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.ocr_lang, "eng");
        assert_eq!(config.pdftoppm_bin, "pdftoppm");
        assert!(config.heuristics_path.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().to_str().unwrap().to_string();
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("PDF_DPI", "300"),
            ("OCR_LANG", "eng+deu"),
            ("STATIC_DIR", &static_dir),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.pdf_dpi, 300);
        assert_eq!(config.ocr_lang, "eng+deu");
        assert_eq!(config.static_dir, dir.path());
    }

    #[test]
    fn test_missing_static_dir_falls_back_to_cwd() {
        let config = ServerConfig::from_lookup(lookup_from(&[(
            "STATIC_DIR",
            "/definitely/not/a/real/frontend",
        )]))
        .unwrap();
        assert_eq!(config.static_dir, PathBuf::from("."));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("PDF_DPI", "high")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("PDF_DPI", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("MAX_UPLOAD_BYTES", "-1")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_partial_heuristics_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics.json");
        std::fs::write(&path, r#"{"issuer_keywords": ["acme"], "date_bonus": 5}"#).unwrap();

        let config = HeuristicConfig::load_from_file(&path).unwrap();
        assert_eq!(config.issuer_keywords, vec!["acme".to_string()]);
        assert_eq!(config.date_bonus, 5);
        assert_eq!(config.base_score, 30);
        assert_eq!(config.year_max, 2100);
    }

    #[test]
    fn test_malformed_heuristics_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heuristics.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(HeuristicConfig::load_from_file(&path).is_err());
    }
}
