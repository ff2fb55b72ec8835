// src/ingest/config.rs
//! Source toggles: which registered adapters are switched off.
//!
//! `config/sources.toml`:
//! ```toml
//! disabled = ["nhs_newcastle", "on_this_day"]
//! ```
//! `config/sources.json` takes either `{"disabled": [...]}` or a bare array.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "SOURCES_CONFIG_PATH";
const FALLBACKS: [&str; 2] = ["config/sources.toml", "config/sources.json"];

/// Parsed sources file. Names are trimmed, deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourcesConfig {
    #[serde(default, deserialize_with = "adapter_names")]
    pub disabled: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonSources {
    Table(SourcesConfig),
    List(Vec<String>),
}

fn adapter_names<'de, D>(de: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(de)?;
    Ok(clean_names(raw))
}

fn clean_names(raw: Vec<String>) -> BTreeSet<String> {
    raw.into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

impl SourcesConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing sources toml")
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let parsed: JsonSources = serde_json::from_str(s).context("parsing sources json")?;
        Ok(match parsed {
            JsonSources::Table(cfg) => cfg,
            JsonSources::List(names) => SourcesConfig {
                disabled: clean_names(names),
            },
        })
    }

    /// The file extension picks the format.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            other => bail!("sources config {}: unsupported extension '{other}'", path.display()),
        }
    }

    pub fn disabled_names(&self) -> Vec<String> {
        self.disabled.iter().cloned().collect()
    }
}

/// Disabled-adapter names from an explicit path.
pub fn load_disabled_from(path: &Path) -> Result<Vec<String>> {
    SourcesConfig::load(path).map(|c| c.disabled_names())
}

/// `$SOURCES_CONFIG_PATH` if set (it must exist), else the first of
/// `config/sources.toml`, `config/sources.json`, else nothing disabled.
pub fn load_disabled_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let path = PathBuf::from(p);
        if !path.exists() {
            bail!("{ENV_PATH} points to missing file {}", path.display());
        }
        return load_disabled_from(&path);
    }
    match FALLBACKS.iter().map(|p| Path::new(*p)).find(|p| p.exists()) {
        Some(path) => load_disabled_from(path),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_deduped_and_sorted() {
        let cfg = SourcesConfig::from_toml_str(
            r#"disabled = [" weather ", "", "calendar", "calendar"]"#,
        )
        .unwrap();
        assert_eq!(cfg.disabled_names(), vec!["calendar", "weather"]);
    }

    #[test]
    fn json_accepts_table_or_list() {
        let table = SourcesConfig::from_json_str(r#"{"disabled": ["tech_news"]}"#).unwrap();
        let list = SourcesConfig::from_json_str(r#"["tech_news", "  "]"#).unwrap();
        assert_eq!(table, list);
    }

    #[test]
    fn empty_toml_disables_nothing() {
        assert!(SourcesConfig::from_toml_str("").unwrap().disabled.is_empty());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sources.yaml");
        fs::write(&p, "disabled: [weather]").unwrap();
        assert!(SourcesConfig::load(&p).is_err());
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(SourcesConfig::from_toml_str(r#"disabled = "weather""#).is_err());
        assert!(SourcesConfig::from_json_str(r#"{"disabled": 3}"#).is_err());
    }
}
