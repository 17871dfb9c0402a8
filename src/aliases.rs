// src/aliases.rs
//! # Ticker aliases
//!
//! Relevance matching looks for a ticker *or* any company-name alias of it.
//! Where aliases come from is up to the caller: anything implementing
//! [`AliasLookup`] can be plugged into the router. [`AliasTable`] is the stock
//! implementation, loaded from TOML or JSON:
//!
//! ```toml
//! [aliases]
//! ACME = ["Acme Corp", "Acme Corporation"]
//! ```
//!
//! ```json
//! { "ACME": ["Acme Corp", "Acme Corporation"] }
//! ```
//!
//! Tickers are upper-cased; alias lists are trimmed and de-duplicated
//! case-insensitively, empty entries dropped.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_ALIASES_PATH: &str = "TICKER_ALIASES_PATH";

/// Ticker → company-name aliases.
pub trait AliasLookup: Send + Sync {
    /// Aliases for `ticker` (ticker itself excluded). Unknown tickers yield an empty list.
    fn aliases_for(&self, ticker: &str) -> Vec<String>;
}

/// No alias table available: matching falls back to the ticker alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliases;

impl AliasLookup for NoAliases {
    fn aliases_for(&self, _ticker: &str) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    map: HashMap<String, Vec<String>>,
}

impl AliasTable {
    /// Build from raw entries; keys and values are cleaned the same way as file input.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, vs) in entries {
            let key = normalize_ticker(k.as_ref());
            if key.is_empty() {
                continue;
            }
            let slot = map.entry(key).or_default();
            for v in vs {
                push_unique(slot, v.as_ref());
            }
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl AliasLookup for AliasTable {
    fn aliases_for(&self, ticker: &str) -> Vec<String> {
        self.map
            .get(&normalize_ticker(ticker))
            .cloned()
            .unwrap_or_default()
    }
}

fn normalize_ticker(s: &str) -> String {
    s.trim().to_uppercase()
}

fn push_unique(slot: &mut Vec<String>, alias: &str) {
    let t = alias.trim();
    if t.is_empty() {
        return;
    }
    let lower = t.to_lowercase();
    if !slot.iter().any(|a| a.to_lowercase() == lower) {
        slot.push(t.to_string());
    }
}

/// Load an alias table from an explicit path. Supports TOML or JSON formats.
pub fn load_aliases_from(path: &Path) -> Result<AliasTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ticker aliases from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_aliases(&content, ext.as_str())
}

/// Load aliases using env var + fallbacks:
/// 1) $TICKER_ALIASES_PATH
/// 2) config/aliases.toml
/// 3) config/aliases.json
/// 4) empty table
pub fn load_aliases_default() -> Result<AliasTable> {
    if let Ok(p) = std::env::var(ENV_ALIASES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_aliases_from(&pb);
        } else {
            return Err(anyhow!("{ENV_ALIASES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/aliases.toml");
    if toml_p.exists() {
        return load_aliases_from(&toml_p);
    }
    let json_p = PathBuf::from("config/aliases.json");
    if json_p.exists() {
        return load_aliases_from(&json_p);
    }
    Ok(AliasTable::default())
}

fn parse_aliases(s: &str, hint_ext: &str) -> Result<AliasTable> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[aliases]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported ticker alias format"))
}

fn parse_toml(s: &str) -> Result<AliasTable> {
    #[derive(Deserialize)]
    struct TomlAliases {
        aliases: HashMap<String, Vec<String>>,
    }
    let v: TomlAliases = toml::from_str(s)?;
    Ok(AliasTable::from_entries(v.aliases))
}

fn parse_json(s: &str) -> Result<AliasTable> {
    let v: HashMap<String, Vec<String>> = serde_json::from_str(s)?;
    Ok(AliasTable::from_entries(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn entries_are_cleaned_and_merged() {
        let t = AliasTable::from_entries(vec![
            (" acme ", vec!["Acme Corp", " ", "ACME CORP"]),
            ("ACME", vec!["Acme Corporation"]),
            ("", vec!["dropped"]),
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(
            t.aliases_for("Acme"),
            vec!["Acme Corp".to_string(), "Acme Corporation".to_string()]
        );
    }

    #[test]
    fn toml_and_json_formats_work() {
        let toml = r#"
[aliases]
ACME = ["Acme Corp"]
"#;
        let json = r#"{"acme": ["Acme Corp", ""]}"#;
        assert_eq!(parse_toml(toml).unwrap(), parse_json(json).unwrap());
        assert!(parse_aliases("not an alias file", "").is_err());
    }

    #[test]
    fn no_aliases_is_empty() {
        assert!(NoAliases.aliases_for("ACME").is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not picked up
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_ALIASES_PATH);
        assert!(load_aliases_default().unwrap().is_empty());

        let p_json = tmp.path().join("aliases.json");
        fs::write(&p_json, r#"{"XYZ": ["Xyz Inc"]}"#).unwrap();
        env::set_var(ENV_ALIASES_PATH, p_json.display().to_string());
        let t = load_aliases_default().unwrap();
        assert_eq!(t.aliases_for("xyz"), vec!["Xyz Inc".to_string()]);
        env::remove_var(ENV_ALIASES_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
