// src/config/router.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::aliases::{load_aliases_default, load_aliases_from, AliasTable};
use crate::ingest::DEFAULT_MAX_ITEMS;
use crate::market::bars::{BarStore, DEFAULT_MIN_BARS_PER_TICKER};
use crate::market::indicators::{IndicatorSettings, TechnicalCalculator};
use crate::request::{CommandSet, DEFAULT_COMMAND};

pub const DEFAULT_ROUTER_CONFIG_PATH: &str = "config/router.toml";
pub const DEFAULT_FIXTURE_PATH: &str = "data/decoy_news.json";

pub const ENV_ROUTER_CONFIG_PATH: &str = "ROUTER_CONFIG_PATH";
pub const ENV_ROUTER_MAX_ITEMS: &str = "ROUTER_MAX_ITEMS";

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}
fn default_commands() -> Vec<String> {
    CommandSet::default().names().to_vec()
}
fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}
fn default_fixture_path() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURE_PATH)
}
fn default_min_bars() -> usize {
    DEFAULT_MIN_BARS_PER_TICKER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Items kept per ingested source (newest first when over the cap).
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Caller-defined command names accepted on the command surface.
    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
    #[serde(default = "default_command")]
    pub default_command: String,
    /// Ticker alias table; `None` means $TICKER_ALIASES_PATH / config/aliases.* lookup.
    #[serde(default)]
    pub aliases_path: Option<PathBuf>,
    /// News file used when a request carries no news of its own.
    #[serde(default = "default_fixture_path")]
    pub fixture_path: PathBuf,
    /// 5-minute bar file; `None` means contexts carry no technical snapshot.
    #[serde(default)]
    pub bars_path: Option<PathBuf>,
    #[serde(default = "default_min_bars")]
    pub min_bars_per_ticker: usize,
    #[serde(default)]
    pub technicals: IndicatorSettings,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            commands: default_commands(),
            default_command: default_command(),
            aliases_path: None,
            fixture_path: default_fixture_path(),
            bars_path: None,
            min_bars_per_ticker: default_min_bars(),
            technicals: IndicatorSettings::default(),
        }
    }
}

// parse optional item cap from env; at least 1
fn parse_max_items_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map(|v| v.max(1))
}

impl RouterConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading router config from {}", path.display()))?;
        let cfg: RouterConfig = toml::from_str(&data)
            .with_context(|| format!("parsing router config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// $ROUTER_CONFIG_PATH, else config/router.toml, else built-in defaults.
    /// $ROUTER_MAX_ITEMS overrides the item cap in every case.
    pub fn load_default() -> anyhow::Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_ROUTER_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_ROUTER_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_ROUTER_CONFIG_PATH);
            if pb.exists() {
                Self::load_from_file(&pb)?
            } else {
                Self::default()
            }
        };

        if let Some(n) = parse_max_items_env(env::var(ENV_ROUTER_MAX_ITEMS).ok()) {
            cfg.max_items = n;
        }
        Ok(cfg)
    }

    fn sanitized(mut self) -> Self {
        if self.max_items == 0 {
            self.max_items = 1;
        }
        let set = self.command_set();
        self.commands = set.names().to_vec();
        self.default_command = set.default_command().to_string();
        self
    }

    pub fn command_set(&self) -> CommandSet {
        CommandSet::new(&self.commands, &self.default_command)
    }

    pub fn load_aliases(&self) -> anyhow::Result<AliasTable> {
        match &self.aliases_path {
            Some(p) => load_aliases_from(p),
            None => load_aliases_default(),
        }
    }

    /// Bars plus a validated indicator set, when a bar file is configured.
    pub fn load_market(&self) -> anyhow::Result<Option<(BarStore, TechnicalCalculator)>> {
        let Some(path) = &self.bars_path else {
            return Ok(None);
        };
        let calc = TechnicalCalculator::new(self.technicals.clone())?;
        let store = BarStore::load(path, self.min_bars_per_ticker)?;
        Ok(Some((store, calc)))
    }
}
