use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "scout_terminal";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_SEASON: u16 = 2023;
pub const DEFAULT_CACHE_EXPIRY_HOURS: u64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSource {
    ApiSports,
    RapidApi,
    Mock,
}

impl ApiSource {
    pub fn from_text(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "apisports" | "api-sports" => Some(Self::ApiSports),
            "rapidapi" | "rapid-api" => Some(Self::RapidApi),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ApiSports => "API-Sports",
            Self::RapidApi => "RapidAPI",
            Self::Mock => "Mock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueEntry {
    pub id: u32,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub api_source: ApiSource,
    pub leagues: Vec<LeagueEntry>,
    pub season: u16,
    pub cache_expiry_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_source: ApiSource::Mock,
            leagues: default_leagues(),
            season: DEFAULT_SEASON,
            cache_expiry_hours: DEFAULT_CACHE_EXPIRY_HOURS,
        }
    }
}

impl AppConfig {
    /// Config file first, then `SCOUT_*` environment overrides.
    /// Without an API key the source falls back to mock so the app
    /// stays usable offline.
    pub fn load() -> Self {
        let mut cfg = load_config_file().unwrap_or_default();

        if let Ok(key) = env::var("SCOUT_API_KEY") {
            if !key.trim().is_empty() {
                cfg.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(source) = env::var("SCOUT_API_SOURCE") {
            if let Some(source) = ApiSource::from_text(&source) {
                cfg.api_source = source;
            }
        }
        if let Ok(season) = env::var("SCOUT_SEASON") {
            if let Ok(season) = season.trim().parse::<u16>() {
                cfg.season = season;
            }
        }
        if let Ok(hours) = env::var("SCOUT_CACHE_EXPIRY_HOURS") {
            if let Ok(hours) = hours.trim().parse::<u64>() {
                cfg.cache_expiry_hours = hours;
            }
        }

        if cfg.api_key.is_none() && cfg.api_source != ApiSource::Mock {
            cfg.api_source = ApiSource::Mock;
        }
        if cfg.leagues.is_empty() {
            cfg.leagues = default_leagues();
        }
        cfg
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = config_path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(&tmp, json).context("write config")?;
        fs::rename(&tmp, &path).context("swap config")?;
        Ok(())
    }

    pub fn league_name(&self, league_id: u32) -> Option<&str> {
        self.leagues
            .iter()
            .find(|l| l.id == league_id)
            .map(|l| l.name.as_str())
    }

    pub fn league_country(&self, league_id: u32) -> Option<&str> {
        self.leagues
            .iter()
            .find(|l| l.id == league_id)
            .map(|l| l.country.as_str())
    }
}

pub fn default_leagues() -> Vec<LeagueEntry> {
    [
        (39, "Premier League", "England"),
        (140, "La Liga", "Spain"),
        (78, "Bundesliga", "Germany"),
        (135, "Serie A", "Italy"),
        (61, "Ligue 1", "France"),
    ]
    .into_iter()
    .map(|(id, name, country)| LeagueEntry {
        id,
        name: name.to_string(),
        country: country.to_string(),
    })
    .collect()
}

fn load_config_file() -> Option<AppConfig> {
    let path = config_path()?;
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<AppConfig>(&raw).ok()
}

fn config_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(CONFIG_FILE));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE),
    )
}
