use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ApiSource, AppConfig};
use crate::http_cache::fetch_json_cached;
use crate::mock_api;

const APISPORTS_BASE: &str = "https://v3.football.api-sports.io";
const RAPIDAPI_BASE: &str = "https://api-football-v1.p.rapidapi.com/v3";
const RAPIDAPI_HOST: &str = "api-football-v1.p.rapidapi.com";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_PARALLELISM: usize = 4;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let timeout = env::var("SCOUT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("failed to build http client")
    })
}

// Every payload field is optional; the API omits or nulls freely and the
// processor decides what is required.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayerEntry {
    #[serde(default)]
    pub player: RawPlayerInfo,
    #[serde(default)]
    pub statistics: Vec<RawStatBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlayerInfo {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStatBlock {
    pub team: Option<RawTeam>,
    pub league: Option<RawLeague>,
    pub games: Option<RawGames>,
    pub shots: Option<RawShots>,
    pub goals: Option<RawGoals>,
    pub passes: Option<RawPasses>,
    pub tackles: Option<RawTackles>,
    pub duels: Option<RawDuels>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTeam {
    pub id: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLeague {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub season: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGames {
    // API-Sports spells this "appearences"; the mock layer and some mirrors
    // use the dictionary spelling.
    #[serde(default, alias = "appearences")]
    pub appearances: Option<f64>,
    pub minutes: Option<f64>,
    pub position: Option<String>,
    #[serde(default)]
    pub rating: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawShots {
    pub total: Option<f64>,
    pub on: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGoals {
    pub total: Option<f64>,
    pub conceded: Option<f64>,
    pub assists: Option<f64>,
    pub saves: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPasses {
    pub total: Option<f64>,
    pub key: Option<f64>,
    #[serde(default)]
    pub accuracy: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTackles {
    pub total: Option<f64>,
    pub blocks: Option<f64>,
    pub interceptions: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDuels {
    pub total: Option<f64>,
    pub won: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiPaging {
    pub current: Option<u32>,
    pub total: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    response: Vec<RawPlayerEntry>,
    #[serde(default)]
    paging: Option<ApiPaging>,
    #[serde(default)]
    errors: Value,
}

pub struct LeaguePlayersFetch {
    pub entries: Vec<RawPlayerEntry>,
    pub errors: Vec<String>,
}

/// Top scorers for a league season (`/players/topscorers`).
pub fn fetch_top_players(
    cfg: &AppConfig,
    league_id: u32,
    season: u16,
) -> Result<Vec<RawPlayerEntry>> {
    if cfg.api_source == ApiSource::Mock {
        return Ok(mock_api::top_players(league_id, season));
    }
    let url = format!(
        "{}/players/topscorers?league={league_id}&season={season}",
        base_url(cfg.api_source)
    );
    let body = fetch_cached(cfg, &url)?;
    parse_players_json(&body)
}

/// One player by id (`/players?id=`).
pub fn fetch_player(cfg: &AppConfig, player_id: u32, season: u16) -> Result<Vec<RawPlayerEntry>> {
    if cfg.api_source == ApiSource::Mock {
        return Ok(mock_api::player_details(player_id, season));
    }
    let url = format!(
        "{}/players?id={player_id}&season={season}",
        base_url(cfg.api_source)
    );
    let body = fetch_cached(cfg, &url)?;
    parse_players_json(&body)
}

/// League-wide player pages (`/players?league=`). Page 1 reveals the page
/// count; the remaining pages are fetched in parallel.
pub fn fetch_league_players(
    cfg: &AppConfig,
    league_id: u32,
    season: u16,
    max_pages: u32,
) -> Result<LeaguePlayersFetch> {
    if cfg.api_source == ApiSource::Mock {
        return Ok(LeaguePlayersFetch {
            entries: mock_api::league_players(league_id, season),
            errors: Vec::new(),
        });
    }

    let first_url = page_url(cfg.api_source, league_id, season, 1);
    let body = fetch_cached(cfg, &first_url)?;
    let envelope = parse_envelope(&body)?;
    let mut entries = envelope.response;
    let mut errors = Vec::new();

    let total_pages = envelope
        .paging
        .and_then(|p| p.total)
        .unwrap_or(1)
        .min(max_pages.max(1));
    if total_pages <= 1 {
        return Ok(LeaguePlayersFetch { entries, errors });
    }

    let pages: Vec<u32> = (2..=total_pages).collect();
    let pool = build_fetch_pool();
    let results: Vec<(u32, Result<Vec<RawPlayerEntry>>)> = pool.install(|| {
        pages
            .par_iter()
            .map(|page| {
                let url = page_url(cfg.api_source, league_id, season, *page);
                let result = fetch_cached(cfg, &url).and_then(|body| parse_players_json(&body));
                (*page, result)
            })
            .collect()
    });

    for (page, result) in results {
        match result {
            Ok(mut rows) => entries.append(&mut rows),
            Err(err) => errors.push(format!("page {page}: {err}")),
        }
    }
    Ok(LeaguePlayersFetch { entries, errors })
}

pub fn parse_players_json(raw: &str) -> Result<Vec<RawPlayerEntry>> {
    Ok(parse_envelope(raw)?.response)
}

pub fn parse_players_paging(raw: &str) -> Result<ApiPaging> {
    Ok(parse_envelope(raw)?.paging.unwrap_or_default())
}

fn parse_envelope(raw: &str) -> Result<ApiEnvelope> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ApiEnvelope::default());
    }
    let envelope: ApiEnvelope =
        serde_json::from_str(trimmed).context("invalid players json")?;
    if let Some(msg) = api_errors_message(&envelope.errors) {
        return Err(anyhow::anyhow!("api error: {msg}"));
    }
    Ok(envelope)
}

// The API reports request problems inside a 200 body: either an object of
// name -> message or an array of messages.
fn api_errors_message(errors: &Value) -> Option<String> {
    match errors {
        Value::Object(map) if !map.is_empty() => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.as_str().unwrap_or("unknown")))
                .collect();
            Some(parts.join("; "))
        }
        Value::Array(items) if !items.is_empty() => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| v.as_str().unwrap_or("unknown").to_string())
                .collect();
            Some(parts.join("; "))
        }
        _ => None,
    }
}

fn fetch_cached(cfg: &AppConfig, url: &str) -> Result<String> {
    let client = http_client()?;
    let key = cfg
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("SCOUT_API_KEY missing"))?;
    let headers = auth_headers(cfg.api_source, key);
    fetch_json_cached(client, url, &headers, cfg.cache_expiry_hours * 3600)
}

fn auth_headers(source: ApiSource, key: &str) -> Vec<(&'static str, &str)> {
    match source {
        ApiSource::ApiSports => vec![("x-apisports-key", key)],
        ApiSource::RapidApi => vec![
            ("x-rapidapi-key", key),
            ("x-rapidapi-host", RAPIDAPI_HOST),
        ],
        ApiSource::Mock => Vec::new(),
    }
}

fn base_url(source: ApiSource) -> &'static str {
    match source {
        ApiSource::RapidApi => RAPIDAPI_BASE,
        _ => APISPORTS_BASE,
    }
}

fn page_url(source: ApiSource, league_id: u32, season: u16, page: u32) -> String {
    format!(
        "{}/players?league={league_id}&season={season}&page={page}",
        base_url(source)
    )
}

fn build_fetch_pool() -> rayon::ThreadPool {
    let threads = env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FETCH_PARALLELISM)
        .clamp(1, 16);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("failed to build fetch pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_parses_to_no_entries() {
        assert!(parse_players_json("").unwrap().is_empty());
        assert!(parse_players_json("null").unwrap().is_empty());
    }

    #[test]
    fn api_error_object_is_reported() {
        let raw = r#"{"response":[],"errors":{"token":"Error/Missing application key"}}"#;
        let err = parse_players_json(raw).unwrap_err();
        assert!(err.to_string().contains("application key"));
    }

    #[test]
    fn rating_accepts_string_and_number() {
        let raw = r#"{"response":[
            {"player":{"id":1,"name":"A"},"statistics":[{"games":{"rating":"7.2"}}]},
            {"player":{"id":2,"name":"B"},"statistics":[{"games":{"rating":6.9}}]}
        ]}"#;
        let rows = parse_players_json(raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].statistics[0].games.as_ref().unwrap().rating.is_string());
        assert!(rows[1].statistics[0].games.as_ref().unwrap().rating.is_number());
    }

    #[test]
    fn appearances_accepts_api_spelling() {
        let raw = r#"{"response":[
            {"player":{"id":1,"name":"A"},"statistics":[{"games":{"appearences":30}}]}
        ]}"#;
        let rows = parse_players_json(raw).unwrap();
        let games = rows[0].statistics[0].games.as_ref().unwrap();
        assert_eq!(games.appearances, Some(30.0));
    }
}
