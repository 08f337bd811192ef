use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::api_client;
use crate::config::AppConfig;
use crate::data_processor;
use crate::export;
use crate::http_cache;
use crate::state::{Delta, ProviderCommand};

const DEFAULT_MAX_PAGES: u32 = 3;

/// Single background worker owning all network and export work. The UI
/// thread sends commands and applies the resulting deltas between frames.
pub fn spawn_provider(cfg: AppConfig, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || provider_loop(cfg, tx, cmd_rx));
}

fn provider_loop(cfg: AppConfig, tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    let fetch_interval = Duration::from_secs(
        env::var("PLAYERS_POLL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(60)
            .max(10),
    );
    let max_pages = env::var("SCOUT_MAX_PAGES")
        .ok()
        .and_then(|val| val.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_PAGES)
        .clamp(1, 20);
    let mut last_fetch: HashMap<u32, Instant> = HashMap::new();

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            ProviderCommand::FetchTopPlayers { league_id, season } => {
                if throttled(&last_fetch, league_id, fetch_interval) {
                    let _ = tx.send(Delta::Log(format!(
                        "[INFO] Fetch throttled ({}s)",
                        fetch_interval.as_secs()
                    )));
                    continue;
                }
                match api_client::fetch_top_players(&cfg, league_id, season) {
                    Ok(raw) => {
                        send_normalized(&tx, league_id, season, &raw);
                        last_fetch.insert(league_id, Instant::now());
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!(
                            "[WARN] Unable to fetch players: {err}"
                        )));
                    }
                }
            }
            ProviderCommand::FetchLeaguePlayers { league_id, season } => {
                match api_client::fetch_league_players(&cfg, league_id, season, max_pages) {
                    Ok(fetch) => {
                        for err in &fetch.errors {
                            let _ = tx.send(Delta::Log(format!("[WARN] League fetch: {err}")));
                        }
                        send_normalized(&tx, league_id, season, &fetch.entries);
                        last_fetch.insert(league_id, Instant::now());
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!(
                            "[WARN] Unable to fetch league players: {err}"
                        )));
                    }
                }
            }
            ProviderCommand::FetchPlayer { player_id, season } => {
                match api_client::fetch_player(&cfg, player_id, season) {
                    Ok(raw) => match data_processor::normalize(&raw, season) {
                        Ok(table) => match table.rows.into_iter().next() {
                            Some(record) => {
                                let _ = tx.send(Delta::SetPlayerDetail { record });
                            }
                            None => {
                                let _ = tx.send(Delta::Log(format!(
                                    "[WARN] Player {player_id} returned no rows"
                                )));
                            }
                        },
                        Err(err) => {
                            let _ = tx.send(Delta::Log(format!("[WARN] Schema: {err}")));
                        }
                    },
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!(
                            "[WARN] Unable to fetch player {player_id}: {err}"
                        )));
                    }
                }
            }
            ProviderCommand::ExportPlayers {
                path,
                league_id,
                recommendations,
            } => {
                let result = api_client::fetch_top_players(&cfg, league_id, cfg.season)
                    .and_then(|raw| {
                        data_processor::normalize(&raw, cfg.season).map_err(Into::into)
                    })
                    .and_then(|table| {
                        export::export_players_xlsx(Path::new(&path), &table, &recommendations)
                    });
                match result {
                    Ok(report) => {
                        let _ = tx.send(Delta::ExportFinished {
                            path,
                            players: report.players,
                        });
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] Export failed: {err}")));
                    }
                }
            }
            ProviderCommand::ClearCache => match http_cache::clear_cache() {
                Ok(removed) => {
                    let _ = tx.send(Delta::CacheCleared { removed });
                }
                Err(err) => {
                    let _ = tx.send(Delta::Log(format!("[WARN] Cache clear failed: {err}")));
                }
            },
        }
    }
}

fn send_normalized(
    tx: &Sender<Delta>,
    league_id: u32,
    season: u16,
    raw: &[api_client::RawPlayerEntry],
) {
    // Schema problems are a warning, not a crash; the previous table stays.
    match data_processor::normalize(raw, season) {
        Ok(table) => {
            let _ = tx.send(Delta::SetPlayers { league_id, table });
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Schema: {err}")));
        }
    }
}

fn throttled(last_fetch: &HashMap<u32, Instant>, league_id: u32, interval: Duration) -> bool {
    last_fetch
        .get(&league_id)
        .is_some_and(|t| t.elapsed() < interval)
}
