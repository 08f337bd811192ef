use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::data_processor::PlayerTable;
use crate::http_cache::app_cache_dir;
use crate::state::AppState;

const CACHE_FILE: &str = "cache.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    leagues: HashMap<u32, LeagueSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LeagueSnapshot {
    table: PlayerTable,
    fetched_at: Option<u64>,
}

/// Reload previously fetched tables so the app opens warm.
pub fn load_into_state(state: &mut AppState) {
    let Some(path) = snapshot_path() else {
        return;
    };
    let Ok(raw) = fs::read_to_string(&path) else {
        return;
    };
    let Ok(cache) = serde_json::from_str::<CacheFile>(&raw) else {
        return;
    };
    if cache.version != CACHE_VERSION {
        return;
    }

    for (league_id, snapshot) in cache.leagues {
        if snapshot.table.is_empty() {
            continue;
        }
        if let Some(at) = snapshot.fetched_at.and_then(system_time_from_secs) {
            state.fetched_at.insert(league_id, at);
        }
        state.tables.insert(league_id, snapshot.table);
    }
}

pub fn save_from_state(state: &AppState) {
    let Some(path) = snapshot_path() else {
        return;
    };
    let Some(dir) = path.parent() else {
        return;
    };
    let _ = fs::create_dir_all(dir);

    let leagues = state
        .tables
        .iter()
        .map(|(league_id, table)| {
            (
                *league_id,
                LeagueSnapshot {
                    table: table.clone(),
                    fetched_at: state
                        .fetched_at
                        .get(league_id)
                        .copied()
                        .and_then(system_time_to_secs),
                },
            )
        })
        .collect();
    let cache = CacheFile {
        version: CACHE_VERSION,
        leagues,
    };

    if let Ok(json) = serde_json::to_string(&cache) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, &path);
        }
    }
}

fn snapshot_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn system_time_from_secs(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(std::time::Duration::from_secs(secs))
}
