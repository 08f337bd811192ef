use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::config::{AppConfig, LeagueEntry, default_leagues};
use crate::data_processor::{PlayerRecord, PlayerTable, Position, StatKey};
use crate::recommender::{
    self, FeatureToggles, Recommendation, RecommendationQuery, RecommendError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Players,
    PlayerDetail,
    Similar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Rating,
    Goals,
    Assists,
    Age,
    Name,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Rating => SortMode::Goals,
            SortMode::Goals => SortMode::Assists,
            SortMode::Assists => SortMode::Age,
            SortMode::Age => SortMode::Name,
            SortMode::Name => SortMode::Rating,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::Rating => "rating",
            SortMode::Goals => "goals",
            SortMode::Assists => "assists",
            SortMode::Age => "age",
            SortMode::Name => "name",
        }
    }
}

pub const DASHBOARD_METRICS: &[StatKey] = &[
    StatKey::GoalsTotal,
    StatKey::Assists,
    StatKey::Rating,
    StatKey::GoalsPer90,
    StatKey::AssistsPer90,
];

pub struct AppState {
    pub screen: Screen,
    pub leagues: Vec<LeagueEntry>,
    pub league_idx: usize,
    pub season: u16,
    pub tables: HashMap<u32, PlayerTable>,
    pub fetched_at: HashMap<u32, SystemTime>,
    pub players_loading: bool,
    pub selected: usize,
    pub sort: SortMode,
    pub position_filter: Option<Position>,
    pub dashboard_metric_idx: usize,
    pub detail: Option<PlayerRecord>,
    pub detail_similar: Vec<Recommendation>,
    pub detail_back: Screen,
    pub query: RecommendationQuery,
    pub recommendations: Vec<Recommendation>,
    pub recommend_notice: Option<String>,
    pub export_notice: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Self {
        let leagues = if cfg.leagues.is_empty() {
            default_leagues()
        } else {
            cfg.leagues.clone()
        };
        Self {
            screen: Screen::Dashboard,
            leagues,
            league_idx: 0,
            season: cfg.season,
            tables: HashMap::new(),
            fetched_at: HashMap::new(),
            players_loading: false,
            selected: 0,
            sort: SortMode::Rating,
            position_filter: None,
            dashboard_metric_idx: 0,
            detail: None,
            detail_similar: Vec::new(),
            detail_back: Screen::Players,
            query: RecommendationQuery::default(),
            recommendations: Vec::new(),
            recommend_notice: None,
            export_notice: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn current_league(&self) -> &LeagueEntry {
        &self.leagues[self.league_idx.min(self.leagues.len() - 1)]
    }

    pub fn current_league_id(&self) -> u32 {
        self.current_league().id
    }

    pub fn current_table(&self) -> Option<&PlayerTable> {
        self.tables.get(&self.current_league_id())
    }

    pub fn dashboard_metric(&self) -> StatKey {
        DASHBOARD_METRICS[self.dashboard_metric_idx % DASHBOARD_METRICS.len()]
    }

    /// Wall-clock label for the current league's last successful fetch.
    pub fn fetched_label(&self) -> Option<String> {
        let at = self.fetched_at.get(&self.current_league_id())?;
        let local: DateTime<Local> = (*at).into();
        Some(local.format("%H:%M:%S").to_string())
    }

    /// Players screen rows: position filter applied, then current sort.
    /// Sorting is stable so equal keys keep table order.
    pub fn filtered_players(&self) -> Vec<&PlayerRecord> {
        let Some(table) = self.current_table() else {
            return Vec::new();
        };
        let mut rows: Vec<&PlayerRecord> = table
            .rows
            .iter()
            .filter(|r| {
                self.position_filter
                    .is_none_or(|p| r.position == Some(p))
            })
            .collect();
        match self.sort {
            SortMode::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            SortMode::Age => rows.sort_by(|a, b| {
                stat_or_nan(a, StatKey::Age)
                    .partial_cmp(&stat_or_nan(b, StatKey::Age))
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            sort => {
                let key = match sort {
                    SortMode::Rating => StatKey::Rating,
                    SortMode::Goals => StatKey::GoalsTotal,
                    _ => StatKey::Assists,
                };
                rows.sort_by(|a, b| {
                    stat_or_nan(b, key)
                        .partial_cmp(&stat_or_nan(a, key))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
        }
        rows
    }

    pub fn selected_player(&self) -> Option<&PlayerRecord> {
        let rows = self.filtered_players();
        rows.get(self.selected.min(rows.len().saturating_sub(1)))
            .copied()
    }

    pub fn select_next(&mut self) {
        let len = self.filtered_players().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.selected = 0;
    }

    pub fn cycle_league(&mut self) {
        if !self.leagues.is_empty() {
            self.league_idx = (self.league_idx + 1) % self.leagues.len();
            self.selected = 0;
        }
    }

    pub fn cycle_position_filter(&mut self) {
        self.position_filter = match self.position_filter {
            None => Some(Position::Goalkeeper),
            Some(Position::Goalkeeper) => Some(Position::Defender),
            Some(Position::Defender) => Some(Position::Midfielder),
            Some(Position::Midfielder) => Some(Position::Attacker),
            Some(Position::Attacker) => None,
        };
        self.selected = 0;
    }

    pub fn cycle_dashboard_metric(&mut self) {
        self.dashboard_metric_idx = (self.dashboard_metric_idx + 1) % DASHBOARD_METRICS.len();
    }

    pub fn open_detail(&mut self, record: PlayerRecord, back: Screen) {
        self.detail_back = back;
        self.detail = Some(record);
        self.screen = Screen::PlayerDetail;
        self.refresh_detail_similar();
    }

    /// Auto-recommend for the detail view: same position, toggles picked by
    /// role.
    pub fn refresh_detail_similar(&mut self) {
        self.detail_similar.clear();
        let Some(record) = self.detail.clone() else {
            return;
        };
        let Some(table) = self.tables.get(&record.league_id) else {
            return;
        };
        let features = match record.position {
            Some(Position::Goalkeeper) => FeatureToggles::keeper(),
            _ => FeatureToggles::outfield(),
        };
        let query = RecommendationQuery {
            reference: Some(record.id),
            position: record.position,
            features,
            ..RecommendationQuery::default()
        };
        match recommender::find_similar(table, &query) {
            Ok(similar) => self.detail_similar = similar,
            Err(RecommendError::ReferenceNotFound(_)) => {}
            Err(err) => self.push_log(format!("[WARN] Similar players: {err}")),
        }
    }

    pub fn run_recommendation(&mut self) {
        self.recommend_notice = None;
        self.recommendations.clear();
        let Some(table) = self.tables.get(&self.current_league_id()).cloned() else {
            self.recommend_notice = Some("No player data loaded yet".to_string());
            return;
        };
        match recommender::find_similar(&table, &self.query) {
            Ok(recs) if recs.is_empty() => {
                self.recommend_notice = Some("No players match the filters".to_string());
            }
            Ok(recs) => self.recommendations = recs,
            Err(err) => {
                self.recommend_notice = Some(err.to_string());
                self.push_log(format!("[INFO] Recommendation rejected: {err}"));
            }
        }
    }
}

fn stat_or_nan(record: &PlayerRecord, key: StatKey) -> f64 {
    record.stat(key).unwrap_or(f64::NAN)
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetPlayers { league_id: u32, table: PlayerTable },
    SetPlayerDetail { record: PlayerRecord },
    ExportFinished { path: String, players: usize },
    CacheCleared { removed: usize },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchTopPlayers { league_id: u32, season: u16 },
    FetchLeaguePlayers { league_id: u32, season: u16 },
    FetchPlayer { player_id: u32, season: u16 },
    ExportPlayers {
        path: String,
        league_id: u32,
        recommendations: Vec<Recommendation>,
    },
    ClearCache,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetPlayers { league_id, table } => {
            let count = table.len();
            state.tables.insert(league_id, table);
            state.fetched_at.insert(league_id, SystemTime::now());
            if league_id == state.current_league_id() {
                state.players_loading = false;
                let len = state.filtered_players().len();
                if state.selected >= len {
                    state.selected = len.saturating_sub(1);
                }
            }
            if state
                .detail
                .as_ref()
                .is_some_and(|d| d.league_id == league_id)
            {
                // Detail rows are replaced wholesale by the refetch.
                let refreshed = state.detail.as_ref().and_then(|d| {
                    state.tables[&league_id].get_by_id(d.id).cloned()
                });
                if let Some(record) = refreshed {
                    state.detail = Some(record);
                }
                state.refresh_detail_similar();
            }
            state.push_log(format!("[INFO] Loaded {count} player rows (league {league_id})"));
        }
        Delta::SetPlayerDetail { record } => {
            state.detail = Some(record);
            state.refresh_detail_similar();
        }
        Delta::ExportFinished { path, players } => {
            state.export_notice = Some(format!("Exported {players} players to {path}"));
            state.push_log(format!("[INFO] Export finished: {path}"));
        }
        Delta::CacheCleared { removed } => {
            state.push_log(format!("[INFO] HTTP cache cleared ({removed} entries)"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
