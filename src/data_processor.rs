use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api_client::{RawPlayerEntry, RawPlayerInfo, RawStatBlock};

/// Canonical stat columns. Declaration order is the display/export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKey {
    Age,
    Appearances,
    MinutesPlayed,
    Rating,
    ShotsTotal,
    ShotsOnTarget,
    GoalsTotal,
    Assists,
    KeyPasses,
    PassesTotal,
    PassAccuracy,
    TacklesTotal,
    Blocks,
    Interceptions,
    DuelsTotal,
    DuelsWon,
    Saves,
    GoalsConceded,
    MinutesPerAppearance,
    ShotConversionPct,
    DuelSuccessPct,
    GoalsPer90,
    AssistsPer90,
    ShotsPer90,
    PassesPer90,
    TacklesPer90,
    SavesPer90,
}

impl StatKey {
    pub const ALL: &'static [StatKey] = &[
        StatKey::Age,
        StatKey::Appearances,
        StatKey::MinutesPlayed,
        StatKey::Rating,
        StatKey::ShotsTotal,
        StatKey::ShotsOnTarget,
        StatKey::GoalsTotal,
        StatKey::Assists,
        StatKey::KeyPasses,
        StatKey::PassesTotal,
        StatKey::PassAccuracy,
        StatKey::TacklesTotal,
        StatKey::Blocks,
        StatKey::Interceptions,
        StatKey::DuelsTotal,
        StatKey::DuelsWon,
        StatKey::Saves,
        StatKey::GoalsConceded,
        StatKey::MinutesPerAppearance,
        StatKey::ShotConversionPct,
        StatKey::DuelSuccessPct,
        StatKey::GoalsPer90,
        StatKey::AssistsPer90,
        StatKey::ShotsPer90,
        StatKey::PassesPer90,
        StatKey::TacklesPer90,
        StatKey::SavesPer90,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatKey::Age => "age",
            StatKey::Appearances => "appearances",
            StatKey::MinutesPlayed => "minutes_played",
            StatKey::Rating => "rating",
            StatKey::ShotsTotal => "shots_total",
            StatKey::ShotsOnTarget => "shots_on_target",
            StatKey::GoalsTotal => "goals_total",
            StatKey::Assists => "assists",
            StatKey::KeyPasses => "key_passes",
            StatKey::PassesTotal => "passes_total",
            StatKey::PassAccuracy => "pass_accuracy",
            StatKey::TacklesTotal => "tackles_total",
            StatKey::Blocks => "blocks",
            StatKey::Interceptions => "interceptions",
            StatKey::DuelsTotal => "duels_total",
            StatKey::DuelsWon => "duels_won",
            StatKey::Saves => "saves",
            StatKey::GoalsConceded => "goals_conceded",
            StatKey::MinutesPerAppearance => "minutes_per_appearance",
            StatKey::ShotConversionPct => "shot_conversion_pct",
            StatKey::DuelSuccessPct => "duel_success_pct",
            StatKey::GoalsPer90 => "goals_per90",
            StatKey::AssistsPer90 => "assists_per90",
            StatKey::ShotsPer90 => "shots_per90",
            StatKey::PassesPer90 => "passes_per90",
            StatKey::TacklesPer90 => "tackles_per90",
            StatKey::SavesPer90 => "saves_per90",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Attacker,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Attacker,
    ];

    pub fn from_text(raw: &str) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        if s.is_empty() {
            return None;
        }
        if s.contains("goalkeeper") || s.contains("keeper") || s == "gk" {
            return Some(Position::Goalkeeper);
        }
        if s.contains("defender") || s.contains("back") {
            return Some(Position::Defender);
        }
        if s.contains("midfield") {
            return Some(Position::Midfielder);
        }
        if s.contains("attacker")
            || s.contains("forward")
            || s.contains("striker")
            || s.contains("wing")
        {
            return Some(Position::Attacker);
        }
        None
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Attacker => "Attacker",
        }
    }
}

/// One player's stat snapshot for a season/league. Built once by
/// `normalize` and replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: Option<Position>,
    pub nationality: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub league_id: u32,
    pub league_name: String,
    pub season: u16,
    pub stats: HashMap<StatKey, f64>,
}

impl PlayerRecord {
    pub fn stat(&self, key: StatKey) -> Option<f64> {
        self.stats.get(&key).copied()
    }

    pub fn rating(&self) -> Option<f64> {
        self.stat(StatKey::Rating)
    }

    pub fn age(&self) -> Option<f64> {
        self.stat(StatKey::Age)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTable {
    pub rows: Vec<PlayerRecord>,
}

impl PlayerTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get_by_id(&self, id: u32) -> Option<&PlayerRecord> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn players_by_position(&self, position: Position) -> Vec<&PlayerRecord> {
        self.rows
            .iter()
            .filter(|r| r.position == Some(position))
            .collect()
    }

    /// Top n rows by a metric, descending; rows without the metric are
    /// skipped. Stable, so ties keep table order.
    pub fn top_by_metric(&self, key: StatKey, n: usize) -> Vec<&PlayerRecord> {
        let mut rows: Vec<&PlayerRecord> =
            self.rows.iter().filter(|r| r.stat(key).is_some()).collect();
        rows.sort_by(|a, b| {
            let av = a.stat(key).unwrap_or(f64::NEG_INFINITY);
            let bv = b.stat(key).unwrap_or(f64::NEG_INFINITY);
            bv.partial_cmp(&av).unwrap_or(std::cmp::Ordering::Equal)
        });
        rows.truncate(n);
        rows
    }

    /// Columns populated in every row, in canonical order. Numeric work
    /// across mixed positions must stay inside this set.
    pub fn populated_columns(&self) -> Vec<StatKey> {
        populated_intersection(&self.rows.iter().collect::<Vec<_>>())
    }
}

pub fn populated_intersection(rows: &[&PlayerRecord]) -> Vec<StatKey> {
    if rows.is_empty() {
        return Vec::new();
    }
    StatKey::ALL
        .iter()
        .copied()
        .filter(|key| rows.iter().all(|r| r.stats.contains_key(key)))
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("record {index}: missing identity field `{field}`")]
    MissingIdentity { index: usize, field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    League,
    Season,
    Position,
    Team,
}

// Per-position stat schemas. Keys outside a position's schema are left
// unpopulated instead of zero-filled, which is what keeps the
// populated-columns intersection meaningful across mixed pools.
const OUTFIELD_BASE: &[StatKey] = &[
    StatKey::Age,
    StatKey::Appearances,
    StatKey::MinutesPlayed,
    StatKey::Rating,
    StatKey::ShotsTotal,
    StatKey::ShotsOnTarget,
    StatKey::GoalsTotal,
    StatKey::Assists,
    StatKey::KeyPasses,
    StatKey::PassesTotal,
    StatKey::PassAccuracy,
    StatKey::TacklesTotal,
    StatKey::Blocks,
    StatKey::Interceptions,
    StatKey::DuelsTotal,
    StatKey::DuelsWon,
];

const OUTFIELD_DERIVED: &[StatKey] = &[
    StatKey::MinutesPerAppearance,
    StatKey::ShotConversionPct,
    StatKey::DuelSuccessPct,
    StatKey::GoalsPer90,
    StatKey::AssistsPer90,
    StatKey::ShotsPer90,
    StatKey::PassesPer90,
    StatKey::TacklesPer90,
];

const KEEPER_BASE: &[StatKey] = &[
    StatKey::Age,
    StatKey::Appearances,
    StatKey::MinutesPlayed,
    StatKey::Rating,
    StatKey::GoalsTotal,
    StatKey::Assists,
    StatKey::PassesTotal,
    StatKey::PassAccuracy,
    StatKey::DuelsTotal,
    StatKey::DuelsWon,
    StatKey::Saves,
    StatKey::GoalsConceded,
];

const KEEPER_DERIVED: &[StatKey] = &[
    StatKey::MinutesPerAppearance,
    StatKey::DuelSuccessPct,
    StatKey::PassesPer90,
    StatKey::SavesPer90,
];

const COMMON_BASE: &[StatKey] = &[
    StatKey::Age,
    StatKey::Appearances,
    StatKey::MinutesPlayed,
    StatKey::Rating,
    StatKey::PassesTotal,
    StatKey::PassAccuracy,
];

const COMMON_DERIVED: &[StatKey] = &[StatKey::MinutesPerAppearance, StatKey::PassesPer90];

fn base_schema(position: Option<Position>) -> &'static [StatKey] {
    match position {
        Some(Position::Goalkeeper) => KEEPER_BASE,
        Some(_) => OUTFIELD_BASE,
        None => COMMON_BASE,
    }
}

fn derived_schema(position: Option<Position>) -> &'static [StatKey] {
    match position {
        Some(Position::Goalkeeper) => KEEPER_DERIVED,
        Some(_) => OUTFIELD_DERIVED,
        None => COMMON_DERIVED,
    }
}

// Rating-like columns get the column mean; counting stats get zero.
fn mean_filled(key: StatKey) -> bool {
    matches!(key, StatKey::Rating | StatKey::PassAccuracy)
}

/// Build a table from raw API entries: one row per (player, statistics
/// block), missing values filled per column policy, derived metrics
/// computed last. Deterministic, so identical input yields an identical
/// table.
pub fn normalize(
    raw: &[RawPlayerEntry],
    default_season: u16,
) -> Result<PlayerTable, SchemaError> {
    let mut rows = Vec::new();
    for (index, entry) in raw.iter().enumerate() {
        let id = entry
            .player
            .id
            .ok_or(SchemaError::MissingIdentity { index, field: "player.id" })?;
        let name = identity_name(&entry.player)
            .ok_or(SchemaError::MissingIdentity { index, field: "player.name" })?;
        for block in &entry.statistics {
            rows.push(build_row(id, &name, &entry.player, block, default_season));
        }
    }

    fill_missing(&mut rows);
    for row in &mut rows {
        compute_derived(row);
    }
    Ok(PlayerTable { rows })
}

/// Per-group mean summaries over each group's populated intersection.
/// Summary rows are synthetic records named after the group.
pub fn aggregate(table: &PlayerTable, groupby: GroupBy) -> PlayerTable {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&PlayerRecord>> = HashMap::new();
    for row in &table.rows {
        let label = group_label(row, groupby);
        if !groups.contains_key(&label) {
            order.push(label.clone());
        }
        groups.entry(label).or_default().push(row);
    }

    let mut rows = Vec::new();
    for (i, label) in order.iter().enumerate() {
        let members = &groups[label];
        let columns = populated_intersection(members);
        let mut stats = HashMap::new();
        for key in columns {
            let sum: f64 = members.iter().map(|r| r.stats[&key]).sum();
            stats.insert(key, sum / members.len() as f64);
        }
        let first = members[0];
        rows.push(PlayerRecord {
            id: (i + 1) as u32,
            name: label.clone(),
            team: if groupby == GroupBy::Team { label.clone() } else { String::new() },
            position: if groupby == GroupBy::Position { first.position } else { None },
            nationality: None,
            height: None,
            weight: None,
            league_id: if groupby == GroupBy::League { first.league_id } else { 0 },
            league_name: if groupby == GroupBy::League {
                first.league_name.clone()
            } else {
                String::new()
            },
            season: first.season,
            stats,
        });
    }
    PlayerTable { rows }
}

fn group_label(row: &PlayerRecord, groupby: GroupBy) -> String {
    match groupby {
        GroupBy::League => {
            if row.league_name.is_empty() {
                format!("League {}", row.league_id)
            } else {
                row.league_name.clone()
            }
        }
        GroupBy::Season => row.season.to_string(),
        GroupBy::Position => row
            .position
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        GroupBy::Team => row.team.clone(),
    }
}

fn identity_name(player: &RawPlayerInfo) -> Option<String> {
    if let Some(name) = player.name.as_ref() {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }
    match (player.firstname.as_deref(), player.lastname.as_deref()) {
        (Some(first), Some(last)) if !first.trim().is_empty() && !last.trim().is_empty() => {
            Some(format!("{} {}", first.trim(), last.trim()))
        }
        _ => None,
    }
}

fn build_row(
    id: u32,
    name: &str,
    player: &RawPlayerInfo,
    block: &RawStatBlock,
    default_season: u16,
) -> PlayerRecord {
    let games = block.games.as_ref();
    let position = games
        .and_then(|g| g.position.as_deref())
        .or(player.position.as_deref())
        .and_then(Position::from_text);

    let mut stats = HashMap::new();
    let mut put = |key: StatKey, value: Option<f64>| {
        if let Some(v) = value {
            if v.is_finite() {
                stats.insert(key, v);
            }
        }
    };

    put(StatKey::Age, player.age.map(|a| a as f64));
    if let Some(games) = games {
        put(StatKey::Appearances, games.appearances);
        put(StatKey::MinutesPlayed, games.minutes);
        put(StatKey::Rating, parse_stat_value(&games.rating));
    }
    if let Some(shots) = block.shots.as_ref() {
        put(StatKey::ShotsTotal, shots.total);
        put(StatKey::ShotsOnTarget, shots.on);
    }
    if let Some(goals) = block.goals.as_ref() {
        put(StatKey::GoalsTotal, goals.total);
        put(StatKey::Assists, goals.assists);
        put(StatKey::Saves, goals.saves);
        put(StatKey::GoalsConceded, goals.conceded);
    }
    if let Some(passes) = block.passes.as_ref() {
        put(StatKey::PassesTotal, passes.total);
        put(StatKey::KeyPasses, passes.key);
        put(StatKey::PassAccuracy, parse_stat_value(&passes.accuracy));
    }
    if let Some(tackles) = block.tackles.as_ref() {
        put(StatKey::TacklesTotal, tackles.total);
        put(StatKey::Blocks, tackles.blocks);
        put(StatKey::Interceptions, tackles.interceptions);
    }
    if let Some(duels) = block.duels.as_ref() {
        put(StatKey::DuelsTotal, duels.total);
        put(StatKey::DuelsWon, duels.won);
    }

    let league = block.league.as_ref();
    PlayerRecord {
        id,
        name: name.to_string(),
        team: block
            .team
            .as_ref()
            .and_then(|t| t.name.clone())
            .unwrap_or_default(),
        position,
        nationality: player.nationality.clone(),
        height: player.height.clone(),
        weight: player.weight.clone(),
        league_id: league.and_then(|l| l.id).unwrap_or_default(),
        league_name: league.and_then(|l| l.name.clone()).unwrap_or_default(),
        season: league.and_then(|l| l.season).unwrap_or(default_season),
        stats,
    }
}

// Mean fills are computed per position so keeper averages never leak into
// outfield rows.
fn fill_missing(rows: &mut [PlayerRecord]) {
    let mut means: HashMap<(Option<Position>, StatKey), (f64, usize)> = HashMap::new();
    for row in rows.iter() {
        for key in base_schema(row.position) {
            if !mean_filled(*key) {
                continue;
            }
            if let Some(v) = row.stat(*key) {
                let slot = means.entry((row.position, *key)).or_insert((0.0, 0));
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    for row in rows.iter_mut() {
        for key in base_schema(row.position) {
            if row.stats.contains_key(key) {
                continue;
            }
            let fill = if mean_filled(*key) {
                means
                    .get(&(row.position, *key))
                    .map(|(sum, n)| sum / *n as f64)
                    .unwrap_or(0.0)
            } else {
                0.0
            };
            row.stats.insert(*key, fill);
        }
    }
}

// All base keys are present after the fill pass; the guards only protect
// against zero denominators.
fn compute_derived(row: &mut PlayerRecord) {
    let minutes = row.stat(StatKey::MinutesPlayed).unwrap_or(0.0);
    let per90 = |v: f64| if minutes > 0.0 { v * 90.0 / minutes } else { 0.0 };
    let ratio_pct = |num: f64, den: f64| if den > 0.0 { num / den * 100.0 } else { 0.0 };

    for key in derived_schema(row.position) {
        let value = match key {
            StatKey::MinutesPerAppearance => {
                let apps = row.stat(StatKey::Appearances).unwrap_or(0.0);
                if apps > 0.0 { minutes / apps } else { 0.0 }
            }
            StatKey::ShotConversionPct => ratio_pct(
                row.stat(StatKey::GoalsTotal).unwrap_or(0.0),
                row.stat(StatKey::ShotsTotal).unwrap_or(0.0),
            ),
            StatKey::DuelSuccessPct => ratio_pct(
                row.stat(StatKey::DuelsWon).unwrap_or(0.0),
                row.stat(StatKey::DuelsTotal).unwrap_or(0.0),
            ),
            StatKey::GoalsPer90 => per90(row.stat(StatKey::GoalsTotal).unwrap_or(0.0)),
            StatKey::AssistsPer90 => per90(row.stat(StatKey::Assists).unwrap_or(0.0)),
            StatKey::ShotsPer90 => per90(row.stat(StatKey::ShotsTotal).unwrap_or(0.0)),
            StatKey::PassesPer90 => per90(row.stat(StatKey::PassesTotal).unwrap_or(0.0)),
            StatKey::TacklesPer90 => per90(row.stat(StatKey::TacklesTotal).unwrap_or(0.0)),
            StatKey::SavesPer90 => per90(row.stat(StatKey::Saves).unwrap_or(0.0)),
            _ => continue,
        };
        if value.is_finite() {
            row.stats.insert(*key, value);
        }
    }
}

pub fn parse_stat_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches('%');
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_handles_decorations() {
        assert_eq!(parse_number("7.2"), Some(7.2));
        assert_eq!(parse_number("84%"), Some(84.0));
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn position_from_text_covers_api_spellings() {
        assert_eq!(Position::from_text("Goalkeeper"), Some(Position::Goalkeeper));
        assert_eq!(Position::from_text("GK"), Some(Position::Goalkeeper));
        assert_eq!(Position::from_text("Centre-Back"), Some(Position::Defender));
        assert_eq!(Position::from_text("Defensive Midfield"), Some(Position::Midfielder));
        assert_eq!(Position::from_text("Forward"), Some(Position::Attacker));
        assert_eq!(Position::from_text("Winger"), Some(Position::Attacker));
        assert_eq!(Position::from_text(""), None);
        assert_eq!(Position::from_text("Coach"), None);
    }

    #[test]
    fn keeper_schema_differs_from_outfield() {
        assert!(KEEPER_BASE.contains(&StatKey::Saves));
        assert!(!OUTFIELD_BASE.contains(&StatKey::Saves));
        assert!(OUTFIELD_BASE.contains(&StatKey::ShotsTotal));
        assert!(!KEEPER_BASE.contains(&StatKey::ShotsTotal));
    }

    #[test]
    fn rating_and_accuracy_are_mean_filled() {
        assert!(mean_filled(StatKey::Rating));
        assert!(mean_filled(StatKey::PassAccuracy));
        assert!(!mean_filled(StatKey::GoalsTotal));
    }
}
