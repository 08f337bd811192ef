use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_processor::{
    PlayerRecord, PlayerTable, Position, StatKey, populated_intersection,
};

pub const DEFAULT_LIMIT: usize = 5;

// Treated as zero spread; such columns carry no signal and are dropped.
const STD_EPSILON: f64 = 1e-9;

const SHOOTING_COLUMNS: &[StatKey] = &[
    StatKey::ShotsTotal,
    StatKey::ShotsOnTarget,
    StatKey::GoalsTotal,
    StatKey::ShotConversionPct,
    StatKey::GoalsPer90,
    StatKey::ShotsPer90,
];
const PASSING_COLUMNS: &[StatKey] = &[
    StatKey::PassesTotal,
    StatKey::KeyPasses,
    StatKey::PassAccuracy,
    StatKey::Assists,
    StatKey::AssistsPer90,
    StatKey::PassesPer90,
];
const DEFENSE_COLUMNS: &[StatKey] = &[
    StatKey::TacklesTotal,
    StatKey::Blocks,
    StatKey::Interceptions,
    StatKey::TacklesPer90,
];
const DUELS_COLUMNS: &[StatKey] = &[
    StatKey::DuelsTotal,
    StatKey::DuelsWon,
    StatKey::DuelSuccessPct,
];
const GOALKEEPING_COLUMNS: &[StatKey] = &[
    StatKey::Saves,
    StatKey::GoalsConceded,
    StatKey::SavesPer90,
];
const PROFILE_COLUMNS: &[StatKey] = &[
    StatKey::Age,
    StatKey::Appearances,
    StatKey::MinutesPlayed,
    StatKey::Rating,
    StatKey::MinutesPerAppearance,
];

/// Boolean toggles selecting which stat columns feed the distance
/// computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub shooting: bool,
    pub passing: bool,
    pub defense: bool,
    pub duels: bool,
    pub goalkeeping: bool,
    pub profile: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self::outfield()
    }
}

impl FeatureToggles {
    pub fn none() -> Self {
        Self {
            shooting: false,
            passing: false,
            defense: false,
            duels: false,
            goalkeeping: false,
            profile: false,
        }
    }

    pub fn outfield() -> Self {
        Self {
            shooting: true,
            passing: true,
            defense: true,
            duels: true,
            goalkeeping: false,
            profile: true,
        }
    }

    pub fn keeper() -> Self {
        Self {
            shooting: false,
            passing: true,
            defense: false,
            duels: true,
            goalkeeping: true,
            profile: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.shooting
            || self.passing
            || self.defense
            || self.duels
            || self.goalkeeping
            || self.profile)
    }

    /// Selected columns in canonical order.
    pub fn columns(&self) -> Vec<StatKey> {
        StatKey::ALL
            .iter()
            .copied()
            .filter(|key| {
                (self.shooting && SHOOTING_COLUMNS.contains(key))
                    || (self.passing && PASSING_COLUMNS.contains(key))
                    || (self.defense && DEFENSE_COLUMNS.contains(key))
                    || (self.duels && DUELS_COLUMNS.contains(key))
                    || (self.goalkeeping && GOALKEEPING_COLUMNS.contains(key))
                    || (self.profile && PROFILE_COLUMNS.contains(key))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub reference: Option<u32>,
    pub position: Option<Position>,
    pub min_rating: Option<f64>,
    pub max_age: Option<f64>,
    pub min_minutes: Option<f64>,
    pub features: FeatureToggles,
    pub limit: usize,
}

impl Default for RecommendationQuery {
    fn default() -> Self {
        Self {
            reference: None,
            position: None,
            min_rating: None,
            max_age: None,
            min_minutes: None,
            features: FeatureToggles::outfield(),
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub player: PlayerRecord,
    pub similarity: f64,
    pub distance: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecommendError {
    #[error("no feature toggles selected")]
    EmptyFeatureSet,
    #[error("selected features share no populated columns for this player pool")]
    NoUsableColumns,
    #[error("reference player {0} not found in table")]
    ReferenceNotFound(u32),
}

/// Nearest players by standardized Euclidean distance.
///
/// Filter, select toggle columns, standardize across the filtered set,
/// rank by distance to the reference vector (or to the pool centroid when
/// no reference is given). Similarity is `1 / (1 + distance)`; ties keep
/// table order. The reference never appears in its own result.
pub fn find_similar(
    table: &PlayerTable,
    query: &RecommendationQuery,
) -> Result<Vec<Recommendation>, RecommendError> {
    if query.features.is_empty() {
        return Err(RecommendError::EmptyFeatureSet);
    }

    let reference = match query.reference {
        Some(id) => Some(
            table
                .get_by_id(id)
                .ok_or(RecommendError::ReferenceNotFound(id))?,
        ),
        None => None,
    };

    let filtered: Vec<&PlayerRecord> = table
        .rows
        .iter()
        .filter(|r| matches_filters(r, query))
        .collect();
    if filtered.is_empty() {
        return Ok(Vec::new());
    }

    // The reference joins the populated-columns check even when it fails
    // the filters; its vector still has to be scalable.
    let mut pool = filtered.clone();
    if let Some(r) = reference {
        if !pool.iter().any(|p| p.id == r.id) {
            pool.push(r);
        }
    }
    let populated = populated_intersection(&pool);
    let usable: Vec<StatKey> = query
        .features
        .columns()
        .into_iter()
        .filter(|key| populated.contains(key))
        .collect();
    if usable.is_empty() {
        return Err(RecommendError::NoUsableColumns);
    }

    let scaling: Vec<(StatKey, f64, f64)> = usable
        .iter()
        .filter_map(|key| {
            let values: Vec<f64> = filtered.iter().map(|r| r.stats[key]).collect();
            let (mean, std) = mean_std(&values);
            (std > STD_EPSILON).then_some((*key, mean, std))
        })
        .collect();
    if scaling.is_empty() {
        return Err(RecommendError::NoUsableColumns);
    }

    let scale = |r: &PlayerRecord| -> Vec<f64> {
        scaling
            .iter()
            .map(|(key, mean, std)| (r.stats[key] - mean) / std)
            .collect()
    };

    let target: Vec<f64> = match reference {
        Some(r) => scale(r),
        None => centroid(&filtered.iter().map(|r| scale(r)).collect::<Vec<_>>()),
    };

    let mut scored: Vec<Recommendation> = filtered
        .iter()
        .filter(|r| reference.is_none_or(|f| r.id != f.id))
        .map(|r| {
            let distance = euclidean(&scale(r), &target);
            Recommendation {
                player: (*r).clone(),
                similarity: 1.0 / (1.0 + distance),
                distance,
            }
        })
        .collect();

    // Stable sort: equal distances keep original table order.
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(query.limit);
    Ok(scored)
}

fn matches_filters(record: &PlayerRecord, query: &RecommendationQuery) -> bool {
    if let Some(position) = query.position {
        if record.position != Some(position) {
            return false;
        }
    }
    if let Some(min_rating) = query.min_rating {
        match record.rating() {
            Some(rating) if rating >= min_rating => {}
            _ => return false,
        }
    }
    if let Some(max_age) = query.max_age {
        match record.age() {
            Some(age) if age <= max_age => {}
            _ => return false,
        }
    }
    if let Some(min_minutes) = query.min_minutes {
        match record.stat(StatKey::MinutesPlayed) {
            Some(minutes) if minutes >= min_minutes => {}
            _ => return false,
        }
    }
    true
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn centroid(vectors: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut out = vec![0.0; first.len()];
    for v in vectors {
        for (slot, value) in out.iter_mut().zip(v) {
            *slot += value;
        }
    }
    for slot in &mut out {
        *slot /= vectors.len() as f64;
    }
    out
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_std_is_population_stddev() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn euclidean_matches_hand_computation() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn toggle_columns_keep_canonical_order() {
        let toggles = FeatureToggles {
            shooting: true,
            passing: true,
            ..FeatureToggles::none()
        };
        let columns = toggles.columns();
        let shots = columns.iter().position(|k| *k == StatKey::ShotsTotal).unwrap();
        let passes = columns.iter().position(|k| *k == StatKey::PassesTotal).unwrap();
        assert!(shots < passes);
        assert!(!columns.contains(&StatKey::TacklesTotal));
    }

    #[test]
    fn empty_toggles_have_no_columns() {
        assert!(FeatureToggles::none().is_empty());
        assert!(FeatureToggles::none().columns().is_empty());
    }

    #[test]
    fn centroid_averages_vectors() {
        let c = centroid(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(c, vec![2.0, 3.0]);
    }
}
