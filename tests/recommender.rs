use std::collections::HashMap;

use scout_terminal::data_processor::{PlayerRecord, PlayerTable, Position, StatKey};
use scout_terminal::recommender::{
    FeatureToggles, RecommendError, RecommendationQuery, find_similar,
};

fn record(id: u32, position: Position, stats: &[(StatKey, f64)]) -> PlayerRecord {
    PlayerRecord {
        id,
        name: format!("P{id}"),
        team: "T".to_string(),
        position: Some(position),
        nationality: None,
        height: None,
        weight: None,
        league_id: 39,
        league_name: "Premier League".to_string(),
        season: 2023,
        stats: stats.iter().copied().collect::<HashMap<_, _>>(),
    }
}

fn attacker(id: u32, goals: f64, shots: f64, rating: f64, age: f64) -> PlayerRecord {
    record(
        id,
        Position::Attacker,
        &[
            (StatKey::GoalsTotal, goals),
            (StatKey::ShotsTotal, shots),
            (StatKey::Rating, rating),
            (StatKey::Age, age),
            (StatKey::MinutesPlayed, 2000.0),
        ],
    )
}

fn shooting_only() -> FeatureToggles {
    FeatureToggles {
        shooting: true,
        ..FeatureToggles::none()
    }
}

fn sample_table() -> PlayerTable {
    PlayerTable {
        rows: vec![
            attacker(1, 20.0, 90.0, 7.9, 24.0),
            attacker(2, 19.0, 88.0, 7.7, 27.0),
            attacker(3, 5.0, 30.0, 6.6, 31.0),
            attacker(4, 21.0, 95.0, 8.0, 22.0),
            attacker(5, 2.0, 15.0, 6.2, 19.0),
            record(
                6,
                Position::Defender,
                &[
                    (StatKey::GoalsTotal, 3.0),
                    (StatKey::ShotsTotal, 20.0),
                    (StatKey::Rating, 7.1),
                    (StatKey::Age, 28.0),
                    (StatKey::MinutesPlayed, 2500.0),
                ],
            ),
        ],
    }
}

#[test]
fn reference_never_appears_in_its_own_result() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert!(!recs.is_empty());
    assert!(recs.iter().all(|r| r.player.id != 1));
}

#[test]
fn similarity_is_non_increasing() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    for pair in recs.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[test]
fn nearest_neighbor_comes_first() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    // Players 2 and 4 shadow the reference's shooting profile; player 5
    // is the far outlier.
    assert!(matches!(recs[0].player.id, 2 | 4));
    assert_eq!(recs.last().unwrap().player.id, 5);
}

#[test]
fn position_filter_matches_exactly() {
    let table = sample_table();
    let query = RecommendationQuery {
        position: Some(Position::Attacker),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert!(!recs.is_empty());
    assert!(
        recs.iter()
            .all(|r| r.player.position == Some(Position::Attacker))
    );
}

#[test]
fn empty_feature_selection_always_fails() {
    let table = sample_table();
    let with_reference = RecommendationQuery {
        reference: Some(1),
        features: FeatureToggles::none(),
        ..RecommendationQuery::default()
    };
    assert_eq!(
        find_similar(&table, &with_reference).unwrap_err(),
        RecommendError::EmptyFeatureSet
    );

    let without_reference = RecommendationQuery {
        features: FeatureToggles::none(),
        ..RecommendationQuery::default()
    };
    assert_eq!(
        find_similar(&table, &without_reference).unwrap_err(),
        RecommendError::EmptyFeatureSet
    );
}

#[test]
fn unknown_reference_is_reported() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(999),
        features: shooting_only(),
        ..RecommendationQuery::default()
    };
    assert_eq!(
        find_similar(&table, &query).unwrap_err(),
        RecommendError::ReferenceNotFound(999)
    );
}

#[test]
fn ties_keep_original_table_order() {
    // Two candidates with identical stats sit at the same distance.
    let table = PlayerTable {
        rows: vec![
            attacker(10, 10.0, 50.0, 7.0, 25.0),
            attacker(11, 8.0, 40.0, 7.0, 25.0),
            attacker(12, 8.0, 40.0, 7.0, 25.0),
            attacker(13, 2.0, 10.0, 7.0, 25.0),
        ],
    };
    let query = RecommendationQuery {
        reference: Some(10),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    let ids: Vec<u32> = recs.iter().map(|r| r.player.id).collect();
    assert_eq!(ids, vec![11, 12, 13]);
}

#[test]
fn numeric_filters_restrict_the_pool() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        min_rating: Some(7.0),
        max_age: Some(28.0),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert!(!recs.is_empty());
    for rec in &recs {
        assert!(rec.player.rating().unwrap() >= 7.0);
        assert!(rec.player.age().unwrap() <= 28.0);
    }
    assert!(recs.iter().all(|r| r.player.id != 3 && r.player.id != 5));
}

#[test]
fn centroid_ranking_prefers_the_most_typical_player() {
    let table = PlayerTable {
        rows: vec![
            attacker(21, 1.0, 10.0, 7.0, 25.0),
            attacker(22, 10.0, 50.0, 7.0, 25.0),
            attacker(23, 19.0, 90.0, 7.0, 25.0),
        ],
    };
    let query = RecommendationQuery {
        reference: None,
        features: shooting_only(),
        limit: 3,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert_eq!(recs[0].player.id, 22);
    assert_eq!(recs.len(), 3);
}

#[test]
fn toggles_without_populated_columns_are_rejected() {
    // Outfield pool: no goalkeeping columns anywhere.
    let table = sample_table();
    let query = RecommendationQuery {
        features: FeatureToggles {
            goalkeeping: true,
            ..FeatureToggles::none()
        },
        ..RecommendationQuery::default()
    };
    assert_eq!(
        find_similar(&table, &query).unwrap_err(),
        RecommendError::NoUsableColumns
    );
}

#[test]
fn zero_variance_columns_carry_no_signal() {
    // Rating is constant across the pool; distances must come from the
    // goal/shot spread alone instead of dividing by a zero spread.
    let table = PlayerTable {
        rows: vec![
            attacker(31, 10.0, 50.0, 7.0, 25.0),
            attacker(32, 11.0, 52.0, 7.0, 25.0),
            attacker(33, 1.0, 5.0, 7.0, 25.0),
        ],
    };
    let query = RecommendationQuery {
        reference: Some(31),
        features: FeatureToggles {
            shooting: true,
            profile: true,
            ..FeatureToggles::none()
        },
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert_eq!(recs[0].player.id, 32);
    assert!(recs.iter().all(|r| r.distance.is_finite()));
}

#[test]
fn limit_bounds_the_result() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        features: shooting_only(),
        limit: 2,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    assert_eq!(recs.len(), 2);
}

#[test]
fn similarity_is_inverse_of_distance() {
    let table = sample_table();
    let query = RecommendationQuery {
        reference: Some(1),
        features: shooting_only(),
        limit: 10,
        ..RecommendationQuery::default()
    };
    let recs = find_similar(&table, &query).unwrap();
    for rec in &recs {
        assert!((rec.similarity - 1.0 / (1.0 + rec.distance)).abs() < 1e-12);
    }
}
