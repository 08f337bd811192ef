use std::fs;
use std::path::PathBuf;

use scout_terminal::api_client::parse_players_json;
use scout_terminal::data_processor::{
    GroupBy, Position, SchemaError, StatKey, aggregate, normalize,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_entries() -> Vec<scout_terminal::api_client::RawPlayerEntry> {
    parse_players_json(&read_fixture("players_topscorers.json")).expect("fixture should parse")
}

#[test]
fn normalize_builds_one_row_per_stat_block() {
    let table = normalize(&fixture_entries(), 2023).expect("fixture should normalize");
    assert_eq!(table.len(), 4);
    let ids: Vec<u32> = table.rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1100, 1101, 1102, 1103]);
    assert_eq!(table.rows[0].position, Some(Position::Attacker));
    assert_eq!(table.rows[3].position, Some(Position::Goalkeeper));
}

#[test]
fn normalize_is_idempotent() {
    let entries = fixture_entries();
    let first = normalize(&entries, 2023).unwrap();
    let second = normalize(&entries, 2023).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_player_id_is_a_schema_error() {
    let raw = r#"{"response":[{"player":{"name":"No Id"},"statistics":[]}]}"#;
    let entries = parse_players_json(raw).unwrap();
    let err = normalize(&entries, 2023).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingIdentity {
            index: 0,
            field: "player.id"
        }
    );
}

#[test]
fn missing_name_is_a_schema_error_unless_split_names_exist() {
    let raw = r#"{"response":[{"player":{"id":9},"statistics":[]}]}"#;
    let entries = parse_players_json(raw).unwrap();
    let err = normalize(&entries, 2023).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingIdentity {
            index: 0,
            field: "player.name"
        }
    );

    let raw = r#"{"response":[{"player":{"id":9,"firstname":"Ana","lastname":"Silva"},"statistics":[{"games":{"minutes":90}}]}]}"#;
    let entries = parse_players_json(raw).unwrap();
    let table = normalize(&entries, 2023).unwrap();
    assert_eq!(table.rows[0].name, "Ana Silva");
}

#[test]
fn counting_stats_are_zero_filled() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    // Ferro's shots came back null; the row is kept with zeros rather
    // than dropped.
    let ferro = table.get_by_id(1102).expect("row should exist");
    assert_eq!(ferro.stat(StatKey::ShotsTotal), Some(0.0));
    assert_eq!(ferro.stat(StatKey::ShotsOnTarget), Some(0.0));
}

#[test]
fn rating_is_mean_filled_from_same_position() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    // Ferro (midfielder, no rating) inherits the midfielder mean, which
    // here is Weaver's 7.0 — not the attacker's 7.8.
    let ferro = table.get_by_id(1102).unwrap();
    let filled = ferro.rating().expect("rating should be filled");
    assert!((filled - 7.0).abs() < 1e-9);
}

#[test]
fn derived_metrics_match_hand_computation() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let northgate = table.get_by_id(1100).unwrap();
    let goals_per90 = northgate.stat(StatKey::GoalsPer90).unwrap();
    assert!((goals_per90 - 27.0 * 90.0 / 2700.0).abs() < 1e-9);
    let conversion = northgate.stat(StatKey::ShotConversionPct).unwrap();
    assert!((conversion - 27.0 / 110.0 * 100.0).abs() < 1e-9);
    let minutes_per_app = northgate.stat(StatKey::MinutesPerAppearance).unwrap();
    assert!((minutes_per_app - 90.0).abs() < 1e-9);
}

#[test]
fn zero_denominators_do_not_produce_infinities() {
    let raw = r#"{"response":[{
        "player":{"id":7,"name":"Benchwarmer"},
        "statistics":[{"games":{"appearences":0,"minutes":0,"position":"Attacker"}}]
    }]}"#;
    let entries = parse_players_json(raw).unwrap();
    let table = normalize(&entries, 2023).unwrap();
    let row = &table.rows[0];
    for key in StatKey::ALL {
        if let Some(value) = row.stat(*key) {
            assert!(value.is_finite(), "{} should be finite", key.label());
        }
    }
    assert_eq!(row.stat(StatKey::GoalsPer90), Some(0.0));
    assert_eq!(row.stat(StatKey::MinutesPerAppearance), Some(0.0));
}

#[test]
fn populated_intersection_respects_position_schemas() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let columns = table.populated_columns();
    // Shared across keepers and outfielders.
    assert!(columns.contains(&StatKey::Rating));
    assert!(columns.contains(&StatKey::MinutesPlayed));
    assert!(columns.contains(&StatKey::PassesTotal));
    assert!(columns.contains(&StatKey::DuelsWon));
    // Keeper-only and outfield-only columns fall out of the intersection.
    assert!(!columns.contains(&StatKey::Saves));
    assert!(!columns.contains(&StatKey::ShotsTotal));
    assert!(!columns.contains(&StatKey::TacklesTotal));
}

#[test]
fn position_lookup_matches_exactly() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let mids = table.players_by_position(Position::Midfielder);
    assert_eq!(mids.len(), 2);
    assert!(mids.iter().all(|r| r.position == Some(Position::Midfielder)));
}

#[test]
fn top_by_metric_sorts_descending() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let top = table.top_by_metric(StatKey::GoalsTotal, 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].id, 1100);
    assert!(
        top[0].stat(StatKey::GoalsTotal).unwrap() >= top[1].stat(StatKey::GoalsTotal).unwrap()
    );
}

#[test]
fn aggregate_by_position_averages_groups() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let summary = aggregate(&table, GroupBy::Position);
    assert_eq!(summary.len(), 3);

    let mids = summary
        .rows
        .iter()
        .find(|r| r.name == "Midfielder")
        .expect("midfielder group");
    assert_eq!(mids.position, Some(Position::Midfielder));
    // Mean of Weaver (6 goals) and Ferro (4 goals).
    assert!((mids.stat(StatKey::GoalsTotal).unwrap() - 5.0).abs() < 1e-9);
    // Mean of assists 16 and 9.
    assert!((mids.stat(StatKey::Assists).unwrap() - 12.5).abs() < 1e-9);
}

#[test]
fn aggregate_by_league_spans_all_rows() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let summary = aggregate(&table, GroupBy::League);
    assert_eq!(summary.len(), 1);
    let league = &summary.rows[0];
    assert_eq!(league.name, "Premier League");
    assert_eq!(league.league_id, 39);
    assert_eq!(league.position, None);
    // Mixed pool: only the cross-position intersection is averaged.
    assert!(league.stat(StatKey::Rating).is_some());
    assert!(league.stat(StatKey::Saves).is_none());
    assert!(league.stat(StatKey::ShotsTotal).is_none());
}

#[test]
fn aggregate_by_team_groups_by_club() {
    let table = normalize(&fixture_entries(), 2023).unwrap();
    let summary = aggregate(&table, GroupBy::Team);
    assert_eq!(summary.len(), 2);
    let names: Vec<&str> = summary.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Manchester City", "Chelsea"]);
}
