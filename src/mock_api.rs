use rand::Rng;
use serde_json::Value;

use crate::api_client::{
    RawDuels, RawGames, RawGoals, RawLeague, RawPasses, RawPlayerEntry, RawPlayerInfo, RawShots,
    RawStatBlock, RawTackles, RawTeam,
};
use crate::config::default_leagues;

const FIRST_NAMES: &[&str] = &[
    "Lionel", "Cristiano", "Robert", "Kevin", "Mohamed", "Virgil", "Sergio", "Harry", "Kylian",
    "Erling",
];
const LAST_NAMES: &[&str] = &[
    "Messi", "Ronaldo", "Lewandowski", "De Bruyne", "Salah", "van Dijk", "Ramos", "Kane",
    "Mbappe", "Haaland",
];
const TEAMS: &[&str] = &[
    "Manchester United",
    "Barcelona",
    "Real Madrid",
    "Bayern Munich",
    "Liverpool",
    "Paris Saint-Germain",
    "Manchester City",
    "Chelsea",
    "Juventus",
    "Borussia Dortmund",
];

pub fn top_players(league_id: u32, season: u16) -> Vec<RawPlayerEntry> {
    let mut rng = rand::thread_rng();
    (0..20)
        .map(|i| {
            let position = pick_position(&mut rng);
            gen_player(&mut rng, 10_000 + i, league_id, season, position)
        })
        .collect()
}

pub fn player_details(player_id: u32, season: u16) -> Vec<RawPlayerEntry> {
    let mut rng = rand::thread_rng();
    let position = pick_position(&mut rng);
    vec![gen_player(&mut rng, player_id, 39, season, position)]
}

pub fn league_players(league_id: u32, season: u16) -> Vec<RawPlayerEntry> {
    let mut rng = rand::thread_rng();
    (0..60)
        .map(|i| {
            let position = pick_position(&mut rng);
            gen_player(&mut rng, 20_000 + i, league_id, season, position)
        })
        .collect()
}

// Position mix roughly 4:3:2:1 attackers to goalkeepers.
fn pick_position(rng: &mut impl Rng) -> &'static str {
    match rng.gen_range(0..10) {
        0..=3 => "Attacker",
        4..=6 => "Midfielder",
        7..=8 => "Defender",
        _ => "Goalkeeper",
    }
}

fn gen_player(
    rng: &mut impl Rng,
    id: u32,
    league_id: u32,
    season: u16,
    position: &str,
) -> RawPlayerEntry {
    let firstname = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let lastname = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    let team_idx = (id as usize) % TEAMS.len();

    let (goals, assists, pass_accuracy, tackles) = match position {
        "Attacker" => (
            rng.gen_range(10..=30),
            rng.gen_range(2..=15),
            rng.gen_range(70..=85),
            rng.gen_range(5..=20),
        ),
        "Midfielder" => (
            rng.gen_range(3..=12),
            rng.gen_range(5..=20),
            rng.gen_range(80..=92),
            rng.gen_range(30..=70),
        ),
        "Defender" => (
            rng.gen_range(1..=5),
            rng.gen_range(1..=8),
            rng.gen_range(75..=90),
            rng.gen_range(50..=120),
        ),
        _ => (0, rng.gen_range(0..=2), rng.gen_range(70..=85), rng.gen_range(0..=5)),
    };

    let goalkeeper = position == "Goalkeeper";
    let rating = rng.gen_range(65..=89) as f64 / 10.0;

    RawPlayerEntry {
        player: RawPlayerInfo {
            id: Some(id),
            name: Some(format!("{firstname} {lastname}")),
            firstname: Some(firstname.to_string()),
            lastname: Some(lastname.to_string()),
            age: Some(rng.gen_range(20..=36)),
            nationality: Some("Country".to_string()),
            height: Some(format!("{} cm", rng.gen_range(170..=195))),
            weight: Some(format!("{} kg", rng.gen_range(65..=90))),
            position: Some(position.to_string()),
        },
        statistics: vec![RawStatBlock {
            team: Some(RawTeam {
                id: Some(1000 + team_idx as u32),
                name: Some(TEAMS[team_idx].to_string()),
            }),
            league: Some(RawLeague {
                id: Some(league_id),
                name: league_name(league_id),
                country: None,
                season: Some(season),
            }),
            games: Some(RawGames {
                appearances: Some(rng.gen_range(20..=38) as f64),
                minutes: Some(rng.gen_range(1800..=3400) as f64),
                position: Some(position.to_string()),
                rating: Value::from(rating),
            }),
            shots: Some(RawShots {
                total: Some(rng.gen_range(20..=100) as f64),
                on: Some(rng.gen_range(10..=50) as f64),
            }),
            goals: Some(RawGoals {
                total: Some(goals as f64),
                conceded: goalkeeper.then(|| rng.gen_range(20..=55) as f64),
                assists: Some(assists as f64),
                saves: goalkeeper.then(|| rng.gen_range(60..=140) as f64),
            }),
            passes: Some(RawPasses {
                total: Some(rng.gen_range(500..=2000) as f64),
                key: Some(rng.gen_range(5..=80) as f64),
                accuracy: Value::from(pass_accuracy),
            }),
            tackles: Some(RawTackles {
                total: Some(tackles as f64),
                blocks: Some(rng.gen_range(5..=30) as f64),
                interceptions: Some(rng.gen_range(10..=50) as f64),
            }),
            duels: Some(RawDuels {
                total: Some(rng.gen_range(100..=300) as f64),
                won: Some(rng.gen_range(50..=200) as f64),
            }),
        }],
    }
}

fn league_name(league_id: u32) -> Option<String> {
    default_leagues()
        .into_iter()
        .find(|l| l.id == league_id)
        .map(|l| l.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_players_carry_identity_and_stats() {
        let rows = top_players(39, 2023);
        assert_eq!(rows.len(), 20);
        for row in &rows {
            assert!(row.player.id.is_some());
            assert!(row.player.name.is_some());
            assert_eq!(row.statistics.len(), 1);
            assert!(row.statistics[0].games.is_some());
        }
    }

    #[test]
    fn player_details_use_requested_id() {
        let rows = player_details(4242, 2023);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player.id, Some(4242));
    }

    #[test]
    fn mock_output_survives_normalize() {
        let rows = top_players(39, 2023);
        let table = crate::data_processor::normalize(&rows, 2023)
            .expect("mock entries should never trip a schema error");
        assert_eq!(table.len(), 20);
    }

    #[test]
    fn goalkeepers_get_keeper_stats() {
        // Enough draws that at least one keeper shows up.
        let rows = league_players(39, 2023);
        let keeper = rows.iter().find(|r| {
            r.player.position.as_deref() == Some("Goalkeeper")
        });
        if let Some(keeper) = keeper {
            let goals = keeper.statistics[0].goals.as_ref().unwrap();
            assert!(goals.saves.is_some());
            assert!(goals.conceded.is_some());
        }
    }
}
