//! Headless export: fetch a league's top players, normalize, write XLSX.
//!
//! Usage: export_xlsx [league_id] [output.xlsx]

use std::path::Path;

use anyhow::{Context, Result};

use scout_terminal::config::AppConfig;
use scout_terminal::{api_client, data_processor, export};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::load();
    let mut args = std::env::args().skip(1);
    let league_id = args
        .next()
        .map(|raw| raw.parse::<u32>().context("league id must be numeric"))
        .transpose()?
        .or_else(|| cfg.leagues.first().map(|l| l.id))
        .context("no league configured")?;
    let out = args.next().unwrap_or_else(|| "scout_report.xlsx".to_string());

    let raw = api_client::fetch_top_players(&cfg, league_id, cfg.season)?;
    let table = data_processor::normalize(&raw, cfg.season)?;
    let report = export::export_players_xlsx(Path::new(&out), &table, &[])?;

    println!(
        "exported {} players / {} stat columns to {}",
        report.players, report.columns, out
    );
    Ok(())
}
