use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::data_processor::{PlayerTable, StatKey};
use crate::recommender::Recommendation;

pub struct ExportReport {
    pub players: usize,
    pub columns: usize,
    pub recommendations: usize,
}

/// Write the player table (and optionally a recommendation run) to an
/// XLSX workbook.
pub fn export_players_xlsx(
    path: &Path,
    table: &PlayerTable,
    recommendations: &[Recommendation],
) -> Result<ExportReport> {
    let columns = export_columns(table);

    let mut header = vec![
        "ID".to_string(),
        "Name".to_string(),
        "Team".to_string(),
        "Position".to_string(),
        "League".to_string(),
        "Season".to_string(),
    ];
    header.extend(columns.iter().map(|key| key.label().to_string()));

    let mut player_rows = vec![header];
    for record in &table.rows {
        let mut row = vec![
            record.id.to_string(),
            record.name.clone(),
            record.team.clone(),
            record
                .position
                .map(|p| p.label().to_string())
                .unwrap_or_default(),
            record.league_name.clone(),
            record.season.to_string(),
        ];
        for key in &columns {
            row.push(
                record
                    .stat(*key)
                    .map(format_stat)
                    .unwrap_or_default(),
            );
        }
        player_rows.push(row);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &player_rows)?;
    }

    if !recommendations.is_empty() {
        let mut rec_rows = vec![vec![
            "Rank".to_string(),
            "ID".to_string(),
            "Name".to_string(),
            "Team".to_string(),
            "Position".to_string(),
            "Similarity".to_string(),
            "Distance".to_string(),
        ]];
        for (i, rec) in recommendations.iter().enumerate() {
            rec_rows.push(vec![
                (i + 1).to_string(),
                rec.player.id.to_string(),
                rec.player.name.clone(),
                rec.player.team.clone(),
                rec.player
                    .position
                    .map(|p| p.label().to_string())
                    .unwrap_or_default(),
                format!("{:.4}", rec.similarity),
                format!("{:.4}", rec.distance),
            ]);
        }
        let sheet = workbook.add_worksheet();
        sheet.set_name("Recommendations")?;
        write_rows(sheet, &rec_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: table.len(),
        columns: columns.len(),
        recommendations: recommendations.len(),
    })
}

// Union of populated columns, canonical order; rows missing a column get
// an empty cell.
fn export_columns(table: &PlayerTable) -> Vec<StatKey> {
    StatKey::ALL
        .iter()
        .copied()
        .filter(|key| table.rows.iter().any(|r| r.stats.contains_key(key)))
        .collect()
}

fn format_stat(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.2}")
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_stat_trims_integers() {
        assert_eq!(format_stat(12.0), "12");
        assert_eq!(format_stat(7.25), "7.25");
        assert_eq!(format_stat(0.333), "0.33");
    }
}
