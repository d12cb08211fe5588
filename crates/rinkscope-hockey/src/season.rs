// Season CSV loading and combined-dataset export.
//
// Reads hockey-reference style skater exports. A traded player appears once
// per team plus a leading total row, so only the first row per `Id` is kept.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rinkscope_core::{AnalysisError, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::record::{CombinedPlayerRecord, PlayerSeasonRecord, Stat, StatLine, SEASON_COLUMNS};

/// Header of the per-player season count appended to combined exports.
pub const SEASONS_COLUMN: &str = "Seasons";

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// One skater row. Blank or unparseable numeric cells deserialize to
/// `None`; columns beyond the schema are ignored. Only a bad `Rk` fails the
/// row.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawSeasonRow {
    Id: String,
    Rk: u32,
    Player: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    Age: Option<f64>,
    #[serde(default)]
    Tm: String,
    #[serde(default)]
    Pos: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    GP: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    G: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    A: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    PTS: Option<f64>,
    #[serde(rename = "+/-", deserialize_with = "csv::invalid_option")]
    PlusMinus: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    PIM: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    PS: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    EV: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    PP: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    SH: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    GW: Option<f64>,
    #[serde(rename = "EV.1", deserialize_with = "csv::invalid_option")]
    EvAssists: Option<f64>,
    #[serde(rename = "PP.1", deserialize_with = "csv::invalid_option")]
    PpAssists: Option<f64>,
    #[serde(rename = "SH.1", deserialize_with = "csv::invalid_option")]
    ShAssists: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    S: Option<f64>,
    #[serde(rename = "S%", deserialize_with = "csv::invalid_option")]
    ShootingPct: Option<f64>,
}

impl RawSeasonRow {
    fn into_record(self) -> PlayerSeasonRecord {
        // Non-finite cells are treated as missing.
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let stats = StatLine::new([
            finite(self.Age),
            finite(self.GP),
            finite(self.G),
            finite(self.A),
            finite(self.PTS),
            finite(self.PlusMinus),
            finite(self.PIM),
            finite(self.PS),
            finite(self.EV),
            finite(self.PP),
            finite(self.SH),
            finite(self.GW),
            finite(self.EvAssists),
            finite(self.PpAssists),
            finite(self.ShAssists),
            finite(self.S),
            finite(self.ShootingPct),
        ]);
        PlayerSeasonRecord {
            id: self.Id.trim().to_string(),
            rank: self.Rk,
            player: self.Player.trim().to_string(),
            team: self.Tm.trim().to_string(),
            position: self.Pos.trim().to_string(),
            stats,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load one season from any reader, keeping the first row per `Id`.
///
/// `source_name` is only used in error messages and logs.
pub fn load_season_from_reader<R: Read>(
    rdr: R,
    source_name: &str,
) -> Result<Vec<PlayerSeasonRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::Csv {
            path: PathBuf::from(source_name),
            source: e,
        })?
        .clone();
    let missing: Vec<&str> = SEASON_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::input_format(
            source_name,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }

    let id_index = headers.iter().position(|h| h == "Id").ok_or_else(|| {
        AnalysisError::input_format(source_name, "missing required column(s): Id")
    })?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut duplicates = 0usize;

    for (line, result) in reader.records().enumerate() {
        let row = line + 2;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{source_name}: skipping unreadable row {row}: {e}");
                continue;
            }
        };
        let id = raw.get(id_index).unwrap_or_default().trim();
        if id.is_empty() {
            warn!("{source_name}: skipping row {row} with blank Id");
            continue;
        }
        // The Id is claimed before parsing so a later partial row can never
        // stand in for a broken first row.
        if !seen.insert(id.to_string()) {
            duplicates += 1;
            continue;
        }
        match raw.deserialize::<RawSeasonRow>(Some(&headers)) {
            Ok(parsed) => records.push(parsed.into_record()),
            Err(e) => warn!("{source_name}: dropping `{id}` for this season, row {row}: {e}"),
        }
    }

    info!(
        "Loaded {} players from {source_name} ({duplicates} duplicate rows dropped)",
        records.len()
    );
    Ok(records)
}

/// Load one season CSV file.
pub fn load_season(path: &Path) -> Result<Vec<PlayerSeasonRecord>> {
    let file = std::fs::File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    debug!("Reading season file {}", path.display());
    load_season_from_reader(file, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write combined records as CSV in the season schema, plus a trailing
/// `Seasons` column. Missing values are written as empty cells.
pub fn write_combined<W: Write>(wtr: W, players: &[CombinedPlayerRecord]) -> Result<()> {
    let to_csv_err = |e: csv::Error| AnalysisError::Csv {
        path: PathBuf::from("combined export"),
        source: e,
    };
    let mut writer = csv::Writer::from_writer(wtr);

    let mut header: Vec<&str> = SEASON_COLUMNS.to_vec();
    header.push(SEASONS_COLUMN);
    writer.write_record(&header).map_err(to_csv_err)?;

    for p in players {
        let cell = |stat: Stat| p.stat(stat).map(|v| v.to_string()).unwrap_or_default();
        let mut row = vec![
            p.id.clone(),
            p.rank.to_string(),
            p.player.clone(),
            cell(Stat::Age),
            p.team.clone(),
            p.position.clone(),
        ];
        row.extend(Stat::ALL[1..].iter().map(|&s| cell(s)));
        row.push(p.seasons.to_string());
        writer.write_record(&row).map_err(to_csv_err)?;
    }

    writer
        .flush()
        .map_err(|e| AnalysisError::io("combined export", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
