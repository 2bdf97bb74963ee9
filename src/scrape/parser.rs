use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{ProfileEntry, ScrapeError};

/// The markup contract with the leaderboard site.
///
/// Bump `VERSION` whenever one of these changes. If parsing suddenly returns
/// nothing for a profile known to be present, re-check this contract first.
pub mod markup {
    pub const VERSION: u32 = 1;
    pub const TABLE: &str = "table.leaderboard";
    pub const ROW: &str = "tr";
    pub const CELL: &str = "td";
    pub const TOTAL_ENTRIES: &str = ".total-entries";
    /// Row class the site uses to highlight the fastest lap
    pub const FASTEST_LAP_CLASS: &str = "fastest-lap";

    pub const RANK: usize = 0;
    pub const DATE: usize = 1;
    pub const NAME: usize = 2;
    pub const VEHICLE: usize = 3;
    pub const INPUT_DEVICE: usize = 4;
    pub const TYRE: usize = 5;
    pub const LAP_TIME: usize = 6;
    pub const COLUMNS: usize = 7;
}

/// Extracts profile rows and the entry count from leaderboard pages
pub struct LeaderboardParser {
    table: Selector,
    row: Selector,
    cell: Selector,
    total_entries: Selector,
}

impl LeaderboardParser {
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            table: compile(markup::TABLE)?,
            row: compile(markup::ROW)?,
            cell: compile(markup::CELL)?,
            total_entries: compile(markup::TOTAL_ENTRIES)?,
        })
    }

    /// Total number of entries advertised by the page.
    ///
    /// The last number in the counter is the total ("Showing 1-25 of 1,062").
    /// Fails closed: missing or unreadable counters yield 0.
    pub fn total_entries(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        let Some(counter) = document.select(&self.total_entries).next() else {
            debug!("No entry counter found (markup v{})", markup::VERSION);
            return 0;
        };

        let text: String = counter.text().collect();
        last_number(&text).unwrap_or_else(|| {
            debug!("Unreadable entry counter '{}'", text.trim());
            0
        })
    }

    /// Rows whose name column equals `profile` exactly, in page order
    pub fn parse_page(&self, html: &str, profile: &str) -> Result<Vec<ProfileEntry>, ScrapeError> {
        let document = Html::parse_document(html);
        let table = document.select(&self.table).next().ok_or_else(|| {
            ScrapeError::ParseStructure(format!(
                "no element matches '{}' (markup v{})",
                markup::TABLE,
                markup::VERSION
            ))
        })?;

        let mut entries = Vec::new();

        // First row is the header
        for (index, row) in table.select(&self.row).skip(1).enumerate() {
            let cells: Vec<String> = row
                .select(&self.cell)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();

            if cells.len() < markup::COLUMNS {
                debug!("Skipping row {} with {} cells", index + 1, cells.len());
                continue;
            }

            if cells[markup::NAME] != profile {
                continue;
            }

            let Ok(rank) = cells[markup::RANK].parse::<u32>() else {
                warn!("Skipping row {} for {} with rank '{}'", index + 1, profile, cells[markup::RANK]);
                continue;
            };

            entries.push(ProfileEntry {
                rank,
                date: cells[markup::DATE].clone(),
                name: cells[markup::NAME].clone(),
                vehicle: cells[markup::VEHICLE].clone(),
                input_device: cells[markup::INPUT_DEVICE].clone(),
                tyre: cells[markup::TYRE].clone(),
                lap_time: cells[markup::LAP_TIME].clone(),
                fastest_lap: is_fastest_lap(&row),
            });
        }

        Ok(entries)
    }
}

/// Presentation-level marker for the fastest lap; rows without it are not fastest
fn is_fastest_lap(row: &ElementRef<'_>) -> bool {
    row.value()
        .classes()
        .any(|class| class == markup::FASTEST_LAP_CLASS)
}

/// Last run of digits in `text`, allowing thousands separators
fn last_number(text: &str) -> Option<u32> {
    let run = text
        .split(|c: char| !c.is_ascii_digit() && c != ',')
        .filter(|run| run.chars().any(|c| c.is_ascii_digit()))
        .last()?;

    run.replace(',', "").parse().ok()
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
