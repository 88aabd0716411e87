//! HTML parser for race listings and result tables
//!
//! This module turns decoded pages into domain values:
//! - Listing page → distinct race ids, in first-seen order
//! - Detail page → ordered participant rows of the result table
//!
//! The result table is read by fixed column position. That layout is the
//! only coupling to the source's page structure and it stays in this file.

use crate::race::{ParticipantResult, RaceId, RaceRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Minimum number of `<td>` cells in a result row (highest column read is 20)
pub const RESULT_COLUMNS: usize = 21;

const COL_RANK: usize = 0;
const COL_FRAME_NUMBER: usize = 1;
const COL_HORSE_NUMBER: usize = 2;
const COL_HORSE_NAME: usize = 3;
const COL_SEX_AND_AGE: usize = 4;
const COL_WEIGHT_CARRIED: usize = 5;
const COL_JOCKEY: usize = 6;
const COL_TIME: usize = 7;
const COL_MARGIN: usize = 8;
const COL_PASSING_ORDER: usize = 10;
const COL_LAST_3_FURLONGS: usize = 11;
const COL_WIN_ODDS: usize = 12;
const COL_POPULARITY: usize = 13;
const COL_HORSE_WEIGHT: usize = 14;
const COL_TRAINER: usize = 18;
const COL_OWNER: usize = 19;
const COL_PRIZE_MONEY: usize = 20;

/// A result row that does not have the expected number of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMismatch {
    /// Index of the offending `<tr>` within the table body
    pub row: usize,
    /// Number of `<td>` cells found in it
    pub found: usize,
}

static RACE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?/race/([0-9]{12})/")
        .expect("hardcoded regex pattern is valid")
});

/// Extracts the distinct race ids linked from a listing page
///
/// Every `<a href>` is matched against `/race/<12 digits>/`; relative and
/// absolute hrefs both count. Duplicates are dropped, first occurrence wins.
///
/// # Example
///
/// ```
/// use furlong::crawler::parse_race_ids;
///
/// let html = r#"<a href="/race/202401010101/">1R</a><a href="/race/202401010101/">1R</a>"#;
/// let ids = parse_race_ids(html);
/// assert_eq!(ids.len(), 1);
/// assert_eq!(ids[0].as_str(), "202401010101");
/// ```
pub fn parse_race_ids(html: &str) -> Vec<RaceId> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return ids;
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(captures) = RACE_PATH.captures(href.trim()) else {
            continue;
        };

        if let Ok(id) = RaceId::parse(&captures[1]) {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    ids
}

/// Extracts the participant rows of a race detail page
///
/// Rows without `<td>` cells (headers, separators) are skipped. A page
/// without a result table yields an empty record.
///
/// # Returns
///
/// * `Ok(RaceRecord)` - The rows in page order
/// * `Err(LayoutMismatch)` - A data row had fewer than `RESULT_COLUMNS` cells
pub fn parse_race_record(html: &str) -> Result<RaceRecord, LayoutMismatch> {
    let document = Html::parse_document(html);
    let mut record = Vec::new();

    let (Ok(row_selector), Ok(cell_selector)) = (
        Selector::parse(".race_table_01 tbody tr"),
        Selector::parse("td"),
    ) else {
        return Ok(record);
    };

    for (index, row) in document.select(&row_selector).enumerate() {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
        if cells.is_empty() {
            continue;
        }

        let result = extract_participant_result(&cells).ok_or(LayoutMismatch {
            row: index,
            found: cells.len(),
        })?;
        record.push(result);
    }

    Ok(record)
}

/// Maps the cells of one result row to a participant
///
/// Returns `None` when the row is too short for the column layout.
pub fn extract_participant_result(cells: &[ElementRef<'_>]) -> Option<ParticipantResult> {
    if cells.len() < RESULT_COLUMNS {
        return None;
    }

    let text = |col: usize| cell_text(cells[col]);
    let link = |col: usize| link_text(cells[col]);

    Some(ParticipantResult {
        rank: text(COL_RANK),
        frame_number: text(COL_FRAME_NUMBER),
        horse_number: text(COL_HORSE_NUMBER),
        horse_name: text(COL_HORSE_NAME),
        sex_and_age: text(COL_SEX_AND_AGE),
        weight_carried: text(COL_WEIGHT_CARRIED),
        jockey: text(COL_JOCKEY),
        time: text(COL_TIME),
        margin: text(COL_MARGIN),
        passing_order: text(COL_PASSING_ORDER),
        last_3_furlongs: text(COL_LAST_3_FURLONGS),
        win_odds: text(COL_WIN_ODDS),
        popularity: text(COL_POPULARITY),
        horse_weight: text(COL_HORSE_WEIGHT),
        trainer: link(COL_TRAINER),
        owner: link(COL_OWNER),
        prize_money: text(COL_PRIZE_MONEY),
    })
}

/// Trimmed text content of a cell
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the links inside a cell, ignoring any bare text around them
fn link_text(cell: ElementRef<'_>) -> String {
    let Ok(a_selector) = Selector::parse("a") else {
        return String::new();
    };

    cell.select(&a_selector)
        .flat_map(|a| a.text())
        .collect::<String>()
        .trim()
        .to_string()
}
