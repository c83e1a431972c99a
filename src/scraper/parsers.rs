use crate::error::{Result, ScrapeError};
use crate::models::{RawCell, RowSet, SpotId};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Selectors known to match the forecast table, most specific first.
/// Also used by the rendering fetcher to decide when the table has appeared.
pub const FORECAST_TABLE_SELECTORS: &[&str] = &[
    "#div_wgfcst1 table.tabulka",
    "table.tabulka",
    "#div_wgfcst1 table",
    "div.wgfcst table",
    "table.forecast-table",
];

/// A generic table must have more rows than this to count as the forecast.
pub const MIN_TABLE_ROWS: usize = 5;

const SPOT_NAME_SELECTORS: &[&str] = &[".spot-name", "#spot_name", "h1"];

/// Row index → field. Anything past the last index is ignored.
const ROW_PERIODS: usize = 0;
const ROW_WIND_SPEED: usize = 1;
const ROW_WIND_GUSTS: usize = 2;
const ROW_WIND_DIRECTION: usize = 3;
const ROW_TEMPERATURE: usize = 4;
const ROW_CLOUD_LOW: usize = 5;
const ROW_CLOUD_MID: usize = 6;
const ROW_CLOUD_HIGH: usize = 7;
const ROW_PRECIPITATION: usize = 8;

// ── Table location ────────────────────────────────────────────────────────────

type TableMatcher = for<'a> fn(&'a Html) -> Option<ElementRef<'a>>;

/// Tried in order; first hit wins. `None` from all of them means no table.
const TABLE_MATCHERS: &[(&str, TableMatcher)] = &[
    ("known selector", match_known_selector as TableMatcher),
    ("largest table", match_largest_table as TableMatcher),
];

fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// The table's own rows: `tr` children of the table or of its row groups.
/// Rows of tables nested inside a cell are not included.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    child_elements(table)
        .flat_map(|child| match child.value().name() {
            "tr" => vec![child],
            "thead" | "tbody" | "tfoot" => child_elements(child)
                .filter(|row| row.value().name() == "tr")
                .collect(),
            _ => vec![],
        })
        .collect()
}

fn match_known_selector(doc: &Html) -> Option<ElementRef<'_>> {
    FORECAST_TABLE_SELECTORS
        .iter()
        .filter_map(|s| selector(s))
        .find_map(|sel| doc.select(&sel).find(|t| !table_rows(*t).is_empty()))
}

fn match_largest_table(doc: &Html) -> Option<ElementRef<'_>> {
    let table_sel = selector("table")?;
    doc.select(&table_sel)
        .map(|t| (table_rows(t).len(), t))
        .filter(|(rows, _)| *rows > MIN_TABLE_ROWS)
        .max_by_key(|(rows, _)| *rows)
        .map(|(_, t)| t)
}

/// Locate the forecast table and slice it into positional rows.
pub fn locate(doc: &Html) -> Result<RowSet> {
    let (how, table) = TABLE_MATCHERS
        .iter()
        .find_map(|(name, matcher)| matcher(doc).map(|t| (*name, t)))
        .ok_or(ScrapeError::TableNotFound)?;

    let rows: Vec<Vec<RawCell>> = table_rows(table)
        .into_iter()
        .take(ROW_PRECIPITATION + 1)
        .map(row_cells)
        .collect();

    debug!("Forecast table located by {} ({} rows)", how, rows.len());

    let row = |idx: usize| rows.get(idx).cloned().unwrap_or_default();

    Ok(RowSet {
        periods: row(ROW_PERIODS),
        wind_speed: row(ROW_WIND_SPEED),
        wind_gusts: row(ROW_WIND_GUSTS),
        wind_direction: row(ROW_WIND_DIRECTION),
        temperature: row(ROW_TEMPERATURE),
        cloud_low: row(ROW_CLOUD_LOW),
        cloud_mid: row(ROW_CLOUD_MID),
        cloud_high: row(ROW_CLOUD_HIGH),
        precipitation: row(ROW_PRECIPITATION),
    })
}

/// Data cells of a row; the first cell is the row label and is skipped.
fn row_cells(tr: ElementRef<'_>) -> Vec<RawCell> {
    child_elements(tr)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .skip(1)
        .map(|cell| RawCell {
            text: collapse_whitespace(&cell.text().collect::<String>()),
            html: cell.inner_html(),
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Spot meta ─────────────────────────────────────────────────────────────────

/// Display name of the spot, or "Spot <id>" when the page has none.
pub fn spot_name(doc: &Html, spot: &SpotId) -> String {
    SPOT_NAME_SELECTORS
        .iter()
        .filter_map(|s| selector(s))
        .filter_map(|sel| doc.select(&sel).next())
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| format!("Spot {}", spot))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
