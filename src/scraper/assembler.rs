use chrono::{DateTime, Utc};

use crate::error::{Result, ScrapeError};
use crate::models::{ForecastPoint, RawCell, RowSet};

use super::cleaner::{parse_cloud_cover, parse_direction, parse_numeric};

/// Zip the positional rows into one point per column.
///
/// Column `i` of every row is the same forecast period; a row that stops
/// early yields nulls for the remaining columns.
pub fn assemble(rows: &RowSet, captured_at: DateTime<Utc>) -> Result<Vec<ForecastPoint>> {
    let columns = rows.column_count();

    let points: Vec<ForecastPoint> = (0..columns)
        .map(|col| {
            let text = |row: &[RawCell]| cell_text(row, col).to_string();
            let num = |row: &[RawCell]| parse_numeric(cell_text(row, col));

            let direction = rows
                .wind_direction
                .get(col)
                .and_then(|c| parse_direction(&c.text, &c.html));

            ForecastPoint {
                period: text(&rows.periods),
                wind_speed: num(&rows.wind_speed),
                wind_gusts: num(&rows.wind_gusts),
                wind_direction: direction,
                temperature: num(&rows.temperature),
                cloud_cover: parse_cloud_cover(
                    cell_text(&rows.cloud_low, col),
                    cell_text(&rows.cloud_mid, col),
                    cell_text(&rows.cloud_high, col),
                ),
                precipitation: num(&rows.precipitation),
                captured_at,
            }
        })
        .collect();

    if points.iter().all(ForecastPoint::is_blank) {
        return Err(ScrapeError::EmptyForecast);
    }

    Ok(points)
}

fn cell_text(row: &[RawCell], col: usize) -> &str {
    row.get(col).map(|c| c.text.as_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WindDirection;
    use crate::scraper::{fixtures, parsers};
    use scraper::Html;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-16T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn cells(values: &[&str]) -> Vec<RawCell> {
        values.iter().map(|v| RawCell::text(v)).collect()
    }

    #[test]
    fn test_short_trailing_rows_pad_with_nulls() {
        let mut grid = fixtures::grid(6);
        grid[8].truncate(1 + 4);
        let doc = Html::parse_document(&fixtures::page_with_table("tabulka", &grid));
        let rows = parsers::locate(&doc).unwrap();

        let points = assemble(&rows, now()).unwrap();

        assert_eq!(points.len(), 6);
        assert_eq!(points[0].precipitation, Some(0.4));
        assert_eq!(points[3].precipitation, Some(0.0));
        assert_eq!(points[4].precipitation, None);
        assert_eq!(points[5].precipitation, None);
        // other rows stay aligned with their period
        assert_eq!(points[5].period, "Tu 17. 03h");
        assert_eq!(points[5].wind_speed, Some(17.0));
        assert_eq!(points[5].wind_gusts, Some(23.0));
    }

    #[test]
    fn test_assemble_full_page() {
        let doc = Html::parse_document(&fixtures::forecast_page("Tarifa", 3));
        let rows = parsers::locate(&doc).unwrap();
        let points = assemble(&rows, now()).unwrap();

        assert_eq!(points.len(), 3);
        let first = &points[0];
        assert_eq!(first.period, "Mo 16. 12h");
        assert_eq!(first.wind_speed, Some(12.0));
        assert_eq!(first.temperature, Some(18.0));
        // rotate(-45deg) + 180
        assert_eq!(first.wind_direction, Some(WindDirection::Degrees(135)));
        let cloud = first.cloud_cover.as_ref().unwrap();
        assert_eq!((cloud.low, cloud.mid, cloud.high), (Some(40.0), Some(0.0), None));
        assert_eq!(cloud.total, 40.0);
        assert!(points.iter().all(|p| p.captured_at == now()));
    }

    #[test]
    fn test_wider_data_row_than_header() {
        let rows = RowSet {
            periods: cells(&["Mo 16. 12h"]),
            wind_speed: cells(&["10-14", "8"]),
            wind_direction: cells(&["NE", "135°"]),
            ..Default::default()
        };
        let points = assemble(&rows, now()).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].wind_speed, Some(12.0));
        assert_eq!(points[1].period, "");
        assert_eq!(points[1].wind_direction, Some(WindDirection::Compass("SE".into())));
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let rows = RowSet::default();
        assert!(matches!(assemble(&rows, now()), Err(ScrapeError::EmptyForecast)));

        let blank = RowSet {
            periods: cells(&["", ""]),
            wind_speed: cells(&["-", ""]),
            ..Default::default()
        };
        assert!(matches!(assemble(&blank, now()), Err(ScrapeError::EmptyForecast)));
    }
}
