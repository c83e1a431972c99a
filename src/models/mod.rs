use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

pub const SOURCE_TAG: &str = "windguru";

// ── Spot identifier ───────────────────────────────────────────────────────────

/// Numeric Windguru spot id, e.g. "500760".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpotId(String);

impl SpotId {
    /// Only the URL identifier constructs these; the digits are checked there.
    pub(crate) fn from_digits(digits: &str) -> Self {
        debug_assert!(!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        Self(digits.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn canonical_url(&self) -> String {
        format!("https://www.windguru.cz/{}", self.0)
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Forecast point ────────────────────────────────────────────────────────────

/// Wind direction as the page exposed it.
///
/// Text cells give compass codes; arrow markup gives degrees, which are kept
/// as degrees ("135°") rather than converted to letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindDirection {
    Compass(String),
    Degrees(u16),
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindDirection::Compass(code) => f.write_str(code),
            WindDirection::Degrees(deg) => write!(f, "{}°", deg),
        }
    }
}

impl Serialize for WindDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudCover {
    pub low: Option<f64>,
    pub mid: Option<f64>,
    pub high: Option<f64>,
    /// Max of the present levels.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub period: String,
    pub wind_speed: Option<f64>,
    pub wind_gusts: Option<f64>,
    pub wind_direction: Option<WindDirection>,
    pub temperature: Option<f64>,
    pub cloud_cover: Option<CloudCover>,
    pub precipitation: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl ForecastPoint {
    /// True when the column carried nothing at all, not even a label.
    pub fn is_blank(&self) -> bool {
        self.period.is_empty()
            && self.wind_speed.is_none()
            && self.wind_gusts.is_none()
            && self.wind_direction.is_none()
            && self.temperature.is_none()
            && self.cloud_cover.is_none()
            && self.precipitation.is_none()
    }
}

// ── Scrape result ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub spot_id: SpotId,
    pub spot_name: String,
    pub source_url: String,
    pub forecasts: Vec<ForecastPoint>,
    pub scraped_at: DateTime<Utc>,
    pub source_tag: &'static str,
}

// ── Raw table rows ────────────────────────────────────────────────────────────

/// One table cell: trimmed text plus inner markup (arrows carry direction
/// in attributes, not text).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCell {
    pub text: String,
    pub html: String,
}

impl RawCell {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            html: String::new(),
        }
    }
}

/// Forecast table sliced by fixed row position, label cells removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub periods: Vec<RawCell>,
    pub wind_speed: Vec<RawCell>,
    pub wind_gusts: Vec<RawCell>,
    pub wind_direction: Vec<RawCell>,
    pub temperature: Vec<RawCell>,
    pub cloud_low: Vec<RawCell>,
    pub cloud_mid: Vec<RawCell>,
    pub cloud_high: Vec<RawCell>,
    pub precipitation: Vec<RawCell>,
}

impl RowSet {
    pub fn rows(&self) -> [&[RawCell]; 9] {
        [
            &self.periods,
            &self.wind_speed,
            &self.wind_gusts,
            &self.wind_direction,
            &self.temperature,
            &self.cloud_low,
            &self.cloud_mid,
            &self.cloud_high,
            &self.precipitation,
        ]
    }

    /// Widest row wins; short rows are padded with nulls on assembly.
    pub fn column_count(&self) -> usize {
        self.rows().iter().map(|r| r.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serializes_as_string() {
        let compass = serde_json::to_string(&WindDirection::Compass("NE".into())).unwrap();
        let degrees = serde_json::to_string(&WindDirection::Degrees(135)).unwrap();
        assert_eq!(compass, "\"NE\"");
        assert_eq!(degrees, "\"135°\"");
    }

    #[test]
    fn test_result_uses_camel_case_keys() {
        let result = ForecastResult {
            spot_id: SpotId::from_digits("48"),
            spot_name: "Tarifa".into(),
            source_url: "https://www.windguru.cz/48".into(),
            forecasts: vec![],
            scraped_at: DateTime::from_timestamp(0, 0).unwrap(),
            source_tag: SOURCE_TAG,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["spotId"], "48");
        assert_eq!(json["sourceTag"], "windguru");
        assert_eq!(json["scrapedAt"], "1970-01-01T00:00:00Z");
    }
}
