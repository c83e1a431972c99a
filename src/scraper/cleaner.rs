//! Cell normalisation: numbers, wind direction and cloud cover.

use crate::models::{CloudCover, WindDirection};

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Arrow icons are drawn pointing opposite to the bearing they label.
const ARROW_ROTATION_OFFSET: f64 = 180.0;

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Midpoint of the first one or two numbers in the text, one decimal.
/// "12" → 12.0 | "10-14" → 12.0 | "10 - 14" → 12.0 | "7.5" → 7.5 | "-3" → -3.0 | "-" → None
pub fn parse_numeric(s: &str) -> Option<f64> {
    let numbers = scan_numbers(s);
    let value = match numbers.as_slice() {
        [] => return None,
        [single] => *single,
        [a, b, ..] => (a + b) / 2.0,
    };
    Some(round1(value))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Pull up to two numbers out of free text.
///
/// A '-' after a number (spaces between allowed) separates a range;
/// anywhere else it is a sign.
fn scan_numbers(s: &str) -> Vec<f64> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::with_capacity(2);
    let mut i = 0;

    while i < chars.len() && out.len() < 2 {
        let c = chars[i];
        let follows_number = chars[..i]
            .iter()
            .rev()
            .find(|p| !p.is_whitespace())
            .is_some_and(|p| p.is_ascii_digit() || *p == '.');
        let is_sign = c == '-'
            && !follows_number
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        if c.is_ascii_digit() || is_sign {
            let start = i;
            i += 1;
            let mut seen_dot = false;
            while i < chars.len() {
                let d = chars[i];
                if d.is_ascii_digit() {
                    i += 1;
                } else if d == '.'
                    && !seen_dot
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
                {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            let token: String = chars[start..i].iter().collect();
            if let Ok(v) = token.parse::<f64>() {
                out.push(v);
            }
        } else {
            i += 1;
        }
    }

    out
}

// ── Wind direction ────────────────────────────────────────────────────────────

/// 16-point compass bucket for a bearing in degrees.
pub fn degrees_to_compass(degrees: f64) -> &'static str {
    let idx = (degrees / 22.5).round().rem_euclid(16.0) as usize;
    COMPASS[idx]
}

/// Decode a direction cell.
///
/// Text is preferred: a compass code is taken as-is, a "<n>°" text is bucketed
/// to a compass code. Failing that the cell markup is read: a "(<n>°)" title
/// first, then the arrow's `rotate(<n>deg)` transform. Markup-derived values
/// stay in degrees.
pub fn parse_direction(text: &str, html: &str) -> Option<WindDirection> {
    let text = text.trim();

    if is_compass_code(text) {
        return Some(WindDirection::Compass(text.to_uppercase()));
    }

    if let Some(deg) = number_before_degree_mark(text) {
        return Some(WindDirection::Compass(degrees_to_compass(deg).to_string()));
    }

    if let Some(deg) = parenthesised_degrees(html) {
        return Some(WindDirection::Degrees(wrap_degrees(deg)));
    }

    rotation_degrees(html).map(|rot| WindDirection::Degrees(wrap_degrees(rot + ARROW_ROTATION_OFFSET)))
}

fn is_compass_code(s: &str) -> bool {
    (1..=3).contains(&s.len())
        && s.chars().all(|c| matches!(c.to_ascii_uppercase(), 'N' | 'E' | 'S' | 'W'))
}

fn wrap_degrees(deg: f64) -> u16 {
    (deg.round().rem_euclid(360.0)) as u16
}

/// "135°" / "135 °" / "wind 135.5°" → 135.x
fn number_before_degree_mark(s: &str) -> Option<f64> {
    let mark = s.find('°')?;
    let head = s[..mark].trim_end();
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map(|(i, _)| i)?;
    head[start..].parse().ok()
}

/// `title="NW (315°)"` → 315
fn parenthesised_degrees(html: &str) -> Option<f64> {
    let mut rest = html;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() && after[digits.len()..].starts_with("°)") {
            return digits.parse().ok();
        }
        rest = after;
    }
    None
}

/// `style="transform: rotate(-45deg)"` → -45
fn rotation_degrees(html: &str) -> Option<f64> {
    let start = html.find("rotate(")? + "rotate(".len();
    let inner = &html[start..];
    let end = inner.find("deg")?;
    inner[..end].trim().parse().ok()
}

// ── Cloud cover ───────────────────────────────────────────────────────────────

/// Combine low/mid/high cloud cells. Levels outside 0–100 are dropped;
/// `total` is the max of what remains.
pub fn parse_cloud_cover(low: &str, mid: &str, high: &str) -> Option<CloudCover> {
    let level = |s: &str| parse_numeric(s).filter(|v| (0.0..=100.0).contains(v));
    let (low, mid, high) = (level(low), level(mid), level(high));

    let total = [low, mid, high].into_iter().flatten().reduce(f64::max)?;

    Some(CloudCover {
        low,
        mid,
        high,
        total,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
