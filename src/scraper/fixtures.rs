//! Synthetic Windguru-like pages for tests.

const DAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

fn period_label(col: usize) -> String {
    let hours = 12 + col * 3;
    format!("{} {}. {:02}h", DAYS[hours / 24 % 7], 16 + hours / 24, hours % 24)
}

/// Nine positional rows (label cell first) with `cols` forecast columns.
pub fn grid(cols: usize) -> Vec<Vec<String>> {
    let row = |label: &str, cell: &dyn Fn(usize) -> String| {
        std::iter::once(label.to_string())
            .chain((0..cols).map(cell))
            .collect::<Vec<_>>()
    };

    vec![
        row("", &period_label),
        row("Wind speed (knots)", &|i| (12 + i).to_string()),
        row("Wind gusts (knots)", &|i| (18 + i).to_string()),
        row("Wind direction", &|i| {
            format!(
                r#"<span class="wgarrow"><svg style="transform: rotate({}deg)"></svg></span>"#,
                -45 + 10 * i as i32
            )
        }),
        row("Temperature (°C)", &|i| (18 - i as i32).to_string()),
        row("Cloud cover low (%)", &|_| "40".to_string()),
        row("Cloud cover mid (%)", &|i| (10 * i).to_string()),
        row("Cloud cover high (%)", &|_| String::new()),
        row("Precip. (mm/3h)", &|i| if i == 0 { "0.4".into() } else { "0".into() }),
    ]
}

pub fn table_markup(class: &str, grid: &[Vec<String>]) -> String {
    let rows: String = grid
        .iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
            format!("<tr>{}</tr>", tds)
        })
        .collect();
    format!(r#"<table class="{}"><tbody>{}</tbody></table>"#, class, rows)
}

pub fn page_with_table(class: &str, grid: &[Vec<String>]) -> String {
    format!("<html><body>{}</body></html>", table_markup(class, grid))
}

/// A full spot page the way the provider serves it once rendered.
pub fn forecast_page(spot_name: &str, cols: usize) -> String {
    format!(
        r#"<html><head><title>Windguru</title></head><body>
<div class="spot-name">{}</div>
<div id="div_wgfcst1">{}</div>
</body></html>"#,
        spot_name,
        table_markup("tabulka", &grid(cols))
    )
}

/// What the lightweight fetch sees when the table is drawn client-side.
pub fn script_shell_page() -> String {
    r#"<html><body><div id="div_wgfcst1"></div><script src="/js/wg.js"></script></body></html>"#
        .to_string()
}
