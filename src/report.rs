//! Human-readable run summaries.

use owo_colors::{colors::css, OwoColorize};

use crate::filter::Summary;

/// Detects whether colored output should be enabled on stdout.
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

fn paint_count(value: usize, color: bool, removed: bool) -> String {
    let text = value.to_string();
    match (color, removed) {
        (false, _) => text,
        (true, false) => text.fg::<css::Green>().bold().to_string(),
        (true, true) => text.fg::<css::Orange>().bold().to_string(),
    }
}

/// Renders the end-of-run panel.
///
/// ```text
/// ┌─ Bibliography pruned ─────┐
/// │ Entries in original:    3 │
/// │ Cited entries kept:     2 │
/// │ Entries removed:        1 │
/// └───────────────────────────┘
/// ```
pub fn render_summary(summary: &Summary, color: bool) -> String {
    let rows = [
        ("Entries in original:", summary.total, false),
        ("Cited entries kept:", summary.kept, false),
        ("Entries removed:", summary.removed, true),
    ];

    let label_width = rows.iter().map(|(label, _, _)| label.len()).max().unwrap_or(0);
    let value_width = rows
        .iter()
        .map(|(_, value, _)| value.to_string().len())
        .max()
        .unwrap_or(0);
    // "│ " + label + " " + value + " │"
    let inner = label_width + 1 + value_width.max(4);

    let title = " Bibliography pruned ";
    let title_fill = (inner + 2).saturating_sub(title.chars().count() + 1);
    let painted_title = if color {
        title.fg::<css::LightBlue>().bold().to_string()
    } else {
        title.to_string()
    };

    let mut out = format!("┌─{painted_title}{}┐\n", "─".repeat(title_fill));
    for (label, value, removed) in rows {
        let padding = inner - label.len() - value.to_string().len();
        out.push_str(&format!(
            "│ {label}{}{} │\n",
            " ".repeat(padding),
            paint_count(value, color, removed)
        ));
    }
    out.push_str(&format!("└{}┘\n", "─".repeat(inner + 2)));
    out
}
