//! Human-readable summaries of a run's edges.

pub mod slack;

use crate::types::EdgeRecord;

const HEADERS: [&str; 8] = ["Player", "Market", "Side", "Line", "Odds", "EV%", "z", "Units"];

/// Format an American price with an explicit sign for plus money.
pub fn format_price(price: i32) -> String {
    if price > 0 {
        format!("+{price}")
    } else {
        price.to_string()
    }
}

fn row_cells(edge: &EdgeRecord) -> [String; 8] {
    [
        edge.player.clone(),
        edge.market.clone(),
        edge.side.to_string(),
        format!("{}", edge.line),
        format_price(edge.price),
        format!("{:.1}", edge.expected_value * 100.0),
        format!("{:.2}", edge.z_score),
        format!("{:.2}", edge.unit_size),
    ]
}

/// Render the first `n` edges (already ranked) as a fixed-width table.
pub fn format_top_table(edges: &[EdgeRecord], n: usize) -> String {
    let rows: Vec<[String; 8]> = edges.iter().take(n).map(row_cells).collect();
    if rows.is_empty() {
        return "No picks available.".to_string();
    }

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![render(&header)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(|row| render(&row[..])));
    lines.join("\n")
}
