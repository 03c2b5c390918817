//! Formatted output helpers for CLI commands.
//!
//! Provides consistent headings, column padding, diagnostic lines, and
//! human-readable memory figures.

use stackforge_common::diagnostic::Diagnostic;

/// Formats a megabyte figure (e.g., "512 MB", "1.5 GB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_megabytes(mb: u64) -> String {
    if mb >= 1024 {
        format!("{:.1} GB", mb as f64 / 1024.0)
    } else {
        format!("{mb} MB")
    }
}

/// A title underlined with a double rule.
#[must_use]
pub fn heading(title: &str) -> String {
    format!("{title}\n{}", "\u{2550}".repeat(title.chars().count().max(35)))
}

/// Pads each cell to its column width and joins them with two spaces.
///
/// The last cell is never padded.
#[must_use]
pub fn row(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let width = widths.get(i).copied().unwrap_or(0);
        if i + 1 < cells.len() {
            line.push_str(&format!("{cell:<width$}"));
        } else {
            line.push_str(cell);
        }
    }
    line
}

/// Column widths fitting a header and every row.
#[must_use]
pub fn widths(header: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    widths
}

/// One diagnostic as an indented, tagged line.
#[must_use]
pub fn diagnostic_line(marker: &str, diagnostic: &Diagnostic) -> String {
    format!("  {marker} [{}] {}", diagnostic.kind, diagnostic.message)
}

/// Prints a table with a header row.
#[allow(clippy::print_stdout)]
pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let widths = widths(header, rows);
    println!("{}", row(header, &widths));
    for r in rows {
        let cells: Vec<&str> = r.iter().map(String::as_str).collect();
        println!("{}", row(&cells, &widths));
    }
}

/// Prints a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
