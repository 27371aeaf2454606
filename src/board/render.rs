//! Text rendering of the board for diagnostics.
//!
//! Draws the 5x12 grid with one marker per station, row 1 at the top:
//! `+<symbol>` for our pieces, `-?` for hidden opponent pieces and
//! `-<symbol>` once an opponent rank is known.

use std::fmt;

use super::piece::{Piece, Side};
use super::state::Board;
use super::station::{Station, COLUMNS, ROWS};

const PAD: &str = "  ";

/// Marker for a single piece.
pub fn piece_marker(piece: &Piece) -> String {
    let sign = match piece.side {
        Side::Own => '+',
        Side::Opponent => '-',
    };
    let symbol = piece.rank.map_or('?', |r| r.symbol());
    format!("{}{}", sign, symbol)
}

/// Renders the grid with `mark(station)` in every cell. Columns widen to
/// their longest marker, so callers may join several markers with `,`.
pub fn render_grid<F>(mark: F) -> String
where
    F: Fn(Station) -> String,
{
    let marks: Vec<Vec<String>> = (0..ROWS as u8)
        .map(|row| {
            (0..COLUMNS as u8)
                .map(|col| Station::at(col, row).map(&mark).unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<usize> = (0..COLUMNS)
        .map(|col| {
            marks
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let separator = {
        let dashes: Vec<String> = widths
            .iter()
            .map(|w| "-".repeat(w + 2 * PAD.len()))
            .collect();
        format!("   +{}+", dashes.join("+"))
    };
    let cells = |texts: &[String]| -> Vec<String> {
        texts
            .iter()
            .zip(&widths)
            .map(|(text, &width)| format!("{PAD}{:^width$}{PAD}", text))
            .collect()
    };

    let letters: Vec<String> = (0..COLUMNS as u8)
        .map(|c| char::from(b'A' + c).to_string())
        .collect();
    let mut lines = vec![format!("    {} ", cells(&letters).join(" "))];
    for (row, row_marks) in marks.iter().enumerate() {
        lines.push(separator.clone());
        lines.push(format!("{:>2} |{}|", row + 1, cells(row_marks).join("|")));
    }
    lines.push(separator);
    lines.join("\n")
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = render_grid(|s| {
            self.get(s)
                .map(|p| piece_marker(&p))
                .unwrap_or_default()
        });
        f.write_str(&grid)
    }
}
