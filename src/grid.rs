// src/grid.rs

//! The boolean pixel grid and the glyph composer.
//!
//! A [`Grid`] is a row-major boolean matrix, one cell per LED. Composition
//! always produces an exact 14x14 canvas; CSV import is deliberately
//! permissive and may yield ragged or undersized grids, which the frame
//! encoder rejects at the point of use.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::glyph::{Glyph, Symbol, DIGITS};

/// Edge length of the LED matrix, in cells.
pub const GRID_SIZE: usize = 14;

/// First column of the leading digit glyph.
const FIRST_DIGIT_COL: usize = 1;
/// Column stride between consecutive digit glyphs (3 columns + 1 gap).
const DIGIT_STRIDE: usize = 4;

/// A row-major boolean pixel matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<bool>>,
}

impl Grid {
    /// An all-unlit 14x14 grid.
    pub fn blank() -> Self {
        Grid {
            rows: vec![vec![false; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Wraps raw rows without validating their shape. Undersized grids are
    /// accepted here and rejected by the frame encoder.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Self {
        Grid { rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells in `row`, or zero for a missing row.
    pub fn col_count(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    /// Cell state at `(row, col)`. Cells outside the stored rows read unlit.
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Sets the cell at `(row, col)`, ignoring writes outside the stored rows.
    pub fn set(&mut self, row: usize, col: usize, lit: bool) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = lit;
        }
    }

    /// Stamps `glyph` with its top-left corner at `(row, col)`.
    ///
    /// Cells that would land outside the stored grid are clipped, not an
    /// error: a tall glyph placed near the bottom edge simply loses its
    /// lower rows.
    pub fn stamp(&mut self, glyph: &Glyph, row: usize, col: usize) {
        for i in 0..glyph.height() {
            for j in 0..glyph.width() {
                self.set(row + i, col + j, glyph.is_set(i, j));
            }
        }
    }

    /// Serializes the grid as CSV, one row per line, cells as `1`/`0`.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let line: Vec<&str> = row.iter().map(|&lit| if lit { "1" } else { "0" }).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// Parses CSV text into a grid. Every `1` token lights a cell; anything
    /// else reads unlit. Ragged input is preserved as-is.
    pub fn from_csv(text: &str) -> Self {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(',').map(|cell| cell.trim() == "1").collect())
            .collect();
        Grid { rows }
    }
}

impl fmt::Display for Grid {
    /// Renders the grid with `#` for lit cells, one line per row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for &lit in row {
                f.write_str(if lit { "#" } else { "." })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Error returned when a telemetry value cannot be rendered as glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueOutOfRange(pub u16);

impl fmt::Display for ValueOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value {} outside displayable range 0..=999", self.0)
    }
}

impl std::error::Error for ValueOutOfRange {}

/// Renders `value` and a trailing unit symbol onto a fresh 14x14 grid.
///
/// Values below 100 are laid out as two digits at columns 1 and 5 with the
/// symbol at column 9; three-digit values use columns 1, 5 and 9 with the
/// symbol at column 13. Glyph rows that overflow the canvas are clipped.
pub fn compose(value: u16, symbol: Symbol, base_row: usize) -> Result<Grid, ValueOutOfRange> {
    if value > 999 {
        return Err(ValueOutOfRange(value));
    }

    let mut grid = Grid::blank();

    let (digits, symbol_col): (Vec<usize>, usize) = if value < 100 {
        (vec![(value / 10) as usize, (value % 10) as usize], 9)
    } else {
        (
            vec![
                (value / 100) as usize,
                ((value % 100) / 10) as usize,
                (value % 10) as usize,
            ],
            13,
        )
    };

    let mut col = FIRST_DIGIT_COL;
    for digit in digits {
        grid.stamp(&DIGITS[digit], base_row, col);
        col += DIGIT_STRIDE;
    }
    grid.stamp(symbol.glyph(), base_row, symbol_col);

    Ok(grid)
}

/// Reads a CSV pattern file from disk.
pub fn parse_csv_file(path: &Path) -> Result<Grid> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read pattern file {}", path.display()))?;
    Ok(Grid::from_csv(&text))
}

/// Writes `grid` as `<name>.csv` under the application config directory,
/// creating the directory if needed. Returns the path written.
pub fn export_csv(name: &str, grid: &Grid) -> Result<PathBuf> {
    let dir = crate::config::app_config_dir().context("no config directory available")?;
    export_csv_to(&dir, name, grid)
}

fn export_csv_to(dir: &Path, name: &str, grid: &Grid) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("{name}.csv"));
    fs::write(&path, grid.to_csv())
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!("exported pattern to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::Symbol;

    /// Collects the lit cells of `glyph` translated to `(base_row, col)`.
    fn expect_glyph_at(grid: &Grid, glyph: &Glyph, base_row: usize, col: usize) {
        for i in 0..glyph.height() {
            for j in 0..glyph.width() {
                let (row, c) = (base_row + i, col + j);
                if row < GRID_SIZE && c < GRID_SIZE {
                    assert_eq!(
                        grid.get(row, c),
                        glyph.is_set(i, j),
                        "cell mismatch at ({row}, {c})"
                    );
                }
            }
        }
    }

    #[test]
    fn compose_two_digit_layout() {
        let grid = compose(7, Symbol::Celsius, 5).unwrap();
        // 7 renders as the digits 0 and 7 with the unit at column 9.
        expect_glyph_at(&grid, &DIGITS[0], 5, 1);
        expect_glyph_at(&grid, &DIGITS[7], 5, 5);
        expect_glyph_at(&grid, Symbol::Celsius.glyph(), 5, 9);
    }

    #[test]
    fn compose_three_digit_layout() {
        let grid = compose(305, Symbol::Fahrenheit, 0).unwrap();
        expect_glyph_at(&grid, &DIGITS[3], 0, 1);
        expect_glyph_at(&grid, &DIGITS[0], 0, 5);
        expect_glyph_at(&grid, &DIGITS[5], 0, 9);
        expect_glyph_at(&grid, Symbol::Fahrenheit.glyph(), 0, 13);
    }

    #[test]
    fn compose_rejects_values_above_999() {
        assert_eq!(
            compose(1000, Symbol::Percent, 5).unwrap_err(),
            ValueOutOfRange(1000)
        );
    }

    #[test]
    fn compose_clips_glyphs_at_the_bottom_edge() {
        // Base row 12 leaves room for only the top two glyph rows.
        let grid = compose(7, Symbol::Celsius, 12).unwrap();
        assert!(grid.get(12, 1) && grid.get(12, 2) && grid.get(12, 3));
        assert!(grid.get(13, 1) && !grid.get(13, 2) && grid.get(13, 3));
        // Nothing below the canvas, and nothing wrapped around to the top.
        for row in 0..12 {
            for col in 0..GRID_SIZE {
                assert!(!grid.get(row, col), "unexpected lit cell at ({row}, {col})");
            }
        }
    }

    #[test]
    fn compose_leaves_untouched_cells_unlit() {
        let grid = compose(42, Symbol::Percent, 5).unwrap();
        // Column 0 is a margin and never painted.
        for row in 0..GRID_SIZE {
            assert!(!grid.get(row, 0));
        }
    }

    #[test]
    fn csv_round_trip_preserves_cells() {
        let grid = compose(42, Symbol::Percent, 5).unwrap();
        let parsed = Grid::from_csv(&grid.to_csv());
        assert_eq!(parsed, grid);
    }

    #[test]
    fn csv_accepts_ragged_input() {
        let grid = Grid::from_csv("1,0,1\n0\n1,1");
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.col_count(0), 3);
        assert_eq!(grid.col_count(1), 1);
        assert!(grid.get(0, 0) && !grid.get(0, 1) && grid.get(0, 2));
        assert!(grid.get(2, 1));
        // Out-of-range reads stay unlit rather than panicking.
        assert!(!grid.get(1, 5));
    }

    #[test]
    fn csv_treats_non_one_tokens_as_unlit() {
        let grid = Grid::from_csv("1,x,0,2\n");
        assert!(grid.get(0, 0));
        assert!(!grid.get(0, 1));
        assert!(!grid.get(0, 2));
        assert!(!grid.get(0, 3));
    }

    #[test]
    fn csv_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.csv");
        let grid = compose(99, Symbol::Celsius, 5).unwrap();
        std::fs::write(&path, grid.to_csv()).unwrap();
        let parsed = parse_csv_file(&path).unwrap();
        assert_eq!(parsed, grid);
    }

    #[test]
    fn export_writes_under_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/matrixd");
        let grid = compose(7, Symbol::Percent, 5).unwrap();
        let path = export_csv_to(&target, "saved", &grid).unwrap();
        assert_eq!(path, target.join("saved.csv"));
        assert_eq!(parse_csv_file(&path).unwrap(), grid);
    }

    #[test]
    fn stamp_overwrites_covered_cells() {
        let mut grid = Grid::blank();
        // Pre-light a cell inside the glyph footprint that the glyph leaves
        // unlit; stamping must clear it, matching the source bitmap exactly.
        grid.set(6, 2, true);
        grid.stamp(&DIGITS[0], 5, 1);
        assert!(!grid.get(6, 2), "glyph hole should overwrite lit cell");
    }
}
