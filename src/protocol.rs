// src/protocol.rs

//! Wire frame encoding for the display controller.
//!
//! The device accepts a single 36-byte bulk command per refresh:
//!
//! ```text
//! offset  0..6   fixed header 10 68 01 05 1D 01
//! offset  6..34  packed pixel body, 28 bytes
//! offset  34     checksum: sum of bytes 1..=33, mod 256
//! offset  35     fixed trailer 0x16
//! ```
//!
//! The body packs each of the 14 columns into two bytes. Every physical row
//! carries a fixed weight, repeating in pairs down the panel; for a column,
//! the weights of its lit odd rows are summed into one byte and the weights
//! of its lit even rows into another. Odd-row bytes are laid out ascending
//! from offset 6, even-row bytes descending from offset 33, so the two
//! halves of the body mirror each other by column. Any deviation here
//! garbles the panel without any error from the device, which is why this
//! module carries golden byte vectors in its tests.

use std::fmt;

use crate::grid::{Grid, GRID_SIZE};

/// Total frame length in bytes.
pub const FRAME_LEN: usize = 36;

/// Fixed command header.
pub const HEADER: [u8; 6] = [0x10, 0x68, 0x01, 0x05, 0x1D, 0x01];

/// Fixed trailer byte.
pub const TRAILER: u8 = 0x16;

/// Per-row packing weights, 1-indexed rows, repeating in pairs.
const ROW_WEIGHTS: [u8; GRID_SIZE] = [
    0x10, 0x10, // rows 1-2
    0x20, 0x20, // rows 3-4
    0x40, 0x40, // rows 5-6
    0x80, 0x80, // rows 7-8
    0x01, 0x01, // rows 9-10
    0x02, 0x02, // rows 11-12
    0x04, 0x04, // rows 13-14
];

/// One encoded 36-byte display command.
///
/// Frames are plain values: copyable, byte-comparable, and rendered
/// hex-encoded by `Debug` for log lines.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Hex rendition of the frame, for logging.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.to_hex())
    }
}

/// Error returned when a grid is too small to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedGrid {
    /// Fewer than 14 rows were supplied.
    NotEnoughRows { rows: usize },
    /// One of the first 14 rows has fewer than 14 cells.
    ShortRow { row: usize, cols: usize },
}

impl fmt::Display for MalformedGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedGrid::NotEnoughRows { rows } => {
                write!(f, "grid has {rows} rows, need {GRID_SIZE}")
            }
            MalformedGrid::ShortRow { row, cols } => {
                write!(f, "grid row {row} has {cols} cells, need {GRID_SIZE}")
            }
        }
    }
}

impl std::error::Error for MalformedGrid {}

/// Encodes a grid into the 36-byte wire frame.
///
/// Pure and deterministic: the same grid always yields the same frame. The
/// grid must cover at least 14x14 cells; extra rows or columns are ignored.
pub fn encode(grid: &Grid) -> Result<Frame, MalformedGrid> {
    if grid.row_count() < GRID_SIZE {
        return Err(MalformedGrid::NotEnoughRows {
            rows: grid.row_count(),
        });
    }
    for row in 0..GRID_SIZE {
        if grid.col_count(row) < GRID_SIZE {
            return Err(MalformedGrid::ShortRow {
                row,
                cols: grid.col_count(row),
            });
        }
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[..HEADER.len()].copy_from_slice(&HEADER);

    for col in 1..=GRID_SIZE {
        let mut odd: u32 = 0;
        let mut even: u32 = 0;
        for row in 1..=GRID_SIZE {
            if grid.get(row - 1, col - 1) {
                let weight = u32::from(ROW_WEIGHTS[row - 1]);
                if row % 2 == 0 {
                    even += weight;
                } else {
                    odd += weight;
                }
            }
        }
        frame[HEADER.len() + col - 1] = (odd % 256) as u8;
        frame[HEADER.len() + 28 - col] = (even % 256) as u8;
    }

    let checksum: u32 = frame[1..=33].iter().map(|&b| u32::from(b)).sum();
    frame[34] = (checksum % 256) as u8;
    frame[35] = TRAILER;

    Ok(Frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::Symbol;
    use crate::grid::compose;

    /// Reference frame for `compose(42, Percent, 5)`, captured from the
    /// known-good encoder output.
    const GOLDEN_42_PERCENT: [u8; FRAME_LEN] = [
        0x10, 0x68, 0x01, 0x05, 0x1D, 0x01, 0x00, 0x80, 0x00, 0x81, 0x00, 0x01, 0x00, 0x80, 0x00,
        0x00, 0x80, 0x01, 0x00, 0x80, 0x01, 0x80, 0x00, 0x01, 0x00, 0x00, 0xC1, 0xC1, 0xC1, 0x00,
        0xC1, 0x80, 0xC0, 0x00, 0xD5, 0x16,
    ];

    /// Reference frame for `compose(7, Celsius, 5)`.
    const GOLDEN_7_CELSIUS: [u8; FRAME_LEN] = [
        0x10, 0x68, 0x01, 0x05, 0x1D, 0x01, 0x00, 0x81, 0x00, 0x81, 0x00, 0x00, 0x01, 0x80, 0x00,
        0x00, 0x01, 0x80, 0x80, 0x00, 0x00, 0x01, 0x01, 0x80, 0x40, 0x00, 0x40, 0xC1, 0x40, 0x00,
        0xC1, 0x41, 0xC1, 0x00, 0xD6, 0x16,
    ];

    fn assert_frame_invariants(frame: &Frame) {
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(&bytes[..6], &HEADER);
        assert_eq!(bytes[35], TRAILER);
        let sum: u32 = bytes[1..=33].iter().map(|&b| u32::from(b)).sum();
        assert_eq!(bytes[34], (sum % 256) as u8);
    }

    #[test]
    fn blank_grid_encodes_to_empty_body() {
        let frame = encode(&Grid::blank()).unwrap();
        assert_frame_invariants(&frame);
        assert!(frame.as_bytes()[6..34].iter().all(|&b| b == 0));
        assert_eq!(frame.as_bytes()[34], 0x8C);
    }

    #[test]
    fn full_grid_lights_every_weight() {
        let grid = Grid::from_rows(vec![vec![true; GRID_SIZE]; GRID_SIZE]);
        let frame = encode(&grid).unwrap();
        assert_frame_invariants(&frame);
        // Every column sums the full odd and even weight sets: 0xF7 each.
        assert!(frame.as_bytes()[6..34].iter().all(|&b| b == 0xF7));
        assert_eq!(frame.as_bytes()[34], 0x90);
    }

    #[test]
    fn top_left_cell_lands_in_first_odd_byte() {
        let mut grid = Grid::blank();
        grid.set(0, 0, true);
        let frame = encode(&grid).unwrap();
        assert_eq!(frame.as_bytes()[6], 0x10);
        assert!(frame.as_bytes()[7..34].iter().all(|&b| b == 0));
    }

    #[test]
    fn second_row_cell_lands_in_last_even_byte() {
        // Row 2 is even, so column 1's even byte sits at the mirrored end of
        // the body (offset 6 + 28 - 1 = 33).
        let mut grid = Grid::blank();
        grid.set(1, 0, true);
        let frame = encode(&grid).unwrap();
        assert_eq!(frame.as_bytes()[33], 0x10);
        assert!(frame.as_bytes()[6..33].iter().all(|&b| b == 0));
    }

    #[test]
    fn bottom_right_cell_uses_smallest_weight() {
        let mut grid = Grid::blank();
        grid.set(GRID_SIZE - 1, GRID_SIZE - 1, true);
        let frame = encode(&grid).unwrap();
        // Row 14 is even with weight 0x04; column 14's even byte is at
        // offset 6 + 28 - 14 = 20.
        assert_eq!(frame.as_bytes()[20], 0x04);
    }

    #[test]
    fn odd_and_even_halves_are_independent() {
        let mut odd_only = Grid::blank();
        let mut even_only = Grid::blank();
        for row in 0..GRID_SIZE {
            let target = if row % 2 == 0 { &mut odd_only } else { &mut even_only };
            target.set(row, 3, true);
        }
        let odd_frame = encode(&odd_only).unwrap();
        let even_frame = encode(&even_only).unwrap();
        // Odd rows (1-indexed) populate only the ascending half, even rows
        // only the descending half.
        assert!(odd_frame.as_bytes()[6..20].iter().any(|&b| b != 0));
        assert!(odd_frame.as_bytes()[20..34].iter().all(|&b| b == 0));
        assert!(even_frame.as_bytes()[6..20].iter().all(|&b| b == 0));
        assert!(even_frame.as_bytes()[20..34].iter().any(|&b| b != 0));
    }

    #[test]
    fn encode_is_deterministic() {
        let grid = compose(123, Symbol::Fahrenheit, 5).unwrap();
        assert_eq!(encode(&grid).unwrap(), encode(&grid).unwrap());
    }

    #[test]
    fn single_cell_changes_the_body() {
        let base = compose(42, Symbol::Percent, 5).unwrap();
        let mut flipped = base.clone();
        flipped.set(0, 0, !flipped.get(0, 0));
        assert_ne!(encode(&base).unwrap(), encode(&flipped).unwrap());
    }

    #[test]
    fn golden_vector_42_percent() {
        let grid = compose(42, Symbol::Percent, 5).unwrap();
        let frame = encode(&grid).unwrap();
        assert_eq!(frame.as_bytes(), &GOLDEN_42_PERCENT);
    }

    #[test]
    fn golden_vector_7_celsius() {
        let grid = compose(7, Symbol::Celsius, 5).unwrap();
        let frame = encode(&grid).unwrap();
        assert_eq!(frame.as_bytes(), &GOLDEN_7_CELSIUS);
    }

    #[test]
    fn undersized_grids_are_rejected() {
        let short = Grid::from_rows(vec![vec![false; GRID_SIZE]; 13]);
        assert_eq!(
            encode(&short).unwrap_err(),
            MalformedGrid::NotEnoughRows { rows: 13 }
        );

        let mut rows = vec![vec![false; GRID_SIZE]; GRID_SIZE];
        rows[6] = vec![false; 9];
        let ragged = Grid::from_rows(rows);
        assert_eq!(
            encode(&ragged).unwrap_err(),
            MalformedGrid::ShortRow { row: 6, cols: 9 }
        );
    }

    #[test]
    fn oversized_grids_ignore_the_excess() {
        let exact = Grid::from_rows(vec![vec![true; GRID_SIZE]; GRID_SIZE]);
        let oversized = Grid::from_rows(vec![vec![true; 20]; 17]);
        assert_eq!(encode(&exact).unwrap(), encode(&oversized).unwrap());
    }

    #[test]
    fn hex_rendition_matches_bytes() {
        let frame = encode(&Grid::blank()).unwrap();
        assert_eq!(frame.to_hex().len(), FRAME_LEN * 2);
        assert!(frame.to_hex().starts_with("1068"));
    }
}
