//! The visible board: the parsed grid plus the set of flagged coordinates.

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Cell, Point, Tile};

/// The parsed grid as last reported by the opponent, together with the
/// flags this solver has placed.
///
/// The grid is rebuilt wholesale on every refresh, never patched in place.
/// Flags survive refreshes: a flag only ever sits on a hidden cell, and a
/// flagged cell is never sent as a reveal, so the opponent can never show
/// it to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    rows: Vec<Vec<Tile>>,
    flags: HashSet<Point>,
}

impl Board {
    /// Parses a grid body: one character per cell, rows separated by `\n`,
    /// a trailing empty row discarded. A digit is a revealed hint, any
    /// other character is a hidden cell.
    pub fn parse(body: &str) -> Result<Self> {
        let rows = parse_rows(body)?;
        Ok(Board {
            width: rows[0].len(),
            height: rows.len(),
            rows,
            flags: HashSet::new(),
        })
    }

    /// Replaces the grid with a fresh parse of `body`, keeping flags.
    ///
    /// The first map of a game fixes the dimensions; a refresh that
    /// disagrees with them is rejected and the current grid is retained.
    pub fn refresh(&mut self, body: &str) -> Result<()> {
        let rows = parse_rows(body)?;
        if rows.len() != self.height || rows[0].len() != self.width {
            anyhow::bail!("map_size_changed");
        }
        self.rows = rows;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile(&self, p: Point) -> Tile {
        self.rows[p.y][p.x]
    }

    pub fn cell(&self, p: Point) -> Cell {
        Cell {
            pos: p,
            tile: self.tile(p),
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).map(move |x| self.cell(Point { x, y }))
        })
    }

    /// The up-to-8 grid-adjacent cells, clipped at board edges, in
    /// row-major order within the 3x3 window around `p`.
    pub fn neighbors(&self, p: Point) -> impl Iterator<Item = Cell> + '_ {
        let width = self.width;
        let height = self.height;
        (-1..=1).flat_map(move |dy: isize| {
            (-1..=1).filter_map(move |dx: isize| {
                if dx == 0 && dy == 0 {
                    return None;
                }
                let nx = p.x as isize + dx;
                let ny = p.y as isize + dy;
                if nx >= 0 && nx < width as isize && ny >= 0 && ny < height as isize {
                    Some(self.cell(Point {
                        x: nx as usize,
                        y: ny as usize,
                    }))
                } else {
                    None
                }
            })
        })
    }

    pub fn is_closed(&self, p: Point) -> bool {
        matches!(self.tile(p), Tile::Hidden)
    }

    pub fn is_flagged(&self, p: Point) -> bool {
        self.flags.contains(&p)
    }

    pub fn flagged_neighbor_count(&self, p: Point) -> usize {
        self.neighbors(p).filter(|c| self.is_flagged(c.pos)).count()
    }

    /// Hidden neighbors, flagged ones included.
    pub fn closed_neighbor_count(&self, p: Point) -> usize {
        self.neighbors(p)
            .filter(|c| matches!(c.tile, Tile::Hidden))
            .count()
    }

    /// Marks a believed mine. The grid itself is untouched; the cell stays
    /// hidden until the opponent says otherwise, which for a real mine it
    /// never will.
    pub fn mark_flag(&mut self, p: Point) {
        self.flags.insert(p);
    }

    pub fn flags(&self) -> &HashSet<Point> {
        &self.flags
    }

    /// Serializes the board state to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// Deserializes a board state from bytes.
    pub fn deserialize(bts: &[u8]) -> Result<Self> {
        Ok(bcs::from_bytes(bts)?)
    }
}

fn parse_rows(body: &str) -> Result<Vec<Vec<Tile>>> {
    let mut lines: Vec<&str> = body.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    if lines.is_empty() {
        anyhow::bail!("empty_map");
    }

    let rows: Vec<Vec<Tile>> = lines
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| match c.to_digit(10) {
                    Some(n) => Tile::Revealed(n as u8),
                    None => Tile::Hidden,
                })
                .collect()
        })
        .collect();

    let width = rows[0].len();
    if width == 0 || rows.iter().any(|row| row.len() != width) {
        anyhow::bail!("ragged_map");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discards_trailing_empty_row() {
        let board = Board::parse("1?\n??\n").unwrap();
        assert_eq!(board.width(), 2);
        assert_eq!(board.height(), 2);
        assert_eq!(board.tile(Point { x: 0, y: 0 }), Tile::Revealed(1));
        assert_eq!(board.tile(Point { x: 1, y: 1 }), Tile::Hidden);
    }

    #[test]
    fn test_parse_rejects_ragged_and_empty() {
        assert!(Board::parse("12\n???\n").is_err());
        assert!(Board::parse("").is_err());
        assert!(Board::parse("\n").is_err());
    }

    #[test]
    fn test_neighbor_count_by_position() {
        let board = Board::parse("000\n000\n000\n").unwrap();

        // Corner, edge, center.
        assert_eq!(board.neighbors(Point { x: 0, y: 0 }).count(), 3);
        assert_eq!(board.neighbors(Point { x: 1, y: 0 }).count(), 5);
        assert_eq!(board.neighbors(Point { x: 1, y: 1 }).count(), 8);
    }

    #[test]
    fn test_neighbor_order_is_row_major() {
        let board = Board::parse("012\n345\n678\n").unwrap();
        let hints: Vec<u8> = board
            .neighbors(Point { x: 1, y: 1 })
            .filter_map(|c| c.hint())
            .collect();
        assert_eq!(hints, vec![0, 1, 2, 3, 5, 6, 7, 8]);
    }

    #[test]
    fn test_counts_and_flags() {
        let mut board = Board::parse("1??\n???\n").unwrap();
        let p = Point { x: 0, y: 0 };
        assert_eq!(board.closed_neighbor_count(p), 3);
        assert_eq!(board.flagged_neighbor_count(p), 0);

        board.mark_flag(Point { x: 1, y: 0 });
        assert_eq!(board.flagged_neighbor_count(p), 1);
        // Flagged cells still count as closed.
        assert_eq!(board.closed_neighbor_count(p), 3);
        assert!(board.is_flagged(Point { x: 1, y: 0 }));
        assert!(board.is_closed(Point { x: 1, y: 0 }));
    }

    #[test]
    fn test_refresh_keeps_flags_and_checks_dimensions() {
        let mut board = Board::parse("1?\n??\n").unwrap();
        board.mark_flag(Point { x: 1, y: 1 });

        board.refresh("11\n?1\n").unwrap();
        assert_eq!(board.tile(Point { x: 1, y: 0 }), Tile::Revealed(1));
        assert!(board.is_flagged(Point { x: 1, y: 1 }));

        // A refresh with different dimensions is rejected, grid retained.
        assert!(board.refresh("111\n?11\n").is_err());
        assert_eq!(board.width(), 2);
        assert_eq!(board.tile(Point { x: 1, y: 0 }), Tile::Revealed(1));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut board = Board::parse("21?\n???\n").unwrap();
        board.mark_flag(Point { x: 0, y: 1 });

        let bts = board.serialize().unwrap();
        let restored = Board::deserialize(&bts).unwrap();
        assert_eq!(restored.width(), 3);
        assert_eq!(restored.tile(Point { x: 0, y: 0 }), Tile::Revealed(2));
        assert!(restored.is_flagged(Point { x: 0, y: 1 }));
    }
}
