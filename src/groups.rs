//! Partitioning of the numbered frontier into independent groups.
//!
//! Once deduction stalls, the remaining numbered cells constrain their
//! hidden neighbors jointly. Solving them all at once would be needlessly
//! exponential: two numbered cells only interact if they constrain at
//! least one common unknown. The frontier is therefore flood-filled into
//! connected components under that relation, and each component is handed
//! to the constraint solver on its own.

use std::collections::HashSet;

use crate::{Board, Cell, Point, Tile};

/// Splits the board's numbered frontier into groups.
///
/// Seeds a depth-first fill at every numbered, unresolved cell not yet
/// grouped, scanning row-major. A cell joins a group only while it still
/// has mines unaccounted for (flagged neighbors fewer than its hint), and,
/// when reached through a neighbor, only if the two share at least one
/// hidden unflagged cell - grid adjacency alone says nothing about whether
/// their constraints overlap.
pub fn partition(board: &Board) -> Vec<Vec<Cell>> {
    let mut groups = Vec::new();
    let mut grouped: HashSet<Point> = HashSet::new();

    for cell in board.cells() {
        if !is_numbered(&cell) || grouped.contains(&cell.pos) {
            continue;
        }
        let mut group = Vec::new();
        fill(board, cell, None, &mut group, &mut grouped);
        if !group.is_empty() {
            groups.push(group);
        }
    }

    groups
}

fn is_numbered(cell: &Cell) -> bool {
    matches!(cell.tile, Tile::Revealed(n) if n > 0)
}

fn fill(
    board: &Board,
    cell: Cell,
    via: Option<Point>,
    group: &mut Vec<Cell>,
    grouped: &mut HashSet<Point>,
) {
    if !is_numbered(&cell) || grouped.contains(&cell.pos) {
        return;
    }

    let hint = cell.hint().unwrap_or(0) as usize;
    if board.flagged_neighbor_count(cell.pos) >= hint {
        // Already satisfied; it constrains nothing further.
        return;
    }

    if let Some(prev) = via {
        if !shares_closed_neighbor(board, cell.pos, prev) {
            return;
        }
    }

    group.push(cell);
    grouped.insert(cell.pos);

    for neighbor in board.neighbors(cell.pos) {
        if is_numbered(&neighbor) && !grouped.contains(&neighbor.pos) {
            fill(board, neighbor, Some(cell.pos), group, grouped);
        }
    }
}

/// Whether two cells have at least one hidden unflagged neighbor in common.
fn shares_closed_neighbor(board: &Board, a: Point, b: Point) -> bool {
    let closed_around_a: HashSet<Point> = board
        .neighbors(a)
        .filter(|c| matches!(c.tile, Tile::Hidden) && !board.is_flagged(c.pos))
        .map(|c| c.pos)
        .collect();

    board.neighbors(b).any(|c| closed_around_a.contains(&c.pos))
}
