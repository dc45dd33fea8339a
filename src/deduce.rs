//! The deterministic deduction pass.
//!
//! Every numbered cell sits in a circular worklist and is visited round
//! after round. Two counting rules can fire on a visit:
//!
//! 1. Satisfied: the cell already has as many flagged neighbors as its
//!    hint, so every other hidden neighbor is safe to open.
//! 2. Saturated: the cell has exactly as many hidden neighbors as its
//!    hint, so all of them are mines.
//!
//! Either rule fully resolves the cell, which is then removed from the
//! worklist. A cell where neither rule fires is left in place: flags
//! placed for other cells later in the same pass may unlock it. The pass
//! ends when a full revolution of the circle produces no action.

use crate::list::{CircularList, NodeId};
use crate::{Action, Board, Cell, Tile};

/// Builds the worklist for one pass: every revealed cell with a non-zero
/// hint, in row-major order. Zero hints carry no obligation and are
/// skipped outright.
pub fn build_worklist(board: &Board) -> CircularList<Cell> {
    let mut list = CircularList::new();
    for cell in board.cells() {
        if matches!(cell.tile, Tile::Revealed(n) if n > 0) {
            list.push(cell);
        }
    }
    list
}

/// Drains the worklist to a fixed point, appending the moves it finds.
///
/// `Flag` actions are applied to the board immediately so that cells
/// visited later in the same pass see them; `Open` actions are only
/// recorded - the grid stays stale until the caller refreshes it, which it
/// must do before deducing again whenever this returns `true`.
pub fn run_pass(board: &mut Board, list: &mut CircularList<Cell>, out: &mut Vec<Action>) -> bool {
    let mut acted = false;

    // A full revolution with no action means nothing more can be deduced.
    // The sentinel is the first node visited since the last action; seeing
    // it again closes the revolution. The idle counter is a backstop that
    // bounds the walk even if the sentinel node itself gets removed.
    let mut sentinel: Option<NodeId> = None;
    let mut idle_visits = 0usize;

    let Some(mut cursor) = list.head() else {
        return false;
    };

    loop {
        let cell = *list.get(cursor);
        let after = list.next(cursor);
        let hint = match cell.tile {
            Tile::Revealed(n) => n as usize,
            Tile::Hidden => unreachable!("worklist only holds numbered cells"),
        };

        let neighbors: Vec<Cell> = board.neighbors(cell.pos).collect();
        let flagged = neighbors
            .iter()
            .filter(|c| board.is_flagged(c.pos))
            .count();
        let closed = neighbors
            .iter()
            .filter(|c| matches!(c.tile, Tile::Hidden))
            .count();

        let resolved = if flagged == hint {
            // Satisfied: everything hidden and unflagged around it is safe.
            for n in &neighbors {
                if matches!(n.tile, Tile::Hidden) && !board.is_flagged(n.pos) {
                    out.push(Action::Open(n.pos));
                    acted = true;
                    sentinel = None;
                    idle_visits = 0;
                }
            }
            true
        } else if closed == hint {
            // Saturated: every hidden neighbor must be a mine.
            for n in &neighbors {
                if matches!(n.tile, Tile::Hidden) && !board.is_flagged(n.pos) {
                    board.mark_flag(n.pos);
                    out.push(Action::Flag(n.pos));
                    acted = true;
                    sentinel = None;
                    idle_visits = 0;
                }
            }
            true
        } else {
            false
        };

        if resolved {
            list.remove(cursor);
            if list.is_empty() {
                break;
            }
        } else {
            if sentinel == Some(cursor) {
                break;
            }
            if sentinel.is_none() {
                sentinel = Some(cursor);
            }
            idle_visits += 1;
            if idle_visits > list.len() {
                break;
            }
        }

        cursor = after;
    }

    acted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn pass(board: &mut Board) -> (bool, Vec<Action>, CircularList<Cell>) {
        let mut list = build_worklist(board);
        let mut actions = Vec::new();
        let acted = run_pass(board, &mut list, &mut actions);
        (acted, actions, list)
    }

    #[test]
    fn test_worklist_skips_zero_hints() {
        let board = Board::parse("01?\n0??\n").unwrap();
        let list = build_worklist(&board);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_saturated_rule_flags_all_closed_neighbors() {
        // A '2' between two unknowns on a single row: both must be mines.
        let mut board = Board::parse("?2?\n").unwrap();
        let (acted, actions, list) = pass(&mut board);

        assert!(acted);
        assert_eq!(
            actions,
            vec![
                Action::Flag(Point { x: 0, y: 0 }),
                Action::Flag(Point { x: 2, y: 0 }),
            ]
        );
        assert!(board.is_flagged(Point { x: 0, y: 0 }));
        assert!(board.is_flagged(Point { x: 2, y: 0 }));
        // The node is fully resolved and gone from the worklist.
        assert!(list.is_empty());
    }

    #[test]
    fn test_satisfied_rule_opens_remaining_neighbors() {
        // A '1' with its mine already flagged: the other unknown is safe.
        let mut board = Board::parse("?1?\n").unwrap();
        board.mark_flag(Point { x: 0, y: 0 });

        let (acted, actions, list) = pass(&mut board);

        assert!(acted);
        assert_eq!(actions, vec![Action::Open(Point { x: 2, y: 0 })]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_flags_placed_mid_pass_feed_the_satisfied_rule() {
        // Both '2's see the same two unknowns. The first visit flags them
        // (saturated); the second visit then finds itself satisfied with
        // nothing left to open, and both nodes resolve in one pass.
        let mut board = Board::parse("22\n??\n").unwrap();
        let (acted, actions, list) = pass(&mut board);

        assert!(acted);
        assert_eq!(
            actions,
            vec![
                Action::Flag(Point { x: 0, y: 1 }),
                Action::Flag(Point { x: 1, y: 1 }),
            ]
        );
        assert!(list.is_empty());
    }

    #[test]
    fn test_stalled_board_reports_no_action() {
        // A '1' with two unknowns: neither rule can fire.
        let mut board = Board::parse("?1?\n").unwrap();
        let (acted, actions, list) = pass(&mut board);

        assert!(!acted);
        assert!(actions.is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_stalled_multi_node_pass_terminates() {
        // Several stuck nodes: the pass must stop after one idle revolution.
        let mut board = Board::parse("?1?1?\n?????\n").unwrap();
        let (acted, actions, list) = pass(&mut board);

        assert!(!acted);
        assert!(actions.is_empty());
        assert_eq!(list.len(), 2);
    }
}
