//! An autonomous solver for a networked minesweeper game.
//!
//! The game is played over a line-oriented command protocol (`new`, `open`,
//! `map`) against a remote opponent that owns the ground truth. This crate
//! only ever sees the visible grid: revealed numbers and unrevealed cells.
//! From that it decides which cells are certainly safe, which are certainly
//! mines, and - when logic runs out - which cell is the least risky guess.
//!
//! The pipeline is:
//! 1. [`deduce`] - a worklist of numbered cells is drained with the two
//!    counting rules until a full circular pass makes no progress.
//! 2. [`groups`] - the stalled frontier is split into connected components
//!    that share unrevealed neighbors, so each can be solved independently.
//! 3. [`constraint`] - per component, every feasible mine placement is
//!    enumerated and each unknown cell gets an exact mine probability.
//! 4. [`session`] - a [`Session`] drives the protocol: it applies certain
//!    moves, falls back to the lowest-probability guess, and requests a grid
//!    refresh after every action.

use serde::{Deserialize, Serialize};

pub mod board;
pub mod constraint;
pub mod deduce;
pub mod groups;
pub mod list;
pub mod session;

pub use board::Board;
pub use constraint::{Analysis, CellOdds};
pub use list::{CircularList, NodeId};
pub use session::{Session, Transport};

/// A 2D coordinate on the board, 0-indexed from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

/// The visible state of a single cell.
///
/// `Hidden` covers everything the opponent has not shown us: unrevealed
/// cells and cells we have flagged ourselves. `Revealed(0)` is an open,
/// empty cell with nothing left to deduce from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Hidden,
    Revealed(u8),
}

/// A cell snapshot: a coordinate paired with its visible state.
///
/// Cells are plain values re-derived from the board on demand; they are
/// never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub pos: Point,
    pub tile: Tile,
}

impl Cell {
    /// The numeric hint of a revealed cell, or `None` when hidden.
    pub fn hint(&self) -> Option<u8> {
        match self.tile {
            Tile::Revealed(n) => Some(n),
            Tile::Hidden => None,
        }
    }
}

/// A move the engine wants to make.
///
/// `Open` is sent to the opponent over the wire; `Flag` is a local marker
/// only (a flagged cell is never sent as a reveal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open(Point),
    Flag(Point),
}
