//! Exact mine probabilities for a group of numbered cells.
//!
//! Each group from [`crate::groups`] is an independent constraint problem:
//! its variables are the distinct hidden unflagged cells its members touch,
//! and every member demands that exactly `hint - flagged` of its own
//! variables are mines. Feasible assignments over the shared variables are
//! enumerated outright - group sizes are kept small by the partitioning
//! step, and each member's local combinations are bounded by its at most
//! eight neighbors - and each variable's mine probability is the fraction
//! of feasible assignments in which it carries a mine.

use std::collections::HashMap;

use anyhow::Result;
use itertools::Itertools;

use crate::{Action, Board, Cell, Point, Tile};

/// Mine statistics for one hidden cell, measured over a group's feasible
/// assignments.
#[derive(Debug, Clone, Copy)]
pub struct CellOdds {
    pub pos: Point,
    /// Feasible assignments in which this cell is a mine.
    pub mine_count: usize,
    /// All feasible assignments of the group.
    pub total_count: usize,
}

impl CellOdds {
    pub fn probability(&self) -> f64 {
        self.mine_count as f64 / self.total_count as f64
    }

    pub fn certain_mine(&self) -> bool {
        self.mine_count == self.total_count
    }

    pub fn certain_safe(&self) -> bool {
        self.mine_count == 0
    }
}

/// The outcome of constraint-solving every group on the board.
#[derive(Debug)]
pub struct Analysis {
    /// Certain moves: flags for probability-1 cells, opens for probability-0.
    pub actions: Vec<Action>,
    /// When no certain move exists anywhere, the globally least likely
    /// mine. Ties go to the first cell seen in enumeration order.
    pub guess: Option<Point>,
}

/// Solves each group independently and merges the verdicts.
///
/// An inconsistent group (zero feasible assignments) means the board and
/// the deductions made so far disagree; it is skipped so the remaining
/// groups still get evaluated.
pub fn analyze(board: &Board, groups: &[Vec<Cell>]) -> Analysis {
    let mut actions = Vec::new();
    let mut best: Option<CellOdds> = None;

    for group in groups {
        let odds = match solve_group(board, group) {
            Ok(odds) => odds,
            Err(_) => continue,
        };

        for cell_odds in odds {
            if cell_odds.certain_mine() {
                actions.push(Action::Flag(cell_odds.pos));
            } else if cell_odds.certain_safe() {
                actions.push(Action::Open(cell_odds.pos));
            } else if best.is_none_or(|b| b.probability() > cell_odds.probability()) {
                best = Some(cell_odds);
            }
        }
    }

    let guess = if actions.is_empty() {
        best.map(|b| b.pos)
    } else {
        None
    };

    Analysis { actions, guess }
}

/// One member cell's view of the group: the indices of the shared
/// variables it touches and its locally valid mine subsets.
struct Member {
    vars: Vec<usize>,
    combos: Vec<Vec<usize>>,
}

/// Computes per-variable mine odds for one group.
///
/// Fails with zero feasible assignments; a group with no variables at all
/// short-circuits to an empty (and trivially consistent) answer.
pub fn solve_group(board: &Board, group: &[Cell]) -> Result<Vec<CellOdds>> {
    // Shared variables in first-encounter order, deduplicated by
    // coordinate: the same hidden cell seen from two members is one
    // variable.
    let mut var_index: HashMap<Point, usize> = HashMap::new();
    let mut vars: Vec<Point> = Vec::new();
    let mut members: Vec<Member> = Vec::with_capacity(group.len());

    for cell in group {
        let hint = cell.hint().unwrap_or(0) as usize;
        let mut own = Vec::new();
        let mut flagged = 0usize;

        for neighbor in board.neighbors(cell.pos) {
            if board.is_flagged(neighbor.pos) {
                flagged += 1;
                continue;
            }
            if matches!(neighbor.tile, Tile::Hidden) {
                let idx = *var_index.entry(neighbor.pos).or_insert_with(|| {
                    vars.push(neighbor.pos);
                    vars.len() - 1
                });
                own.push(idx);
            }
        }

        // Mines still owed by this cell. A negative budget means the cell
        // is unsatisfiable on its own; it contributes zero combinations,
        // which surfaces below as an inconsistent group rather than a
        // wrong probability.
        let combos: Vec<Vec<usize>> = match hint.checked_sub(flagged) {
            Some(budget) => own.iter().copied().combinations(budget).collect(),
            None => Vec::new(),
        };

        members.push(Member { vars: own, combos });
    }

    if vars.is_empty() {
        return Ok(Vec::new());
    }

    let mut assignment: Vec<Option<bool>> = vec![None; vars.len()];
    let mut mine_counts = vec![0usize; vars.len()];
    let mut total = 0usize;
    compose(&members, 0, &mut assignment, &mut mine_counts, &mut total);

    if total == 0 {
        anyhow::bail!("unsat_group");
    }

    Ok(vars
        .iter()
        .enumerate()
        .map(|(i, &pos)| CellOdds {
            pos,
            mine_count: mine_counts[i],
            total_count: total,
        })
        .collect())
}

/// Backtracking conjunction over the members' combination sets: a global
/// assignment is feasible exactly when every member finds one of its own
/// combinations embedded in it.
fn compose(
    members: &[Member],
    depth: usize,
    assignment: &mut [Option<bool>],
    mine_counts: &mut [usize],
    total: &mut usize,
) {
    let Some(member) = members.get(depth) else {
        // Every member placed its mines consistently: one feasible
        // assignment, tallied per variable.
        *total += 1;
        for (i, value) in assignment.iter().enumerate() {
            if *value == Some(true) {
                mine_counts[i] += 1;
            }
        }
        return;
    };

    for combo in &member.combos {
        let mut touched: Vec<usize> = Vec::new();
        let mut compatible = true;

        for &var in &member.vars {
            let want = combo.contains(&var);
            match assignment[var] {
                Some(have) => {
                    if have != want {
                        compatible = false;
                        break;
                    }
                }
                None => {
                    assignment[var] = Some(want);
                    touched.push(var);
                }
            }
        }

        if compatible {
            compose(members, depth + 1, assignment, mine_counts, total);
        }
        for var in touched {
            assignment[var] = None;
        }
    }
}
