//! Plays the solver against a local simulated opponent.
//!
//! `LocalGame` speaks the same textual protocol a remote server would:
//! `new`, `open` and `map` go in, `map:` payloads and `You lose` /
//! `You win` come back. Mines are placed after the first open so the
//! opening move is always a cascade.

use std::collections::{HashSet, VecDeque};

use anyhow::Result;
use rand::prelude::*;

use minesweeper_bot::{Point, Session, Transport};

enum Outcome {
    Playing,
    Lost,
    Won,
}

/// An in-process minesweeper opponent.
struct LocalGame {
    width: usize,
    height: usize,
    mine_target: usize,
    mines: HashSet<Point>,
    revealed: HashSet<Point>,
    outcome: Outcome,
    outbox: VecDeque<String>,
    rng: StdRng,
}

impl LocalGame {
    fn new(seed: u64) -> Self {
        LocalGame {
            width: 0,
            height: 0,
            mine_target: 0,
            mines: HashSet::new(),
            revealed: HashSet::new(),
            outcome: Outcome::Playing,
            outbox: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    fn revealed(&self) -> &HashSet<Point> {
        &self.revealed
    }

    fn won(&self) -> bool {
        matches!(self.outcome, Outcome::Won)
    }

    fn lost(&self) -> bool {
        matches!(self.outcome, Outcome::Lost)
    }

    fn reset(&mut self, difficulty: u32) {
        let (width, height, mine_target) = match difficulty {
            1 => (9, 9, 10),
            2 => (16, 16, 40),
            _ => (24, 24, 99),
        };
        self.width = width;
        self.height = height;
        self.mine_target = mine_target;
        self.mines.clear();
        self.revealed.clear();
        self.outcome = Outcome::Playing;
        self.outbox.clear();
    }

    fn neighbors_of(&self, p: Point) -> Vec<Point> {
        let mut out = Vec::new();
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = p.x as isize + dx;
                let ny = p.y as isize + dy;
                if nx >= 0 && nx < self.width as isize && ny >= 0 && ny < self.height as isize {
                    out.push(Point {
                        x: nx as usize,
                        y: ny as usize,
                    });
                }
            }
        }
        out
    }

    /// Scatters mines anywhere outside the first opened cell and its
    /// neighbors, so the first reveal is guaranteed to be a zero.
    fn place_mines(&mut self, first: Point) {
        let mut safe: HashSet<Point> = HashSet::from([first]);
        safe.extend(self.neighbors_of(first));

        let mut candidates: Vec<Point> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Point { x, y }))
            .filter(|p| !safe.contains(p))
            .collect();
        candidates.shuffle(&mut self.rng);
        self.mines = candidates.into_iter().take(self.mine_target).collect();
    }

    fn adjacent_mines(&self, p: Point) -> usize {
        self.neighbors_of(p)
            .iter()
            .filter(|n| self.mines.contains(n))
            .count()
    }

    fn open(&mut self, p: Point) {
        if !matches!(self.outcome, Outcome::Playing) || self.revealed.contains(&p) {
            return;
        }
        if self.mines.is_empty() {
            self.place_mines(p);
        }
        if self.mines.contains(&p) {
            self.outcome = Outcome::Lost;
            self.outbox.push_back("You lose".to_string());
            return;
        }

        // Cascade: zero cells pull in their whole neighborhood.
        let mut stack = vec![p];
        while let Some(q) = stack.pop() {
            if !self.revealed.insert(q) {
                continue;
            }
            if self.adjacent_mines(q) == 0 {
                for n in self.neighbors_of(q) {
                    if !self.revealed.contains(&n) && !self.mines.contains(&n) {
                        stack.push(n);
                    }
                }
            }
        }

        if self.revealed.len() == self.width * self.height - self.mines.len() {
            self.outcome = Outcome::Won;
            self.outbox
                .push_back(format!("You win: {} cells opened", self.revealed.len()));
        }
    }

    fn render(&self) -> String {
        let mut body = String::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Point { x, y };
                if self.revealed.contains(&p) {
                    body.push(char::from_digit(self.adjacent_mines(p) as u32, 10).unwrap_or('?'));
                } else {
                    body.push('?');
                }
            }
            body.push('\n');
        }
        body
    }
}

impl Transport for LocalGame {
    fn send(&mut self, command: &str) -> Result<()> {
        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("new") => {
                let difficulty: u32 = parts.next().unwrap_or("1").parse().unwrap_or(1);
                self.reset(difficulty);
            }
            Some("open") => {
                let x: usize = parts.next().unwrap_or("0").parse()?;
                let y: usize = parts.next().unwrap_or("0").parse()?;
                if x < self.width && y < self.height {
                    self.open(Point { x, y });
                }
            }
            Some("map") => {
                self.outbox.push_back(format!("map:\n{}", self.render()));
            }
            _ => anyhow::bail!("unknown_command"),
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<String> {
        self.outbox.pop_front()
    }
}

fn print_board(session: &Session<LocalGame>) {
    let Some(board) = session.board() else {
        return;
    };
    for y in 0..board.height() {
        let mut line = String::new();
        for x in 0..board.width() {
            let p = Point { x, y };
            line.push(if board.is_flagged(p) {
                'F'
            } else {
                match board.cell(p).hint() {
                    Some(n) => char::from_digit(n as u32, 10).unwrap_or('?'),
                    None => '?',
                }
            });
        }
        println!("{line}");
    }
}

fn main() -> Result<()> {
    let seed: u64 = rand::rng().random();
    println!("seed: {seed}");

    let mut session = Session::new(LocalGame::new(seed));
    session.on_game_lost(|| println!("hit a mine"));
    session.on_game_win(|message| println!("{message}"));

    session.start_game(1)?;
    while session.poll()? {}
    session.set_autosolve()?;
    while session.poll()? {}

    print_board(&session);
    println!(
        "game over: won={} lost={}",
        session.transport().won(),
        session.transport().lost()
    );
    Ok(())
}
