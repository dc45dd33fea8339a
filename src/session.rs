//! The solve session: one puzzle instance played over a command protocol.
//!
//! Outbound commands are plain strings: `new <difficulty>` starts a game,
//! `open <x> <y>` reveals a cell, `map` asks for a full grid refresh.
//! Inbound messages are either a `map:` payload carrying the grid body, or
//! free text whose `You lose` / `You win` substrings end the game.
//!
//! A session runs one decision cycle at a time, always against the last
//! good grid: deduction first, constraint solving only when deduction
//! stalls, and a refresh request after every batch of moves. In auto-solve
//! mode each incoming map triggers the next cycle, so cycles and refreshes
//! are serialized by construction.

use anyhow::Result;

use crate::board::Board;
use crate::{constraint, deduce, groups, Action};

/// The wire the session plays over.
///
/// `send` delivers one command to the opponent; `recv` pops the next
/// queued inbound message, if any. The session never blocks: whoever owns
/// it decides when to pump.
pub trait Transport {
    fn send(&mut self, command: &str) -> Result<()>;
    fn recv(&mut self) -> Option<String>;
}

/// One puzzle instance and everything needed to play it.
pub struct Session<T: Transport> {
    transport: T,
    raw_map: String,
    board: Option<Board>,
    autosolve: bool,
    game_started: bool,
    /// Set when a cycle found neither an action nor a guess; cleared as
    /// soon as the grid changes. Stops auto-solve from spinning on a board
    /// it can do nothing with.
    stalled: bool,
    on_map_updated: Option<Box<dyn FnMut(&str)>>,
    on_game_lost: Option<Box<dyn FnMut()>>,
    on_game_win: Option<Box<dyn FnMut(&str)>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Session {
            transport,
            raw_map: String::new(),
            board: None,
            autosolve: false,
            game_started: false,
            stalled: false,
            on_map_updated: None,
            on_game_lost: None,
            on_game_win: None,
        }
    }

    /// Called with the latest grid body whenever it changes outside of
    /// auto-solve mode.
    pub fn on_map_updated(&mut self, f: impl FnMut(&str) + 'static) {
        self.on_map_updated = Some(Box::new(f));
    }

    pub fn on_game_lost(&mut self, f: impl FnMut() + 'static) {
        self.on_game_lost = Some(Box::new(f));
    }

    /// Called with the opponent's raw message on a win.
    pub fn on_game_win(&mut self, f: impl FnMut(&str) + 'static) {
        self.on_game_win = Some(Box::new(f));
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Discards all per-game state and asks for a fresh puzzle. The first
    /// cell is opened immediately; any opening is as good as any other.
    pub fn start_game(&mut self, difficulty: u32) -> Result<()> {
        self.raw_map.clear();
        self.board = None;
        self.autosolve = false;
        self.game_started = false;
        self.stalled = false;
        self.transport.send(&format!("new {difficulty}"))?;
        self.open_coords(0, 0)
    }

    /// Reveals one cell by hand and requests the resulting grid.
    pub fn open_coords(&mut self, x: usize, y: usize) -> Result<()> {
        self.transport.send(&format!("open {x} {y}"))?;
        self.request_map()
    }

    /// Switches to continuous solving. Each map refresh from here on
    /// triggers the next step until the game ends or the solver stalls.
    pub fn set_autosolve(&mut self) -> Result<()> {
        if self.game_started {
            self.autosolve = true;
            self.make_step()?;
        }
        Ok(())
    }

    /// Runs one full decision cycle against the current grid.
    ///
    /// Deduction acts alone when it can. When it stalls, the frontier is
    /// partitioned and constraint-solved: certain cells are flagged or
    /// opened, and failing that the least-likely mine is opened as a
    /// guess. Flags stay local; opens go over the wire; either way the
    /// cycle ends by requesting a refreshed grid.
    pub fn make_step(&mut self) -> Result<()> {
        let Some(board) = self.board.as_mut() else {
            return Ok(());
        };

        let mut list = deduce::build_worklist(board);
        let mut actions = Vec::new();
        let acted = deduce::run_pass(board, &mut list, &mut actions);

        if !acted {
            let frontier = groups::partition(board);
            let analysis = constraint::analyze(board, &frontier);
            if analysis.actions.is_empty() {
                if let Some(p) = analysis.guess {
                    actions.push(Action::Open(p));
                }
            } else {
                actions = analysis.actions;
            }
        }

        self.stalled = actions.is_empty();

        for action in &actions {
            match action {
                Action::Flag(p) => board.mark_flag(*p),
                Action::Open(p) => self.transport.send(&format!("open {} {}", p.x, p.y))?,
            }
        }

        self.request_map()
    }

    /// Feeds one inbound message through [`Self::handle_message`].
    /// Returns whether a message was consumed.
    pub fn poll(&mut self) -> Result<bool> {
        match self.transport.recv() {
            Some(message) => {
                self.handle_message(&message)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Dispatches one inbound message.
    pub fn handle_message(&mut self, message: &str) -> Result<()> {
        if let Some(rest) = message.strip_prefix("map:") {
            let body = rest.strip_prefix('\n').unwrap_or(rest);
            self.apply_map(body)?;
        }

        if message.contains("You lose") {
            self.game_started = false;
            self.autosolve = false;
            if let Some(cb) = &mut self.on_game_lost {
                cb();
            }
        }

        if message.contains("You win") {
            self.game_started = false;
            self.autosolve = false;
            if let Some(cb) = &mut self.on_game_win {
                cb(message);
            }
        }

        Ok(())
    }

    /// Installs a refreshed grid. A body that fails to parse, or that
    /// disagrees with the dimensions fixed by the game's first map, is
    /// dropped silently and the last good state stands.
    fn apply_map(&mut self, body: &str) -> Result<()> {
        match &mut self.board {
            Some(board) => {
                if board.refresh(body).is_err() {
                    return Ok(());
                }
            }
            None => match Board::parse(body) {
                Ok(board) => {
                    self.board = Some(board);
                    self.game_started = true;
                }
                Err(_) => return Ok(()),
            },
        }

        if self.raw_map != body {
            self.raw_map.clear();
            self.raw_map.push_str(body);
            self.stalled = false;
        }

        if self.autosolve {
            if !self.stalled {
                self.make_step()?;
            }
        } else if let Some(cb) = &mut self.on_map_updated {
            cb(body);
        }

        Ok(())
    }

    fn request_map(&mut self) -> Result<()> {
        self.transport.send("map")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct MockTransport {
        sent: Vec<String>,
        inbox: VecDeque<String>,
    }

    impl Transport for MockTransport {
        fn send(&mut self, command: &str) -> Result<()> {
            self.sent.push(command.to_string());
            Ok(())
        }

        fn recv(&mut self) -> Option<String> {
            self.inbox.pop_front()
        }
    }

    fn session_with_map(body: &str) -> Session<MockTransport> {
        let mut session = Session::new(MockTransport::default());
        session.handle_message(&format!("map:\n{body}")).unwrap();
        session
    }

    #[test]
    fn test_start_game_resets_and_opens_origin() {
        let mut session = session_with_map("1?\n??\n");
        assert!(session.board().is_some());

        session.start_game(2).unwrap();
        assert!(session.board().is_none());
        assert_eq!(
            session.transport().sent,
            vec!["new 2", "open 0 0", "map"]
        );
    }

    #[test]
    fn test_map_message_parses_board_and_fires_callback() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let seen_handle = Rc::clone(&seen);

        let mut session = Session::new(MockTransport::default());
        session.on_map_updated(move |body| seen_handle.borrow_mut().push(body.to_string()));
        session.handle_message("map:\n01?\n01?\n").unwrap();

        let board = session.board().unwrap();
        assert_eq!(board.width(), 3);
        assert_eq!(seen.borrow().as_slice(), ["01?\n01?\n"]);
    }

    #[test]
    fn test_malformed_map_keeps_last_good_state() {
        let mut session = session_with_map("1?\n??\n");
        session.handle_message("map:\n1?????\n?\n").unwrap();

        let board = session.board().unwrap();
        assert_eq!(board.width(), 2);
        assert_eq!(board.height(), 2);
    }

    #[test]
    fn test_step_flags_locally_and_opens_over_the_wire() {
        // '?2?' saturates: both neighbors get flagged, nothing is sent but
        // the refresh request.
        let mut session = session_with_map("?2?\n");
        session.make_step().unwrap();
        assert_eq!(session.transport().sent, vec!["map"]);
        assert!(session.board().unwrap().is_flagged(Point { x: 0, y: 0 }));
        assert!(session.board().unwrap().is_flagged(Point { x: 2, y: 0 }));

        // The refreshed grid satisfies the '2'; nothing remains to do, but
        // a '1' whose mine is flagged would open. Exercise the open path
        // with a fresh session instead.
        let mut session = session_with_map("121\n???\n");
        session.make_step().unwrap();
        // Deduction stalls, the constraint solver pins all three cells.
        assert_eq!(
            session.transport().sent,
            vec!["open 1 1", "map"]
        );
        assert!(session.board().unwrap().is_flagged(Point { x: 0, y: 1 }));
        assert!(session.board().unwrap().is_flagged(Point { x: 2, y: 1 }));
    }

    #[test]
    fn test_guess_is_sent_when_nothing_is_certain() {
        let mut session = session_with_map("?1?\n");
        session.make_step().unwrap();
        assert_eq!(session.transport().sent, vec!["open 0 0", "map"]);
    }

    #[test]
    fn test_idle_cycle_requests_refresh_once_then_rests() {
        // No frontier at all: the cycle ends idle. In auto-solve mode the
        // unchanged refresh must not trigger another step.
        let mut session = session_with_map("00\n00\n");
        session.set_autosolve().unwrap();
        assert_eq!(session.transport().sent, vec!["map"]);

        session.handle_message("map:\n00\n00\n").unwrap();
        assert_eq!(session.transport().sent, vec!["map"]);
    }

    #[test]
    fn test_loss_halts_autosolve() {
        let lost = Rc::new(RefCell::new(false));
        let lost_handle = Rc::clone(&lost);

        let mut session = session_with_map("?1?\n");
        session.on_game_lost(move || *lost_handle.borrow_mut() = true);
        session.set_autosolve().unwrap();
        let sent_before = session.transport().sent.len();

        session.handle_message("You lose").unwrap();
        assert!(*lost.borrow());

        // Further map refreshes no longer step.
        session.handle_message("map:\n010\n").unwrap();
        assert_eq!(session.transport().sent.len(), sent_before);
    }

    #[test]
    fn test_win_passes_raw_message() {
        let message: Rc<RefCell<String>> = Rc::default();
        let message_handle = Rc::clone(&message);

        let mut session = session_with_map("?1?\n");
        session.on_game_win(move |m| *message_handle.borrow_mut() = m.to_string());
        session.handle_message("You win: 42 moves").unwrap();

        assert_eq!(message.borrow().as_str(), "You win: 42 moves");
    }

    #[test]
    fn test_autosolve_steps_on_each_changed_map() {
        let mut session = session_with_map("?2?\n");
        session.set_autosolve().unwrap();
        // The saturated step flagged both cells and asked for a refresh.
        assert_eq!(session.transport().sent, vec!["map"]);

        // The board is unchanged on the wire (flags are local), but the
        // step acted, so the session is not stalled and keeps going. The
        // satisfied '2' now resolves with nothing to open, which finally
        // stalls the session.
        session.handle_message("map:\n?2?\n").unwrap();
        assert_eq!(session.transport().sent, vec!["map", "map"]);
        session.handle_message("map:\n?2?\n").unwrap();
        assert_eq!(session.transport().sent, vec!["map", "map"]);
    }
}
