//! Free-play game session.
//!
//! A session owns one [`Level`] and walks an explicit state machine:
//!
//! ```text
//!   Idle --select non-empty--> Selected(i) --select i--> Idle
//!                              Selected(i) --select j--> pour --> Idle | Settling
//!   Settling --settle()--> Idle
//! ```
//!
//! Every successful pour keeps the full pre-pour snapshot so undo restores
//! it exactly.

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::error::InvalidIndex;
use crate::generator::{GenerateError, generate_level};
use crate::model::Level;
use crate::pour::{IllegalPour, Move, PourError, PourOutcome, PourRules, StandardRules, legal_pours};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A container is picked as the pour source.
    Selected(usize),
    /// A pour was committed and the presentation layer is still animating it.
    Settling,
}

/// What a container click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected(usize),
    Deselected,
    /// Nothing happened: an empty container with no source picked, or the
    /// level is already won.
    Ignored,
    Poured { mv: Move, victory: bool },
    /// The pour broke a rule. The selection is cleared, nothing moved.
    Rejected(IllegalPour),
    /// A previous pour is still settling.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("no moves to undo")]
    EmptyHistory,

    #[error("no undone moves to redo")]
    NothingToRedo,

    #[error("a pour is still settling")]
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionOptions {
    /// Enter [`Phase::Settling`] after each pour until [`GameSession::settle`].
    pub settle: bool,
    /// Oldest undo entries are dropped beyond this depth.
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    mv: Move,
    /// The level on the other side of the move: before it for undo entries,
    /// after it for redo entries.
    snapshot: Level,
}

#[derive(Debug, Clone)]
pub struct GameSession<R: PourRules = StandardRules> {
    rules: R,
    options: SessionOptions,
    num_colors: usize,
    starting_level: Level,
    level: Level,
    phase: Phase,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    move_count: usize,
    solved: BTreeSet<usize>,
    victory: bool,
}

impl GameSession {
    pub fn new(level: Level) -> Self {
        Self::with_options(level, SessionOptions::default())
    }

    pub fn with_options(level: Level, options: SessionOptions) -> Self {
        Self::with_rules(level, options, StandardRules)
    }

    /// Generates a fresh level and starts a session on it.
    pub fn generate<G: Rng + ?Sized>(
        num_colors: usize,
        capacity: usize,
        options: SessionOptions,
        rng: &mut G,
    ) -> Result<Self, GenerateError> {
        let level = generate_level(num_colors, capacity, rng)?;
        Ok(Self::with_options(level, options))
    }
}

impl<R: PourRules> GameSession<R> {
    pub fn with_rules(level: Level, options: SessionOptions, rules: R) -> Self {
        let mut session = Self {
            rules,
            options,
            num_colors: count_colors(&level),
            starting_level: level.clone(),
            level,
            phase: Phase::Idle,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            move_count: 0,
            solved: BTreeSet::new(),
            victory: false,
        };
        session.refresh_status();
        session
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected(&self) -> Option<usize> {
        match self.phase {
            Phase::Selected(index) => Some(index),
            Phase::Idle | Phase::Settling => None,
        }
    }

    pub fn is_settling(&self) -> bool {
        self.phase == Phase::Settling
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    pub fn history_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Indices of containers that are currently full of a single color.
    pub fn solved(&self) -> &BTreeSet<usize> {
        &self.solved
    }

    pub fn is_victory(&self) -> bool {
        self.victory
    }

    /// False when no legal pour is left. Generated levels can end up here.
    pub fn has_moves(&self) -> bool {
        !legal_pours(&self.rules, &self.level).is_empty()
    }

    /// Containers the current selection could legally pour into.
    pub fn pour_targets(&self) -> Vec<usize> {
        let Some(from) = self.selected() else {
            return Vec::new();
        };
        (0..self.level.len())
            .filter(|&to| self.rules.check(&self.level, from, to).is_ok())
            .collect()
    }

    /// Handles a click on container `index`.
    #[instrument(skip(self), fields(phase = ?self.phase))]
    pub fn select_container(&mut self, index: usize) -> Result<Selection, InvalidIndex> {
        let target_empty = self.level.container(index)?.is_empty();

        let selection = match self.phase {
            Phase::Settling => Selection::Busy,
            _ if self.victory => Selection::Ignored,
            Phase::Idle if target_empty => Selection::Ignored,
            Phase::Idle => {
                self.phase = Phase::Selected(index);
                Selection::Selected(index)
            }
            Phase::Selected(from) if from == index => {
                self.phase = Phase::Idle;
                Selection::Deselected
            }
            Phase::Selected(from) => {
                self.phase = Phase::Idle;
                match self.rules.pour(&self.level, from, index) {
                    Ok(outcome) => self.commit(outcome),
                    Err(PourError::Illegal(reason)) => {
                        debug!(%reason, "pour rejected");
                        Selection::Rejected(reason)
                    }
                    Err(PourError::InvalidIndex(e)) => return Err(e),
                }
            }
        };
        Ok(selection)
    }

    fn commit(&mut self, outcome: PourOutcome) -> Selection {
        let PourOutcome { level, mv } = outcome;
        let before = std::mem::replace(&mut self.level, level);
        self.push_undo(HistoryEntry {
            mv,
            snapshot: before,
        });
        self.redo_stack.clear();
        self.move_count += 1;
        if self.options.settle {
            self.phase = Phase::Settling;
        }
        self.refresh_status();
        if self.victory {
            info!(moves = self.move_count, "level solved");
        }
        Selection::Poured {
            mv,
            victory: self.victory,
        }
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        if let Some(limit) = self.options.history_limit {
            if limit == 0 {
                return;
            }
            while self.undo_stack.len() >= limit {
                self.undo_stack.pop_front();
            }
        }
        self.undo_stack.push_back(entry);
    }

    /// Ends the settling phase. Returns false if nothing was settling.
    pub fn settle(&mut self) -> bool {
        if self.phase == Phase::Settling {
            self.phase = Phase::Idle;
            true
        } else {
            false
        }
    }

    /// Restores the snapshot taken before the last pour.
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> Result<Move, HistoryError> {
        if self.is_settling() {
            return Err(HistoryError::Settling);
        }
        let entry = self.undo_stack.pop_back().ok_or(HistoryError::EmptyHistory)?;
        let after = std::mem::replace(&mut self.level, entry.snapshot);
        self.redo_stack.push(HistoryEntry {
            mv: entry.mv,
            snapshot: after,
        });
        self.move_count = self.move_count.saturating_sub(1);
        self.phase = Phase::Idle;
        self.refresh_status();
        debug!(mv = %entry.mv, "undone");
        Ok(entry.mv)
    }

    /// Re-applies the last undone pour.
    #[instrument(skip(self))]
    pub fn redo(&mut self) -> Result<Move, HistoryError> {
        if self.is_settling() {
            return Err(HistoryError::Settling);
        }
        let entry = self.redo_stack.pop().ok_or(HistoryError::NothingToRedo)?;
        let before = std::mem::replace(&mut self.level, entry.snapshot);
        self.push_undo(HistoryEntry {
            mv: entry.mv,
            snapshot: before,
        });
        self.move_count += 1;
        self.phase = Phase::Idle;
        self.refresh_status();
        debug!(mv = %entry.mv, "redone");
        Ok(entry.mv)
    }

    /// Back to the level this session started with.
    pub fn restart(&mut self) {
        let level = self.starting_level.clone();
        self.load_level(level);
    }

    /// Replaces the level with a freshly generated one of the same size.
    pub fn reset<G: Rng + ?Sized>(&mut self, rng: &mut G) -> Result<(), GenerateError> {
        let level = generate_level(self.num_colors.max(1), self.level.capacity(), rng)?;
        self.load_level(level);
        Ok(())
    }

    /// Starts over on `level`, which also becomes the restart point.
    pub fn load_level(&mut self, level: Level) {
        self.num_colors = count_colors(&level);
        self.starting_level = level.clone();
        self.level = level;
        self.phase = Phase::Idle;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.move_count = 0;
        self.refresh_status();
    }

    /// Full rescan: whether a container counts as solved does not depend
    /// only on the two containers a pour touched.
    fn refresh_status(&mut self) {
        self.solved = self.level.solved_indices().into_iter().collect();
        self.victory = self.level.is_victory();
    }
}

fn count_colors(level: &Level) -> usize {
    level
        .containers()
        .iter()
        .flat_map(|c| c.get_packets())
        .map(|p| p.get_color_id())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FluidPacket;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session(text: &str) -> GameSession {
        GameSession::new(Level::from_text(text).unwrap())
    }

    #[test]
    fn select_then_deselect() {
        let mut s = session("AABB\nBBAA\n....\n....");
        assert_eq!(s.select_container(0), Ok(Selection::Selected(0)));
        assert_eq!(s.phase(), Phase::Selected(0));
        assert_eq!(s.select_container(0), Ok(Selection::Deselected));
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn clicking_empty_container_while_idle_is_ignored() {
        let mut s = session("AABB\nBBAA\n....\n....");
        assert_eq!(s.select_container(2), Ok(Selection::Ignored));
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn successful_pour_records_history() {
        let mut s = session("AABB\nBBAA\n....\n....");
        s.select_container(0).unwrap();
        let result = s.select_container(2).unwrap();
        assert_eq!(
            result,
            Selection::Poured {
                mv: Move::new(0, 2, FluidPacket::new(1), 2),
                victory: false,
            }
        );
        assert_eq!(s.level().to_text(), "AA..\nBBAA\nBB..\n....");
        assert_eq!(s.move_count(), 1);
        assert_eq!(s.history_depth(), 1);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn rejected_pour_clears_selection_without_changes() {
        let mut s = session("AAB.\nBBA.\n....");
        s.select_container(0).unwrap();
        let result = s.select_container(1).unwrap();
        assert!(matches!(
            result,
            Selection::Rejected(IllegalPour::ColorMismatch { .. })
        ));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.level().to_text(), "AAB.\nBBA.\n....");
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.history_depth(), 0);
    }

    #[test]
    fn undo_restores_snapshot_and_count() {
        let mut s = session("AABB\nBBAA\n....\n....");
        let before = s.level().clone();
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        let mv = s.undo().unwrap();
        assert_eq!(mv.units(), 2);
        assert_eq!(s.level(), &before);
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.undo(), Err(HistoryError::EmptyHistory));
    }

    #[test]
    fn undo_clears_selection() {
        let mut s = session("AABB\nBBAA\n....\n....");
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        s.select_container(1).unwrap();
        assert_eq!(s.phase(), Phase::Selected(1));
        s.undo().unwrap();
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn redo_reapplies_and_new_pour_clears_it() {
        let mut s = session("AABB\nBBAA\n....\n....");
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        let after = s.level().clone();
        s.undo().unwrap();
        assert_eq!(s.redo_depth(), 1);
        s.redo().unwrap();
        assert_eq!(s.level(), &after);
        assert_eq!(s.move_count(), 1);
        assert_eq!(s.redo(), Err(HistoryError::NothingToRedo));

        s.undo().unwrap();
        s.select_container(1).unwrap();
        s.select_container(3).unwrap();
        assert_eq!(s.redo_depth(), 0);
    }

    #[test]
    fn settling_blocks_intents_until_settled() {
        let options = SessionOptions {
            settle: true,
            history_limit: None,
        };
        let mut s = GameSession::with_options(
            Level::from_text("AABB\nBBAA\n....\n....").unwrap(),
            options,
        );
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        assert_eq!(s.phase(), Phase::Settling);
        assert_eq!(s.select_container(1), Ok(Selection::Busy));
        assert_eq!(s.undo(), Err(HistoryError::Settling));
        assert_eq!(s.move_count(), 1);

        assert!(s.settle());
        assert!(!s.settle());
        assert_eq!(s.select_container(1), Ok(Selection::Selected(1)));
        assert!(s.undo().is_ok());
    }

    #[test]
    fn victory_is_detected_and_freezes_clicks() {
        let mut s = session("AAA.\nBBBB\nA...");
        assert!(!s.is_victory());
        assert_eq!(s.solved().iter().copied().collect::<Vec<_>>(), vec![1]);

        s.select_container(2).unwrap();
        let result = s.select_container(0).unwrap();
        assert!(matches!(result, Selection::Poured { victory: true, .. }));
        assert!(s.is_victory());
        assert_eq!(s.solved().iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(s.select_container(0), Ok(Selection::Ignored));

        s.undo().unwrap();
        assert!(!s.is_victory());
    }

    #[test]
    fn out_of_range_click_is_an_error() {
        let mut s = session("AB\n..");
        assert_eq!(
            s.select_container(2),
            Err(InvalidIndex { index: 2, len: 2 })
        );
        s.select_container(0).unwrap();
        assert!(s.select_container(7).is_err());
        assert_eq!(s.phase(), Phase::Selected(0));
    }

    #[test]
    fn history_limit_drops_oldest() {
        let options = SessionOptions {
            settle: false,
            history_limit: Some(1),
        };
        let mut s = GameSession::with_options(Level::from_text("AB..\n....\n....").unwrap(), options);
        s.select_container(0).unwrap();
        s.select_container(1).unwrap();
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        assert_eq!(s.move_count(), 2);
        assert_eq!(s.history_depth(), 1);
        s.undo().unwrap();
        assert_eq!(s.undo(), Err(HistoryError::EmptyHistory));
        assert_eq!(s.level().to_text(), "A...\nB...\n....");
    }

    #[test]
    fn reset_generates_same_shape_and_clears_state() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = GameSession::generate(4, 4, SessionOptions::default(), &mut rng).unwrap();
        assert_eq!(s.num_colors(), 4);
        let first = s.level().clone();

        let (from, to) = legal_pours(&StandardRules, s.level())[0];
        s.select_container(from).unwrap();
        s.select_container(to).unwrap();

        s.reset(&mut rng).unwrap();
        assert_eq!(s.level().len(), first.len());
        assert_eq!(s.level().total_units(), first.total_units());
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.history_depth(), 0);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn restart_returns_to_starting_level() {
        let mut s = session("AABB\nBBAA\n....\n....");
        let start = s.level().clone();
        s.select_container(0).unwrap();
        s.select_container(2).unwrap();
        s.restart();
        assert_eq!(s.level(), &start);
        assert_eq!(s.move_count(), 0);
        assert_eq!(s.undo(), Err(HistoryError::EmptyHistory));
    }

    #[test]
    fn pour_targets_follow_selection() {
        let mut s = session("AB..\nB...\nA...\n....");
        assert!(s.pour_targets().is_empty());
        s.select_container(0).unwrap();
        assert_eq!(s.pour_targets(), vec![1, 3]);
        assert!(s.has_moves());
        assert!(!session("AB\nBA").has_moves());
    }
}
