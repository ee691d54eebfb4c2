//! Scripted three-step tutorial.
//!
//! The tutorial plays on its own tiny level and shares nothing with a
//! [`GameSession`]. It reuses the pour engine through [`TutorialRules`],
//! which only admits the one pour the script asks for.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::error::InvalidIndex;
use crate::generator::GenerateError;
use crate::model::{FluidContainer, FluidPacket, Level, LevelError};
use crate::pour::{IllegalPour, Move, PourError, PourRules, StandardRules};
use crate::session::{GameSession, SessionOptions};

/// The container the player is told to pick up first.
pub const FIRST_CONTAINER: usize = 0;
/// The empty containers the first one may be poured into.
pub const TARGET_CONTAINERS: [usize; 2] = [2, 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialStep {
    AwaitSource,
    AwaitDestination,
    Done,
}

impl TutorialStep {
    pub fn number(&self) -> u8 {
        match self {
            TutorialStep::AwaitSource => 0,
            TutorialStep::AwaitDestination => 1,
            TutorialStep::Done => 2,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            TutorialStep::AwaitSource => "Tap the glowing tube to pick it up",
            TutorialStep::AwaitDestination => "Now tap an empty tube to pour",
            TutorialStep::Done => "Well done! Continue or try again",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialEvent {
    Ignored,
    SourceSelected(usize),
    Poured(Move),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TutorialError {
    #[error("the tutorial is not finished yet")]
    NotFinished,
}

/// Standard rules narrowed to the scripted pour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialRules {
    source: usize,
    targets: [usize; 2],
}

impl Default for TutorialRules {
    fn default() -> Self {
        Self {
            source: FIRST_CONTAINER,
            targets: TARGET_CONTAINERS,
        }
    }
}

impl PourRules for TutorialRules {
    fn check(&self, level: &Level, from: usize, to: usize) -> Result<(), PourError> {
        level.container(from)?;
        level.container(to)?;
        if from != self.source || !self.targets.contains(&to) {
            return Err(IllegalPour::Restricted { from, to }.into());
        }
        StandardRules.check(level, from, to)
    }
}

/// Returned by [`Tutorial::advance`]; the only way from the tutorial into a
/// real game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialExit {
    _private: (),
}

impl TutorialExit {
    /// Generates the first main level. The caller persists the completion flag.
    pub fn start_game<G: Rng + ?Sized>(
        self,
        num_colors: usize,
        capacity: usize,
        options: SessionOptions,
        rng: &mut G,
    ) -> Result<GameSession, GenerateError> {
        GameSession::generate(num_colors, capacity, options, rng)
    }
}

#[derive(Debug, Clone)]
pub struct Tutorial {
    rules: TutorialRules,
    initial: Level,
    level: Level,
    step: TutorialStep,
}

impl Tutorial {
    /// Two single-packet containers of different colors, then two empty ones.
    pub fn new(capacity: usize) -> Result<Self, LevelError> {
        let initial = Level::new(vec![
            FluidContainer::with_packets(capacity, vec![FluidPacket::new(0)])?,
            FluidContainer::with_packets(capacity, vec![FluidPacket::new(1)])?,
            FluidContainer::new(capacity),
            FluidContainer::new(capacity),
        ])?;
        Ok(Self {
            rules: TutorialRules::default(),
            level: initial.clone(),
            initial,
            step: TutorialStep::AwaitSource,
        })
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn step(&self) -> TutorialStep {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.step == TutorialStep::Done
    }

    /// Containers the player should click next.
    pub fn highlighted(&self) -> Vec<usize> {
        match self.step {
            TutorialStep::AwaitSource => vec![self.rules.source],
            TutorialStep::AwaitDestination => self.rules.targets.to_vec(),
            TutorialStep::Done => Vec::new(),
        }
    }

    /// The picked-up container, if any.
    pub fn selected(&self) -> Option<usize> {
        (self.step == TutorialStep::AwaitDestination).then_some(self.rules.source)
    }

    #[instrument(skip(self), fields(step = self.step.number()))]
    pub fn click(&mut self, index: usize) -> Result<TutorialEvent, InvalidIndex> {
        self.level.container(index)?;

        let event = match self.step {
            TutorialStep::AwaitSource if index == self.rules.source => {
                self.step = TutorialStep::AwaitDestination;
                TutorialEvent::SourceSelected(index)
            }
            TutorialStep::AwaitDestination => {
                match self.rules.pour(&self.level, self.rules.source, index) {
                    Ok(outcome) => {
                        self.level = outcome.level;
                        self.step = TutorialStep::Done;
                        info!(mv = %outcome.mv, "tutorial pour done");
                        TutorialEvent::Poured(outcome.mv)
                    }
                    Err(PourError::Illegal(reason)) => {
                        debug!(%reason, "tutorial click ignored");
                        TutorialEvent::Ignored
                    }
                    Err(PourError::InvalidIndex(e)) => return Err(e),
                }
            }
            TutorialStep::AwaitSource | TutorialStep::Done => TutorialEvent::Ignored,
        };
        Ok(event)
    }

    /// Back to step 0 with the starting layout.
    pub fn restart(&mut self) {
        self.level = self.initial.clone();
        self.step = TutorialStep::AwaitSource;
    }

    /// Leaves the finished tutorial.
    pub fn advance(&self) -> Result<TutorialExit, TutorialError> {
        if self.is_done() {
            Ok(TutorialExit { _private: () })
        } else {
            Err(TutorialError::NotFinished)
        }
    }
}
