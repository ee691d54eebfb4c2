//! Pour legality and transfer.
//!
//! A pour moves the top contiguous run of one color from a source container
//! onto a destination, as much of it as fits. Everything here is pure: the
//! input [`Level`] is never touched and a new snapshot is returned.

use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::InvalidIndex;
use crate::model::{FluidPacket, Level};

/// A committed pour, kept in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: usize,
    to: usize,
    color: FluidPacket,
    units: usize,
}

impl Move {
    pub fn new(from: usize, to: usize, color: FluidPacket, units: usize) -> Self {
        Self {
            from,
            to,
            color,
            units,
        }
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn color(&self) -> FluidPacket {
        self.color
    }

    pub fn units(&self) -> usize {
        self.units
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} from {} to {}",
            self.color, self.units, self.from, self.to
        )
    }
}

/// Why a pour was refused. Always recoverable: nothing moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalPour {
    #[error("cannot pour container {0} into itself")]
    SameContainer(usize),

    #[error("container {0} is empty")]
    SourceEmpty(usize),

    #[error("container {0} is full")]
    DestinationFull(usize),

    #[error("cannot pour {poured} onto {top}")]
    ColorMismatch {
        poured: FluidPacket,
        top: FluidPacket,
    },

    #[error("pouring {from} into {to} is not allowed right now")]
    Restricted { from: usize, to: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PourError {
    #[error(transparent)]
    InvalidIndex(#[from] InvalidIndex),

    #[error(transparent)]
    Illegal(#[from] IllegalPour),
}

/// The level after a successful pour plus the move that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PourOutcome {
    pub level: Level,
    pub mv: Move,
}

/// Legality policy shared by free play and the tutorial.
pub trait PourRules {
    /// `Ok(())` when pouring `from` into `to` is allowed on `level`.
    fn check(&self, level: &Level, from: usize, to: usize) -> Result<(), PourError>;

    fn can_pour(&self, level: &Level, from: usize, to: usize) -> Result<bool, InvalidIndex> {
        match self.check(level, from, to) {
            Ok(()) => Ok(true),
            Err(PourError::Illegal(_)) => Ok(false),
            Err(PourError::InvalidIndex(e)) => Err(e),
        }
    }

    fn pour(&self, level: &Level, from: usize, to: usize) -> Result<PourOutcome, PourError> {
        self.check(level, from, to)?;
        transfer(level, from, to)
    }
}

/// The four rules of the puzzle and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardRules;

impl PourRules for StandardRules {
    fn check(&self, level: &Level, from: usize, to: usize) -> Result<(), PourError> {
        let source = level.container(from)?;
        let destination = level.container(to)?;

        if from == to {
            return Err(IllegalPour::SameContainer(from).into());
        }
        let Some(poured) = source.get_top_fluid() else {
            return Err(IllegalPour::SourceEmpty(from).into());
        };
        if destination.is_full() {
            return Err(IllegalPour::DestinationFull(to).into());
        }
        if let Some(top) = destination.get_top_fluid()
            && top != poured
        {
            return Err(IllegalPour::ColorMismatch { poured, top }.into());
        }
        Ok(())
    }
}

pub fn can_pour(level: &Level, from: usize, to: usize) -> Result<bool, InvalidIndex> {
    StandardRules.can_pour(level, from, to)
}

pub fn pour(level: &Level, from: usize, to: usize) -> Result<PourOutcome, PourError> {
    StandardRules.pour(level, from, to)
}

/// Every `(from, to)` pair `rules` would accept on `level`.
pub fn legal_pours<R: PourRules + ?Sized>(rules: &R, level: &Level) -> Vec<(usize, usize)> {
    let n = level.len();
    (0..n)
        .flat_map(|from| (0..n).map(move |to| (from, to)))
        .filter(|&(from, to)| rules.check(level, from, to).is_ok())
        .collect()
}

/// Greedy maximal transfer. Callers must have checked legality.
#[instrument(level = "trace", skip(level))]
fn transfer(level: &Level, from: usize, to: usize) -> Result<PourOutcome, PourError> {
    let mut next = level.clone();
    let (source, destination) = next.pair_mut(from, to);

    let Some(poured) = source.get_top_fluid() else {
        return Err(IllegalPour::SourceEmpty(from).into());
    };
    let mut units = 0;
    while !destination.is_full() && source.get_top_fluid() == Some(poured) {
        if let Some(packet) = source.pop_fluid() {
            destination.add_fluid(packet);
            units += 1;
        }
    }

    let mv = Move::new(from, to, poured, units);
    debug!(%mv, "poured");
    Ok(PourOutcome { level: next, mv })
}
