//! Water sort puzzle engine.
//!
//! Levels are generated by [`generator`], pours are checked and computed by
//! [`pour`], and play happens through a [`GameSession`] or the scripted
//! [`Tutorial`]. Nothing in here renders, sleeps or persists; see the
//! binary for a macroquad frontend.

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod model;
pub mod pour;
pub mod progress;
pub mod session;
pub mod tutorial;

pub use error::InvalidIndex;
pub use generator::{GenerateError, colors_for_level, generate_level, generate_seeded};
pub use model::{FluidContainer, FluidPacket, Level, LevelError};
pub use pour::{IllegalPour, Move, PourError, PourOutcome, PourRules, StandardRules, can_pour, pour};
pub use session::{GameSession, HistoryError, Phase, Selection, SessionOptions};
pub use tutorial::{Tutorial, TutorialError, TutorialEvent, TutorialExit, TutorialStep};
