use std::collections::BTreeSet;

use clipboard_rs::{Clipboard, ClipboardContext};
use macroquad::color::Color;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};
use water_sort::config::GameConfig;
use water_sort::progress::{FileStore, MemoryStore, Progress, ProgressStore};
use water_sort::{GameSession, GenerateError, Level, Selection, Tutorial, TutorialEvent};

use crate::renderer::{FLUID_COLORS, Frame, HitItem, Renderer};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlAction {
    SelectContainer(usize),
    Undo,
    Redo,
    Restart,
    NewLevel,
    NextLevel,
    CopyState,
    PasteState,
    ContinueTutorial,
    RestartTutorial,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Button {
    label: String,
    action: ControlAction,
    color: Color,
}

impl Button {
    pub fn new(label: &str, action: ControlAction, color: Color) -> Self {
        Self {
            label: label.to_string(),
            action,
            color,
        }
    }
    pub fn get_action(&self) -> ControlAction {
        self.action
    }
    pub fn get_label(&self) -> &str {
        &self.label
    }
    pub fn get_color(&self) -> Color {
        self.color
    }
}

enum Screen {
    Tutorial(Tutorial),
    Playing(GameSession),
}

pub struct GameEngine {
    config: GameConfig,
    progress: Progress<Box<dyn ProgressStore>>,
    rng: StdRng,
    screen: Screen,
    level_number: u32,
    renderer: Renderer,
    /// Clock time the current pour started settling.
    settle_started: Option<f64>,
    status: String,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Result<Self, GenerateError> {
        let store: Box<dyn ProgressStore> = match FileStore::open(&config.progress_path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(error = %e, "progress will not be saved this run");
                Box::new(MemoryStore::default())
            }
        };
        let progress = Progress::new(store);
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let level_number = progress.current_level();

        let (screen, status) = if config.tutorial && !progress.tutorial_done() {
            let tutorial = Tutorial::new(config.capacity)?;
            let hint = tutorial.step().hint().to_string();
            (Screen::Tutorial(tutorial), hint)
        } else {
            let session = new_session(&config, level_number, &mut rng)?;
            (Screen::Playing(session), String::new())
        };

        Ok(Self {
            config,
            progress,
            rng,
            screen,
            level_number,
            renderer: Renderer::new(),
            settle_started: None,
            status,
        })
    }

    fn start_level(&mut self, level_number: u32) {
        match new_session(&self.config, level_number, &mut self.rng) {
            Ok(session) => {
                self.level_number = level_number;
                self.screen = Screen::Playing(session);
                self.settle_started = None;
                self.status.clear();
                if let Err(e) = self.progress.set_current_level(level_number) {
                    warn!(error = %e, "failed to save progress");
                }
            }
            Err(e) => error!(error = %e, "failed to generate level"),
        }
    }

    fn buttons(&self) -> Vec<Button> {
        match &self.screen {
            Screen::Tutorial(tutorial) if tutorial.is_done() => vec![
                Button::new("Continue", ControlAction::ContinueTutorial, FLUID_COLORS[3]), // GREEN
                Button::new("Again", ControlAction::RestartTutorial, FLUID_COLORS[1]), // BLUE
            ],
            Screen::Tutorial(_) => Vec::new(),
            Screen::Playing(session) if session.is_victory() => vec![
                Button::new("Next level", ControlAction::NextLevel, FLUID_COLORS[3]), // GREEN
                Button::new("Copy", ControlAction::CopyState, FLUID_COLORS[5]), // ORANGE
            ],
            Screen::Playing(_) => vec![
                Button::new("Undo", ControlAction::Undo, FLUID_COLORS[7]), // MAGENTA
                Button::new("Redo", ControlAction::Redo, FLUID_COLORS[8]), // LIME
                Button::new("Restart", ControlAction::Restart, FLUID_COLORS[9]), // PINK
                Button::new("New", ControlAction::NewLevel, FLUID_COLORS[0]), // RED
                Button::new("Copy", ControlAction::CopyState, FLUID_COLORS[5]), // ORANGE
                Button::new("Paste", ControlAction::PasteState, FLUID_COLORS[4]), // PURPLE
            ],
        }
    }

    pub fn render(&mut self) {
        self.renderer.autoset_viewport();
        let buttons = self.buttons();
        let (level, selected, highlighted, solved, title) = match &self.screen {
            Screen::Tutorial(tutorial) => (
                tutorial.level(),
                tutorial.selected(),
                tutorial.highlighted(),
                BTreeSet::new(),
                "How to play".to_string(),
            ),
            Screen::Playing(session) => (
                session.level(),
                session.selected(),
                session.pour_targets(),
                session.solved().clone(),
                format!(
                    "Level {}   Moves {}",
                    self.level_number + 1,
                    session.move_count()
                ),
            ),
        };
        let frame = Frame {
            containers: level.containers(),
            selected,
            highlighted: &highlighted,
            solved: &solved,
            buttons: &buttons,
            title: &title,
            status: &self.status,
        };
        self.renderer.render_game(&frame);
    }

    /// Ends the settle guard once the pour animation has had its time.
    pub fn update(&mut self, now: f64) {
        let Some(started) = self.settle_started else {
            return;
        };
        if now - started < self.config.settle_delay().as_secs_f64() {
            return;
        }
        self.settle_started = None;
        if let Screen::Playing(session) = &mut self.screen {
            session.settle();
        }
    }

    pub fn handle_click(&mut self, x: f32, y: f32, now: f64) {
        let Some(hit) = self.renderer.get_hit_test_registry().hit_test(x, y) else {
            return;
        };
        let action = match hit.item {
            HitItem::Container { index } => ControlAction::SelectContainer(index),
            HitItem::Button { index } => match self.buttons().get(index) {
                Some(button) => button.get_action(),
                None => return,
            },
        };
        self.handle_game_action(action, now);
    }

    pub fn handle_game_action(&mut self, action: ControlAction, now: f64) {
        match self.screen {
            Screen::Tutorial(_) => self.handle_tutorial_action(action),
            Screen::Playing(_) => self.handle_session_action(action, now),
        }
    }

    fn handle_tutorial_action(&mut self, action: ControlAction) {
        let Screen::Tutorial(tutorial) = &mut self.screen else {
            return;
        };
        match action {
            ControlAction::SelectContainer(index) => match tutorial.click(index) {
                Ok(TutorialEvent::Ignored) => {}
                Ok(_) => self.status = tutorial.step().hint().to_string(),
                Err(e) => error!(error = %e, "click outside the tutorial level"),
            },
            ControlAction::RestartTutorial => {
                tutorial.restart();
                self.status = tutorial.step().hint().to_string();
            }
            ControlAction::ContinueTutorial => {
                let exit = match tutorial.advance() {
                    Ok(exit) => exit,
                    Err(e) => {
                        warn!(error = %e, "continue pressed too early");
                        return;
                    }
                };
                if let Err(e) = self.progress.mark_tutorial_done() {
                    warn!(error = %e, "failed to save tutorial completion");
                }
                let num_colors = self.config.colors_for_level(self.level_number);
                match exit.start_game(
                    num_colors,
                    self.config.capacity,
                    self.config.session_options(),
                    &mut self.rng,
                ) {
                    Ok(session) => {
                        info!(level = self.level_number, "tutorial finished");
                        self.screen = Screen::Playing(session);
                        self.status.clear();
                    }
                    Err(e) => error!(error = %e, "failed to generate level"),
                }
            }
            _ => {}
        }
    }

    fn handle_session_action(&mut self, action: ControlAction, now: f64) {
        if action == ControlAction::NextLevel {
            self.start_level(self.level_number + 1);
            return;
        }
        let Screen::Playing(session) = &mut self.screen else {
            return;
        };
        match action {
            ControlAction::SelectContainer(index) => match session.select_container(index) {
                Ok(Selection::Poured { mv, victory }) => {
                    if session.is_settling() {
                        self.settle_started = Some(now);
                    }
                    self.status = if victory {
                        format!("Solved in {} moves!", session.move_count())
                    } else if !session.has_moves() {
                        "No moves left. Undo or start a new level".to_string()
                    } else {
                        format!("Poured {} unit(s)", mv.units())
                    };
                }
                Ok(Selection::Rejected(reason)) => self.status = format!("Can't pour: {reason}"),
                Ok(_) => self.status.clear(),
                Err(e) => error!(error = %e, "click outside the level"),
            },
            ControlAction::Undo => match session.undo() {
                Ok(_) => self.status.clear(),
                Err(e) => self.status = e.to_string(),
            },
            ControlAction::Redo => match session.redo() {
                Ok(_) => self.status.clear(),
                Err(e) => self.status = e.to_string(),
            },
            ControlAction::Restart => {
                session.restart();
                self.settle_started = None;
                self.status.clear();
            }
            ControlAction::NewLevel => {
                if let Err(e) = session.reset(&mut self.rng) {
                    error!(error = %e, "failed to generate level");
                }
                self.settle_started = None;
                self.status.clear();
            }
            ControlAction::CopyState => {
                let repr = session.level().to_text();
                self.status = match set_clipboard(&repr) {
                    Ok(()) => "Level copied".to_string(),
                    Err(e) => format!("Copy failed: {e}"),
                };
            }
            ControlAction::PasteState => {
                let pasted = get_clipboard()
                    .and_then(|repr| Level::from_text(&repr).map_err(|e| e.to_string()));
                match pasted {
                    Ok(level) => {
                        session.load_level(level);
                        self.settle_started = None;
                        self.status = "Level pasted".to_string();
                    }
                    Err(e) => self.status = format!("Paste failed: {e}"),
                }
            }
            ControlAction::NextLevel
            | ControlAction::ContinueTutorial
            | ControlAction::RestartTutorial => {}
        }
    }
}

fn new_session(
    config: &GameConfig,
    level_number: u32,
    rng: &mut StdRng,
) -> Result<GameSession, GenerateError> {
    let num_colors = config.colors_for_level(level_number);
    info!(level = level_number, num_colors, "starting level");
    GameSession::generate(num_colors, config.capacity, config.session_options(), rng)
}

fn get_clipboard() -> Result<String, String> {
    let ctx = ClipboardContext::new().map_err(|e| e.to_string())?;
    ctx.get_text().map_err(|e| e.to_string())
}

fn set_clipboard(content: &str) -> Result<(), String> {
    let ctx = ClipboardContext::new().map_err(|e| e.to_string())?;
    ctx.set_text(content.to_string()).map_err(|e| e.to_string())
}
