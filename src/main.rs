mod gameplay;
mod renderer;

use crate::gameplay::{ControlAction, GameEngine};

use macroquad::prelude::*;
use tracing::{error, warn};
use water_sort::config::GameConfig;
use water_sort::logging::init_tracing;

#[macroquad::main("Water Sort")]
async fn main() {
    init_tracing();

    let config = GameConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default config");
        GameConfig::default()
    });
    let mut engine = match GameEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "cannot start game");
            return;
        }
    };

    loop {
        let now = get_time();
        engine.update(now);
        engine.render();
        if is_mouse_button_pressed(MouseButton::Left) {
            let (x, y) = mouse_position();
            engine.handle_click(x, y, now);
        }
        let shortcuts = [
            (KeyCode::Z, ControlAction::Undo),
            (KeyCode::Y, ControlAction::Redo),
            (KeyCode::R, ControlAction::Restart),
            (KeyCode::N, ControlAction::NewLevel),
            (KeyCode::C, ControlAction::CopyState),
            (KeyCode::V, ControlAction::PasteState),
        ];
        for (key, action) in shortcuts {
            if is_key_pressed(key) {
                engine.handle_game_action(action, now);
            }
        }
        next_frame().await;
    }
}
