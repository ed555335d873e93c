use winit::{
    event::*,
    keyboard::{KeyCode, PhysicalKey},
};

/// Keyboard state sampled once per frame.
#[derive(Debug, Clone)]
pub struct InputState {
    close_key: KeyCode,
    close_key_down: bool,
}

impl InputState {
    pub fn new(close_key: KeyCode) -> Self {
        Self {
            close_key,
            close_key_down: false,
        }
    }

    pub fn close_key_down(&self) -> bool {
        self.close_key_down
    }

    pub fn set_key(&mut self, key: KeyCode, key_state: ElementState) -> bool {
        if key != self.close_key {
            return false;
        }
        self.close_key_down = key_state == ElementState::Pressed;
        true
    }

    /// Focus loss drops held keys; the release event goes to another window.
    pub fn release_all(&mut self) {
        self.close_key_down = false;
    }
}

pub fn handle_input(state: &mut InputState, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    state: key_state,
                    physical_key: PhysicalKey::Code(key),
                    ..
                },
            ..
        } => state.set_key(*key, *key_state),
        WindowEvent::Focused(false) => {
            state.release_all();
            false
        }
        _ => false,
    }
}
