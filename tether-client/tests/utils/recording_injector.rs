use std::sync::Mutex;
use tether_client::control::{InputInjector, KeyboardInput, MouseInput};

/// Injector that only remembers what it was asked to do.
pub struct RecordingInjector {
    available: bool,
    mouse: Mutex<Vec<MouseInput>>,
    keyboard: Mutex<Vec<KeyboardInput>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self {
            available: true,
            mouse: Mutex::new(Vec::new()),
            keyboard: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn mouse(&self) -> Vec<MouseInput> {
        self.mouse.lock().unwrap().clone()
    }

    pub fn keyboard(&self) -> Vec<KeyboardInput> {
        self.keyboard.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.mouse.lock().unwrap().len() + self.keyboard.lock().unwrap().len()
    }
}

impl InputInjector for RecordingInjector {
    fn is_available(&self) -> bool {
        self.available
    }

    fn inject_mouse(&self, input: MouseInput) {
        self.mouse.lock().unwrap().push(input);
    }

    fn inject_keyboard(&self, input: KeyboardInput) {
        self.keyboard.lock().unwrap().push(input);
    }
}
