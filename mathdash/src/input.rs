use std::collections::HashSet;

/// Logical inputs the player controller reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Jump,
    Slide,
    Shoot,
}

/// Tracks held actions across frames plus the ones pressed this frame.
///
/// Whatever drives the game (a window, the simulator's autopilot, a test)
/// calls [`press`](Self::press) and [`release`](Self::release); the game
/// clears the per-frame edges at the end of every update.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    down: HashSet<Action>,
    pressed: HashSet<Action>,
    released: HashSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame pressed/released flags.
    pub fn begin_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    pub fn press(&mut self, action: Action) {
        if self.down.insert(action) {
            self.pressed.insert(action);
        }
    }

    pub fn release(&mut self, action: Action) {
        if self.down.remove(&action) {
            self.released.insert(action);
        }
    }

    /// Press and release in the same frame, as a tap shorter than a tick.
    pub fn tap(&mut self, action: Action) {
        self.press(action);
        self.release(action);
    }

    pub fn release_all(&mut self) {
        let held: Vec<Action> = self.down.iter().copied().collect();
        for action in held {
            self.release(action);
        }
    }

    /// Returns true if the action is currently held down.
    pub fn is_down(&self, action: Action) -> bool {
        self.down.contains(&action)
    }

    /// Returns true if the action was pressed this frame.
    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    /// Returns true if the action was released this frame.
    pub fn is_released(&self, action: Action) -> bool {
        self.released.contains(&action)
    }

    /// -1..=1 from the movement actions; both held cancel out.
    pub fn horizontal_axis(&self) -> f32 {
        let mut value = 0.0;
        if self.is_down(Action::MoveLeft) {
            value -= 1.0;
        }
        if self.is_down(Action::MoveRight) {
            value += 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_is_an_edge() {
        let mut input = InputState::new();
        input.press(Action::Jump);
        assert!(input.is_pressed(Action::Jump));
        input.begin_frame();
        assert!(!input.is_pressed(Action::Jump));
        assert!(input.is_down(Action::Jump));
        // Holding does not re-trigger the edge.
        input.press(Action::Jump);
        assert!(!input.is_pressed(Action::Jump));
    }

    #[test]
    fn tap_registers_press_without_hold() {
        let mut input = InputState::new();
        input.tap(Action::Shoot);
        assert!(input.is_pressed(Action::Shoot));
        assert!(input.is_released(Action::Shoot));
        assert!(!input.is_down(Action::Shoot));
    }

    #[test]
    fn axis_cancels_out() {
        let mut input = InputState::new();
        input.press(Action::MoveRight);
        assert_eq!(input.horizontal_axis(), 1.0);
        input.press(Action::MoveLeft);
        assert_eq!(input.horizontal_axis(), 0.0);
        input.release_all();
        assert_eq!(input.horizontal_axis(), 0.0);
        assert!(input.is_released(Action::MoveRight));
    }
}
