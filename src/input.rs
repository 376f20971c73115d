//! Controller input
//!
//! Six logical buttons with a double-buffered snapshot: the host latches
//! presses for the coming frame, and at the end of every frame the held
//! states roll into the previous-frame buffer. `btn` answers "held now",
//! `btnp` answers "held now but not last frame".

/// Number of logical buttons
pub const BUTTON_COUNT: usize = 6;

/// Logical controller buttons, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    Circle = 4,
    Cross = 5,
}

impl Button {
    /// Map a button index as scripts use it
    pub fn from_index(index: u8) -> Option<Button> {
        match index {
            0 => Some(Button::Left),
            1 => Some(Button::Right),
            2 => Some(Button::Up),
            3 => Some(Button::Down),
            4 => Some(Button::Circle),
            5 => Some(Button::Cross),
            _ => None,
        }
    }
}

/// Input state structure
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: [bool; BUTTON_COUNT],
    previous: [bool; BUTTON_COUNT],
}

impl InputState {
    /// Create a new input state with nothing held
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a button as held for the coming frame
    pub fn press(&mut self, button: Button) {
        self.held[button as usize] = true;
    }

    /// Whether a button is held this frame
    pub fn held(&self, button: Button) -> bool {
        self.held[button as usize]
    }

    /// Whether a button was freshly pressed this frame
    pub fn pressed(&self, button: Button) -> bool {
        self.held[button as usize] && !self.previous[button as usize]
    }

    /// Roll the frame over: held states become last-frame states and the
    /// live buffer clears for the next round of latches.
    pub fn next_frame(&mut self) {
        self.previous = self.held;
        self.held = [false; BUTTON_COUNT];
    }
}
