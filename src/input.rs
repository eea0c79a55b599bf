//! Per-frame input snapshot. Holds are booleans, `fire`/`reload`/`jump` are
//! edge events consumed by the tick that sees them. [`KeyEdges`] turns a
//! held-key table into those edges.

// Browser key codes
const KEY_SPACE: usize = 32;
const KEY_LEFT: usize = 37;
const KEY_UP: usize = 38;
const KEY_RIGHT: usize = 39;
const KEY_DOWN: usize = 40;
const KEY_A: usize = 65;
const KEY_D: usize = 68;
const KEY_F: usize = 70;
const KEY_R: usize = 82;
const KEY_S: usize = 83;
const KEY_W: usize = 87;
const KEY_Z: usize = 90;
const KEY_SHIFT: usize = 16;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub forward: bool,
    pub back: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub zoom: bool,
    pub jump: bool,
    pub fire: bool,
    pub reload: bool,
    /// Pointer movement in pixels since the last frame
    pub look_dx: f64,
    pub look_dy: f64,
}

impl FrameInput {
    /// Build from a key-down table indexed by key code. Mouse buttons and
    /// pointer deltas are supplied separately. `pressed` holds only the keys
    /// that went down since the previous frame.
    pub fn from_keys(
        held: &[bool; 256],
        pressed: &[bool; 256],
        look: (f64, f64),
        clicked: bool,
        zoom_button: bool,
    ) -> Self {
        Self {
            forward: held[KEY_W] || held[KEY_UP],
            back: held[KEY_S] || held[KEY_DOWN],
            strafe_left: held[KEY_A],
            strafe_right: held[KEY_D],
            turn_left: held[KEY_LEFT],
            turn_right: held[KEY_RIGHT],
            zoom: zoom_button || held[KEY_Z] || held[KEY_SHIFT],
            jump: pressed[KEY_SPACE],
            fire: clicked || pressed[KEY_F],
            reload: pressed[KEY_R],
            look_dx: look.0,
            look_dy: look.1,
        }
    }
}

/// Remembers last frame's key table so a held key yields one press
#[derive(Clone, Debug)]
pub struct KeyEdges {
    prev: [bool; 256],
}

impl Default for KeyEdges {
    fn default() -> Self {
        Self { prev: [false; 256] }
    }
}

impl KeyEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// One frame of input from the current key-down table
    pub fn frame(
        &mut self,
        keys: &[bool; 256],
        look: (f64, f64),
        clicked: bool,
        zoom_button: bool,
    ) -> FrameInput {
        let mut pressed = [false; 256];
        for (slot, (&now, &before)) in pressed.iter_mut().zip(keys.iter().zip(self.prev.iter())) {
            *slot = now && !before;
        }
        self.prev = *keys;
        FrameInput::from_keys(keys, &pressed, look, clicked, zoom_button)
    }

    /// Forget held keys, e.g. when the page stops the game
    pub fn reset(&mut self) {
        self.prev = [false; 256];
    }
}
