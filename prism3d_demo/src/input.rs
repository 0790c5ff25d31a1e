/// Keyboard state and per-player input filtering
///
/// The window event handler writes raw key states here; each player
/// controller consumes a filtered view. Player 0 uses WASD, player 1 uses
/// IJKL.

use winit::keyboard::KeyCode;

/// Raw key-state booleans for both players' keys
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyStates {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
    pub i: bool,
    pub j: bool,
    pub k: bool,
    pub l: bool,
}

impl KeyStates {
    /// Record a key transition; unmapped keys are ignored
    pub fn set_key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyW => self.w = pressed,
            KeyCode::KeyA => self.a = pressed,
            KeyCode::KeyS => self.s = pressed,
            KeyCode::KeyD => self.d = pressed,
            KeyCode::KeyI => self.i = pressed,
            KeyCode::KeyJ => self.j = pressed,
            KeyCode::KeyK => self.k = pressed,
            KeyCode::KeyL => self.l = pressed,
            _ => {}
        }
    }
}

/// One player's view of the controls
#[derive(Debug, Default, Clone, Copy)]
pub struct FilteredInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Map the raw key states onto one player's controls.
///
/// With only two players a direct mapping per player number stays more
/// readable than indexing into a key table.
pub fn filter_player_input(player: usize, keys: &KeyStates) -> FilteredInput {
    match player {
        0 => FilteredInput {
            up: keys.w,
            down: keys.s,
            left: keys.a,
            right: keys.d,
        },
        1 => FilteredInput {
            up: keys.i,
            down: keys.k,
            left: keys.j,
            right: keys.l,
        },
        _ => FilteredInput::default(),
    }
}

#[cfg(test)]
mod input_tests {
    use super::*;

    #[test]
    fn test_player_zero_reads_wasd() {
        let mut keys = KeyStates::default();
        keys.set_key(KeyCode::KeyW, true);
        keys.set_key(KeyCode::KeyD, true);

        let filtered = filter_player_input(0, &keys);
        assert!(filtered.up);
        assert!(filtered.right);
        assert!(!filtered.down);
        assert!(!filtered.left);

        // Player 1 is unaffected by WASD
        let other = filter_player_input(1, &keys);
        assert!(!other.up && !other.down && !other.left && !other.right);
    }

    #[test]
    fn test_player_one_reads_ijkl() {
        let mut keys = KeyStates::default();
        keys.set_key(KeyCode::KeyI, true);
        keys.set_key(KeyCode::KeyJ, true);

        let filtered = filter_player_input(1, &keys);
        assert!(filtered.up);
        assert!(filtered.left);
    }

    #[test]
    fn test_key_release_clears_state() {
        let mut keys = KeyStates::default();
        keys.set_key(KeyCode::KeyA, true);
        keys.set_key(KeyCode::KeyA, false);
        assert!(!filter_player_input(0, &keys).left);
    }

    #[test]
    fn test_unmapped_keys_are_ignored() {
        let mut keys = KeyStates::default();
        keys.set_key(KeyCode::Space, true);
        let filtered = filter_player_input(0, &keys);
        assert!(!filtered.up && !filtered.down && !filtered.left && !filtered.right);
    }
}
