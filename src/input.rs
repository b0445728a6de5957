use crate::runner::CancelToken;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

pub const KEY_COUNT: usize = 16;

/// map of keys on the left-hand side of a qwerty keyboard to the hex keypad
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CONVENTIONAL_KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals never report key-up, so a key counts as held for this long
/// after it was last pressed
const HOLD_WINDOW: Duration = Duration::from_millis(150);

/// how long next_key_press may wait for the terminal before giving up
const KEY_WAIT_SLICE: Duration = Duration::from_millis(10);

/// most unconsumed presses we keep around
const PRESS_QUEUE_LEN: usize = 16;

/// reads the hex keypad, and supplies the random bytes RND needs
pub trait Input {
    /// whether `key` (0x0-0xf) is currently held down
    fn is_key_down(&mut self, key: u8) -> Result<bool, io::Error>;

    /// the oldest key press not yet handed out, if there is one. may block
    /// briefly; `None` means ask again later
    fn next_key_press(&mut self) -> Result<Option<u8>, io::Error>;

    fn random_byte(&mut self) -> u8;
}

/// terminal keyboard via crossterm; puts the terminal in raw mode while alive
pub struct TermInput {
    keymap: HashMap<char, u8>,
    last_pressed: [Option<Instant>; KEY_COUNT],
    presses: VecDeque<u8>,
    cancel: CancelToken,
    rng: StdRng,
}

impl TermInput {
    /// Esc or ctrl-c trips `cancel`
    pub fn new(cancel: CancelToken, seed: Option<u64>) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
            last_pressed: [None; KEY_COUNT],
            presses: VecDeque::with_capacity(PRESS_QUEUE_LEN),
            cancel,
            rng: seeded_rng(seed),
        })
    }

    /// drain pending terminal events, waiting up to `timeout` for the first
    fn read_terminal(&mut self, timeout: Duration) -> Result<(), io::Error> {
        let mut wait = timeout;
        while poll(wait)? {
            wait = Duration::from_millis(0);
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.cancel.cancel()
                    }
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()).copied() {
                        Some(mapped_key) => self.press(mapped_key),
                        None => {
                            warn!("can't map {:?} to a keypad key", key);
                        }
                    },
                    KeyCode::Esc => self.cancel.cancel(),
                    _ => {
                        debug!("ignoring key event {:?}", evt);
                    }
                },
                _ => {
                    debug!("ignoring terminal event");
                }
            }
        }
        Ok(())
    }

    fn press(&mut self, key: u8) {
        self.last_pressed[key as usize] = Some(Instant::now());
        if self.presses.len() == PRESS_QUEUE_LEN {
            self.presses.pop_front();
        }
        self.presses.push_back(key);
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't restore terminal mode: {}", e);
        }
    }
}

impl Input for TermInput {
    fn is_key_down(&mut self, key: u8) -> Result<bool, io::Error> {
        self.read_terminal(Duration::from_millis(0))?;
        Ok(self
            .last_pressed
            .get(key as usize)
            .copied()
            .flatten()
            .map_or(false, |at| at.elapsed() < HOLD_WINDOW))
    }

    fn next_key_press(&mut self) -> Result<Option<u8>, io::Error> {
        if self.presses.is_empty() {
            self.read_terminal(KEY_WAIT_SLICE)?;
        }
        Ok(self.presses.pop_front())
    }

    fn random_byte(&mut self) -> u8 {
        self.rng.gen()
    }
}

/// scripted Input for testing and headless runs: a fixed set of held keys, a
/// queue of presses to hand out, and seeded randomness
pub struct ScriptedInput {
    down: [bool; KEY_COUNT],
    presses: VecDeque<u8>,
    rng: StdRng,
}

impl ScriptedInput {
    pub fn new(keys_down: &[u8]) -> Self {
        let mut input = ScriptedInput {
            down: [false; KEY_COUNT],
            presses: VecDeque::new(),
            rng: seeded_rng(Some(0)),
        };
        input.set_down(keys_down);
        input
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.rng = seeded_rng(seed);
        self
    }

    /// replace the set of held keys; anything outside 0x0-0xf is ignored
    pub fn set_down(&mut self, keys: &[u8]) {
        self.down = [false; KEY_COUNT];
        for key in keys.iter().filter(|k| (**k as usize) < KEY_COUNT) {
            self.down[*key as usize] = true;
        }
    }

    pub fn queue_presses(&mut self, keys: &[u8]) {
        self.presses.extend(keys.iter().copied());
    }
}

impl Input for ScriptedInput {
    fn is_key_down(&mut self, key: u8) -> Result<bool, io::Error> {
        Ok(self.down.get(key as usize).copied().unwrap_or(false))
    }

    fn next_key_press(&mut self) -> Result<Option<u8>, io::Error> {
        Ok(self.presses.pop_front())
    }

    fn random_byte(&mut self) -> u8 {
        self.rng.gen()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_keypad() {
        let mut keys: Vec<u8> = CONVENTIONAL_KEYMAP.iter().map(|(_, k)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_scripted_keys_down() -> Result<(), io::Error> {
        let mut input = ScriptedInput::new(&[0x1, 0xf, 0x42]);
        assert!(input.is_key_down(0x1)?);
        assert!(input.is_key_down(0xf)?);
        assert!(!input.is_key_down(0x2)?);
        assert!(!input.is_key_down(0x42)?);
        input.set_down(&[]);
        assert!(!input.is_key_down(0x1)?);
        Ok(())
    }

    #[test]
    fn test_scripted_presses_in_order() -> Result<(), io::Error> {
        let mut input = ScriptedInput::new(&[]);
        assert_eq!(input.next_key_press()?, None);
        input.queue_presses(&[0xa, 0x3]);
        assert_eq!(input.next_key_press()?, Some(0xa));
        assert_eq!(input.next_key_press()?, Some(0x3));
        assert_eq!(input.next_key_press()?, None);
        Ok(())
    }

    #[test]
    fn test_seeded_randomness_repeats() {
        let mut a = ScriptedInput::new(&[]).with_seed(Some(7));
        let mut b = ScriptedInput::new(&[]).with_seed(Some(7));
        let xs: Vec<u8> = (0..8).map(|_| a.random_byte()).collect();
        let ys: Vec<u8> = (0..8).map(|_| b.random_byte()).collect();
        assert_eq!(xs, ys);
    }
}
