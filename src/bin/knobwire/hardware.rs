//! Emulated panel hardware: quadrature contacts and an expander bank.
//!
//! Key presses become commands for a worker thread that plays them back with
//! real timing, so the decoder sees the same edge spacing a hand would give.

use std::{
    sync::{
        atomic::{AtomicU16, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use knobwire::{
    input::{encoder::Direction, EdgeSink},
    panel::Panel,
    EXPANDER_BASE_PIN, MAX_ENCODERS, TICKS_PER_DETENT,
};

/// Contact levels `(a, b)` in clockwise order.
const GRAY_CYCLE: [(u8, u8); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Pause between quadrature steps for a slow turn.
pub const SLOW_STEP: Duration = Duration::from_millis(35);
/// Pause for a flick, fast enough to hit full acceleration.
pub const FAST_STEP: Duration = Duration::from_millis(3);

pub enum Command {
    Turn {
        encoder: usize,
        direction: Direction,
        step_gap: Duration,
    },
    Quit,
}

/// Two 8-bit expander banks. The poll loop reads pins from here.
#[derive(Debug, Default)]
pub struct Expander {
    register: AtomicU16,
}

impl Expander {
    pub fn level(&self, pin: u32) -> u8 {
        match pin.checked_sub(EXPANDER_BASE_PIN) {
            Some(bit) if bit < 16 => ((self.register.load(Ordering::Acquire) >> bit) & 1) as u8,
            _ => 0,
        }
    }

    /// Flip `pin` and return its new level.
    pub fn toggle(&self, pin: u32) -> u8 {
        let Some(bit) = pin.checked_sub(EXPANDER_BASE_PIN).filter(|bit| *bit < 16) else {
            return 0;
        };
        let previous = self.register.fetch_xor(1 << bit, Ordering::AcqRel);
        (((previous >> bit) & 1) ^ 1) as u8
    }
}

/// Worker thread turning encoders.
pub struct Hardware {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Hardware {
    pub fn spawn(panel: Arc<Panel>) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("knobwire-hw".into())
            .spawn(move || play(&panel, rx))?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    pub fn turn(&self, encoder: usize, direction: Direction, step_gap: Duration) {
        let _ = self.commands.send(Command::Turn {
            encoder,
            direction,
            step_gap,
        });
    }
}

impl Drop for Hardware {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Quit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn play(panel: &Panel, commands: Receiver<Command>) {
    let mut phases = [0usize; MAX_ENCODERS];

    while let Ok(command) = commands.recv() {
        match command {
            Command::Turn {
                encoder,
                direction,
                step_gap,
            } => {
                let Some(phase) = phases.get_mut(encoder) else {
                    continue;
                };
                // One detent is a full Gray cycle
                for _ in 0..TICKS_PER_DETENT {
                    *phase = match direction {
                        Direction::Up => (*phase + 1) % GRAY_CYCLE.len(),
                        Direction::Down => (*phase + GRAY_CYCLE.len() - 1) % GRAY_CYCLE.len(),
                    };
                    let (a, b) = GRAY_CYCLE[*phase];
                    thread::sleep(step_gap);
                    panel.report_encoder_levels(encoder, a, b);
                }
            }
            Command::Quit => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expander_toggles_single_pins() {
        let expander = Expander::default();
        assert_eq!(expander.toggle(EXPANDER_BASE_PIN + 2), 1);
        assert_eq!(expander.level(EXPANDER_BASE_PIN + 2), 1);
        assert_eq!(expander.level(EXPANDER_BASE_PIN + 3), 0);
        assert_eq!(expander.toggle(EXPANDER_BASE_PIN + 2), 0);
        assert_eq!(expander.level(3), 0);
    }
}
