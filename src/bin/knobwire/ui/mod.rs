//! TUI module for knobwire
//!
//! Keys drive the emulated hardware; the panes show encoder and switch state,
//! the MIDI traffic on both sides of the realtime bridge and the log.

mod controls;
pub mod logger;
mod monitor;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction as LayoutDirection, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use std::{collections::VecDeque, sync::Arc, time::Duration};

use knobwire::{
    input::encoder::Direction,
    io::midi::MidiEvent,
    panel::{EncoderSnapshot, Panel},
    transport::FaultSnapshot,
    MAX_ENCODERS,
};

use super::app::Channels;
use super::hardware::{Expander, Hardware, FAST_STEP, SLOW_STEP};
use controls::{render_encoders, render_switches};
use logger::LogLines;
use monitor::{describe, render_log, render_monitor, Flow};

/// Monitor lines kept for display
const MONITOR_LINES: usize = 200;
/// Keys toggling switches 0..4
const SWITCH_KEYS: [char; 4] = ['z', 'x', 'c', 'v'];
/// Pitch-bend sensitivity RPN
const RPN_BEND_RANGE: u16 = 0x0000;

/// UI application state
pub struct UiApp {
    panel: Arc<Panel>,
    hardware: Hardware,
    expander: Arc<Expander>,
    channels: Channels,
    labels: Vec<String>,
    switch_pins: Vec<u32>,
    /// Last measured release time per switch
    durations: Vec<u32>,
    selected: usize,
    next_program: u8,
    monitor: VecDeque<(Flow, String)>,
    log_lines: LogLines,
    faults: FaultSnapshot,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        panel: Arc<Panel>,
        hardware: Hardware,
        expander: Arc<Expander>,
        channels: Channels,
        labels: Vec<String>,
        switch_count: usize,
        log_lines: LogLines,
    ) -> Self {
        let switch_pins = (0..switch_count)
            .filter_map(|i| panel.switch_pin(i))
            .collect();
        let faults = panel.faults();
        Self {
            panel,
            hardware,
            expander,
            channels,
            labels,
            switch_pins,
            durations: vec![0; switch_count],
            selected: 0,
            next_program: 0,
            monitor: VecDeque::with_capacity(MONITOR_LINES),
            log_lines,
            faults,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_panel();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }
        }

        Ok(())
    }

    fn push_monitor(&mut self, flow: Flow, text: String) {
        if self.monitor.len() == MONITOR_LINES {
            self.monitor.pop_front();
        }
        self.monitor.push_back((flow, text));
    }

    /// Collect everything the panel and the realtime side produced
    fn poll_panel(&mut self) {
        while let Ok(record) = self.channels.monitor.pop() {
            self.push_monitor(Flow::Out, describe(&record));
        }
        while let Some(record) = self.channels.inbound.read_inbound() {
            self.push_monitor(Flow::In, describe(&record));
        }
        while let Some(event) = self.channels.events.pop() {
            let bytes = event.to_le_bytes();
            let text = match MidiEvent::from_packed(event) {
                Some(parsed) => format!("{:08X} {:?}", event, parsed),
                None => format!("{:08X} {:02X?}", event, &bytes[..3]),
            };
            self.push_monitor(Flow::Event, text);
        }
        for (i, duration) in self.durations.iter_mut().enumerate() {
            let fresh = self.panel.read_and_clear_duration(i);
            if fresh > 0 {
                *duration = fresh;
            }
        }
        self.panel.report_faults(&mut self.faults);
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        let step_gap = if modifiers.contains(KeyModifiers::SHIFT) {
            FAST_STEP
        } else {
            SLOW_STEP
        };
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(c @ '1'..='8') => {
                let index = c as usize - '1' as usize;
                if index < self.labels.len().min(MAX_ENCODERS) {
                    self.selected = index;
                }
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                self.selected = (self.selected + 1).min(self.labels.len().saturating_sub(1))
            }
            KeyCode::Right => self.hardware.turn(self.selected, Direction::Up, step_gap),
            KeyCode::Left => self.hardware.turn(self.selected, Direction::Down, step_gap),
            KeyCode::Char(c) if SWITCH_KEYS.contains(&c) => {
                let index = SWITCH_KEYS.iter().position(|k| *k == c).unwrap_or(0);
                if let Some(pin) = self.switch_pins.get(index) {
                    let level = self.expander.toggle(*pin);
                    log::debug!("switch {} contact -> {}", index, level);
                }
            }
            KeyCode::Char('p') => {
                // Program change arriving from the outside world
                let program = self.next_program;
                self.next_program = (self.next_program + 1) & 0x7F;
                self.inject([0xC0, program, 0]);
            }
            KeyCode::Char('m') => {
                // Controller move echoed back from the outside world
                if let Some(enc) = self.snapshot(self.selected).filter(|enc| enc.midi_ctrl > 0) {
                    let value = ((enc.value + 16) % 128) as u8;
                    self.inject([0xB0 | enc.midi_chan, enc.midi_ctrl, value]);
                }
            }
            KeyCode::Char('s') => {
                if let Some(enc) = self.snapshot(self.selected) {
                    self.panel.set_value(self.selected, enc.max_value / 2);
                }
            }
            KeyCode::Char('r') => {
                if let Err(e) = self.panel.send_rpn(0, RPN_BEND_RANGE, 12 << 7) {
                    log::warn!("{}", e);
                }
            }
            _ => {}
        }
    }

    fn inject(&mut self, record: [u8; 3]) {
        if self.channels.inject.push(record).is_err() {
            log::warn!("inject queue full, message dropped");
        }
    }

    fn snapshot(&self, index: usize) -> Option<EncoderSnapshot> {
        self.panel.encoder_snapshot(index)
    }

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Length(self.labels.len() as u16 + 3), // Encoders
                Constraint::Min(8),                               // Switches + MIDI
                Constraint::Length(8),                            // Log
                Constraint::Length(1),                            // Help bar
            ])
            .split(area);
        let middle = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(20)])
            .split(rows[1]);

        let encoders = (0..self.labels.len())
            .map(|i| self.snapshot(i))
            .collect::<Vec<_>>();
        render_encoders(frame, rows[0], &encoders, &self.labels, self.selected);

        let switches = self
            .durations
            .iter()
            .enumerate()
            .map(|(i, duration)| (self.panel.switch_status(i), *duration))
            .collect::<Vec<_>>();
        render_switches(frame, middle[0], &switches, &SWITCH_KEYS);
        render_monitor(frame, middle[1], &self.monitor);

        if let Ok(lines) = self.log_lines.lock() {
            render_log(frame, rows[2], &lines);
        }

        let help = Paragraph::new(
            " [1-8/↑↓] Select  [←→] Turn (Shift: fast)  [ZXCV] Switches  [S] Set  [M] Echo CC  [P] Inject PC  [R] RPN  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[3]);
    }
}
