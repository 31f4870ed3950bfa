//! MIDI monitor and log panes

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::collections::VecDeque;

use knobwire::io::midi::{self, MidiEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Drained by the realtime bridge
    Out,
    /// Forwarded to the inbound ring
    In,
    /// Popped from the returned-event ring
    Event,
}

/// Format raw bytes the way they went over the wire
pub fn describe(bytes: &[u8]) -> String {
    let len = bytes.first().map_or(0, |status| midi::message_len(*status)).min(bytes.len());
    let hex = bytes[..len]
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    match MidiEvent::from_bytes(bytes) {
        Some(event) => format!("{:<9} {:?}", hex, event),
        None => hex,
    }
}

pub fn render_monitor(frame: &mut Frame, area: Rect, entries: &VecDeque<(Flow, String)>) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = entries
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|(flow, text)| {
            let (tag, color) = match flow {
                Flow::Out => ("OUT", Color::Cyan),
                Flow::In => ("IN ", Color::Green),
                Flow::Event => ("EVT", Color::Magenta),
            };
            Line::from(vec![
                Span::styled(format!("{} ", tag), Style::default().fg(color)),
                Span::raw(text.clone()),
            ])
        })
        .collect::<Vec<_>>();

    let paragraph =
        Paragraph::new(lines).block(Block::default().title(" MIDI ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

pub fn render_log(frame: &mut Frame, area: Rect, lines: &VecDeque<String>) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = lines
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|line| {
            let color = if line.starts_with("ERROR") {
                Color::Red
            } else if line.starts_with("WARN") {
                Color::Yellow
            } else {
                Color::DarkGray
            };
            Line::styled(line.clone(), Style::default().fg(color))
        })
        .collect::<Vec<_>>();

    let paragraph = Paragraph::new(lines).block(Block::default().title(" Log ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_change_shows_two_bytes() {
        assert!(describe(&[0xC3, 0x05, 0x00]).starts_with("C3 05 "));
        assert!(describe(&[0xB0, 0x07, 0x40]).starts_with("B0 07 40"));
    }
}
