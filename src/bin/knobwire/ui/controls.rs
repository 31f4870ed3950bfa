//! Encoder and switch widgets

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use knobwire::panel::EncoderSnapshot;

/// Width of the value bar in cells
const BAR_WIDTH: usize = 24;

fn value_bar(value: u32, max_value: u32) -> String {
    let filled = if max_value == 0 {
        0
    } else {
        (value.min(max_value) as usize * BAR_WIDTH) / max_value as usize
    };
    format!("{}{}", "█".repeat(filled), "·".repeat(BAR_WIDTH - filled))
}

/// Render the encoder table, highlighting the selected row
pub fn render_encoders(
    frame: &mut Frame,
    area: Rect,
    encoders: &[Option<EncoderSnapshot>],
    labels: &[String],
    selected: usize,
) {
    let rows = encoders.iter().zip(labels).enumerate().map(|(i, (snapshot, label))| {
        let style = if i == selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        match snapshot {
            Some(enc) => Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(label.clone()),
                Cell::from(if enc.step == 0 {
                    "fine".to_string()
                } else {
                    format!("step {}", enc.step)
                }),
                Cell::from(format!("{:>4}/{:<4}", enc.value, enc.max_value)),
                Cell::from(format!("{:>5}", enc.subvalue)),
                Cell::from(value_bar(enc.value, enc.max_value)),
            ])
            .style(style),
            None => Row::new(vec![Cell::from(format!("{}", i + 1)), Cell::from("disabled")])
                .style(style.fg(Color::DarkGray)),
        }
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(24),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Min(BAR_WIDTH as u16),
        ],
    )
    .header(
        Row::new(vec!["#", "target", "mode", "value", "sub", ""])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(" Encoders ").borders(Borders::ALL));
    frame.render_widget(table, area);
}

/// Render switch levels and the last measured release time
pub fn render_switches(frame: &mut Frame, area: Rect, switches: &[(Option<u8>, u32)], keys: &[char]) {
    let rows = switches.iter().zip(keys).enumerate().map(|(i, ((status, duration_us), key))| {
        let (text, color) = match status {
            Some(1) => ("pressed", Color::Green),
            Some(_) => ("released", Color::White),
            None => ("disabled", Color::DarkGray),
        };
        Row::new(vec![
            Cell::from(format!("{} [{}]", i, key)),
            Cell::from(text).style(Style::default().fg(color)),
            Cell::from(format!("{:.1} ms", *duration_us as f64 / 1000.0)),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Length(10), Constraint::Min(10)],
    )
    .header(
        Row::new(vec!["sw", "state", "released for"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(" Switches ").borders(Borders::ALL));
    frame.render_widget(table, area);
}
