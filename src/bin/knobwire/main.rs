//! knobwire - terminal emulator for an encoder/switch control panel
//!
//! Run with: cargo run -- [--osc PORT]

mod app;
mod hardware;
mod ui;

use app::Emulator;
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use knobwire::{
    input::{EncoderConfig, SwitchConfig},
    panel::PanelConfig,
    EXPANDER_BASE_PIN,
};

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let log_lines = ui::logger::install(log::LevelFilter::Debug).wrap_err("failed to install logger")?;

    let osc_port = parse_osc_port(std::env::args().skip(1))?;

    // Encoders on direct GPIO, switches on the first expander bank
    let config = PanelConfig::default()
        .encoder(EncoderConfig::midi(2, 3, 0, 74))
        .encoder(EncoderConfig::midi(4, 5, 0, 71).value(64))
        .encoder(EncoderConfig::midi(6, 7, 1, 7).step(8).value(96))
        .encoder(EncoderConfig::osc(8, 9, "/knobwire/toggle").step(64))
        .switch(SwitchConfig::new(EXPANDER_BASE_PIN))
        .switch(SwitchConfig::new(EXPANDER_BASE_PIN + 1))
        .switch(SwitchConfig::new(EXPANDER_BASE_PIN + 2))
        .switch(SwitchConfig::new(EXPANDER_BASE_PIN + 3));

    Emulator::new(config).osc_port(osc_port).run(log_lines)
}

fn parse_osc_port(mut args: impl Iterator<Item = String>) -> EyreResult<Option<u16>> {
    let mut port = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--osc" => {
                let value = args.next().ok_or_else(|| eyre!("--osc needs a port number"))?;
                port = Some(
                    value
                        .parse()
                        .wrap_err_with(|| format!("invalid OSC port `{}`", value))?,
                );
            }
            other => return Err(eyre!("unknown argument `{}`", other)),
        }
    }
    Ok(port)
}
