//! Emulator - wires the panel to an audio callback and the terminal UI

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::Arc;

use knobwire::{
    dispatch::UdpOscSink,
    input::Poller,
    io::midi::{self, MidiRecord},
    panel::{Panel, PanelConfig},
    transport::MidiOutputPort,
};

use super::hardware::{Expander, Hardware};
use super::ui::{logger::LogLines, UiApp};

/// Most UI-injected messages handed to one period.
const MAX_INJECTED: usize = 16;
/// Slots in the UI <-> callback monitor rings.
const MONITOR_SLOTS: usize = 256;

/// Loopback output port: everything the panel sends is shown in the UI.
struct MonitorPort {
    tx: Producer<MidiRecord>,
}

impl MidiOutputPort for MonitorPort {
    fn write_event(&mut self, _index: usize, bytes: &[u8]) {
        let mut record = [0u8; 3];
        for (dst, src) in record.iter_mut().zip(bytes) {
            *dst = *src;
        }
        // A full monitor only loses display lines
        let _ = self.tx.push(record);
    }
}

/// Main application builder
pub struct Emulator {
    config: PanelConfig,
    osc_port: Option<u16>,
}

impl Emulator {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            osc_port: None,
        }
    }

    /// Send OSC encoders to `port` on localhost
    pub fn osc_port(mut self, port: Option<u16>) -> Self {
        self.osc_port = port;
        self
    }

    /// Run the emulator until the UI quits
    pub fn run(self, log_lines: LogLines) -> EyreResult<()> {
        let labels = self
            .config
            .encoders
            .iter()
            .map(|encoder| match (&encoder.osc_path, encoder.midi_ctrl) {
                (_, ctrl) if ctrl > 0 => format!("CC {}/{}", encoder.midi_chan, ctrl),
                (Some(path), _) => format!("OSC {}", path),
                (None, _) => "unbound".to_string(),
            })
            .collect::<Vec<_>>();
        let switch_count = self.config.switches.len();
        let poll = self.config.poll;

        let mut builder = Panel::builder(self.config);
        if let Some(port) = self.osc_port {
            let sink = UdpOscSink::localhost(port).wrap_err("failed to open OSC socket")?;
            log::info!("sending OSC to {}", sink.target());
            builder = builder.osc(Box::new(sink));
        }
        let (panel, mut bridge, inbound, events) = builder.open()?;

        // Set up audio
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;
        let channels = config.channels() as usize;
        log::info!(
            "realtime period from {} Hz / {} channel output",
            config.sample_rate().0,
            channels
        );

        let (monitor_tx, monitor_rx) = RingBuffer::<MidiRecord>::new(MONITOR_SLOTS);
        let (inject_tx, mut inject_rx) = RingBuffer::<MidiRecord>::new(MONITOR_SLOTS);
        let mut port = MonitorPort { tx: monitor_tx };
        let mut injected = [[0u8; 3]; MAX_INJECTED];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                data.fill(0.0);
                let frames = data.len() / channels.max(1);

                let mut count = 0;
                while count < MAX_INJECTED {
                    let Ok(record) = inject_rx.pop() else {
                        break;
                    };
                    injected[count] = record;
                    count += 1;
                }
                let input = injected[..count]
                    .iter()
                    .map(|record| &record[..midi::message_len(record[0])]);

                // Overloaded periods are counted by the bridge and reported by the UI
                let _ = bridge.process(frames, input, &mut port);
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )?;
        stream.play()?;

        // Emulated expander switches are sampled by the poll loop
        let expander = Arc::new(Expander::default());
        let _poller = Poller::spawn(
            panel.clone(),
            {
                let expander = expander.clone();
                move |pin: u32| expander.level(pin)
            },
            poll,
        )
        .wrap_err("failed to start poll thread")?;
        let hardware = Hardware::spawn(panel.clone()).wrap_err("failed to start hardware thread")?;

        let mut terminal = ratatui::init();
        let result = UiApp::new(
            panel,
            hardware,
            expander,
            Channels {
                monitor: monitor_rx,
                inject: inject_tx,
                inbound,
                events,
            },
            labels,
            switch_count,
            log_lines,
        )
        .run(&mut terminal);
        ratatui::restore();
        result
    }
}

/// UI ends of the message rings
pub struct Channels {
    pub monitor: Consumer<MidiRecord>,
    pub inject: Producer<MidiRecord>,
    pub inbound: knobwire::transport::MidiReceiver,
    pub events: knobwire::transport::EventReceiver,
}
