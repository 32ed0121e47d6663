//! MIDI input via midir.
//!
//! The input callback only stamps each message with the scheduler clock and
//! pushes it onto the event queue; decoding and timing happen on the
//! scheduler thread.

use midir::{Ignore, MidiInput, MidiInputConnection};
use rtrb::Producer;
use subsnake_synth::{MidiEvent, SchedulerClock};

use crate::stream::find_by_name;
use crate::{Error, Result};

const CLIENT_NAME: &str = "subsnake";

/// A MIDI input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPort {
    /// Position in the port list.
    pub index: usize,
    /// Port name as reported by the system.
    pub name: String,
}

/// List MIDI input ports.
pub fn list_ports() -> Result<Vec<MidiPort>> {
    let input = MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    Ok(input
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            input
                .port_name(port)
                .ok()
                .map(|name| MidiPort { index, name })
        })
        .collect())
}

/// An open MIDI input. Dropping it closes the port.
pub struct MidiConnection {
    connection: MidiInputConnection<Producer<MidiEvent>>,
    port: MidiPort,
}

impl std::fmt::Debug for MidiConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiConnection")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl MidiConnection {
    /// The connected port.
    pub fn port(&self) -> &MidiPort {
        &self.port
    }

    /// Close the port.
    pub fn close(self) {
        let (_input, _events) = self.connection.close();
        tracing::info!(port = %self.port.name, "MIDI input closed");
    }
}

/// Open the port matching `name_or_index` and push its messages to
/// `events`, stamped with `clock`.
pub fn connect_midi(
    name_or_index: &str,
    events: Producer<MidiEvent>,
    clock: SchedulerClock,
) -> Result<MidiConnection> {
    let mut input = MidiInput::new(CLIENT_NAME).map_err(|e| Error::Midi(e.to_string()))?;
    input.ignore(Ignore::All);

    let ports = input.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| input.port_name(p).unwrap_or_default())
        .collect();
    let index = find_by_name(&names, name_or_index, "MIDI input")
        .ok_or_else(|| Error::MidiPortNotFound(name_or_index.to_string()))?;
    let port = MidiPort {
        index,
        name: names[index].clone(),
    };

    let connection = input
        .connect(
            &ports[index],
            "subsnake-in",
            move |_stamp_us, message, events: &mut Producer<MidiEvent>| {
                // A full queue means the scheduler has stalled; the message
                // cannot be held here without blocking the driver thread.
                let _ = events.push(MidiEvent::new(message, clock.now()));
            },
            events,
        )
        .map_err(|e| Error::Midi(e.to_string()))?;

    tracing::info!(port = %port.name, index, "MIDI input connected");
    Ok(MidiConnection { connection, port })
}
