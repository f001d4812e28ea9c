//! Standard MIDI File reading.
//!
//! Turns a metrical SMF (format 0 or 1) back into [`NoteEvent`]s with absolute
//! times in seconds.  Used to ingest transcriber output and to inspect the
//! files this crate writes.

use std::collections::{HashMap, VecDeque};

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::transcribe::NoteEvent;

use super::{MidiError, TempoMap};

/// One parsed track.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiTrack {
    /// First track-name meta event, if any.
    pub name: Option<String>,
    /// Channel of the first channel message, if any.
    pub channel: Option<u8>,
    /// First program change, if any.
    pub program: Option<u8>,
    /// Notes ordered by onset, then key.
    pub notes: Vec<NoteEvent>,
}

/// Parse every track of `bytes`.
pub fn read_tracks(bytes: &[u8]) -> Result<Vec<MidiTrack>, MidiError> {
    let smf = Smf::parse(bytes).map_err(|e| MidiError::Parse(e.to_string()))?;
    let tpq = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int(),
        Timing::Timecode(..) => return Err(MidiError::UnsupportedTiming),
    };

    // Tempo changes may live in any track; format 1 keeps them in the first.
    let mut changes = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u32;
        for event in track {
            tick = advance(tick, event)?;
            if let TrackEventKind::Meta(MetaMessage::Tempo(uspq)) = event.kind {
                changes.push((tick, uspq.as_int()));
            }
        }
    }
    let tempo_map = TempoMap::new(tpq, changes);

    smf.tracks
        .iter()
        .map(|track| read_track(track, &tempo_map))
        .collect()
}

/// Parse `bytes` and return the notes of every track, ordered by onset.
pub fn read_notes(bytes: &[u8]) -> Result<Vec<NoteEvent>, MidiError> {
    let mut notes: Vec<NoteEvent> = read_tracks(bytes)?
        .into_iter()
        .flat_map(|t| t.notes)
        .collect();
    sort_notes(&mut notes);
    Ok(notes)
}

/// Absolute tick after `event`.  Fails when the track outgrows `u32` ticks.
fn advance(tick: u32, event: &midly::TrackEvent<'_>) -> Result<u32, MidiError> {
    tick.checked_add(event.delta.as_int())
        .ok_or_else(|| MidiError::Parse(format!("track runs past tick {}", u32::MAX)))
}

fn read_track(
    track: &[midly::TrackEvent<'_>],
    tempo_map: &TempoMap,
) -> Result<MidiTrack, MidiError> {
    let mut name = None;
    let mut channel = None;
    let mut program = None;
    // (channel, key) → pending (onset tick, velocity), oldest first.
    let mut open: HashMap<(u8, u8), VecDeque<(u32, u8)>> = HashMap::new();
    let mut closed: Vec<(u8, u32, u32, u8)> = Vec::new();

    let mut tick = 0u32;
    for event in track {
        tick = advance(tick, event)?;
        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) if name.is_none() => {
                name = Some(String::from_utf8_lossy(raw).into_owned());
            }
            TrackEventKind::Midi { channel: ch, message } => {
                let ch = ch.as_int();
                channel.get_or_insert(ch);
                match message {
                    MidiMessage::ProgramChange { program: p } => {
                        program.get_or_insert(p.as_int());
                    }
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry((ch, key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        if let Some((on, vel)) = open
                            .get_mut(&(ch, key.as_int()))
                            .and_then(VecDeque::pop_front)
                        {
                            closed.push((key.as_int(), on, tick, vel));
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    // Notes never released end with the track.
    for ((_, key), pending) in open {
        for (on, vel) in pending {
            closed.push((key, on, tick, vel));
        }
    }

    let mut notes: Vec<NoteEvent> = closed
        .into_iter()
        .map(|(key, on, off, vel)| {
            let start = tempo_map.seconds_at(on);
            NoteEvent::new(key, start, tempo_map.seconds_at(off) - start, vel)
        })
        .collect();
    sort_notes(&mut notes);

    Ok(MidiTrack {
        name,
        channel,
        program,
        notes,
    })
}

fn sort_notes(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
}
