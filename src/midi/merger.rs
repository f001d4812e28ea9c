//! Standard MIDI File writing.
//!
//! [`merge`] combines the four channel-mapped stems into one format 1 file:
//! one track per stem, each opening with its name and a single program
//! change.  The global tempo map sits at the head of the first track, so all
//! four tracks share it and notes that were simultaneous in the source stay
//! simultaneous.  Notes keep their absolute onset; nothing is quantised.
//!
//! [`write_notes`] writes one raw (unmapped) transcription as a format 0 file.

use std::collections::HashSet;

use midly::num::{u15, u4};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::transcribe::NoteEvent;

use super::{MidiError, StemTrack, Tempo};

/// Number of stems a combined file must contain.
pub const TRACK_COUNT: usize = 4;

/// Ordering of events that share a tick: meta first, then the program
/// change, then releases before new attacks.
const PRIORITY_META: u8 = 0;
const PRIORITY_PROGRAM: u8 = 1;
const PRIORITY_OFF: u8 = 2;
const PRIORITY_ON: u8 = 3;

/// An event at an absolute tick, before delta encoding.
type Timed<'a> = (u32, u8, TrackEventKind<'a>);

/// Merge exactly four stem tracks, one per channel 0–3, into SMF bytes.
///
/// # Errors
///
/// [`MidiError::IncompleteTrackSet`] when the set is not four tracks on four
/// distinct channels in `0..=3`.
pub fn merge(tracks: &[StemTrack], tempo: &Tempo) -> Result<Vec<u8>, MidiError> {
    validate_track_set(tracks)?;

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::from(tempo.ticks_per_quarter())),
    ));

    for (i, track) in tracks.iter().enumerate() {
        let channel = u4::from(track.channel);
        let mut events: Vec<Timed<'_>> = vec![(
            0,
            PRIORITY_META,
            TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
        )];
        if i == 0 {
            events.extend(tempo_events(tempo));
        }
        events.push((
            0,
            PRIORITY_PROGRAM,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: track.program.into(),
                },
            },
        ));
        events.extend(note_events(channel, &track.notes, tempo));
        smf.tracks.push(finish_track(events));
    }

    encode(&smf)
}

/// Write one transcription as a single-track file on channel 0.
pub fn write_notes(name: &str, notes: &[NoteEvent], tempo: &Tempo) -> Result<Vec<u8>, MidiError> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::from(tempo.ticks_per_quarter())),
    ));

    let mut events: Vec<Timed<'_>> = vec![(
        0,
        PRIORITY_META,
        TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    )];
    events.extend(tempo_events(tempo));
    events.extend(note_events(u4::from(0), notes, tempo));
    smf.tracks.push(finish_track(events));

    encode(&smf)
}

fn validate_track_set(tracks: &[StemTrack]) -> Result<(), MidiError> {
    if tracks.len() != TRACK_COUNT {
        return Err(MidiError::IncompleteTrackSet(format!(
            "expected {TRACK_COUNT} tracks, got {}",
            tracks.len()
        )));
    }

    let mut seen = HashSet::new();
    for track in tracks {
        if track.channel as usize >= TRACK_COUNT {
            return Err(MidiError::IncompleteTrackSet(format!(
                "{} is on channel {}, outside 0–3",
                track.stem, track.channel
            )));
        }
        if !seen.insert(track.channel) {
            return Err(MidiError::IncompleteTrackSet(format!(
                "channel {} is used by more than one track",
                track.channel
            )));
        }
    }
    Ok(())
}

fn tempo_events<'a>(tempo: &Tempo) -> [Timed<'a>; 2] {
    [
        (
            0,
            PRIORITY_META,
            TrackEventKind::Meta(MetaMessage::Tempo(tempo.microseconds_per_quarter().into())),
        ),
        (
            0,
            PRIORITY_META,
            // 4/4, denominator as a power of two, 24 clocks per click, 8 32nds per quarter.
            TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
        ),
    ]
}

fn note_events<'a>(channel: u4, notes: &[NoteEvent], tempo: &Tempo) -> Vec<Timed<'a>> {
    let mut events = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let on = tempo.seconds_to_ticks(note.start);
        // A note always lasts at least one tick so its release cannot sort
        // ahead of its own attack.
        let off = tempo.seconds_to_ticks(note.end()).max(on + 1);
        let key = note.pitch.min(127).into();

        events.push((
            on,
            PRIORITY_ON,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: note.velocity.clamp(1, 127).into(),
                },
            },
        ));
        events.push((
            off,
            PRIORITY_OFF,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: 0.into(),
                },
            },
        ));
    }
    events
}

/// Sort by tick (stable within a priority), delta-encode, append EndOfTrack.
fn finish_track(mut events: Vec<Timed<'_>>) -> Track<'_> {
    events.sort_by_key(|&(tick, priority, _)| (tick, priority));

    let mut prev = 0u32;
    let mut track: Track<'_> = events
        .into_iter()
        .map(|(tick, _, kind)| {
            let delta = tick - prev;
            prev = tick;
            TrackEvent {
                delta: delta.into(),
                kind,
            }
        })
        .collect();

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

fn encode(smf: &Smf<'_>) -> Result<Vec<u8>, MidiError> {
    let mut out = Vec::new();
    smf.write(&mut out)
        .map_err(|e| MidiError::Encode(e.to_string()))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
