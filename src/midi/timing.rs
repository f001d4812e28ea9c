//! Seconds ↔ ticks conversion.
//!
//! Writing uses one fixed [`Tempo`] for the whole file.  Reading goes through
//! a [`TempoMap`] because transcriber output may carry tempo changes.

/// Largest value a MIDI variable-length delta can hold (`u28`).
const MAX_TICK: u32 = 0x0FFF_FFFF;
/// Largest tempo a `u24` tempo meta event can hold.
const MAX_USPQ: u32 = 0x00FF_FFFF;
/// Largest resolution a metrical header can hold (`u15`).
const MAX_TPQ: u16 = 0x7FFF;

/// 120 BPM.
pub const DEFAULT_USPQ: u32 = 500_000;

// ---------------------------------------------------------------------------
// Tempo
// ---------------------------------------------------------------------------

/// A single global tempo and resolution, shared by every track of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
    ticks_per_quarter: u16,
}

impl Tempo {
    /// Create a tempo.  Non-positive or non-finite `bpm` falls back to 120;
    /// `ticks_per_quarter` is kept within `1..=32767`.
    pub fn new(bpm: f64, ticks_per_quarter: u16) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 120.0 };
        Self {
            bpm,
            ticks_per_quarter: ticks_per_quarter.clamp(1, MAX_TPQ),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }

    /// Value of the tempo meta event.
    pub fn microseconds_per_quarter(&self) -> u32 {
        ((60_000_000.0 / self.bpm).round() as u32).clamp(1, MAX_USPQ)
    }

    /// Absolute tick for a time in seconds.  Negative times map to tick 0.
    ///
    /// ```
    /// use organ_midi::midi::Tempo;
    ///
    /// let tempo = Tempo::new(120.0, 480);
    /// assert_eq!(tempo.seconds_to_ticks(0.5), 480);
    /// ```
    pub fn seconds_to_ticks(&self, secs: f64) -> u32 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        let ticks = secs * 1_000_000.0 / self.microseconds_per_quarter() as f64
            * self.ticks_per_quarter as f64;
        (ticks.round() as u64).min(MAX_TICK as u64) as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0, 480)
    }
}

// ---------------------------------------------------------------------------
// TempoMap
// ---------------------------------------------------------------------------

/// Tempo changes of a parsed file, for tick → seconds conversion.
#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_quarter: u16,
    /// `(tick, microseconds per quarter)`, sorted by tick, first entry at 0.
    changes: Vec<(u32, u32)>,
}

impl TempoMap {
    /// Build from unordered `(tick, uspq)` changes.  A change at tick 0 is
    /// implied (120 BPM) when none is given.
    pub fn new(ticks_per_quarter: u16, mut changes: Vec<(u32, u32)>) -> Self {
        changes.sort_by_key(|&(tick, _)| tick);
        if changes.first().map_or(true, |&(tick, _)| tick > 0) {
            changes.insert(0, (0, DEFAULT_USPQ));
        }
        Self {
            ticks_per_quarter: ticks_per_quarter.max(1),
            changes,
        }
    }

    /// Absolute time in seconds of `tick`.
    pub fn seconds_at(&self, tick: u32) -> f64 {
        let tpq = self.ticks_per_quarter as f64;
        let mut secs = 0.0;
        for (i, &(start, uspq)) in self.changes.iter().enumerate() {
            if start >= tick {
                break;
            }
            let end = self
                .changes
                .get(i + 1)
                .map_or(tick, |&(next, _)| next.min(tick));
            secs += (end - start) as f64 / tpq * uspq as f64 / 1_000_000.0;
        }
        secs
    }
}
