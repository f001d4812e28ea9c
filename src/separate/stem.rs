//! The four stems every separation produces.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One isolated part of a mixed recording.
///
/// Declaration order is the canonical processing order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Drums,
    Bass,
    Vocals,
    Other,
}

impl Stem {
    /// All stems in canonical order.
    pub const ALL: [Stem; 4] = [Stem::Drums, Stem::Bass, Stem::Vocals, Stem::Other];

    /// Lower-case name as used in file names and job records.
    pub fn name(&self) -> &'static str {
        match self {
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Vocals => "vocals",
            Stem::Other => "other",
        }
    }

    /// Title-case name for track labels.
    pub fn title(&self) -> &'static str {
        match self {
            Stem::Drums => "Drums",
            Stem::Bass => "Bass",
            Stem::Vocals => "Vocals",
            Stem::Other => "Other",
        }
    }

    /// Parse a stem name.  Exact, lower-case match only.
    ///
    /// ```
    /// use organ_midi::separate::Stem;
    ///
    /// assert_eq!(Stem::from_name("vocals"), Some(Stem::Vocals));
    /// assert_eq!(Stem::from_name("guitar"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Stem::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ---------------------------------------------------------------------------
// StemPaths
// ---------------------------------------------------------------------------

/// Audio file produced for each stem.  Always exactly four entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub drums: PathBuf,
    pub bass: PathBuf,
    pub vocals: PathBuf,
    pub other: PathBuf,
}

impl StemPaths {
    /// Build by asking `path_for` for each stem.
    pub fn from_fn(mut path_for: impl FnMut(Stem) -> PathBuf) -> Self {
        Self {
            drums: path_for(Stem::Drums),
            bass: path_for(Stem::Bass),
            vocals: path_for(Stem::Vocals),
            other: path_for(Stem::Other),
        }
    }

    pub fn get(&self, stem: Stem) -> &Path {
        match stem {
            Stem::Drums => &self.drums,
            Stem::Bass => &self.bass,
            Stem::Vocals => &self.vocals,
            Stem::Other => &self.other,
        }
    }

    /// `(stem, path)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Stem, &Path)> + '_ {
        Stem::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}
