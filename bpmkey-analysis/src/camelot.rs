//! Key labels and Camelot wheel notation
//!
//! Maps the 24 estimated key labels to Camelot codes (1A-12B) for
//! harmonic mixing. Relative major/minor pairs share a wheel number.

use std::fmt;

/// Major or minor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// Musical key (24 possible: 12 major + 12 minor)
///
/// Major keys are spelled with flats. Minor keys keep the mixed spelling
/// of the label set (`C#m`, `F#m`, `G#m` stay sharp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicalKey {
    CMajor,
    DbMajor,
    DMajor,
    EbMajor,
    EMajor,
    FMajor,
    GbMajor,
    GMajor,
    AbMajor,
    AMajor,
    BbMajor,
    BMajor,
    CMinor,
    CSharpMinor,
    DMinor,
    EbMinor,
    EMinor,
    FMinor,
    FSharpMinor,
    GMinor,
    GSharpMinor,
    AMinor,
    BbMinor,
    BMinor,
}

/// Sharp major spellings and their flat equivalents
const SHARP_TO_FLAT: [(&str, &str); 5] = [
    ("C#", "Db"),
    ("D#", "Eb"),
    ("F#", "Gb"),
    ("G#", "Ab"),
    ("A#", "Bb"),
];

/// Rewrite a sharp major spelling to its flat equivalent
///
/// Anything else (including minor labels) is returned unchanged.
pub fn to_flat(label: &str) -> &str {
    SHARP_TO_FLAT
        .iter()
        .find(|(sharp, _)| *sharp == label)
        .map(|(_, flat)| *flat)
        .unwrap_or(label)
}

impl MusicalKey {
    /// All keys, majors first, each group ordered by tonic pitch class
    pub const ALL: [MusicalKey; 24] = {
        use MusicalKey::*;
        [
            CMajor, DbMajor, DMajor, EbMajor, EMajor, FMajor, GbMajor, GMajor, AbMajor, AMajor,
            BbMajor, BMajor, CMinor, CSharpMinor, DMinor, EbMinor, EMinor, FMinor, FSharpMinor,
            GMinor, GSharpMinor, AMinor, BbMinor, BMinor,
        ]
    };

    /// Key with the given tonic pitch class (0-11, where 0=C) and mode
    pub fn from_tonic(pitch_class: u8, mode: Mode) -> Self {
        let offset = match mode {
            Mode::Major => 0,
            Mode::Minor => 12,
        };
        Self::ALL[offset + (pitch_class % 12) as usize]
    }

    /// Parse an exact label ("C", "Db", "Am", "C#m", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.label() == label)
    }

    /// Tonic pitch class (0-11, where 0=C)
    pub fn root_pitch_class(&self) -> u8 {
        (*self as u8) % 12
    }

    /// Major or minor
    pub fn mode(&self) -> Mode {
        if (*self as u8) < 12 {
            Mode::Major
        } else {
            Mode::Minor
        }
    }

    /// Check if this key is major
    pub fn is_major(&self) -> bool {
        self.mode() == Mode::Major
    }

    /// Label as reported in analysis results
    pub fn label(&self) -> &'static str {
        use MusicalKey::*;
        match self {
            CMajor => "C",
            DbMajor => "Db",
            DMajor => "D",
            EbMajor => "Eb",
            EMajor => "E",
            FMajor => "F",
            GbMajor => "Gb",
            GMajor => "G",
            AbMajor => "Ab",
            AMajor => "A",
            BbMajor => "Bb",
            BMajor => "B",
            CMinor => "Cm",
            CSharpMinor => "C#m",
            DMinor => "Dm",
            EbMinor => "Ebm",
            EMinor => "Em",
            FMinor => "Fm",
            FSharpMinor => "F#m",
            GMinor => "Gm",
            GSharpMinor => "G#m",
            AMinor => "Am",
            BbMinor => "Bbm",
            BMinor => "Bm",
        }
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Camelot wheel, position 1-12: (major, relative minor)
const WHEEL: [(MusicalKey, MusicalKey); 12] = {
    use MusicalKey::*;
    [
        (BMajor, GSharpMinor),
        (GbMajor, EbMinor),
        (DbMajor, BbMinor),
        (AbMajor, FMinor),
        (EbMajor, CMinor),
        (BbMajor, GMinor),
        (FMajor, DMinor),
        (CMajor, AMinor),
        (GMajor, EMinor),
        (DMajor, BMinor),
        (AMajor, FSharpMinor),
        (EMajor, CSharpMinor),
    ]
};

/// Camelot wheel notation (1A-12B)
///
/// - Numbers 1-12 are positions on the wheel (circle of fifths)
/// - 'A' suffix = minor keys
/// - 'B' suffix = major keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CamelotKey {
    /// Position on the wheel (1-12)
    pub number: u8,
    /// true = B (major), false = A (minor)
    pub is_major: bool,
}

impl CamelotKey {
    /// Create a new Camelot key
    pub fn new(number: u8, is_major: bool) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self { number, is_major })
        } else {
            None
        }
    }

    /// Convert from musical key to Camelot notation
    pub fn from_musical_key(key: MusicalKey) -> Self {
        let position = WHEEL
            .iter()
            .position(|&(major, minor)| major == key || minor == key)
            .unwrap_or(7);
        Self {
            number: position as u8 + 1,
            is_major: key.is_major(),
        }
    }

    /// Convert to musical key
    pub fn to_musical_key(&self) -> MusicalKey {
        let (major, minor) = WHEEL[(self.number.clamp(1, 12) - 1) as usize];
        if self.is_major {
            major
        } else {
            minor
        }
    }

    /// Parse from string (e.g., "8A", "12B")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 {
            return None;
        }

        let is_major = match s.chars().last()?.to_ascii_uppercase() {
            'B' => true,
            'A' => false,
            _ => return None,
        };

        let number: u8 = s[..s.len() - 1].parse().ok()?;
        Self::new(number, is_major)
    }
}

impl From<MusicalKey> for CamelotKey {
    fn from(key: MusicalKey) -> Self {
        Self::from_musical_key(key)
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, if self.is_major { 'B' } else { 'A' })
    }
}

/// Camelot code for a key label, or an empty string for unknown labels
pub fn camelot_code(label: &str) -> String {
    MusicalKey::from_label(label)
        .map(|key| CamelotKey::from_musical_key(key).to_string())
        .unwrap_or_default()
}
