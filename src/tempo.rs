//! Host tempo and musical note divisions for tempo-synced effects.

use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// Tempo supplied by the host transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tempo {
    /// Beats (quarter notes) per minute.
    pub bpm: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo { bpm: 120.0 }
    }
}

impl Tempo {
    pub fn new(bpm: f64) -> Self {
        Tempo {
            bpm: if bpm.is_finite() { bpm.clamp(20.0, 400.0) } else { 120.0 },
        }
    }

    /// Length of one beat in seconds.
    pub fn beat_seconds(&self) -> f64 {
        60.0 / self.bpm
    }
}

/// Division modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feel {
    Straight,
    Triplet,
    Dotted,
}

/// A note length such as `1/8`, `1/8t` (triplet) or `1/4d` (dotted).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteDivision {
    /// Denominator of the note value (4 = quarter note).
    pub denominator: u32,
    pub feel: Feel,
}

impl NoteDivision {
    pub const QUARTER: NoteDivision = NoteDivision {
        denominator: 4,
        feel: Feel::Straight,
    };

    /// Parse `"1/16"`, `"1/8t"`, `"1/4d"` and the like.
    pub fn parse(text: &str) -> Result<Self, FxError> {
        let text = text.trim();
        let (body, feel) = match text.chars().last() {
            Some('t') | Some('T') => (&text[..text.len() - 1], Feel::Triplet),
            Some('d') | Some('D') => (&text[..text.len() - 1], Feel::Dotted),
            _ => (text, Feel::Straight),
        };
        let denominator = body
            .strip_prefix("1/")
            .and_then(|d| d.parse::<u32>().ok())
            .filter(|d| d.is_power_of_two() && *d <= 64)
            .ok_or_else(|| FxError::validation(format!("invalid note division '{text}'")))?;
        Ok(NoteDivision { denominator, feel })
    }

    /// Length in beats (quarter notes).
    pub fn beats(&self) -> f64 {
        let straight = 4.0 / self.denominator as f64;
        match self.feel {
            Feel::Straight => straight,
            Feel::Triplet => straight * 2.0 / 3.0,
            Feel::Dotted => straight * 1.5,
        }
    }

    pub fn seconds(&self, tempo: Tempo) -> f64 {
        self.beats() * tempo.beat_seconds()
    }

    /// Rate in Hz of a cycle lasting one division.
    pub fn hz(&self, tempo: Tempo) -> f64 {
        1.0 / self.seconds(tempo)
    }
}
