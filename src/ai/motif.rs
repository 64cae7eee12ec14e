//! Cinematic motif mix derived from threat-driven intensity.
//!
//! Only the active motif emits. Emission, music pitch and volume all scale
//! linearly with intensity.

use serde::{Deserialize, Serialize};

use crate::curve::{clamp01, lerp};

pub const MIN_EMISSION: f32 = 10.0;
pub const MAX_EMISSION: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motif {
    #[default]
    Storm,
    Calm,
    Cosmic,
    Oracle,
}

impl Motif {
    pub const ALL: [Motif; 4] = [Motif::Storm, Motif::Calm, Motif::Cosmic, Motif::Oracle];

    pub fn emission_scale(&self) -> f32 {
        match self {
            Motif::Storm => 1.0,
            Motif::Calm => 0.5,
            Motif::Cosmic => 0.8,
            Motif::Oracle => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotifMix {
    pub motif: Motif,
    pub intensity: f32,
    pub emission_rate: f32, // particles/s of the active motif
    pub music_pitch: f32,
    pub music_volume: f32,
}

impl MotifMix {
    pub fn new(motif: Motif, intensity: f32) -> Self {
        let i = clamp01(intensity);
        Self {
            motif,
            intensity: i,
            emission_rate: lerp(MIN_EMISSION, MAX_EMISSION, i) * motif.emission_scale(),
            music_pitch: lerp(0.95, 1.08, i),
            music_volume: lerp(0.6, 1.0, i),
        }
    }

    /// Emission for any motif; zero unless it is the active one.
    pub fn emission_for(&self, motif: Motif) -> f32 {
        if motif == self.motif { self.emission_rate } else { 0.0 }
    }
}

impl Default for MotifMix {
    fn default() -> Self {
        Self::new(Motif::Storm, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storm_at_full_intensity() {
        let mix = MotifMix::new(Motif::Storm, 1.0);
        assert_eq!(mix.emission_rate, 200.0);
        assert!((mix.music_pitch - 1.08).abs() < 1e-6);
        assert_eq!(mix.music_volume, 1.0);
    }

    #[test]
    fn calm_is_scaled_and_only_active_emits() {
        let mix = MotifMix::new(Motif::Calm, 0.0);
        assert_eq!(mix.emission_rate, 5.0);
        assert_eq!(mix.emission_for(Motif::Calm), 5.0);
        for other in Motif::ALL.into_iter().filter(|m| *m != Motif::Calm) {
            assert_eq!(mix.emission_for(other), 0.0);
        }
    }

    #[test]
    fn intensity_is_clamped() {
        let mix = MotifMix::new(Motif::Oracle, 7.0);
        assert_eq!(mix.intensity, 1.0);
        assert!((mix.emission_rate - 120.0).abs() < 1e-4);
        assert_eq!(MotifMix::new(Motif::Cosmic, -1.0).music_volume, 0.6);
    }
}
