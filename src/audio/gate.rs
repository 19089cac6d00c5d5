//! Noise gate and peak normalization
//!
//! The sender drops near-silent chunks entirely (no datagram for dead
//! air) and peak-normalizes the rest so playback is loud and consistent
//! without clipping. The ceiling sits below `i16::MAX` on purpose: the
//! headroom absorbs the rounding of the scale factor.

/// Mean absolute sample magnitude, the chunk's energy estimate
pub fn mean_abs(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|s| (*s as i32).unsigned_abs() as u64).sum();
    sum as f32 / samples.len() as f32
}

/// Outcome of gating one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Energy at or below the threshold; nothing is transmitted
    Silent,
    /// Voiced chunk, peak-normalized and ready to transmit
    Voiced(Vec<i16>),
}

/// Amplitude-threshold gate with peak normalization
#[derive(Debug, Clone, Copy)]
pub struct NoiseGate {
    threshold: f32,
    ceiling: i16,
}

impl NoiseGate {
    pub fn new(threshold: f32, ceiling: i16) -> Self {
        Self { threshold, ceiling }
    }

    /// Gate one chunk
    ///
    /// Voiced chunks are scaled so their maximum magnitude maps to the
    /// ceiling. Quiet-but-voiced chunks are amplified by the same rule.
    pub fn process(&self, samples: &[i16]) -> GateDecision {
        if mean_abs(samples) <= self.threshold {
            return GateDecision::Silent;
        }

        let peak = samples
            .iter()
            .map(|s| (*s as i32).unsigned_abs())
            .max()
            .unwrap_or(0)
            .max(1);
        let factor = self.ceiling as f32 / peak as f32;

        let normalized = samples
            .iter()
            .map(|s| (*s as f32 * factor) as i16)
            .collect();

        GateDecision::Voiced(normalized)
    }
}
