//! Phase-accumulating oscillators.
//!
//! Phase is carried in f64 and wrapped every sample, so long notes do not
//! drift. Each `synth` call multiplies the raw waveform by a matching
//! envelope slice and writes the product into the output window.

use std::f64::consts::PI;

/// Frequency of a MIDI note number with a 14-bit pitch bend applied.
/// 8192 bend units are one semitone.
pub fn note_to_freq(note: u8, bend: i16) -> f64 {
    let semitones = note as f64 - 69.0 + bend as f64 / 8192.0;
    440.0 * (semitones / 12.0).exp2()
}

/// Sine oscillator; phase wraps modulo 2π.
#[derive(Debug, Default, Clone)]
pub struct SineOsc {
    phase: f64,
}

impl SineOsc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `out.len()` samples at `freq`, scaled samplewise by `env`.
    pub fn synth(&mut self, out: &mut [f32], env: &[f32], freq: f64, rate: u32) {
        debug_assert_eq!(out.len(), env.len());
        let step = 2.0 * PI * freq / rate as f64;
        for (sample, level) in out.iter_mut().zip(env) {
            self.phase = (self.phase + step) % (2.0 * PI);
            *sample = self.phase.sin() as f32 * level;
        }
    }

    /// Advance the phase as if `frames` samples had been rendered.
    /// Steps one sample at a time so the phase matches `synth` bit for bit.
    pub fn skip(&mut self, frames: u64, freq: f64, rate: u32) {
        let step = 2.0 * PI * freq / rate as f64;
        for _ in 0..frames {
            self.phase = (self.phase + step) % (2.0 * PI);
        }
    }
}

/// Descending sawtooth; phase wraps modulo 2, samples span (-1, 1].
#[derive(Debug, Default, Clone)]
pub struct SawOsc {
    phase: f64,
}

impl SawOsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synth(&mut self, out: &mut [f32], env: &[f32], freq: f64, rate: u32) {
        debug_assert_eq!(out.len(), env.len());
        let step = 2.0 * freq / rate as f64;
        for (sample, level) in out.iter_mut().zip(env) {
            self.phase = (self.phase + step) % 2.0;
            *sample = (1.0 - self.phase) as f32 * level;
        }
    }

    pub fn skip(&mut self, frames: u64, freq: f64, rate: u32) {
        let step = 2.0 * freq / rate as f64;
        for _ in 0..frames {
            self.phase = (self.phase + step) % 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_note_to_freq() {
        assert_abs_diff_eq!(note_to_freq(69, 0), 440.0, epsilon = 1e-9);
        assert_abs_diff_eq!(note_to_freq(81, 0), 880.0, epsilon = 1e-9);
        assert_abs_diff_eq!(note_to_freq(60, 0), 261.625_565_300_6, epsilon = 1e-6);
        // A full positive bend raises the note by one semitone.
        assert_abs_diff_eq!(note_to_freq(69, 8192), note_to_freq(70, 0), epsilon = 1e-9);
        assert_abs_diff_eq!(note_to_freq(69, -8192), note_to_freq(68, 0), epsilon = 1e-9);
    }

    #[test]
    fn test_sine_phase_increments_before_sampling() {
        let mut osc = SineOsc::new();
        let mut out = [0.0f32; 4];
        let env = [1.0f32; 4];
        // freq = rate/4 puts one sample per quarter cycle.
        osc.synth(&mut out, &env, 100.0, 400);
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6_f32); // sin(π/2)
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-6_f32); // sin(π)
        assert_abs_diff_eq!(out[2], -1.0, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[3], 0.0, epsilon = 1e-6_f32);
    }

    #[test]
    fn test_sine_skip_matches_synth() {
        let mut a = SineOsc::new();
        let mut b = SineOsc::new();
        let mut sink = [0.0f32; 128];
        let env = [1.0f32; 128];
        a.synth(&mut sink, &env, 440.0, 48_000);
        b.skip(128, 440.0, 48_000);

        let mut next_a = [0.0f32; 8];
        let mut next_b = [0.0f32; 8];
        a.synth(&mut next_a, &env[..8], 440.0, 48_000);
        b.synth(&mut next_b, &env[..8], 440.0, 48_000);
        // Skipping must leave the phase exactly where rendering would.
        for (x, y) in next_a.iter().zip(&next_b) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_saw_ramp() {
        let mut osc = SawOsc::new();
        let mut out = [0.0f32; 4];
        let env = [1.0f32; 4];
        // One full cycle over 4 samples: phase steps of 0.5 (mod 2).
        osc.synth(&mut out, &env, 100.0, 400);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[2], -0.5, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[3], 1.0, epsilon = 1e-6_f32); // wrapped
    }

    #[test]
    fn test_envelope_scales_output() {
        let mut osc = SineOsc::new();
        let mut out = [0.0f32; 2];
        let env = [0.5f32, 0.0];
        osc.synth(&mut out, &env, 100.0, 400);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-6_f32);
    }
}
