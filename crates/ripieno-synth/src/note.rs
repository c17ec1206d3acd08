//! Per-note voices.
//!
//! A [`Note`] owns one oscillator and one envelope and consumes its own
//! queue of timed events. Generation walks the output window, splitting
//! it at every event timestamp so state changes land sample-accurately.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::envelope::{Envelope, EnvelopeShape};
use crate::event::{SynthEvent, TimedEvent};
use crate::osc::{note_to_freq, SawOsc, SineOsc};

/// Largest window a single `generate` call may be asked to fill. Scratch
/// buffers are sized to this at construction so the audio path never
/// allocates.
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Which waveform a voice produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    Sine,
    Saw,
    /// Gate voice: a constant velocity-scaled level while the note is
    /// held, zero otherwise. No envelope.
    OnOff,
}

#[derive(Debug)]
enum Voice {
    Sine(SineOsc),
    Saw(SawOsc),
    OnOff { level: f32 },
}

/// One sounding (or pending) note on an instrument.
#[derive(Debug)]
pub struct Note {
    note: u8,
    rate: u32,
    shape: EnvelopeShape,
    voice: Voice,
    bend: i16,
    envelope: Option<Envelope>,
    pending: VecDeque<TimedEvent>,
    env_buf: Vec<f32>,
}

impl Note {
    pub fn new(note: u8, kind: VoiceKind, shape: EnvelopeShape, rate: u32, bend: i16) -> Self {
        let voice = match kind {
            VoiceKind::Sine => Voice::Sine(SineOsc::new()),
            VoiceKind::Saw => Voice::Saw(SawOsc::new()),
            VoiceKind::OnOff => Voice::OnOff { level: 0.0 },
        };
        let env_buf = match voice {
            Voice::OnOff { .. } => Vec::new(),
            _ => vec![0.0; MAX_BLOCK_SIZE],
        };
        Self {
            note,
            rate,
            shape,
            voice,
            bend,
            envelope: None,
            pending: VecDeque::new(),
            env_buf,
        }
    }

    /// Queue an event for this note. Events are expected in
    /// non-decreasing frame order.
    pub fn add_event(&mut self, event: TimedEvent) {
        self.pending.push_back(event);
    }

    fn apply(&mut self, frame_time: u64, event: &SynthEvent) {
        match event {
            SynthEvent::NoteOn { velocity, .. } if *velocity > 0 => {
                let vel = *velocity as f32 / 127.0;
                match &mut self.voice {
                    Voice::OnOff { level } => *level = vel,
                    _ => {
                        // Retrigger from the current level so the output
                        // stays continuous.
                        let start = self
                            .envelope
                            .as_ref()
                            .map(|env| env.level_at(frame_time))
                            .unwrap_or(0.0);
                        self.envelope =
                            Some(Envelope::new(self.shape, frame_time, self.rate, start, vel));
                    }
                }
            }
            SynthEvent::NoteOn { .. } | SynthEvent::NoteOff { .. } => match &mut self.voice {
                Voice::OnOff { level } => *level = 0.0,
                _ => {
                    if let Some(env) = &mut self.envelope {
                        env.release(frame_time);
                    }
                }
            },
            SynthEvent::PitchBend { bend } => self.bend = *bend,
        }
    }

    fn render_segment(&mut self, seg_start: u64, out: &mut [f32]) {
        if out.is_empty() {
            return;
        }
        let freq = note_to_freq(self.note, self.bend);
        match &mut self.voice {
            Voice::OnOff { level } => out.fill(*level),
            Voice::Sine(osc) => match &self.envelope {
                Some(env) => {
                    let ebuf = &mut self.env_buf[..out.len()];
                    if env.generate(seg_start, ebuf) {
                        osc.synth(out, ebuf, freq, self.rate);
                    } else {
                        // Phase still advances through silent segments so
                        // re-reading the stream in different window sizes
                        // yields identical samples.
                        self.envelope = None;
                        osc.skip(out.len() as u64, freq, self.rate);
                        out.fill(0.0);
                    }
                }
                None => {
                    osc.skip(out.len() as u64, freq, self.rate);
                    out.fill(0.0);
                }
            },
            Voice::Saw(osc) => match &self.envelope {
                Some(env) => {
                    let ebuf = &mut self.env_buf[..out.len()];
                    if env.generate(seg_start, ebuf) {
                        osc.synth(out, ebuf, freq, self.rate);
                    } else {
                        self.envelope = None;
                        osc.skip(out.len() as u64, freq, self.rate);
                        out.fill(0.0);
                    }
                }
                None => {
                    osc.skip(out.len() as u64, freq, self.rate);
                    out.fill(0.0);
                }
            },
        }
    }

    /// Fill `out` with this note's samples for the window starting at
    /// `frame_time`, applying queued events at their exact offsets.
    ///
    /// Events stamped before the window start are folded into state
    /// immediately and counted against `underruns`. Returns `false` once
    /// the note is spent and can be pruned.
    pub fn generate(&mut self, frame_time: u64, out: &mut [f32], underruns: &AtomicU64) -> bool {
        assert!(out.len() <= MAX_BLOCK_SIZE);
        let window_end = frame_time + out.len() as u64;
        let mut cursor = 0usize;
        while let Some(evt) = self.pending.front().copied() {
            if evt.frame_time >= window_end {
                break;
            }
            self.pending.pop_front();
            if evt.frame_time < frame_time {
                underruns.fetch_add(1, Ordering::Relaxed);
                self.apply(frame_time, &evt.event);
                continue;
            }
            let offset = (evt.frame_time - frame_time) as usize;
            if offset > cursor {
                self.render_segment(frame_time + cursor as u64, &mut out[cursor..offset]);
                cursor = offset;
            }
            self.apply(evt.frame_time, &evt.event);
        }
        self.render_segment(frame_time + cursor as u64, &mut out[cursor..]);

        self.envelope.is_some()
            || !self.pending.is_empty()
            || matches!(&self.voice, Voice::OnOff { level } if *level != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn counter() -> AtomicU64 {
        AtomicU64::new(0)
    }

    #[test]
    fn test_on_off_segment_split() {
        let mut note = Note::new(60, VoiceKind::OnOff, EnvelopeShape::default(), 1000, 0);
        note.add_event(TimedEvent::note_on(1024, 0, 60, 64));

        let underruns = counter();
        let mut out = [0.0f32; 1000];
        assert!(note.generate(1000, &mut out, &underruns));

        let level = 64.0 / 127.0;
        assert!(out[..24].iter().all(|&s| s == 0.0));
        for &s in &out[24..] {
            assert_abs_diff_eq!(s, level, epsilon = 1e-6_f32);
        }
        assert_eq!(underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_on_off_goes_quiet_and_prunes() {
        let mut note = Note::new(60, VoiceKind::OnOff, EnvelopeShape::default(), 1000, 0);
        note.add_event(TimedEvent::note_on(0, 0, 60, 127));
        note.add_event(TimedEvent::note_off(100, 0, 60));

        let underruns = counter();
        let mut out = [0.0f32; 200];
        // Still alive inside the window that turns it off.
        assert!(!note.generate(0, &mut out, &underruns));
        assert_abs_diff_eq!(out[99], 1.0, epsilon = 1e-6_f32);
        assert_abs_diff_eq!(out[100], 0.0, epsilon = 1e-6_f32);
    }

    #[test]
    fn test_past_event_folds_and_counts_underrun() {
        let mut note = Note::new(60, VoiceKind::OnOff, EnvelopeShape::default(), 1000, 0);
        note.add_event(TimedEvent::note_on(500, 0, 60, 127));

        let underruns = counter();
        let mut out = [0.0f32; 64];
        assert!(note.generate(1000, &mut out, &underruns));
        // Applied from the very first frame of the window.
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6_f32);
        assert_eq!(underruns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_sine_note_lifecycle() {
        let rate = 50;
        let mut note = Note::new(69, VoiceKind::Sine, EnvelopeShape::default(), rate, 0);
        note.add_event(TimedEvent::note_on(0, 0, 69, 127));
        note.add_event(TimedEvent::note_off(20, 0, 69));

        let underruns = counter();
        let mut out = [0.0f32; 64];
        // Window covers attack, decay, sustain and the full 10-frame
        // release, which ends at frame 30.
        assert!(note.generate(0, &mut out, &underruns));
        assert!(out[..30].iter().any(|&s| s != 0.0));
        assert!(out[31..].iter().all(|&s| s == 0.0));

        // Next window: envelope exhausted, nothing pending, prune.
        assert!(!note.generate(64, &mut out, &underruns));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_retrigger_is_continuous() {
        // A sub-audio sawtooth changes slowly enough that any envelope
        // discontinuity at the retrigger point would show as a jump.
        let rate = 48_000;
        let mut note = Note::new(0, VoiceKind::Saw, EnvelopeShape::default(), rate, 0);
        note.add_event(TimedEvent::note_on(0, 0, 0, 127));
        // Retrigger mid-attack.
        note.add_event(TimedEvent::note_on(1024, 0, 0, 127));

        let underruns = counter();
        let mut out = vec![0.0f32; 2048];
        assert!(note.generate(0, &mut out, &underruns));
        let jump = (out[1024] - out[1023]).abs();
        assert!(jump < 0.01, "retrigger jump {jump}");
    }

    #[test]
    fn test_split_reads_match_across_release_end() {
        // A short note whose release tail ends mid-stream, then a
        // retrigger. Reading the stream whole and reading it split right
        // after the tail must produce identical samples, which requires
        // the oscillator phase to advance through silent segments.
        let rate = 1000;
        let events = [
            TimedEvent::note_on(0, 0, 69, 127),
            TimedEvent::note_off(5, 0, 69),
            TimedEvent::note_on(300, 0, 69, 127),
        ];

        let underruns = counter();
        let mut whole_note = Note::new(69, VoiceKind::Sine, EnvelopeShape::default(), rate, 0);
        let mut split_note = Note::new(69, VoiceKind::Sine, EnvelopeShape::default(), rate, 0);
        for evt in events {
            whole_note.add_event(evt);
            split_note.add_event(evt);
        }

        let mut whole = vec![0.0f32; 512];
        whole_note.generate(0, &mut whole, &underruns);

        let mut split = vec![0.0f32; 512];
        split_note.generate(0, &mut split[..250], &underruns);
        split_note.generate(250, &mut split[250..], &underruns);

        assert_eq!(whole, split);
    }

    #[test]
    fn test_pitch_bend_changes_frequency() {
        let rate = 48_000;
        let mut a = Note::new(69, VoiceKind::Sine, EnvelopeShape::default(), rate, 0);
        let mut b = Note::new(69, VoiceKind::Sine, EnvelopeShape::default(), rate, 0);
        a.add_event(TimedEvent::note_on(0, 0, 69, 127));
        b.add_event(TimedEvent::pitch_bend(0, 0, 8192));
        b.add_event(TimedEvent::note_on(0, 0, 69, 127));

        let underruns = counter();
        let mut out_a = [0.0f32; 256];
        let mut out_b = [0.0f32; 256];
        a.generate(0, &mut out_a, &underruns);
        b.generate(0, &mut out_b, &underruns);
        assert!(out_a.iter().zip(&out_b).any(|(x, y)| (x - y).abs() > 1e-3));
    }
}
