//! Score playback.
//!
//! A [`MidiPlayer`] holds a sorted score and feeds it to the engine in
//! slices just ahead of the rolling clock, so arbitrarily long scores
//! never sit in the realtime queue all at once.

use crate::event::TimedEvent;
use crate::error::SynthError;
use crate::synth::MidiSynth;

/// Streams a score of input-clock events into a [`MidiSynth`] bank.
pub struct MidiPlayer {
    synth: MidiSynth,
    bank: usize,
    score: Vec<TimedEvent>,
    cursor: usize,
    batch: Vec<TimedEvent>,
}

impl MidiPlayer {
    /// The score is sorted by timestamp (stable, so simultaneous events
    /// keep their authored order).
    pub fn new(synth: MidiSynth, bank: usize, mut score: Vec<TimedEvent>) -> Self {
        score.sort_by_key(|evt| evt.frame_time);
        Self {
            synth,
            bank,
            score,
            cursor: 0,
            batch: Vec::new(),
        }
    }

    /// The engine clock expressed in input frames.
    fn clock_in(&self) -> u64 {
        let config = self.synth.config();
        let out = self.synth.clock_frames();
        if config.in_rate == config.out_rate {
            out
        } else {
            (out as f64 * config.in_rate as f64 / config.out_rate as f64).round() as u64
        }
    }

    /// Schedule every score event due within `horizon` input frames of
    /// the current clock. Returns the number of events handed over; call
    /// this periodically from a control thread.
    pub fn pump(&mut self, horizon: u64) -> Result<usize, SynthError> {
        let until = self.clock_in().saturating_add(horizon);
        self.batch.clear();
        while let Some(evt) = self.score.get(self.cursor) {
            if evt.frame_time >= until {
                break;
            }
            self.batch.push(*evt);
            self.cursor += 1;
        }
        if !self.batch.is_empty() {
            self.synth.add_events(self.bank, &self.batch)?;
        }
        Ok(self.batch.len())
    }

    /// True once the whole score has been handed to the engine.
    pub fn finished(&self) -> bool {
        self.cursor == self.score.len()
    }

    /// Input frames until the last score event, from the current clock.
    pub fn remaining_frames(&self) -> u64 {
        self.score
            .last()
            .map(|evt| evt.frame_time.saturating_sub(self.clock_in()))
            .unwrap_or(0)
    }
}
