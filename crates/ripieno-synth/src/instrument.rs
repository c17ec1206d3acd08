//! Instruments and channel banks.
//!
//! An [`Instrument`] maps note numbers to live [`Note`] voices and mixes
//! them; an [`InstrumentBank`] maps MIDI channels to instruments. Spent
//! voices are pruned as soon as generation reports them inaudible.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;

use crate::envelope::EnvelopeShape;
use crate::event::{SynthEvent, TimedEvent};
use crate::note::{Note, VoiceKind};

/// Sample rates for the engine: events arrive stamped on `in_rate`, audio
/// is produced at `out_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub in_rate: u32,
    pub out_rate: u32,
}

impl AudioConfig {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self { in_rate, out_rate }
    }

    /// Rescale an input-clock frame timestamp to the output clock.
    /// Identity when the rates match.
    pub fn rescale(&self, frame_time: u64) -> u64 {
        if self.in_rate == self.out_rate {
            frame_time
        } else {
            (frame_time as f64 * self.out_rate as f64 / self.in_rate as f64).round() as u64
        }
    }
}

/// A polyphonic voice set for one MIDI channel.
#[derive(Debug)]
pub struct Instrument {
    kind: VoiceKind,
    shape: EnvelopeShape,
    rate: u32,
    notes: BTreeMap<u8, Note>,
    /// Last seen pitch bend, inherited by voices created later.
    bend: i16,
}

impl Instrument {
    pub fn new(kind: VoiceKind, shape: EnvelopeShape, rate: u32) -> Self {
        Self {
            kind,
            shape,
            rate,
            notes: BTreeMap::new(),
            bend: 0,
        }
    }

    pub fn voices(&self) -> usize {
        self.notes.len()
    }

    /// Route an event to the voice it names. A note-on creates the voice
    /// if needed; a pitch bend fans out to every live voice and is
    /// remembered for future ones; a note-off for a dead voice is dropped.
    pub fn add_event(&mut self, event: TimedEvent) {
        match event.event {
            SynthEvent::PitchBend { bend } => {
                self.bend = bend;
                for note in self.notes.values_mut() {
                    note.add_event(event);
                }
            }
            ref ev => {
                let number = ev.note().unwrap_or_default();
                if ev.is_note_on() {
                    self.notes
                        .entry(number)
                        .or_insert_with(|| {
                            Note::new(number, self.kind, self.shape, self.rate, self.bend)
                        })
                        .add_event(event);
                } else if let Some(note) = self.notes.get_mut(&number) {
                    note.add_event(event);
                }
            }
        }
    }

    /// Release every live voice at `frame_time`.
    pub fn release_all(&mut self, frame_time: u64) {
        for (&number, note) in self.notes.iter_mut() {
            note.add_event(TimedEvent::note_off(frame_time, 0, number));
        }
    }

    /// Mix all voices into `out`, which must be zero-filled on entry.
    /// `scratch` is a per-voice staging buffer at least as long as `out`.
    pub fn generate(
        &mut self,
        frame_time: u64,
        out: &mut [f32],
        scratch: &mut [f32],
        underruns: &AtomicU64,
    ) {
        let scratch = &mut scratch[..out.len()];
        self.notes.retain(|_, note| {
            scratch.fill(0.0);
            let alive = note.generate(frame_time, scratch, underruns);
            for (acc, s) in out.iter_mut().zip(scratch.iter()) {
                *acc += s;
            }
            alive
        });
    }
}

/// Instruments addressed by MIDI channel, sharing one output clock.
#[derive(Debug)]
pub struct InstrumentBank {
    config: AudioConfig,
    instruments: BTreeMap<u8, Instrument>,
}

impl InstrumentBank {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            instruments: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Assign an instrument to a channel, replacing any previous one.
    pub fn set_instrument(&mut self, channel: u8, kind: VoiceKind, shape: EnvelopeShape) {
        self.instruments
            .insert(channel, Instrument::new(kind, shape, self.config.out_rate));
    }

    pub fn instrument(&self, channel: u8) -> Option<&Instrument> {
        self.instruments.get(&channel)
    }

    /// Route an output-clock event to its channel. Events for channels
    /// with no instrument are dropped.
    pub fn add_event(&mut self, event: TimedEvent) {
        if let Some(instrument) = self.instruments.get_mut(&event.channel) {
            instrument.add_event(event);
        }
    }

    pub fn release_all(&mut self, frame_time: u64) {
        for instrument in self.instruments.values_mut() {
            instrument.release_all(frame_time);
        }
    }

    /// Mix every instrument into `out` (additive; `out` is not cleared).
    pub fn generate(
        &mut self,
        frame_time: u64,
        out: &mut [f32],
        scratch: &mut [f32],
        underruns: &AtomicU64,
    ) {
        for instrument in self.instruments.values_mut() {
            instrument.generate(frame_time, out, scratch, underruns);
        }
    }
}
