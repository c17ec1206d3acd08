//! Realtime MIDI synthesis engine.
//!
//! Events are scheduled on an input clock, rescaled once at ingestion,
//! queued in a delta-encoded list, and rendered sample-accurately by
//! per-note voices with precomputed envelopes. The audio-side API never
//! blocks and never allocates in the steady state.
//!
//! ```no_run
//! use ripieno_synth::{
//!     AudioConfig, EnvelopeShape, InstrumentBank, MidiSynth, SynthError, TimedEvent, VoiceKind,
//! };
//!
//! # fn main() -> Result<(), SynthError> {
//! let (synth, mut runner) = MidiSynth::new(AudioConfig::new(48_000, 48_000));
//! let mut bank = InstrumentBank::new(synth.config());
//! bank.set_instrument(0, VoiceKind::Sine, EnvelopeShape::default());
//! let bank = synth.add_bank(bank);
//!
//! synth.add_events(bank, &[TimedEvent::note_on(4800, 0, 69, 100)])?;
//!
//! // In the audio callback:
//! let mut out = [0.0f32; 512];
//! runner.process(&mut out);
//! # Ok(())
//! # }
//! ```

pub mod deltalist;
pub mod envelope;
pub mod error;
pub mod event;
pub mod instrument;
pub mod note;
pub mod osc;
pub mod player;
pub mod synth;

pub use deltalist::{DeltaEvent, DeltaList, SharedDeltaList};
pub use envelope::{Envelope, EnvelopeShape};
pub use error::SynthError;
pub use event::{SynthEvent, TimedEvent};
pub use instrument::{AudioConfig, Instrument, InstrumentBank};
pub use note::{Note, VoiceKind, MAX_BLOCK_SIZE};
pub use osc::{note_to_freq, SawOsc, SineOsc};
pub use player::MidiPlayer;
pub use synth::{MidiSynth, SynthRunner};
