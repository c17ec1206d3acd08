//! # Ripieno - Component Runtime and MIDI Synthesis Engine
//!
//! A message-passing runtime for mixed-context applications plus a
//! realtime synthesizer that lives inside it.
//!
//! ## Architecture
//!
//! Ripieno is an umbrella crate that coordinates:
//! - **ripieno-core** - Component/hub runtime (app queue, thread hubs,
//!   wire codec, affinity)
//! - **ripieno-synth** - MIDI synthesis engine (delta-list scheduling,
//!   ADSR envelopes, phase-accumulation voices)
//!
//! plus the glue only the combination needs: the realtime
//! [`AudioHub`] and the [`SynthComponent`] hosting the engine on it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ripieno::{App, AudioConfig, AudioHub, InstrumentBank, MidiSynth, SynthComponent};
//! use ripieno::{EnvelopeShape, TimedEvent, VoiceKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = App::new();
//! let workers = app.add_thread_hub("worker")?;
//!
//! let (audio, mut driver) = AudioHub::new("audio", app.sender());
//! app.register_hub(Box::new(audio.clone()))?;
//!
//! let (synth, runner) = MidiSynth::new(AudioConfig::new(48_000, 48_000));
//! let mut bank = InstrumentBank::new(synth.config());
//! bank.set_instrument(0, VoiceKind::Sine, EnvelopeShape::default());
//! let bank = synth.add_bank(bank);
//! audio.add_component(Box::new(SynthComponent::new("synth", synth.clone(), runner)));
//!
//! // Any thread schedules notes through the handle; the audio backend
//! // drives the hub from its callback.
//! synth.add_events(bank, &[TimedEvent::note_on(4800, 0, 69, 100)])?;
//! let mut buffer = [0.0f32; 256];
//! driver.render(&mut buffer);
//!
//! let _ = workers;
//! app.run();
//! # Ok(())
//! # }
//! ```

pub mod audio_hub;
pub mod synth_component;

/// Re-export of ripieno-core for direct access
pub use ripieno_core as core;
/// Re-export of ripieno-synth for direct access
pub use ripieno_synth as synth;

// Runtime types
pub use ripieno_core::{
    App, AppSender, Affinity, Component, ComponentHandle, Error, HubContext, HubHandle, HubPort,
    Message, MessageKind, Result, ThreadHub, WireError,
};

// Engine types
pub use ripieno_synth::{
    AudioConfig, EnvelopeShape, InstrumentBank, MidiPlayer, MidiSynth, SynthError, SynthEvent,
    SynthRunner, TimedEvent, VoiceKind,
};

pub use audio_hub::{AudioComponent, AudioHub, AudioHubDriver};
pub use synth_component::{log_engine_counters, SynthComponent};
