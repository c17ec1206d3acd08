//! The synthesizer as an audio hub component.

use ripieno_core::{Message, MessageKind};
use ripieno_synth::{MidiSynth, SynthRunner, MAX_BLOCK_SIZE};
use tracing::info;

use crate::audio_hub::AudioComponent;

/// Hosts a [`SynthRunner`] on the audio hub and reacts to runtime
/// messages: an emergency stop or shutdown releases every voice.
pub struct SynthComponent {
    name: String,
    synth: MidiSynth,
    runner: SynthRunner,
    mix: Vec<f32>,
}

impl SynthComponent {
    pub fn new(name: impl Into<String>, synth: MidiSynth, runner: SynthRunner) -> Self {
        Self {
            name: name.into(),
            synth,
            runner,
            mix: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Control handle for scheduling events into this component's engine.
    pub fn synth(&self) -> MidiSynth {
        self.synth.clone()
    }
}

impl AudioComponent for SynthComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&mut self, msg: &Message) {
        match msg.kind {
            MessageKind::EmergencyStop | MessageKind::Shutdown => {
                // Callback context: release without blocking.
                self.runner.all_notes_off();
            }
            _ => {}
        }
    }

    fn render(&mut self, _frame_time: u64, out: &mut [f32]) {
        let mix = &mut self.mix[..out.len()];
        self.runner.process(mix);
        for (acc, sample) in out.iter_mut().zip(mix.iter()) {
            *acc += sample;
        }
    }
}

/// Log the engine's health counters; call from a control thread.
pub fn log_engine_counters(synth: &MidiSynth) {
    info!(
        underruns = synth.underruns(),
        contentions = synth.contentions(),
        clock = synth.clock_frames(),
        "engine counters"
    );
}
