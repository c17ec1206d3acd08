//! Frame-stamped synth events.
//!
//! A closed enum of the events the engine understands; timestamps are
//! absolute frame counts on whichever clock the producer runs (the engine
//! rescales to its output clock once, at ingestion).

/// A channel-voice event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    /// 14-bit pitch bend, centered at 0 (−8192..=8191).
    PitchBend { bend: i16 },
}

impl SynthEvent {
    /// Note-on with velocity 0 is a note-off, per MIDI convention.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(self, SynthEvent::NoteOn { velocity, .. } if *velocity > 0)
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self,
            SynthEvent::NoteOff { .. } | SynthEvent::NoteOn { velocity: 0, .. }
        )
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self {
            SynthEvent::NoteOn { note, .. } | SynthEvent::NoteOff { note } => Some(*note),
            SynthEvent::PitchBend { .. } => None,
        }
    }
}

/// An event with its absolute frame timestamp and MIDI channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// Absolute frame count on the producer's clock.
    pub frame_time: u64,
    pub channel: u8,
    pub event: SynthEvent,
}

impl TimedEvent {
    #[inline]
    pub fn note_on(frame_time: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            frame_time,
            channel,
            event: SynthEvent::NoteOn { note, velocity },
        }
    }

    #[inline]
    pub fn note_off(frame_time: u64, channel: u8, note: u8) -> Self {
        Self {
            frame_time,
            channel,
            event: SynthEvent::NoteOff { note },
        }
    }

    #[inline]
    pub fn pitch_bend(frame_time: u64, channel: u8, bend: i16) -> Self {
        Self {
            frame_time,
            channel,
            event: SynthEvent::PitchBend { bend },
        }
    }
}
