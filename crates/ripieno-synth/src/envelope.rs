//! ADSR amplitude envelopes.
//!
//! The whole attack and decay curve is computed up front when a note
//! starts, and the release curve is computed when the note is released,
//! so the audio callback only ever copies slices or fills constants.
//! Retriggering an active note starts the new attack from the envelope's
//! instantaneous level, which keeps the output continuous.

/// Envelope curve parameters. Times are in seconds, levels in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    pub attack_level: f32,
    pub attack_time: f32,
    pub decay_time: f32,
    pub sustain_level: f32,
    pub release_time: f32,
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self {
            attack_level: 1.0,
            attack_time: 0.1,
            decay_time: 0.2,
            sustain_level: 0.9,
            release_time: 0.2,
        }
    }
}

/// Push `n` evenly spaced values from `from` to `to` inclusive.
fn linspace(from: f32, to: f32, n: usize, out: &mut Vec<f32>) {
    match n {
        0 => {}
        1 => out.push(from),
        _ => {
            let step = (to - from) / (n - 1) as f32;
            for i in 0..n {
                out.push(from + step * i as f32);
            }
        }
    }
}

/// One chunk of envelope output within a generation window.
enum Chunk<'a> {
    /// Copy these precomputed samples.
    Slice(&'a [f32]),
    /// This many samples at a constant level (sustain).
    Fill(f32, usize),
    /// The envelope has nothing left to produce.
    Done,
}

/// A single note's amplitude envelope, anchored at an absolute frame.
#[derive(Debug)]
pub struct Envelope {
    shape: EnvelopeShape,
    start_frame: u64,
    velocity: f32,
    rate: u32,
    /// Attack plus decay curve, scaled by velocity.
    head: Vec<f32>,
    /// Release curve; empty until [`release`](Self::release).
    tail: Vec<f32>,
    /// Frames from `start_frame` at which the release began.
    release_offset: Option<u64>,
}

impl Envelope {
    /// Start an envelope at `start_frame`, ramping from `start_level` (the
    /// instantaneous level of whatever this envelope replaces, or 0.0 for
    /// a fresh note) toward the velocity-scaled attack peak.
    pub fn new(
        shape: EnvelopeShape,
        start_frame: u64,
        rate: u32,
        start_level: f32,
        velocity: f32,
    ) -> Self {
        let attack_frames = (shape.attack_time * rate as f32).round() as usize;
        let decay_frames = (shape.decay_time * rate as f32).round() as usize;
        let peak = shape.attack_level * velocity;
        let sustain = shape.sustain_level * velocity;

        let mut head = Vec::with_capacity(attack_frames + decay_frames);
        linspace(start_level, peak, attack_frames, &mut head);
        linspace(peak, sustain, decay_frames, &mut head);

        Self {
            shape,
            start_frame,
            velocity,
            rate,
            head,
            tail: Vec::new(),
            release_offset: None,
        }
    }

    /// The envelope's instantaneous level at an absolute frame time.
    pub fn level_at(&self, frame_time: u64) -> f32 {
        let elapsed = frame_time.saturating_sub(self.start_frame) as usize;
        if let Some(off) = self.release_offset {
            let off = off as usize;
            if elapsed >= off {
                return self.tail.get(elapsed - off).copied().unwrap_or(0.0);
            }
        }
        if elapsed < self.head.len() {
            self.head[elapsed]
        } else {
            self.shape.sustain_level * self.velocity
        }
    }

    /// Begin the release ramp at `frame_time`, from whatever level the
    /// envelope holds there. A second release is ignored.
    pub fn release(&mut self, frame_time: u64) {
        if self.release_offset.is_some() {
            return;
        }
        let elapsed = frame_time.saturating_sub(self.start_frame);
        let from = self.level_at(frame_time);
        let release_frames = (self.shape.release_time * self.rate as f32).round() as usize;
        linspace(from, 0.0, release_frames, &mut self.tail);
        self.release_offset = Some(elapsed);
    }

    fn chunk(&self, frame_time: u64, frames: usize) -> Chunk<'_> {
        let elapsed = frame_time.saturating_sub(self.start_frame) as usize;
        if let Some(off) = self.release_offset {
            let off = off as usize;
            if elapsed >= off {
                let offset = elapsed - off;
                if offset >= self.tail.len() {
                    return Chunk::Done;
                }
                let end = (offset + frames).min(self.tail.len());
                return Chunk::Slice(&self.tail[offset..end]);
            }
        }
        if elapsed >= self.head.len() {
            let mut count = frames;
            if let Some(off) = self.release_offset {
                count = count.min(off as usize - elapsed);
            }
            return Chunk::Fill(self.shape.sustain_level * self.velocity, count);
        }
        let mut end = (elapsed + frames).min(self.head.len());
        if let Some(off) = self.release_offset {
            end = end.min(off as usize);
        }
        Chunk::Slice(&self.head[elapsed..end])
    }

    /// Fill `out` with envelope levels for the window starting at
    /// `frame_time`. Returns `false` when the envelope produced nothing at
    /// all (fully released before the window), in which case `out` is
    /// untouched; a window that straddles the end of the release is
    /// zero-padded and still returns `true`.
    pub fn generate(&self, frame_time: u64, out: &mut [f32]) -> bool {
        let mut filled = 0;
        while filled < out.len() {
            match self.chunk(frame_time + filled as u64, out.len() - filled) {
                Chunk::Done => {
                    if filled == 0 {
                        return false;
                    }
                    out[filled..].fill(0.0);
                    return true;
                }
                Chunk::Slice(values) => {
                    out[filled..filled + values.len()].copy_from_slice(values);
                    filled += values.len();
                }
                Chunk::Fill(level, count) => {
                    out[filled..filled + count].fill(level);
                    filled += count;
                }
            }
        }
        true
    }
}
