//! The MIDI synthesis engine.
//!
//! [`MidiSynth::new`] returns a pair: a cloneable control handle for
//! ordinary threads and a [`SynthRunner`] for the audio callback. The two
//! sides share the bank list and the future event queue through mutexes;
//! the runner only ever tries those locks, filling silence and bumping a
//! counter when a producer holds one, so `process` never blocks and never
//! allocates in the steady state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::deltalist::{DeltaEvent, SharedDeltaList};
use crate::error::SynthError;
use crate::event::TimedEvent;
use crate::instrument::{AudioConfig, InstrumentBank};
use crate::note::MAX_BLOCK_SIZE;

/// Preallocated capacity for events in flight between queue and banks.
const EVENT_CAPACITY: usize = 1024;

/// An event bound for one bank, carried through the delta list.
#[derive(Debug, Clone, Copy)]
struct RoutedEvent {
    bank: usize,
    event: TimedEvent,
}

struct Shared {
    config: AudioConfig,
    banks: Mutex<Vec<InstrumentBank>>,
    pending: SharedDeltaList<RoutedEvent>,
    /// Output frames rendered so far.
    clock: AtomicU64,
    underruns: AtomicU64,
    bank_contentions: AtomicU64,
}

/// Control handle: scheduling, bank management and counters. Clone
/// freely; all methods may block briefly on a mutex and must not be
/// called from the audio callback.
#[derive(Clone)]
pub struct MidiSynth {
    shared: Arc<Shared>,
}

/// The realtime side of the engine. Owned by whoever drives the audio
/// callback; not cloneable.
pub struct SynthRunner {
    shared: Arc<Shared>,
    due: Vec<DeltaEvent<RoutedEvent>>,
    /// Events popped from the queue while the bank list was contended.
    backlog: VecDeque<RoutedEvent>,
    scratch: Vec<f32>,
    /// Frames not yet ticked through the queue because of contention.
    carry: u64,
}

impl MidiSynth {
    pub fn new(config: AudioConfig) -> (MidiSynth, SynthRunner) {
        let shared = Arc::new(Shared {
            config,
            banks: Mutex::new(Vec::new()),
            pending: SharedDeltaList::new(),
            clock: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            bank_contentions: AtomicU64::new(0),
        });
        let runner = SynthRunner {
            shared: Arc::clone(&shared),
            due: Vec::with_capacity(EVENT_CAPACITY),
            backlog: VecDeque::with_capacity(EVENT_CAPACITY),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            carry: 0,
        };
        (MidiSynth { shared }, runner)
    }

    pub fn config(&self) -> AudioConfig {
        self.shared.config
    }

    /// Output frames rendered since the engine started.
    pub fn clock_frames(&self) -> u64 {
        self.shared.clock.load(Ordering::Acquire)
    }

    /// Append a bank and return its index for event routing.
    pub fn add_bank(&self, bank: InstrumentBank) -> usize {
        let mut banks = self.shared.banks.lock();
        banks.push(bank);
        banks.len() - 1
    }

    /// Mutate a bank in place (for instance to assign instruments after
    /// the engine is running).
    pub fn with_bank<F>(&self, index: usize, f: F) -> Result<(), SynthError>
    where
        F: FnOnce(&mut InstrumentBank),
    {
        let mut banks = self.shared.banks.lock();
        let bank = banks.get_mut(index).ok_or(SynthError::UnknownBank(index))?;
        f(bank);
        Ok(())
    }

    /// Schedule events for a bank. Timestamps are on the input clock and
    /// are rescaled to the output clock here, once; an event stamped
    /// before the current engine clock is queued for immediate delivery
    /// and will be counted as an underrun when it lands.
    pub fn add_events(&self, bank: usize, events: &[TimedEvent]) -> Result<(), SynthError> {
        if bank >= self.shared.banks.lock().len() {
            return Err(SynthError::UnknownBank(bank));
        }
        let clock = self.shared.clock.load(Ordering::Acquire);
        let config = self.shared.config;
        self.shared.pending.add_events(events.iter().map(|evt| {
            let frame_time = config.rescale(evt.frame_time);
            if frame_time < clock {
                debug!(frame_time, clock, "event stamped in the past");
            }
            let delay = frame_time.saturating_sub(clock);
            (
                delay,
                RoutedEvent {
                    bank,
                    event: TimedEvent { frame_time, ..*evt },
                },
            )
        }));
        Ok(())
    }

    /// Release every voice in every bank at the current clock.
    pub fn all_notes_off(&self) {
        let clock = self.shared.clock.load(Ordering::Acquire);
        let mut banks = self.shared.banks.lock();
        for bank in banks.iter_mut() {
            bank.release_all(clock);
        }
    }

    /// Events that arrived late at a voice.
    pub fn underruns(&self) -> u64 {
        self.shared.underruns.load(Ordering::Relaxed)
    }

    /// Audio callbacks that hit a contended lock and rendered silence.
    pub fn contentions(&self) -> u64 {
        self.shared.pending.contentions() + self.shared.bank_contentions.load(Ordering::Relaxed)
    }
}

impl SynthRunner {
    /// Render one window of mono output. Realtime-safe: locks are only
    /// tried, nothing blocks, and no allocation happens unless the event
    /// backlog outgrows its preallocated capacity.
    pub fn process(&mut self, out: &mut [f32]) {
        assert!(out.len() <= MAX_BLOCK_SIZE);
        out.fill(0.0);
        let frames = out.len() as u64;
        let clock = self.shared.clock.load(Ordering::Acquire);

        self.due.clear();
        // Frames skipped on a contended tick are carried so queued events
        // keep their absolute positions.
        if self.shared.pending.try_clock_tick(self.carry + frames, &mut self.due) {
            self.carry = 0;
        } else {
            self.carry += frames;
        }

        match self.shared.banks.try_lock() {
            Some(mut banks) => {
                while let Some(routed) = self.backlog.pop_front() {
                    if let Some(bank) = banks.get_mut(routed.bank) {
                        bank.add_event(routed.event);
                    }
                }
                for due in self.due.drain(..) {
                    if let Some(bank) = banks.get_mut(due.payload.bank) {
                        bank.add_event(due.payload.event);
                    }
                }
                for bank in banks.iter_mut() {
                    bank.generate(clock, out, &mut self.scratch, &self.shared.underruns);
                }
            }
            None => {
                self.shared.bank_contentions.fetch_add(1, Ordering::Relaxed);
                for due in self.due.drain(..) {
                    self.backlog.push_back(due.payload);
                }
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.shared.clock.store(clock + frames, Ordering::Release);
    }

    /// Non-blocking all-notes-off for use from the callback thread. A
    /// contended bank list is skipped and counted.
    pub fn all_notes_off(&mut self) {
        match self.shared.banks.try_lock() {
            Some(mut banks) => {
                let clock = self.shared.clock.load(Ordering::Acquire);
                for bank in banks.iter_mut() {
                    bank.release_all(clock);
                }
            }
            None => {
                self.shared.bank_contentions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
