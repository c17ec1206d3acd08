//! Delta-encoded future event queue.
//!
//! Each queued entry stores the frame delay from its predecessor rather
//! than an absolute timestamp, so advancing the clock only touches the
//! head of the queue. The shared variant wraps the list in a mutex with a
//! non-blocking consumer side for use from an audio callback.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// An entry as returned by [`DeltaList::clock_tick`]: `frame_delay` is the
/// offset from the start of the elapsed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEvent<T> {
    pub frame_delay: u64,
    pub payload: T,
}

/// An ordered queue of future events, delta-encoded by frame delay.
#[derive(Debug)]
pub struct DeltaList<T> {
    events: VecDeque<DeltaEvent<T>>,
}

impl<T> Default for DeltaList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeltaList<T> {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Insert an event `frame_delay` frames in the future.
    ///
    /// The scan uses strict less-than, so an event inserted at the same
    /// delay as an existing one lands after it: ties keep insertion order.
    pub fn add_event(&mut self, mut frame_delay: u64, payload: T) {
        for idx in 0..self.events.len() {
            let existing = self.events[idx].frame_delay;
            if frame_delay < existing {
                self.events[idx].frame_delay = existing - frame_delay;
                self.events.insert(idx, DeltaEvent {
                    frame_delay,
                    payload,
                });
                return;
            }
            frame_delay -= existing;
        }
        self.events.push_back(DeltaEvent {
            frame_delay,
            payload,
        });
    }

    /// Advance the clock by `frames`, popping every event strictly inside
    /// the elapsed window. Returned events carry their absolute offset from
    /// the window start; the first remaining entry has its delay reduced by
    /// the leftover frames.
    pub fn clock_tick(&mut self, frames: u64) -> Vec<DeltaEvent<T>> {
        let mut due = Vec::new();
        self.clock_tick_into(frames, &mut due);
        due
    }

    /// As [`clock_tick`](Self::clock_tick), draining into a caller-owned
    /// buffer so a preallocated vector can be reused across calls.
    pub fn clock_tick_into(&mut self, frames: u64, due: &mut Vec<DeltaEvent<T>>) {
        let mut remaining = frames;
        while matches!(self.events.front(), Some(head) if head.frame_delay < remaining) {
            let mut evt = self.events.pop_front().unwrap();
            remaining -= evt.frame_delay;
            // Restore the absolute offset from the window start.
            if let Some(prev) = due.last() {
                evt.frame_delay += prev.frame_delay;
            }
            due.push(evt);
        }
        if let Some(head) = self.events.front_mut() {
            head.frame_delay -= remaining;
        }
    }

    #[cfg(test)]
    fn delays(&self) -> Vec<u64> {
        self.events.iter().map(|e| e.frame_delay).collect()
    }
}

/// A [`DeltaList`] shared between a producer thread and a realtime
/// consumer.
///
/// The producer side takes the lock unconditionally. The consumer side
/// only ever tries the lock: on contention it leaves the queue untouched,
/// bumps a counter and reports failure, so the audio callback never
/// blocks. Skipped frames are the caller's to carry into the next tick.
#[derive(Debug, Default)]
pub struct SharedDeltaList<T> {
    inner: Mutex<DeltaList<T>>,
    contentions: AtomicU64,
}

impl<T> SharedDeltaList<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DeltaList::new()),
            contentions: AtomicU64::new(0),
        }
    }

    /// Producer side. May block briefly on the mutex.
    pub fn add_event(&self, frame_delay: u64, payload: T) {
        self.inner.lock().add_event(frame_delay, payload);
    }

    /// Producer side bulk insert under a single lock acquisition.
    pub fn add_events(&self, events: impl IntoIterator<Item = (u64, T)>) {
        let mut list = self.inner.lock();
        for (frame_delay, payload) in events {
            list.add_event(frame_delay, payload);
        }
    }

    /// Consumer side. Returns `false` without touching the queue when the
    /// lock is contended.
    pub fn try_clock_tick(&self, frames: u64, due: &mut Vec<DeltaEvent<T>>) -> bool {
        match self.inner.try_lock() {
            Some(mut list) => {
                list.clock_tick_into(frames, due);
                true
            }
            None => {
                self.contentions.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of consumer ticks lost to lock contention.
    pub fn contentions(&self) -> u64 {
        self.contentions.load(Ordering::Relaxed)
    }

    /// Hold the inner lock, for provoking contention in tests.
    #[cfg(test)]
    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, DeltaList<T>> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> DeltaList<&'static str> {
        let mut dl = DeltaList::new();
        dl.add_event(100, "first");
        dl.add_event(10, "zero_a");
        dl.add_event(1000, "third");
        dl.add_event(0, "head");
        dl.add_event(800, "second");
        dl
    }

    #[test]
    fn test_add_event_delta_encoding() {
        let dl = seeded();
        // Absolute delays 0, 10, 100, 800, 1000 encoded as deltas.
        assert_eq!(dl.delays(), vec![0, 10, 90, 700, 200]);
    }

    #[test]
    fn test_equal_delay_keeps_insertion_order() {
        let mut dl = DeltaList::new();
        dl.add_event(50, "a");
        dl.add_event(50, "b");
        dl.add_event(50, "c");
        let due = dl.clock_tick(51);
        let order: Vec<_> = due.iter().map(|e| e.payload).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(due.iter().all(|e| e.frame_delay == 50));
    }

    #[test]
    fn test_clock_tick_partial() {
        let mut dl = seeded();
        let due = dl.clock_tick(50);
        assert_eq!(
            due,
            vec![
                DeltaEvent { frame_delay: 0, payload: "head" },
                DeltaEvent { frame_delay: 10, payload: "zero_a" },
            ]
        );
        // 100 - 50 elapsed = 50 frames to the next event.
        assert_eq!(dl.delays(), vec![50, 700, 200]);
    }

    #[test]
    fn test_clock_tick_boundary_is_exclusive() {
        let mut dl = DeltaList::new();
        dl.add_event(100, "edge");
        // An event exactly at the window end stays queued with delay 0.
        assert!(dl.clock_tick(100).is_empty());
        assert_eq!(dl.delays(), vec![0]);
        // It fires at the start of the next window.
        let due = dl.clock_tick(1);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].frame_delay, 0);
    }

    #[test]
    fn test_clock_tick_drains_everything() {
        let mut dl = seeded();
        let due = dl.clock_tick(2000);
        let offsets: Vec<_> = due.iter().map(|e| e.frame_delay).collect();
        assert_eq!(offsets, vec![0, 10, 100, 800, 1000]);
        assert!(dl.is_empty());
        assert!(dl.clock_tick(64).is_empty());
    }

    #[test]
    fn test_shared_contention_counter() {
        let shared = SharedDeltaList::new();
        shared.add_event(10, 1u32);

        let guard = shared.inner.lock();
        let mut due = Vec::new();
        assert!(!shared.try_clock_tick(64, &mut due));
        assert!(due.is_empty());
        assert_eq!(shared.contentions(), 1);
        drop(guard);

        assert!(shared.try_clock_tick(64, &mut due));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload, 1);
    }
}
