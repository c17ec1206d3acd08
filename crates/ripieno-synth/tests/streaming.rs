//! Properties of windowed generation: output must not depend on how the
//! stream is cut into callback windows, and the event queue must keep
//! absolute positions across arbitrary tick sizes.

use std::sync::atomic::AtomicU64;

use proptest::prelude::*;
use ripieno_synth::{DeltaList, EnvelopeShape, Note, TimedEvent, VoiceKind};

const WINDOW: usize = 512;
const RATE: u32 = 1000;

fn render(kind: VoiceKind, events: &[TimedEvent], split_at: Option<usize>) -> Vec<f32> {
    let mut note = Note::new(60, kind, EnvelopeShape::default(), RATE, 0);
    for evt in events {
        note.add_event(*evt);
    }
    let underruns = AtomicU64::new(0);
    let mut out = vec![0.0f32; WINDOW];
    match split_at {
        None => {
            note.generate(0, &mut out, &underruns);
        }
        Some(k) => {
            let (head, tail) = out.split_at_mut(k);
            note.generate(0, head, &underruns);
            note.generate(k as u64, tail, &underruns);
        }
    }
    out
}

fn sorted_events(raw: Vec<(u16, bool, u8)>) -> Vec<TimedEvent> {
    let mut raw = raw;
    raw.sort_by_key(|&(frame, _, _)| frame);
    raw.into_iter()
        .map(|(frame, on, velocity)| {
            if on {
                TimedEvent::note_on(frame as u64, 0, 60, velocity)
            } else {
                TimedEvent::note_off(frame as u64, 0, 60)
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn window_split_does_not_change_output(
        raw in prop::collection::vec((0u16..WINDOW as u16, any::<bool>(), 1u8..=127), 0..12),
        split in 1usize..WINDOW,
        kind in prop_oneof![
            Just(VoiceKind::OnOff),
            Just(VoiceKind::Sine),
            Just(VoiceKind::Saw),
        ],
    ) {
        let events = sorted_events(raw);
        let whole = render(kind, &events, None);
        let split = render(kind, &events, Some(split));
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn chunked_ticks_preserve_absolute_offsets(
        delays in prop::collection::vec(0u64..2000, 0..24),
        mut chunks in prop::collection::vec(1u64..256, 1..24),
    ) {
        // Final oversized tick flushes whatever the random chunks missed.
        chunks.push(10_000);

        let mut single = DeltaList::new();
        let mut chunked = DeltaList::new();
        for (idx, &delay) in delays.iter().enumerate() {
            single.add_event(delay, idx);
            chunked.add_event(delay, idx);
        }

        let expected: Vec<(u64, usize)> = single
            .clock_tick(20_000)
            .into_iter()
            .map(|evt| (evt.frame_delay, evt.payload))
            .collect();

        let mut actual = Vec::new();
        let mut base = 0u64;
        for &chunk in &chunks {
            for evt in chunked.clock_tick(chunk) {
                actual.push((base + evt.frame_delay, evt.payload));
            }
            base += chunk;
        }

        prop_assert_eq!(expected, actual);
        prop_assert!(chunked.is_empty());
    }
}
