mod tests {
    use triac_fader::{Error, FadeRecord, FadeRing};

    fn fade(channel: u8, start_cycle: u32, end_cycle: u32) -> FadeRecord {
        FadeRecord::for_channel(channel, 0, 1023, start_cycle, end_cycle)
    }

    fn end_cycles<const N: usize>(ring: &FadeRing<N>) -> Vec<u32> {
        ring.iter_active().map(|fade| fade.end_cycle).collect()
    }

    #[test]
    fn test_iter_active_in_insertion_order() {
        let ring: FadeRing<8> = FadeRing::new();
        assert!(ring.is_empty());
        for end in [5, 3, 9, 1] {
            ring.append(&fade(0, 0, end)).unwrap();
        }
        assert_eq!(ring.len(), 4);
        assert_eq!(end_cycles(&ring), vec![5, 3, 9, 1]);
    }

    #[test]
    fn test_append_fails_when_full() {
        let ring: FadeRing<4> = FadeRing::new();
        for end in 0..4 {
            ring.append(&fade(0, 0, 100 + end)).unwrap();
        }
        assert!(ring.is_full());
        assert_eq!(ring.append(&fade(0, 0, 200)), Err(Error::BufferFull));
        assert_eq!(ring.len(), 4);
        assert_eq!(end_cycles(&ring), vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_retire_stops_at_first_unfinished() {
        let ring: FadeRing<8> = FadeRing::new();
        for end in [2, 4, 10, 3] {
            ring.append(&fade(0, 0, end)).unwrap();
        }

        let retired = ring.retire_up_to(1);
        assert!(retired.is_empty());
        assert_eq!(ring.len(), 4);

        let retired = ring.retire_up_to(4);
        let retired: Vec<u32> = retired.iter().map(|fade| fade.end_cycle).collect();
        assert_eq!(retired, vec![2, 4]);
        // The record ending at 3 waits behind the one ending at 10.
        assert_eq!(end_cycles(&ring), vec![10, 3]);

        let retired = ring.retire_up_to(10);
        assert_eq!(retired.len(), 2);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_retire_never_takes_future_records() {
        let ring: FadeRing<8> = FadeRing::new();
        ring.append(&fade(0, 0, 7)).unwrap();
        for cycle in 0..7 {
            assert!(ring.retire_up_to(cycle).is_empty());
        }
        assert_eq!(ring.retire_up_to(7).len(), 1);
    }

    #[test]
    fn test_slots_are_reused_after_wrap() {
        let ring: FadeRing<4> = FadeRing::new();
        let mut next_end = 0;
        for _ in 0..10 {
            while !ring.is_full() {
                ring.append(&fade(1, 0, next_end)).unwrap();
                next_end += 1;
            }
            let retired = ring.retire_up_to(next_end - 3);
            assert_eq!(retired.len(), 2);
            assert_eq!(ring.len(), 2);
        }
        assert_eq!(end_cycles(&ring), vec![next_end - 2, next_end - 1]);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let ring: FadeRing<8> = FadeRing::new();
        ring.append(&fade(0, 0, 1)).unwrap();
        ring.append(&fade(1, 0, 2)).unwrap();

        let iter = ring.iter_active();
        let first: Vec<FadeRecord> = iter.clone().collect();
        let second: Vec<FadeRecord> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_iterator_ignores_later_appends() {
        let ring: FadeRing<8> = FadeRing::new();
        ring.append(&fade(0, 0, 1)).unwrap();
        let iter = ring.iter_active();
        ring.append(&fade(0, 0, 2)).unwrap();
        assert_eq!(iter.count(), 1);
    }

    #[test]
    fn test_iterator_skips_records_retired_meanwhile() {
        let ring: FadeRing<8> = FadeRing::new();
        for end in [1, 2, 3] {
            ring.append(&fade(0, 0, end)).unwrap();
        }
        let mut iter = ring.iter_active();
        assert_eq!(iter.next().map(|fade| fade.end_cycle), Some(1));
        ring.retire_up_to(2);
        assert_eq!(iter.next().map(|fade| fade.end_cycle), Some(3));
        assert_eq!(iter.next(), None);
    }

    fn numbered(seq: u32) -> FadeRecord {
        #[allow(clippy::cast_possible_truncation)]
        let brightness = (seq & 0x3ff) as u16;
        #[allow(clippy::cast_possible_truncation)]
        let channel = (seq % 8) as u8;
        FadeRecord::for_channel(channel, brightness, 1023 - brightness, seq, seq)
    }

    fn is_whole(fade: &FadeRecord) -> bool {
        *fade == numbered(fade.start_cycle)
    }

    #[test]
    fn test_concurrent_reader_sees_whole_records() {
        use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
        use std::thread;

        const RECORDS: u32 = 100_000;

        let ring: FadeRing<8> = FadeRing::new();
        let produced = AtomicU32::new(0);
        let done = AtomicBool::new(false);

        thread::scope(|scope| {
            scope.spawn(|| {
                for seq in 0..RECORDS {
                    while ring.append(&numbered(seq)).is_err() {
                        thread::yield_now();
                    }
                    produced.store(seq + 1, Ordering::Release);
                }
            });

            scope.spawn(|| {
                let mut next = 0;
                while next < RECORDS {
                    let available = produced.load(Ordering::Acquire);
                    if available == next {
                        thread::yield_now();
                        continue;
                    }
                    for fade in ring.retire_up_to(available - 1) {
                        assert_eq!(fade, numbered(next));
                        next += 1;
                    }
                }
                done.store(true, Ordering::Release);
            });

            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    assert!(ring.len() <= ring.capacity());
                    let mut previous = None;
                    for fade in ring.iter_active() {
                        assert!(is_whole(&fade), "torn record {fade:?}");
                        if let Some(previous) = previous {
                            assert!(fade.start_cycle > previous);
                        }
                        previous = Some(fade.start_cycle);
                    }
                }
            });
        });

        assert!(ring.is_empty());
    }
}
