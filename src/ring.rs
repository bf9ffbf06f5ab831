//! Lock-free fade ring buffer
//!
//! Fixed capacity circular buffer with two free-running cursors. The end
//! cursor is written by exactly one producer (the request pipeline), the
//! start cursor by exactly one consumer (the zero-crossing handler). Slots
//! are made of atomics so readers racing with slot reuse can detect the
//! race instead of reading torn memory.

use heapless::Vec;
use portable_atomic::{AtomicU16, AtomicU32, Ordering, fence};

use crate::error::Error;
use crate::fade::FadeRecord;

struct Slot {
    channels: AtomicU16,
    start_brightness: AtomicU16,
    end_brightness: AtomicU16,
    start_cycle: AtomicU32,
    end_cycle: AtomicU32,
}

impl Slot {
    const fn new() -> Self {
        Self {
            channels: AtomicU16::new(0),
            start_brightness: AtomicU16::new(0),
            end_brightness: AtomicU16::new(0),
            start_cycle: AtomicU32::new(0),
            end_cycle: AtomicU32::new(0),
        }
    }

    fn load(&self) -> FadeRecord {
        FadeRecord {
            channels: self.channels.load(Ordering::Relaxed),
            start_brightness: self.start_brightness.load(Ordering::Relaxed),
            end_brightness: self.end_brightness.load(Ordering::Relaxed),
            start_cycle: self.start_cycle.load(Ordering::Relaxed),
            end_cycle: self.end_cycle.load(Ordering::Relaxed),
        }
    }

    // Release so a reader that observes any new field also observes the
    // start cursor advance that freed this slot.
    fn store(&self, record: &FadeRecord) {
        self.channels.store(record.channels, Ordering::Release);
        self.start_brightness
            .store(record.start_brightness, Ordering::Release);
        self.end_brightness
            .store(record.end_brightness, Ordering::Release);
        self.start_cycle.store(record.start_cycle, Ordering::Release);
        self.end_cycle.store(record.end_cycle, Ordering::Release);
    }
}

/// Ring buffer of in-flight fades
///
/// N is the capacity and must be a power of two.
pub struct FadeRing<const N: usize> {
    slots: [Slot; N],
    start: AtomicU32,
    end: AtomicU32,
}

impl<const N: usize> FadeRing<N> {
    #[allow(clippy::cast_possible_truncation)]
    const MASK: u32 = {
        assert!(N.is_power_of_two(), "fade ring capacity must be a power of two");
        assert!(N <= 1 << 16, "fade ring capacity too large");
        (N - 1) as u32
    };

    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            slots: [const { Slot::new() }; N],
            start: AtomicU32::new(0),
            end: AtomicU32::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of records between the cursors
    pub fn len(&self) -> usize {
        // Start first: it can only catch up with an end read after it.
        let start = self.start.load(Ordering::Acquire);
        let end = self.end.load(Ordering::Acquire);
        (end.wrapping_sub(start) as usize).min(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    fn slot(&self, index: u32) -> &Slot {
        &self.slots[(index & Self::MASK) as usize]
    }

    /// Append a record; never blocks
    ///
    /// Must only be called by the single producer.
    pub fn append(&self, record: &FadeRecord) -> Result<(), Error> {
        let end = self.end.load(Ordering::Relaxed);
        let start = self.start.load(Ordering::Acquire);
        if end.wrapping_sub(start) as usize >= N {
            return Err(Error::BufferFull);
        }
        self.slot(end).store(record);
        self.end.store(end.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Advance the start cursor past every leading record that ended at or before `cycle`
    ///
    /// Returns the retired records in buffer order. Must only be called by
    /// the single consumer. Records are copied out before the cursor moves,
    /// so the producer may reuse their slots as soon as this returns.
    pub fn retire_up_to(&self, cycle: u32) -> Vec<FadeRecord, N> {
        let mut retired = Vec::new();
        let start = self.start.load(Ordering::Relaxed);
        let end = self.end.load(Ordering::Acquire);
        let mut index = start;
        while index != end {
            let record = self.slot(index).load();
            if record.end_cycle > cycle {
                break;
            }
            // Cannot overflow: at most N records sit between the cursors.
            let _ = retired.push(record);
            index = index.wrapping_add(1);
        }
        if index != start {
            self.start.store(index, Ordering::Release);
        }
        retired
    }

    /// Iterate over the records between the cursors, oldest first
    ///
    /// The range is fixed when the iterator is created. Records appended
    /// later are not visited; records retired meanwhile are skipped.
    pub fn iter_active(&self) -> Iter<'_, N> {
        let end = self.end.load(Ordering::Acquire);
        let start = self.start.load(Ordering::Acquire);
        Iter {
            ring: self,
            next: start,
            end,
        }
    }
}

impl<const N: usize> Default for FadeRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over active fade records
#[derive(Clone)]
pub struct Iter<'a, const N: usize> {
    ring: &'a FadeRing<N>,
    next: u32,
    end: u32,
}

impl<const N: usize> Iterator for Iter<'_, N> {
    type Item = FadeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.next == self.end {
                return None;
            }
            let index = self.next;
            let record = self.ring.slot(index).load();

            // Validate the read: the slot is only trustworthy if the start
            // cursor has not moved past it while we were reading.
            fence(Ordering::Acquire);
            let start = self.ring.start.load(Ordering::Relaxed);
            let window = self.end.wrapping_sub(start);
            if window as usize > N {
                // Start overtook our snapshot of the end cursor.
                self.next = self.end;
                continue;
            }
            if self.end.wrapping_sub(index) <= window {
                self.next = index.wrapping_add(1);
                return Some(record);
            }
            self.next = start;
        }
    }
}
