//! Ring of backing allocations with explicit orphaning.
//!
//! wgpu exposes no "invalidate and hand me fresh storage" mapping flag, so the
//! ring does it by hand: every slot carries an in-flight flag that stays set from
//! the moment a frame writes it until the GPU reports the submission that read it
//! as done. Acquisition never waits on that flag; when every slot is busy a new
//! slot is allocated instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RenderError;

/// Clears a slot's in-flight flag. `Send + 'static`, so it can move into a
/// submitted-work-done callback.
#[derive(Debug)]
pub struct ReleaseHandle(Arc<AtomicBool>);

impl ReleaseHandle {
    pub fn release(self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Slot<S> {
    storage: S,
    in_flight: Arc<AtomicBool>,
}

/// Exclusive write access to one slot for the current frame.
///
/// Dropping the lease without [`commit`](Self::commit) releases the slot at once;
/// that is the path taken when a frame is abandoned before submission.
pub struct SlotLease<'a, S> {
    index: usize,
    storage: &'a S,
    flag: Option<Arc<AtomicBool>>,
}

impl<'a, S> SlotLease<'a, S> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn storage(&self) -> &'a S {
        self.storage
    }

    /// Keeps the slot in flight and returns the handle that ends it.
    pub fn commit(mut self) -> ReleaseHandle {
        match self.flag.take() {
            Some(flag) => ReleaseHandle(flag),
            None => unreachable!("lease committed twice"),
        }
    }
}

impl<S> Drop for SlotLease<'_, S> {
    fn drop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.store(false, Ordering::Release);
        }
    }
}

/// Occupancy of an [`OrphanRing`] at one point in time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RingStats {
    pub slots: usize,
    pub in_flight: usize,
    pub allocations: u64,
    /// Allocations made because every existing slot was in flight.
    pub orphaned: u64,
}

/// Bounded ring of `S` allocations.
pub struct OrphanRing<S> {
    slots: Vec<Slot<S>>,
    cursor: usize,
    max_slots: usize,
    allocations: u64,
    orphaned: u64,
}

impl<S> OrphanRing<S> {
    /// Creates an empty ring; slots are allocated on demand up to `max_slots`.
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            max_slots: max_slots.max(1),
            allocations: 0,
            orphaned: 0,
        }
    }

    /// Returns a slot no frame is still reading.
    ///
    /// Scans round-robin from the slot after the last one handed out. If every
    /// slot is in flight, `allocate` is asked for fresh storage. Fails only when
    /// the ring is at `max_slots` and nothing has been released.
    pub fn acquire<F>(&mut self, allocate: F) -> Result<SlotLease<'_, S>, RenderError>
    where
        F: FnOnce(usize) -> Result<S, RenderError>,
    {
        let len = self.slots.len();
        let free = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .find(|&i| !self.slots[i].in_flight.load(Ordering::Acquire));

        let index = match free {
            Some(i) => i,
            None => {
                if len >= self.max_slots {
                    return Err(RenderError::Allocation {
                        resource: "frame uniform slot",
                        reason: format!("all {len} slots are still read by the GPU"),
                    });
                }
                let storage = allocate(len)?;
                self.slots.push(Slot {
                    storage,
                    in_flight: Arc::new(AtomicBool::new(false)),
                });
                self.allocations += 1;
                if len > 0 {
                    self.orphaned += 1;
                    log::debug!("uniform ring orphaned into slot {len} (all {len} busy)");
                }
                len
            }
        };

        self.cursor = (index + 1) % self.slots.len();

        let slot = &self.slots[index];
        slot.in_flight.store(true, Ordering::Release);
        Ok(SlotLease {
            index,
            storage: &slot.storage,
            flag: Some(Arc::clone(&slot.in_flight)),
        })
    }

    /// Number of backing allocations currently owned.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Total allocations performed since creation.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Allocations made because every existing slot was in flight.
    pub fn orphaned_allocations(&self) -> u64 {
        self.orphaned
    }

    /// Number of slots still waiting on the GPU.
    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.in_flight.load(Ordering::Acquire))
            .count()
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            slots: self.slot_count(),
            in_flight: self.in_flight(),
            allocations: self.allocations(),
            orphaned: self.orphaned_allocations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(i: usize) -> Result<usize, RenderError> {
        Ok(i * 100)
    }

    #[test]
    fn first_acquire_allocates() {
        let mut ring = OrphanRing::new(4);
        let lease = ring.acquire(alloc).unwrap();
        assert_eq!(lease.index(), 0);
        assert_eq!(*lease.storage(), 0);
        drop(lease);
        assert_eq!(ring.slot_count(), 1);
    }

    #[test]
    fn busy_slots_are_never_reused() {
        let mut ring = OrphanRing::new(8);
        let mut handles = Vec::new();
        for expected in 0..3 {
            let lease = ring.acquire(alloc).unwrap();
            assert_eq!(lease.index(), expected);
            handles.push(lease.commit());
        }
        assert_eq!(ring.slot_count(), 3);
        assert_eq!(ring.in_flight(), 3);
        assert_eq!(ring.allocations(), 3);
        assert_eq!(ring.orphaned_allocations(), 2);
    }

    #[test]
    fn stats_track_release() {
        let mut ring = OrphanRing::new(8);
        let a = ring.acquire(alloc).unwrap().commit();
        let _b = ring.acquire(alloc).unwrap().commit();
        assert_eq!(
            ring.stats(),
            RingStats {
                slots: 2,
                in_flight: 2,
                allocations: 2,
                orphaned: 1,
            }
        );

        a.release();
        assert_eq!(ring.stats().in_flight, 1);
        assert_eq!(ring.stats().slots, 2);
    }

    #[test]
    fn released_slots_are_recycled_round_robin() {
        let mut ring = OrphanRing::new(8);
        let a = ring.acquire(alloc).unwrap().commit();
        let b = ring.acquire(alloc).unwrap().commit();
        a.release();
        b.release();

        let third = ring.acquire(alloc).unwrap();
        assert_eq!(third.index(), 0);
        let h = third.commit();
        let fourth = ring.acquire(alloc).unwrap();
        assert_eq!(fourth.index(), 1);
        drop(fourth);
        h.release();
        assert_eq!(ring.slot_count(), 2);
    }

    #[test]
    fn grows_instead_of_waiting() {
        let mut ring = OrphanRing::new(8);
        let busy = ring.acquire(alloc).unwrap().commit();
        let fresh = ring.acquire(alloc).unwrap();
        assert_eq!(fresh.index(), 1);
        drop(fresh);
        busy.release();
    }

    #[test]
    fn full_ring_reports_allocation_error() {
        let mut ring = OrphanRing::new(2);
        let _a = ring.acquire(alloc).unwrap().commit();
        let _b = ring.acquire(alloc).unwrap().commit();
        let err = ring.acquire(alloc).err().unwrap();
        assert!(matches!(err, RenderError::Allocation { .. }));
        assert_eq!(ring.slot_count(), 2);
    }

    #[test]
    fn dropped_lease_releases_immediately() {
        let mut ring = OrphanRing::new(1);
        drop(ring.acquire(alloc).unwrap());
        assert_eq!(ring.in_flight(), 0);
        assert!(ring.acquire(alloc).is_ok());
    }

    #[test]
    fn allocation_failure_leaves_ring_unchanged() {
        let mut ring: OrphanRing<usize> = OrphanRing::new(4);
        let err = ring
            .acquire(|_| {
                Err(RenderError::Allocation {
                    resource: "test",
                    reason: "out of memory".into(),
                })
            })
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::Allocation { .. }));
        assert_eq!(ring.slot_count(), 0);
    }

    #[test]
    fn release_from_another_thread_is_observed() {
        let mut ring = OrphanRing::new(1);
        let handle = ring.acquire(alloc).unwrap().commit();
        std::thread::spawn(move || handle.release()).join().unwrap();
        assert_eq!(ring.in_flight(), 0);
    }
}
