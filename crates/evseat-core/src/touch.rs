// Evseat Touch Slot Pool
// Seat-wide touch slot table and per-device slot maps

use std::collections::HashMap;

use crate::input::DeviceId;

/// Number of slots added each time the table runs full
pub const SLOT_GROWTH: usize = 5;

/// One active touch contact
#[derive(Debug, Clone, PartialEq)]
pub struct TouchState {
    /// Device that reported the contact
    pub device: DeviceId,
    /// Seat-wide slot index
    pub seat_slot: usize,
    /// Slot index reported by the device driver
    pub device_slot: i32,
    /// Last stage-space position
    pub x: f32,
    pub y: f32,
}

impl TouchState {
    /// Touch sequence id exposed on events; never zero
    pub fn sequence(&self) -> u32 {
        (self.seat_slot as u32).saturating_add(1).max(1)
    }
}

/// Seat-wide table of touch slots.
///
/// A slot index is handed out again only after it was released.
#[derive(Debug, Default)]
pub struct TouchSlotPool {
    slots: Vec<Option<TouchState>>,
}

impl TouchSlotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new contact to the first free seat slot, growing the table
    /// by [`SLOT_GROWTH`] entries when none is free.
    pub fn acquire(&mut self, device: DeviceId, device_slot: i32) -> usize {
        let seat_slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => free,
            None => {
                let first_new = self.slots.len();
                self.slots
                    .resize_with(self.slots.len() + SLOT_GROWTH, || None);
                first_new
            }
        };

        self.slots[seat_slot] = Some(TouchState {
            device,
            seat_slot,
            device_slot,
            x: 0.0,
            y: 0.0,
        });
        seat_slot
    }

    /// Free a seat slot, returning the contact it held
    pub fn release(&mut self, seat_slot: usize) -> Option<TouchState> {
        self.slots.get_mut(seat_slot).and_then(Option::take)
    }

    pub fn get(&self, seat_slot: usize) -> Option<&TouchState> {
        self.slots.get(seat_slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, seat_slot: usize) -> Option<&mut TouchState> {
        self.slots.get_mut(seat_slot).and_then(Option::as_mut)
    }

    /// Allocated table size
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of contacts currently held
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Per-device map from device slot to the seat slot it was bound to
#[derive(Debug, Default, Clone)]
pub struct DeviceTouchMap {
    slots: HashMap<i32, usize>,
}

impl DeviceTouchMap {
    pub fn insert(&mut self, device_slot: i32, seat_slot: usize) -> Option<usize> {
        self.slots.insert(device_slot, seat_slot)
    }

    pub fn lookup(&self, device_slot: i32) -> Option<usize> {
        self.slots.get(&device_slot).copied()
    }

    pub fn remove(&mut self, device_slot: i32) -> Option<usize> {
        self.slots.remove(&device_slot)
    }

    /// Take every binding, leaving the map empty. Sorted by seat slot so
    /// cancellations come out in a stable order.
    pub fn drain(&mut self) -> Vec<(i32, usize)> {
        let mut all: Vec<(i32, usize)> = self.slots.drain().collect();
        all.sort_by_key(|(_, seat_slot)| *seat_slot);
        all
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: u32) -> DeviceId {
        DeviceId(id)
    }

    #[test]
    fn test_acquire_grows_by_increment() {
        let mut pool = TouchSlotPool::new();
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.acquire(dev(2), 0), 0);
        assert_eq!(pool.capacity(), SLOT_GROWTH);

        for slot in 1..SLOT_GROWTH {
            assert_eq!(pool.acquire(dev(2), slot as i32), slot);
        }
        assert_eq!(pool.capacity(), SLOT_GROWTH);

        assert_eq!(pool.acquire(dev(2), 9), SLOT_GROWTH);
        assert_eq!(pool.capacity(), 2 * SLOT_GROWTH);
    }

    #[test]
    fn test_release_then_reuse_lowest_slot() {
        let mut pool = TouchSlotPool::new();
        let a = pool.acquire(dev(2), 0);
        let b = pool.acquire(dev(2), 1);
        assert_ne!(a, b);

        let released = pool.release(a).unwrap();
        assert_eq!(released.device_slot, 0);
        assert!(pool.get(a).is_none());

        // A different device slot takes the freed seat slot
        let c = pool.acquire(dev(3), 7);
        assert_eq!(c, a);
        assert_eq!(pool.get(c).unwrap().device, dev(3));
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = TouchSlotPool::new();
        let a = pool.acquire(dev(2), 0);
        assert!(pool.release(a).is_some());
        assert!(pool.release(a).is_none());
        assert!(pool.release(42).is_none());
    }

    #[test]
    fn test_sequence_never_zero() {
        let mut pool = TouchSlotPool::new();
        let a = pool.acquire(dev(2), 0);
        assert_eq!(pool.get(a).unwrap().sequence(), 1);
        let b = pool.acquire(dev(2), 1);
        assert_eq!(pool.get(b).unwrap().sequence(), 2);
    }

    #[test]
    fn test_device_map_drain_sorted() {
        let mut map = DeviceTouchMap::default();
        map.insert(4, 2);
        map.insert(1, 0);
        map.insert(9, 1);
        assert_eq!(map.lookup(9), Some(1));
        assert_eq!(map.drain(), vec![(1, 0), (9, 1), (4, 2)]);
        assert!(map.is_empty());
    }
}
