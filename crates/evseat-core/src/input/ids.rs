// Evseat Input Layer - Device Ids
// Seat-wide device id pool

use std::fmt;

/// First id handed out by a fresh seat
pub const INITIAL_DEVICE_ID: u32 = 2;

/// Ids added to the pool each time it runs empty
const ID_BATCH: u32 = 10;

/// Stable identifier of an input device within its seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Device id allocator: a monotonic counter feeding a sorted free list.
///
/// Released ids go back into the list in order, so the lowest free id is
/// always reused first.
#[derive(Debug, Clone)]
pub struct DeviceIdAllocator {
    next: u32,
    free: Vec<u32>,
}

impl Default for DeviceIdAllocator {
    fn default() -> Self {
        Self {
            next: INITIAL_DEVICE_ID,
            free: Vec::new(),
        }
    }
}

impl DeviceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self) -> DeviceId {
        if self.free.is_empty() {
            self.free.extend(self.next..self.next + ID_BATCH);
            self.next += ID_BATCH;
        }
        DeviceId(self.free.remove(0))
    }

    /// Return an id to the pool. Releasing an id that is already free is
    /// ignored.
    pub fn release(&mut self, id: DeviceId) {
        match self.free.binary_search(&id.0) {
            Ok(_) => log::warn!("device id {} released twice", id),
            Err(pos) => self.free.insert(pos, id.0),
        }
    }

    /// Number of ids waiting in the free list
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
