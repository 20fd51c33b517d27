//! Lock-free single-producer/single-consumer byte ring
//!
//! Every serial link owns two of these: one filled by the byte-arrived
//! interrupt and drained by the main loop, one filled by the main loop and
//! drained by the transmit-ready interrupt.
//!
//! The ring itself cannot be read or written. [`RingBuffer::split`] borrows it
//! mutably and hands out exactly one [`Producer`] and one [`Consumer`], so the
//! single-writer/single-reader discipline is checked by the compiler instead of
//! by convention. `head` is only ever stored by the producer and `tail` only by
//! the consumer; both are published with release/acquire ordering so the other
//! side never observes an index before the byte it covers.
//!
//! One slot is kept free to tell "full" from "empty", so a ring of `N` slots
//! holds at most `N - 1` bytes. When full, new bytes are dropped (drop-newest).

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Default number of slots per ring
pub const BUFFER_CAPACITY: usize = 512;

pub struct RingBuffer<const N: usize = BUFFER_CAPACITY> {
    /// Next slot to write, owned by the producer
    head: AtomicUsize,
    /// Next slot to read, owned by the consumer
    tail: AtomicUsize,
    buffer: UnsafeCell<[u8; N]>,
}

// Safety: slots between `tail` and `head` are only read by the consumer and
// slots outside that range are only written by the producer. Each index has a
// single writer, enforced by the split handles.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = {
        assert!(N >= 2 && N.is_power_of_two(), "ring size must be a power of two");
        N - 1
    };

    /// Creates an empty ring. Usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            buffer: UnsafeCell::new([0; N]),
        }
    }

    /// Empties the ring. Exclusive access makes this safe without masking.
    pub fn reset(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
    }

    /// Splits the ring into its producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Maximum number of bytes the ring can hold at once
    pub const fn capacity(&self) -> usize {
        Self::MASK
    }

    fn available(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & Self::MASK
    }

    fn slot(&self, index: usize) -> *mut u8 {
        // `index` is always masked by the callers
        self.buffer.get().cast::<u8>().wrapping_add(index)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write half of a [`RingBuffer`]
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Appends one byte.
    ///
    /// Returns `false` and drops the byte when the ring is full.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        let head = self.ring.head.load(Ordering::Relaxed);
        let next = (head + 1) & RingBuffer::<N>::MASK;
        if next == self.ring.tail.load(Ordering::Acquire) {
            return false;
        }

        // Safety: `head` is outside the consumer's readable range until the
        // store below publishes it.
        unsafe { self.ring.slot(head).write(byte) };
        self.ring.head.store(next, Ordering::Release);
        true
    }

    /// Appends every byte of `bytes`, returning how many were stored.
    ///
    /// Bytes that do not fit are dropped individually, so a full ring that is
    /// drained concurrently may store a non-contiguous subset.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let mut stored = 0;
        for &byte in bytes {
            if self.write_byte(byte) {
                stored += 1;
            }
        }
        stored
    }

    /// Number of bytes queued and not yet consumed
    pub fn available(&self) -> usize {
        self.ring.available()
    }

    /// Number of bytes that can still be written before the ring is full
    pub fn free(&self) -> usize {
        self.ring.capacity() - self.ring.available()
    }
}

/// ASCII output straight into the ring.
///
/// Never fails: bytes that do not fit are dropped like any other overflow.
impl<const N: usize> fmt::Write for Producer<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Read half of a [`RingBuffer`]
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Number of bytes ready to be read
    pub fn available(&self) -> usize {
        self.ring.available()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Removes and returns the oldest byte, or `None` if the ring is empty.
    pub fn read_byte(&mut self) -> Option<u8> {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        if tail == self.ring.head.load(Ordering::Acquire) {
            return None;
        }

        // Safety: `tail` is inside the published range and the producer does
        // not touch it until the store below releases it.
        let byte = unsafe { self.ring.slot(tail).read() };
        self.ring
            .tail
            .store((tail + 1) & RingBuffer::<N>::MASK, Ordering::Release);
        Some(byte)
    }

    /// Returns the byte `distance` positions after the oldest one without
    /// consuming anything, or `None` if fewer bytes are buffered.
    pub fn peek_at(&self, distance: usize) -> Option<u8> {
        if distance >= self.available() {
            return None;
        }

        let tail = self.ring.tail.load(Ordering::Relaxed);
        let index = (tail + distance) & RingBuffer::<N>::MASK;
        // Safety: `index` lies within the published range checked above.
        Some(unsafe { self.ring.slot(index).read() })
    }

    /// Copies the oldest `out.len()` bytes into `out` without consuming them.
    ///
    /// Returns `false` (leaving `out` untouched) if not enough bytes are
    /// buffered.
    pub fn peek_into(&self, out: &mut [u8]) -> bool {
        if out.len() > self.available() {
            return false;
        }

        let tail = self.ring.tail.load(Ordering::Relaxed);
        for (offset, byte) in out.iter_mut().enumerate() {
            let index = (tail + offset) & RingBuffer::<N>::MASK;
            // Safety: every index up to `out.len()` is in the published range.
            *byte = unsafe { self.ring.slot(index).read() };
        }
        true
    }

    /// Drops up to `count` of the oldest bytes, returning how many were dropped.
    pub fn discard(&mut self, count: usize) -> usize {
        let count = count.min(self.available());
        let tail = self.ring.tail.load(Ordering::Relaxed);
        self.ring
            .tail
            .store((tail + count) & RingBuffer::<N>::MASK, Ordering::Release);
        count
    }

    /// Drops everything currently buffered.
    pub fn clear(&mut self) -> usize {
        let available = self.available();
        self.discard(available)
    }
}
