use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{
        AtomicBool, AtomicUsize,
        Ordering::{Acquire, Relaxed, Release},
    },
};

// Push at HEAD, pop at TAIL. Both only ever grow (wrapping), so N must be a
// power of two for `% N` to stay continuous across the wrap.
pub struct Ringbuf<T, const N: usize> {
    is_split: AtomicBool,
    head: AtomicUsize,
    tail: AtomicUsize,
    buf: [UnsafeCell<MaybeUninit<T>>; N],
}

// SAFETY: A slot is written only by the single Producer while it lies outside
// tail..head and read only by the single Consumer while it lies inside.
unsafe impl<T: Send, const N: usize> Sync for Ringbuf<T, N> {}

impl<T, const N: usize> Default for Ringbuf<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Ringbuf<T, N> {
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Ringbuf size must be a power of two");
        Self {
            is_split: AtomicBool::new(false),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            buf: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
        }
    }

    /// Hands out the two halves. Only the first call succeeds.
    pub fn try_split(&'static self) -> Option<(Producer<T, N>, Consumer<T, N>)> {
        match self.is_split.swap(true, Relaxed) {
            true => None,
            false => Some((Producer(self), Consumer(self))),
        }
    }

    fn len(&self) -> usize {
        self.head.load(Acquire).wrapping_sub(self.tail.load(Acquire))
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == N
    }
}

pub struct Consumer<T: 'static, const N: usize>(&'static Ringbuf<T, N>);

impl<T: 'static, const N: usize> Consumer<T, N> {
    pub fn try_read(&self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            let tail = self.0.tail.load(Relaxed);
            // SAFETY: Non-empty, and only this Consumer moves `tail`. The Acquire
            // load of `head` in `is_empty` made the slot contents visible.
            let val = unsafe { self.0.buf[tail % N].get().read().assume_init() };
            // Then hand the slot back to the producer
            self.0.tail.store(tail.wrapping_add(1), Release);
            Some(val)
        }
    }

    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct Producer<T: 'static, const N: usize>(&'static Ringbuf<T, N>);

impl<T: 'static, const N: usize> Producer<T, N> {
    /// Queues `val`, giving it back if the buffer is full. The oldest
    /// entries are never overwritten.
    pub fn try_write(&self, val: T) -> Result<(), T> {
        if self.is_full() {
            Err(val)
        } else {
            let head = self.0.head.load(Relaxed);
            // SAFETY: Not full, and only this Producer moves `head`, so the slot
            // is free until we publish it.
            unsafe {
                (*self.0.buf[head % N].get()).write(val);
            }
            // Then publish the slot
            self.0.head.store(head.wrapping_add(1), Release);
            Ok(())
        }
    }

    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
