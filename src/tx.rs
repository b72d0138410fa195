//! Single-sentence transmit slot shared between the main loop and the
//! transmitter-ready interrupt.
//!
//! The `busy` flag is the only synchronization point. While it is clear the
//! [`TxLoader`] owns the frame; storing `true` with Release hands the frame to
//! the [`TxDrain`], which gives it back by storing `false` once the last byte
//! has gone out.

use core::{
    cell::UnsafeCell,
    sync::atomic::{
        AtomicBool,
        Ordering::{Acquire, Relaxed, Release},
    },
};

use embedded_hal::serial;

use crate::nmea::NMEA_BUF_SIZE;

struct Frame {
    buf: [u8; NMEA_BUF_SIZE],
    len: usize,
    pos: usize,
}

pub struct TxSlot {
    is_split: AtomicBool,
    /// Called after a frame is loaded so the drain side sends its first byte.
    kick: Option<fn()>,
    busy: AtomicBool,
    frame: UnsafeCell<Frame>,
}

// SAFETY: `frame` is only accessed by the TxLoader while `busy` is false and
// by the TxDrain while it is true, with Release/Acquire on every hand-over.
unsafe impl Sync for TxSlot {}

/// Returned when the previous sentence is still being sent.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("transmitter busy")]
pub struct Busy;

impl TxSlot {
    pub const fn new(kick: Option<fn()>) -> Self {
        Self {
            is_split: AtomicBool::new(false),
            kick,
            busy: AtomicBool::new(false),
            frame: UnsafeCell::new(Frame {
                buf: [0; NMEA_BUF_SIZE],
                len: 0,
                pos: 0,
            }),
        }
    }

    pub fn try_split(&'static self) -> Option<(TxLoader, TxDrain)> {
        if self.is_split.fetch_or(true, Relaxed) {
            None
        } else {
            Some((TxLoader(self), TxDrain(self)))
        }
    }
}

/// Main loop side.
pub struct TxLoader(&'static TxSlot);

impl TxLoader {
    pub fn is_busy(&self) -> bool {
        self.0.busy.load(Acquire)
    }

    /// Copies `sentence` into the slot and starts sending it, unless the
    /// previous one is still going out. Nothing is queued on failure.
    pub fn try_load(&mut self, sentence: &[u8]) -> Result<(), Busy> {
        if self.is_busy() {
            return Err(Busy);
        }
        let len = sentence.len().min(NMEA_BUF_SIZE);
        // SAFETY: `busy` is false, so the TxDrain will not touch the frame
        // until we set it below, and only one TxLoader exists.
        let frame = unsafe { &mut *self.0.frame.get() };
        frame.buf[..len].copy_from_slice(&sentence[..len]);
        frame.len = len;
        frame.pos = 0;
        self.0.busy.store(true, Release);

        if let Some(kick) = self.0.kick {
            kick();
        }
        Ok(())
    }
}

/// Transmitter interrupt side.
pub struct TxDrain(&'static TxSlot);

impl TxDrain {
    /// Next byte to send, or `None` if there is nothing in flight. Running
    /// past the end of the frame frees the slot.
    pub fn peek(&mut self) -> Option<u8> {
        if !self.0.busy.load(Acquire) {
            return None;
        }
        // SAFETY: `busy` is true, so the TxLoader will not touch the frame.
        let frame = unsafe { &*self.0.frame.get() };
        if frame.pos < frame.len {
            Some(frame.buf[frame.pos])
        } else {
            self.0.busy.store(false, Release);
            None
        }
    }

    /// Marks the byte returned by [`peek`](Self::peek) as sent.
    pub fn advance(&mut self) {
        if self.0.busy.load(Acquire) {
            // SAFETY: as in `peek`.
            let frame = unsafe { &mut *self.0.frame.get() };
            frame.pos = (frame.pos + 1).min(frame.len);
        }
    }

    /// Services a transmitter-ready event: hands `port` the next byte if it
    /// will take one. Returns whether more bytes remain, i.e. whether the
    /// ready event should stay enabled.
    pub fn service<W: serial::Write<u8>>(&mut self, port: &mut W) -> bool {
        match self.peek() {
            Some(b) => {
                match port.write(b) {
                    Ok(()) => self.advance(),
                    Err(nb::Error::WouldBlock) => (),
                    // Line errors lose the byte, keep going with the sentence
                    Err(nb::Error::Other(_)) => self.advance(),
                }
                true
            }
            None => false,
        }
    }
}
