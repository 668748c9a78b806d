//! Edge-triggered interrupt latch
//!
//! Two sticky flags record "at least one edge since the last check" for the
//! accelerometer and IO-extender interrupt lines.
//!
//! The latch is split once into a [`LatchSetter`], owned by the interrupt
//! handler, and a [`LatchTaker`], owned by the main loop. Each side performs a
//! single atomic load or store per flag, so no lock is taken and no
//! compare-and-swap is needed.
//!
//! # Coalescing
//!
//! Edges are not counted. A second edge while a flag is pending is lost, and
//! an edge landing between the taker's load and its clearing store is merged
//! with the one being taken.
//!
//! ```ignore
//! static LATCH: InterruptLatch = InterruptLatch::new();
//!
//! let (setter, mut taker) = LATCH.split().unwrap();
//! // interrupt handler: setter.service(&mut edge_unit);
//! if taker.take(EdgeChannel::Accelerometer) { /* ... */ }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use log::trace;

/// Monitored interrupt line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChannel {
    /// Accelerometer interrupt line, edge unit channel 0
    Accelerometer = 0,
    /// IO-extender interrupt line, edge unit channel 1
    IoExtender = 1,
}

impl EdgeChannel {
    /// Number of channels
    pub const COUNT: usize = 2;

    /// All channels in hardware order
    pub const ALL: [Self; Self::COUNT] = [Self::Accelerometer, Self::IoExtender];

    /// Hardware channel index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Hardware edge-detection unit
pub trait EdgeEvents {
    /// Whether the unit reports an edge on `channel`.
    fn is_triggered(&mut self, channel: EdgeChannel) -> bool;

    /// Clear the hardware event for `channel` so the same edge does not
    /// re-enter the handler.
    fn acknowledge(&mut self, channel: EdgeChannel);
}

/// Sticky per-channel event flags
pub struct InterruptLatch {
    flags: [AtomicBool; EdgeChannel::COUNT],
    split: AtomicBool,
}

impl InterruptLatch {
    /// Both flags clear.
    pub const fn new() -> Self {
        Self {
            flags: [AtomicBool::new(false), AtomicBool::new(false)],
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the setter and taker.
    ///
    /// Returns `None` on every call after the first.
    pub fn split(&self) -> Option<(LatchSetter<'_>, LatchTaker<'_>)> {
        critical_section::with(|_| {
            if self.split.load(Ordering::Relaxed) {
                return None;
            }
            self.split.store(true, Ordering::Relaxed);
            Some((LatchSetter { latch: self }, LatchTaker { latch: self }))
        })
    }

    /// Whether `channel` has an untaken event.
    #[inline]
    pub fn is_pending(&self, channel: EdgeChannel) -> bool {
        self.flags[channel.index()].load(Ordering::Acquire)
    }
}

impl Default for InterruptLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side handle: may only set flags.
pub struct LatchSetter<'a> {
    latch: &'a InterruptLatch,
}

impl LatchSetter<'_> {
    /// Mark `channel` pending. Idempotent.
    #[inline]
    pub fn set(&self, channel: EdgeChannel) {
        self.latch.flags[channel.index()].store(true, Ordering::Release);
    }

    /// Interrupt handler body: acknowledge and latch every triggered channel.
    ///
    /// Returns how many channels were triggered.
    pub fn service<E: EdgeEvents + ?Sized>(&self, events: &mut E) -> usize {
        let mut triggered = 0;
        for channel in EdgeChannel::ALL {
            if events.is_triggered(channel) {
                events.acknowledge(channel);
                self.set(channel);
                triggered += 1;
            }
        }
        triggered
    }
}

/// Main-side handle: reads and clears flags.
pub struct LatchTaker<'a> {
    latch: &'a InterruptLatch,
}

impl LatchTaker<'_> {
    /// Consume the event on `channel`, returning whether one was pending.
    ///
    /// Taking a clear flag returns `false` and leaves it clear.
    pub fn take(&mut self, channel: EdgeChannel) -> bool {
        let flag = &self.latch.flags[channel.index()];
        let pending = flag.load(Ordering::Acquire);
        if pending {
            flag.store(false, Ordering::Release);
            trace!("latch: took {:?}", channel);
        }
        pending
    }

    /// Whether `channel` has an untaken event, without consuming it.
    #[inline]
    pub fn is_pending(&self, channel: EdgeChannel) -> bool {
        self.latch.is_pending(channel)
    }
}
