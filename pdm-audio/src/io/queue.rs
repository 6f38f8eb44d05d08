//! Lock-free ring of fixed-length sample frames.
//!
//! [`FrameQueue`] models the DMA descriptor chain between an interrupt
//! handler and the audio loop. Frames are copied into and out of
//! preallocated slots, so the queue never allocates and never moves a frame
//! by value.
//!
//! ## Safety contract
//!
//! - Only ONE context may produce ([`push`](FrameQueue::push),
//!   [`try_push`](FrameQueue::try_push)).
//! - Only ONE context may consume ([`pop_into`](FrameQueue::pop_into)).
//! - The two may be different priority levels (ISR vs. main loop).
//!
//! ## Usage
//!
//! ```ignore
//! static RX: FrameQueue<256, 5> = FrameQueue::new();
//!
//! // In the PDM DMA ISR, once a descriptor completes:
//! RX.push(&descriptor_samples);
//!
//! // In the audio loop:
//! let mut source = DmaFrameSource::new(QueueRx::new(&RX, delay, 50), WaitLimit::Forever);
//! ```

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use embedded_hal::delay::DelayNs;

use super::dma::{DmaRx, DmaTx};
use super::WaitLimit;
use crate::config::PeripheralConfig;
use crate::constants::BYTES_PER_SAMPLE;
use crate::error::PeripheralError;

/// Single-producer single-consumer ring of `[i16; L]` frames.
///
/// Usable capacity is `SLOTS - 1`; one slot disambiguates full from empty.
pub struct FrameQueue<const L: usize, const SLOTS: usize> {
    slots: [UnsafeCell<[i16; L]>; SLOTS],
    /// Next slot the producer writes (only modified by the producer).
    head: AtomicUsize,
    /// Next slot the consumer reads (only modified by the consumer).
    tail: AtomicUsize,
    overruns: AtomicU32,
}

// SAFETY: the SPSC contract means head and tail each have a single writer,
// and the Acquire/Release pairs below publish slot contents before the
// index that exposes them.
unsafe impl<const L: usize, const SLOTS: usize> Sync for FrameQueue<L, SLOTS> {}

impl<const L: usize, const SLOTS: usize> FrameQueue<L, SLOTS> {
    pub const fn new() -> Self {
        assert!(SLOTS >= 2, "frame queue needs at least 2 slots (1 usable)");
        assert!(L > 0, "frames must hold at least one sample");

        FrameQueue {
            slots: [const { UnsafeCell::new([0; L]) }; SLOTS],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Samples per frame.
    pub const fn frame_len(&self) -> usize {
        L
    }

    /// Number of frames the queue can hold.
    pub const fn capacity(&self) -> usize {
        SLOTS - 1
    }

    /// Producer side: fill the next free slot in place.
    ///
    /// Returns `false` without calling `fill` if the queue is full.
    pub fn try_push_with(&self, fill: impl FnOnce(&mut [i16; L])) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) % SLOTS;

        if next_head == self.tail.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: we are the sole producer and `next_head != tail`, so the
        // consumer is not reading this slot.
        unsafe {
            fill(&mut *self.slots[head].get());
        }

        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Producer side: copy `frame` in, or report back-pressure with `false`.
    pub fn try_push(&self, frame: &[i16; L]) -> bool {
        self.try_push_with(|slot| slot.copy_from_slice(frame))
    }

    /// Producer side for interrupt handlers: copy `frame` in, or drop it and
    /// count an overrun when the consumer has fallen behind.
    pub fn push(&self, frame: &[i16; L]) -> bool {
        let pushed = self.try_push(frame);
        if !pushed {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        pushed
    }

    /// Consumer side: copy the oldest frame into `dest` and release its slot.
    ///
    /// Copies `min(dest.len(), L)` samples and returns that count, or `0` if
    /// the queue is empty.
    pub fn pop_into(&self, dest: &mut [i16]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return 0;
        }

        // SAFETY: we are the sole consumer and `tail != head`, so the
        // producer has finished writing this slot.
        let frame = unsafe { &*self.slots[tail].get() };
        let n = dest.len().min(L);
        dest[..n].copy_from_slice(&frame[..n]);

        self.tail.store((tail + 1) % SLOTS, Ordering::Release);
        n
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + SLOTS - tail) % SLOTS
    }

    /// Frames dropped by [`push`](Self::push) because the queue was full.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl<const L: usize, const SLOTS: usize> Default for FrameQueue<L, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_frame_len(config: &PeripheralConfig, len: usize) -> Result<(), PeripheralError> {
    if config.frame_samples * config.channels as usize == len {
        Ok(())
    } else {
        Err(PeripheralError::INVALID_SIZE)
    }
}

/// Receive end of a [`FrameQueue`] as a blocking [`DmaRx`].
///
/// Polls the queue, sleeping `poll_us` between attempts. A `poll_us` of 0
/// is raised to 1 so a [`WaitLimit::Micros`] bound always expires.
pub struct QueueRx<'q, D, const L: usize, const SLOTS: usize> {
    queue: &'q FrameQueue<L, SLOTS>,
    delay: D,
    poll_us: u32,
}

impl<'q, D: DelayNs, const L: usize, const SLOTS: usize> QueueRx<'q, D, L, SLOTS> {
    pub fn new(queue: &'q FrameQueue<L, SLOTS>, delay: D, poll_us: u32) -> Self {
        QueueRx {
            queue,
            delay,
            poll_us: poll_us.max(1),
        }
    }
}

impl<D: DelayNs, const L: usize, const SLOTS: usize> DmaRx for QueueRx<'_, D, L, SLOTS> {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        check_frame_len(config, L)
    }

    fn read(&mut self, dest: &mut [i16], wait: WaitLimit) -> Result<usize, PeripheralError> {
        let mut waited = 0u32;
        loop {
            let n = self.queue.pop_into(dest);
            if n > 0 {
                return Ok(n * BYTES_PER_SAMPLE);
            }
            if !wait.allows(waited, self.poll_us) {
                return Ok(0);
            }
            self.delay.delay_us(self.poll_us);
            waited = waited.saturating_add(self.poll_us);
        }
    }
}

/// Transmit end of a [`FrameQueue`] as a blocking [`DmaTx`].
///
/// Waits for a free slot, sleeping `poll_us` between attempts. A `poll_us`
/// of 0 is raised to 1, as for [`QueueRx`].
pub struct QueueTx<'q, D, const L: usize, const SLOTS: usize> {
    queue: &'q FrameQueue<L, SLOTS>,
    delay: D,
    poll_us: u32,
}

impl<'q, D: DelayNs, const L: usize, const SLOTS: usize> QueueTx<'q, D, L, SLOTS> {
    pub fn new(queue: &'q FrameQueue<L, SLOTS>, delay: D, poll_us: u32) -> Self {
        QueueTx {
            queue,
            delay,
            poll_us: poll_us.max(1),
        }
    }
}

impl<D: DelayNs, const L: usize, const SLOTS: usize> DmaTx for QueueTx<'_, D, L, SLOTS> {
    fn configure(&mut self, config: &PeripheralConfig) -> Result<(), PeripheralError> {
        check_frame_len(config, L)
    }

    fn write(&mut self, src: &[i16], wait: WaitLimit) -> Result<usize, PeripheralError> {
        if src.len() != L {
            return Err(PeripheralError::INVALID_SIZE);
        }
        let mut waited = 0u32;
        loop {
            if self.queue.try_push_with(|slot| slot.copy_from_slice(src)) {
                return Ok(L * BYTES_PER_SAMPLE);
            }
            if !wait.allows(waited, self.poll_us) {
                return Ok(0);
            }
            self.delay.delay_us(self.poll_us);
            waited = waited.saturating_add(self.poll_us);
        }
    }
}
