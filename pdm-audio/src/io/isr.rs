//! Interrupt-side glue between I2S DMA buffers and [`FrameQueue`]s.
//!
//! The audio loop never touches a DMA buffer. Instead the DMA
//! half-complete / complete interrupts run these helpers:
//!
//! ```text
//! RX DMA buffer ─► FrameAssembler::isr ─► FrameQueue ─► QueueRx ─► loop
//! loop ─► QueueTx ─► FrameQueue ─► FrameDrainer::isr ─► TX DMA buffer
//! ```
//!
//! DMA halves need not line up with frame boundaries: both helpers keep a
//! working frame and an offset into it across interrupts.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! #[task(binds = DMA0_DMA16, local = [assembler], priority = 2)]
//! fn pdm_rx_isr(cx: pdm_rx_isr::Context) {
//!     let half = dma_rx.completed_half();
//!     cx.local.assembler.isr(half, &RX_QUEUE);
//! }
//! ```

use super::interleave::{left_samples, pack_mono, pack_pairs, silence};
use super::queue::FrameQueue;
use crate::config::ChannelLayout;

/// Collects captured DMA words into frames and pushes them to a queue.
pub struct FrameAssembler<const L: usize> {
    frame: [i16; L],
    offset: usize,
}

impl<const L: usize> FrameAssembler<L> {
    pub const fn new() -> Self {
        FrameAssembler {
            frame: [0; L],
            offset: 0,
        }
    }

    /// Consume one completed DMA region.
    ///
    /// Returns how many whole frames were handed to `queue`. Frames that do
    /// not fit are dropped by the queue and counted as overruns there.
    pub fn isr<const SLOTS: usize>(&mut self, words: &[u32], queue: &FrameQueue<L, SLOTS>) -> usize {
        let mut completed = 0;
        let mut rest = words;

        while !rest.is_empty() {
            let take = (L - self.offset).min(rest.len());
            let (chunk, tail) = rest.split_at(take);
            left_samples(&mut self.frame[self.offset..self.offset + take], chunk);
            self.offset += take;
            rest = tail;

            if self.offset == L {
                queue.push(&self.frame);
                self.offset = 0;
                completed += 1;
            }
        }

        completed
    }

    /// Samples already collected toward the next frame.
    pub fn pending(&self) -> usize {
        self.offset
    }
}

impl<const L: usize> Default for FrameAssembler<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls frames from a queue into an I2S transmit DMA buffer.
///
/// With [`ChannelLayout::Stereo`] queued frames are interleaved `L R L R`
/// and each word consumes two samples; with [`ChannelLayout::Mono`] each
/// word consumes one sample and plays it on both channels.
pub struct FrameDrainer<const L: usize> {
    frame: [i16; L],
    offset: usize,
    loaded: bool,
    layout: ChannelLayout,
    underruns: u32,
}

impl<const L: usize> FrameDrainer<L> {
    pub const fn new(layout: ChannelLayout) -> Self {
        FrameDrainer {
            frame: [0; L],
            offset: 0,
            loaded: false,
            layout,
            underruns: 0,
        }
    }

    /// Fill one DMA region that the hardware is about to transmit.
    ///
    /// When the queue runs dry the rest of the region is silence and an
    /// underrun is counted.
    pub fn isr<const SLOTS: usize>(&mut self, dest: &mut [u32], queue: &FrameQueue<L, SLOTS>) {
        let per_word = self.layout.channels();
        let mut rest = dest;

        while !rest.is_empty() {
            if !self.loaded {
                if queue.pop_into(&mut self.frame) == 0 {
                    silence(rest);
                    self.underruns = self.underruns.saturating_add(1);
                    return;
                }
                self.loaded = true;
                self.offset = 0;
            }

            let words = ((L - self.offset) / per_word).min(rest.len());
            let (chunk, tail) = core::mem::take(&mut rest).split_at_mut(words);
            let samples = &self.frame[self.offset..self.offset + words * per_word];
            match self.layout {
                ChannelLayout::Mono => pack_mono(chunk, samples),
                ChannelLayout::Stereo => pack_pairs(chunk, samples),
            }
            self.offset += words * per_word;
            rest = tail;

            if L - self.offset < per_word {
                self.loaded = false;
            }
        }
    }

    /// DMA regions that ran out of queued audio.
    pub fn underruns(&self) -> u32 {
        self.underruns
    }
}
