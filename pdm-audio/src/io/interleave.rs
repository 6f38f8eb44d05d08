//! Conversion between sample frames and 32-bit I2S DMA words.
//!
//! ## DMA word format
//!
//! Each `u32` in an I2S DMA buffer carries one stereo slot pair:
//! - Lower 16 bits (bits 0–15): left channel sample (`i16`)
//! - Upper 16 bits (bits 16–31): right channel sample (`i16`)
//!
//! A PDM microphone strapped to the left channel delivers its samples in the
//! lower half; the upper half is noise and is discarded.

/// Extract the left-channel samples from captured DMA words.
///
/// # Panics
///
/// Debug-asserts that both slices have the same length.
pub fn left_samples(dest: &mut [i16], src: &[u32]) {
    debug_assert_eq!(dest.len(), src.len());

    for (d, &w) in dest.iter_mut().zip(src) {
        *d = w as i16;
    }
}

/// Pack an interleaved `L R L R ...` frame into DMA words, one pair per word.
///
/// # Panics
///
/// Debug-asserts that `src` holds exactly two samples per word of `dest`.
pub fn pack_pairs(dest: &mut [u32], src: &[i16]) {
    debug_assert_eq!(dest.len() * 2, src.len());

    for (d, pair) in dest.iter_mut().zip(src.chunks_exact(2)) {
        *d = (pair[0] as u16 as u32) | ((pair[1] as u16 as u32) << 16);
    }
}

/// Pack a mono frame into DMA words, placing each sample on both channels.
///
/// # Panics
///
/// Debug-asserts that both slices have the same length.
pub fn pack_mono(dest: &mut [u32], src: &[i16]) {
    debug_assert_eq!(dest.len(), src.len());

    for (d, &s) in dest.iter_mut().zip(src) {
        let half = s as u16 as u32;
        *d = half | (half << 16);
    }
}

/// Fill a region of the DMA buffer with silence (zero for both channels).
pub fn silence(dest: &mut [u32]) {
    dest.fill(0);
}
