//! Gain stage with saturating clip.
//!
//! For each sample `s` the output is `clamp(round(s × gain))` over
//! `-32768..=32767`. Rounding is half away from zero. The product of an
//! `i16` and an `f32` is formed in `f64`, where it is exact, so the only
//! rounding step is the explicit one.

/// Saturate a scaled sample to the `i16` range.
///
/// Values beyond the range clamp to the nearest bound; they never wrap.
#[inline(always)]
pub fn clip(val: f64) -> i16 {
    if val >= i16::MAX as f64 {
        i16::MAX
    } else if val <= i16::MIN as f64 {
        i16::MIN
    } else {
        val as i16
    }
}

/// Scalar gain followed by a saturating clip.
///
/// # Example
/// ```
/// use pdm_audio::dsp::FrameTransform;
///
/// let transform = FrameTransform::new(3.0);
/// assert_eq!(transform.sample(20_000), 32_767);
///
/// let mut stereo = [[0i16; 2]; 2];
/// transform.apply_stereo(&[100, -100], &mut stereo);
/// assert_eq!(stereo, [[300, 300], [-300, -300]]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    gain: f32,
}

impl FrameTransform {
    pub const fn new(gain: f32) -> Self {
        FrameTransform { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Whether the transform leaves every sample unchanged.
    pub fn is_unity(&self) -> bool {
        self.gain == 1.0
    }

    /// Transform a single sample.
    #[inline(always)]
    pub fn sample(&self, s: i16) -> i16 {
        clip(libm::round(s as f64 * self.gain as f64))
    }

    /// Transform `src` into `dst`. Both must have the same length.
    pub fn apply(&self, src: &[i16], dst: &mut [i16]) {
        debug_assert_eq!(src.len(), dst.len());

        if self.is_unity() {
            dst.copy_from_slice(src);
            return;
        }
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = self.sample(s);
        }
    }

    /// Transform a frame in place.
    pub fn apply_in_place(&self, frame: &mut [i16]) {
        if self.is_unity() {
            return;
        }
        for s in frame.iter_mut() {
            *s = self.sample(*s);
        }
    }

    /// Transform `src` and write each result into both slots of `dst`.
    ///
    /// `dst` is the interleaved stereo frame viewed as `[left, right]` pairs,
    /// so `dst.as_flattened()[2 * i] == dst.as_flattened()[2 * i + 1]`.
    pub fn apply_stereo(&self, src: &[i16], dst: &mut [[i16; 2]]) {
        debug_assert_eq!(src.len(), dst.len());

        for (d, &s) in dst.iter_mut().zip(src) {
            let v = self.sample(s);
            *d = [v, v];
        }
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new(1.0)
    }
}
