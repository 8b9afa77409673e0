//! Frame timing: conversion between frame indices and seconds.

use std::fmt;

use crate::error::DtwError;

/// Hop length and sample rate of a feature sequence.
///
/// One frame step lasts `hop_length / sample_rate` seconds. Both values are
/// guaranteed non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTiming {
    hop_length: u32,
    sample_rate: u32,
}

impl FrameTiming {
    /// Create a new frame timing.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidTiming`] | `hop_length` or `sample_rate` is zero |
    pub fn new(hop_length: u32, sample_rate: u32) -> Result<Self, DtwError> {
        if hop_length == 0 || sample_rate == 0 {
            return Err(DtwError::InvalidTiming {
                hop_length,
                sample_rate,
            });
        }
        Ok(Self {
            hop_length,
            sample_rate,
        })
    }

    /// Return the number of audio samples advanced per frame.
    #[must_use]
    pub fn hop_length(&self) -> u32 {
        self.hop_length
    }

    /// Return the audio sample rate in samples per second.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Convert a (possibly negative) frame offset to seconds.
    ///
    /// Multiplies before dividing so that integral offsets convert with a
    /// single rounding step.
    #[must_use]
    pub fn frames_to_seconds(&self, frames: i64) -> f64 {
        (frames as f64 * f64::from(self.hop_length)) / f64::from(self.sample_rate)
    }
}

impl fmt::Display for FrameTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hop {} @ {} Hz", self.hop_length, self.sample_rate)
    }
}
