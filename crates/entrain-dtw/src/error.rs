//! Error types for feature validation and DTW alignment.

/// Errors from feature sequence validation, warping path validation and alignment.
#[derive(Debug, thiserror::Error)]
pub enum DtwError {
    /// Returned when a feature sequence has zero frames.
    #[error("feature sequence must contain at least one frame")]
    EmptySequence,

    /// Returned when the frames of a sequence have zero coefficients.
    #[error("feature frames must contain at least one coefficient")]
    ZeroWidthFrame,

    /// Returned when a frame's width differs from the first frame's width.
    #[error("frame {frame} has {got} coefficients, expected {expected}")]
    RaggedFrames {
        /// Zero-based index of the offending frame.
        frame: usize,
        /// Width of the first frame.
        expected: usize,
        /// Width of the offending frame.
        got: usize,
    },

    /// Returned when a coefficient is NaN, infinity, or negative infinity.
    #[error("non-finite value at frame {frame}, coefficient {coefficient}")]
    NonFiniteValue {
        /// Zero-based frame index.
        frame: usize,
        /// Zero-based coefficient index within the frame.
        coefficient: usize,
    },

    /// Returned when the two sequences being aligned have different frame widths.
    #[error("frame width mismatch: participant has {participant} coefficients, model has {model}")]
    DimensionMismatch {
        /// Frame width of the first (participant) sequence.
        participant: usize,
        /// Frame width of the second (model) sequence.
        model: usize,
    },

    /// Returned when the search radius is zero.
    #[error("search radius must be at least 1, got {radius}")]
    InvalidRadius {
        /// The rejected radius.
        radius: usize,
    },

    /// Returned when the hop length or sample rate is zero.
    #[error("invalid frame timing: hop length {hop_length}, sample rate {sample_rate}")]
    InvalidTiming {
        /// Samples advanced per frame.
        hop_length: u32,
        /// Samples per second.
        sample_rate: u32,
    },

    /// Returned when a distance value is negative or not finite.
    #[error("alignment distance must be finite and non-negative, got {value}")]
    InvalidDistance {
        /// The rejected value.
        value: f64,
    },

    /// Returned when a warping path steps backwards or stalls.
    #[error("warping path is not monotonic at step {index}")]
    NonMonotonicPath {
        /// Index of the first step that does not advance from its predecessor.
        index: usize,
    },

    /// Returned when a warping path does not start at `(0, 0)`.
    #[error("warping path must start at (0, 0), starts at ({a}, {b})")]
    PathOffOrigin {
        /// First-sequence index of the first step.
        a: usize,
        /// Second-sequence index of the first step.
        b: usize,
    },
}
