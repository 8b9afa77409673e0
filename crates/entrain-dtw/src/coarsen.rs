//! Resolution halving for the multiresolution search.

/// Halve a row-major frame buffer by averaging adjacent frame pairs.
///
/// Frames `2k` and `2k+1` average into output frame `k`; an odd trailing frame
/// is carried over unchanged (averaged alone). Output length is
/// `ceil(frames / 2)` frames.
pub(crate) fn halve(data: &[f64], width: usize) -> Vec<f64> {
    let n_frames = data.len() / width;
    let mut out = Vec::with_capacity(n_frames.div_ceil(2) * width);
    for pair in data.chunks(2 * width) {
        if pair.len() == 2 * width {
            let (first, second) = pair.split_at(width);
            out.extend(first.iter().zip(second).map(|(x, y)| (x + y) * 0.5));
        } else {
            out.extend_from_slice(pair);
        }
    }
    out
}
