//! Parallel JPEG encoding.
//!
//! The public API is [`FrameEncoder::encode_all`](crate::FrameEncoder::encode_all)
//! with the `rayon` feature enabled; this module contains only the internal
//! implementation.

use ::rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::encoder::{EncodedFrame, FrameEncoder};
use crate::error::SecondSightError;
use crate::sampler::SampledFrame;

/// Frames handed to one rayon job.
const CHUNK_SIZE: usize = 8;

/// Encode frames across rayon threads.
///
/// Work is split into contiguous chunks so each job amortises its
/// scheduling overhead. Results are returned in second order.
pub(crate) fn parallel_encode(
    encoder: &FrameEncoder,
    frames: &[SampledFrame],
) -> Result<Vec<EncodedFrame>, SecondSightError> {
    if frames.is_empty() {
        return Ok(Vec::new());
    }

    let chunks: Vec<&[SampledFrame]> = frames.chunks(CHUNK_SIZE).collect();

    let results: Result<Vec<Vec<EncodedFrame>>, SecondSightError> = chunks
        .into_par_iter()
        .map(|chunk| chunk.iter().map(|frame| encoder.encode(frame)).collect())
        .collect();

    let mut encoded: Vec<EncodedFrame> = results?.into_iter().flatten().collect();
    encoded.sort_by_key(|frame| frame.second);
    Ok(encoded)
}
