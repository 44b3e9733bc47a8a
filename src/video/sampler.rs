//! Deterministic frame selection.
//!
//! Every policy is a pure function of `(frame_count, k, policy)`: the same
//! arguments always produce the same strictly increasing indices in
//! `[0, frame_count)`. When a video has no more than `k` frames, all of them
//! are selected.

use crate::config::{SamplingConfig, SamplingKind};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Frame sampling policy.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingPolicy {
    /// Centres of `k` equal-width segments spanning the video.
    UniformStride,
    /// Fractional positions in `[0, 1)`, one per sampled frame.
    FixedOffsets(Vec<f32>),
    /// Uniformly random frames drawn from a generator seeded with `seed`.
    SeededRandom {
        /// Generator seed.
        seed: u64,
    },
}

impl SamplingPolicy {
    /// Build the policy described by a model's sampling settings.
    #[must_use]
    pub fn from_config(config: &SamplingConfig) -> Self {
        match config.policy {
            SamplingKind::Uniform => Self::UniformStride,
            SamplingKind::Offsets => Self::FixedOffsets(config.offsets.clone()),
            SamplingKind::Random => Self::SeededRandom { seed: config.seed },
        }
    }

    /// Short name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UniformStride => "uniform",
            Self::FixedOffsets(_) => "offsets",
            Self::SeededRandom { .. } => "random",
        }
    }
}

/// Select up to `k` frame indices out of `frame_count`.
#[must_use]
pub fn sample_indices(frame_count: usize, k: usize, policy: &SamplingPolicy) -> Vec<usize> {
    if frame_count == 0 || k == 0 {
        return Vec::new();
    }
    if frame_count <= k {
        return (0..frame_count).collect();
    }

    match policy {
        SamplingPolicy::UniformStride => uniform_stride(frame_count, k),
        SamplingPolicy::FixedOffsets(offsets) => fixed_offsets(frame_count, k, offsets),
        SamplingPolicy::SeededRandom { seed } => seeded_random(frame_count, k, *seed),
    }
}

/// `index_i = floor((2i + 1) * n / 2k)`, strictly increasing because `n > k`.
fn uniform_stride(n: usize, k: usize) -> Vec<usize> {
    (0..k).map(|i| ((2 * i + 1) * n) / (2 * k)).collect()
}

/// Map offsets to frame positions, then nudge collisions forward.
///
/// Only the first `k` offsets are used. Missing offsets fall back to the
/// uniform positions so the result always has `k` entries.
fn fixed_offsets(n: usize, k: usize, offsets: &[f32]) -> Vec<usize> {
    let mut positions: Vec<usize> = offsets
        .iter()
        .take(k)
        .map(|offset| offset_to_index(*offset, n))
        .collect();
    if positions.len() < k {
        positions.extend(uniform_stride(n, k).into_iter().skip(positions.len()));
    }
    positions.sort_unstable();

    let mut indices = Vec::with_capacity(k);
    for (i, position) in positions.into_iter().enumerate() {
        let floor = indices.last().map_or(0, |prev: &usize| prev + 1);
        let ceiling = n - k + i;
        indices.push(position.max(floor).min(ceiling));
    }
    indices
}

fn offset_to_index(offset: f32, n: usize) -> usize {
    let clamped = if offset.is_finite() {
        f64::from(offset).clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let index = (clamped * n as f64).floor() as usize;
    index.min(n - 1)
}

fn seeded_random(n: usize, k: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, n, k).into_vec();
    indices.sort_unstable();
    indices
}
