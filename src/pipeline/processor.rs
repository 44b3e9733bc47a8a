//! Single video processing pipeline.

use crate::error::{Error, Result};
use crate::inference::{BatchInferenceEngine, PreparedFrame};
use crate::pipeline::aggregate::{TemporalAggregator, VideoPrediction};
use crate::video::{
    FramePreprocessor, SamplingPolicy, VideoFrameReader, open_video, sample_indices,
};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Everything needed to turn one video into a [`VideoPrediction`].
///
/// Shared read-only by all workers.
pub struct VideoPipeline {
    /// Frames sampled per video.
    pub sample_count: usize,
    /// Frame selection policy.
    pub sampling: SamplingPolicy,
    /// Frame to tensor conversion.
    pub preprocessor: FramePreprocessor,
    /// Batched model inference.
    pub engine: BatchInferenceEngine,
    /// Frame to video aggregation.
    pub aggregator: TemporalAggregator,
}

/// Process a single video: read, sample, preprocess, infer, aggregate.
///
/// `should_stop` is polled between frames; when it returns true the video is
/// abandoned with [`Error::Cancelled`] and its decoder released.
pub fn process_video(
    path: &Path,
    pipeline: &VideoPipeline,
    should_stop: &dyn Fn() -> bool,
) -> Result<VideoPrediction> {
    process_with(path, pipeline, should_stop, &open_video)
}

fn process_with(
    path: &Path,
    pipeline: &VideoPipeline,
    should_stop: &dyn Fn() -> bool,
    open: &dyn Fn(&Path) -> Result<VideoFrameReader>,
) -> Result<VideoPrediction> {
    let start_time = Instant::now();
    info!("Processing: {}", path.display());

    let reader = open(path)?;
    let frame_count = match reader.asset().frame_count {
        Some(count) => count,
        None => {
            debug!("Frame count unknown, counting frames of {}", path.display());
            open(path)?.count_frames()?
        }
    };

    let (mut prepared, reached) =
        prepare_frames(reader, frame_count, pipeline, should_stop)?;
    if let Some(actual) = reached {
        warn!(
            "{} ended after {actual} of {frame_count} reported frame(s), resampling",
            path.display()
        );
        prepared = prepare_frames(open(path)?, actual, pipeline, should_stop)?.0;
    }

    if prepared.is_empty() {
        let empty = Error::EmptySample {
            path: path.to_path_buf(),
        };
        info!("{empty}, reporting no-data");
        return Ok(pipeline.aggregator.no_data(path));
    }

    if should_stop() {
        return Err(Error::Cancelled);
    }
    let predictions = pipeline.engine.predict(&prepared)?;
    let prediction = pipeline.aggregator.aggregate(path, &predictions);

    info!(
        "Processed {} frame(s) of {} in {:.2}s",
        prediction.frame_count(),
        path.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(prediction)
}

/// Sample `frame_count` frames and preprocess the selection.
///
/// Also returns the number of frames the stream actually held when it ended
/// before the last sampled index.
fn prepare_frames(
    reader: VideoFrameReader,
    frame_count: usize,
    pipeline: &VideoPipeline,
    should_stop: &dyn Fn() -> bool,
) -> Result<(Vec<PreparedFrame>, Option<usize>)> {
    let indices = sample_indices(frame_count, pipeline.sample_count, &pipeline.sampling);
    debug!(
        "Sampling {} of {} frame(s) ({})",
        indices.len(),
        frame_count,
        pipeline.sampling.name()
    );

    let mut prepared = Vec::with_capacity(indices.len());
    let mut frames = reader.sampled(indices);
    for frame in frames.by_ref() {
        if should_stop() {
            return Err(Error::Cancelled);
        }
        let frame = frame?;
        trace!(
            "Frame {} at {:?}s ({}x{})",
            frame.index, frame.timestamp_secs, frame.pixels.width, frame.pixels.height
        );
        prepared.push(PreparedFrame {
            frame_index: frame.index,
            tensor: pipeline.preprocessor.preprocess(&frame.pixels)?,
        });
    }

    Ok((prepared, frames.frames_reached()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::inference::{FrameBatch, FrameClassifier};
    use crate::pipeline::aggregate::{AggregationPolicy, Thresholds};
    use crate::video::{FrameDecoder, PixelBuffer, SamplingPolicy, VideoAsset};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Container whose header claims more frames than its stream holds.
    struct TruncatedDecoder {
        asset: VideoAsset,
        position: usize,
        actual: usize,
    }

    impl TruncatedDecoder {
        fn reader(claimed: usize, actual: usize) -> VideoFrameReader {
            VideoFrameReader::new(Box::new(Self {
                asset: VideoAsset {
                    path: PathBuf::from("truncated.mp4"),
                    duration_secs: Some(10.0),
                    frame_rate: Some(30.0),
                    width: 1,
                    height: 1,
                    frame_count: Some(claimed),
                },
                position: 0,
                actual,
            }))
        }
    }

    impl FrameDecoder for TruncatedDecoder {
        fn asset(&self) -> &VideoAsset {
            &self.asset
        }

        fn decode_next(&mut self) -> Result<Option<(Option<f64>, PixelBuffer)>> {
            if self.position >= self.actual {
                return Ok(None);
            }
            self.position += 1;
            Ok(Some((None, PixelBuffer::rgb8(1, 1, vec![40, 80, 120]))))
        }
    }

    /// Records which frame indices reach the model.
    struct IndexRecorder {
        labels: Vec<String>,
        seen: Mutex<Vec<usize>>,
    }

    impl FrameClassifier for IndexRecorder {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn classify(&self, batch: &FrameBatch) -> Result<Vec<Vec<f32>>> {
            self.seen
                .lock()
                .unwrap()
                .extend_from_slice(batch.frame_indices());
            Ok(vec![vec![0.25]; batch.len()])
        }
    }

    fn pipeline(classifier: Arc<IndexRecorder>) -> VideoPipeline {
        let input = InputConfig {
            width: 2,
            height: 2,
            ..InputConfig::default()
        };
        VideoPipeline {
            sample_count: 8,
            sampling: SamplingPolicy::UniformStride,
            preprocessor: FramePreprocessor::new(&input),
            engine: BatchInferenceEngine::new(classifier, 16, 0),
            aggregator: TemporalAggregator::new(AggregationPolicy::Mean, Thresholds::uniform(0.5)),
        }
    }

    fn recorder() -> Arc<IndexRecorder> {
        Arc::new(IndexRecorder {
            labels: vec!["duiker".to_string()],
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_stream_shorter_than_header_is_resampled() {
        let classifier = recorder();
        let pipeline = pipeline(Arc::clone(&classifier));

        let prediction = process_with(Path::new("truncated.mp4"), &pipeline, &|| false, &|_| {
            Ok(TruncatedDecoder::reader(300, 120))
        })
        .unwrap();

        assert_eq!(prediction.frame_count(), 8);
        assert_eq!(
            *classifier.seen.lock().unwrap(),
            sample_indices(120, 8, &SamplingPolicy::UniformStride)
        );
    }

    #[test]
    fn test_stream_matching_header_samples_once() {
        let classifier = recorder();
        let pipeline = pipeline(Arc::clone(&classifier));

        let prediction = process_with(Path::new("clip.mp4"), &pipeline, &|| false, &|_| {
            Ok(TruncatedDecoder::reader(40, 40))
        })
        .unwrap();

        assert_eq!(prediction.frame_count(), 8);
        assert_eq!(
            *classifier.seen.lock().unwrap(),
            sample_indices(40, 8, &SamplingPolicy::UniformStride)
        );
    }

    #[test]
    fn test_empty_stream_behind_header_is_no_data() {
        let classifier = recorder();
        let pipeline = pipeline(Arc::clone(&classifier));

        let prediction = process_with(Path::new("empty.mp4"), &pipeline, &|| false, &|_| {
            Ok(TruncatedDecoder::reader(300, 0))
        })
        .unwrap();

        assert_eq!(prediction.frame_count(), 0);
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_request_cancels_video() {
        let pipeline = pipeline(recorder());
        let result = process_with(Path::new("clip.mp4"), &pipeline, &|| true, &|_| {
            Ok(TruncatedDecoder::reader(40, 40))
        });
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
