//! Processing pipeline components.

mod aggregate;
mod coordinator;
mod processor;
mod runner;

pub use aggregate::{
    Aggregate, AggregationPolicy, SpeciesScore, TemporalAggregator, Thresholds, VideoPrediction,
};
pub use coordinator::{collect_input_files, report_path_for};
pub use processor::{VideoPipeline, process_video};
pub use runner::{RunOptions, run_videos};
