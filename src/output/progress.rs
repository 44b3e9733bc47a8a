//! Progress bar utilities for video processing.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for processing multiple videos.
pub fn create_video_progress(total_videos: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_videos == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_videos as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} videos ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Increment a progress bar.
pub fn inc_progress(pb: Option<&ProgressBar>) {
    if let Some(pb) = pb {
        pb.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress() {
        assert!(create_video_progress(10, false).is_none());
        assert!(create_video_progress(0, true).is_none());
    }

    #[test]
    fn test_progress_counts() {
        let pb = create_video_progress(3, true);
        inc_progress(pb.as_ref());
        inc_progress(pb.as_ref());
        assert_eq!(pb.as_ref().map(ProgressBar::position), Some(2));
        finish_progress(pb, "Complete");
    }
}
