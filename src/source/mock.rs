use super::interface::{FacingMode, VideoSource, VideoSourceProvider};
use crate::error::VideoSourceError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Synthetic video source for testing without camera hardware
pub struct MockVideoSource {
    frame_counter: AtomicU64,
    frame_delay: Duration,
    fail_after: Option<(u64, VideoSourceError)>,
    releases: Arc<AtomicUsize>,
}

impl MockVideoSource {
    pub fn new(frame_delay: Duration) -> Self {
        Self {
            frame_counter: AtomicU64::new(0),
            frame_delay,
            fail_after: None,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `error` once `frames` frames have been delivered
    pub fn failing_after(mut self, frames: u64, error: VideoSourceError) -> Self {
        self.fail_after = Some((frames, error));
        self
    }

    pub fn with_release_counter(mut self, releases: Arc<AtomicUsize>) -> Self {
        self.releases = releases;
        self
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSource for MockVideoSource {
    fn describe(&self) -> String {
        "mock video source".to_string()
    }

    async fn next_frame(&mut self) -> Result<FrameData, VideoSourceError> {
        let id = self.frame_counter.load(Ordering::SeqCst);
        if let Some((limit, error)) = &self.fail_after {
            if id >= *limit {
                return Err(error.clone());
            }
        }

        tokio::time::sleep(self.frame_delay).await;
        self.frame_counter.fetch_add(1, Ordering::SeqCst);

        let (width, height) = (32, 32);
        Ok(FrameData::new(
            id,
            SystemTime::now(),
            vec![128u8; width * height],
            width as u32,
            height as u32,
            FrameFormat::Luma8,
        ))
    }

    fn release(&mut self) {
        let count = self.releases.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Mock video source released ({} total)", count);
    }
}

/// Provider handing out mock sources, or a scripted open error
pub struct MockVideoProvider {
    frame_delay: Duration,
    open_error: Mutex<Option<VideoSourceError>>,
    fail_after: Option<(u64, VideoSourceError)>,
    releases: Arc<AtomicUsize>,
    opened: Arc<Mutex<Vec<FacingMode>>>,
}

impl MockVideoProvider {
    pub fn new(frame_delay: Duration) -> Self {
        Self {
            frame_delay,
            open_error: Mutex::new(None),
            fail_after: None,
            releases: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the next `open()` call
    pub fn fail_next_open(&self, error: VideoSourceError) {
        *self.open_error.lock() = Some(error);
    }

    /// Sources opened from now on fail after `frames` frames
    pub fn with_sources_failing_after(mut self, frames: u64, error: VideoSourceError) -> Self {
        self.fail_after = Some((frames, error));
        self
    }

    /// Releases across every source this provider opened
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<FacingMode> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl VideoSourceProvider for MockVideoProvider {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoSource>, VideoSourceError> {
        if let Some(error) = self.open_error.lock().take() {
            return Err(error);
        }

        self.opened.lock().push(facing);
        let mut source = MockVideoSource::new(self.frame_delay)
            .with_release_counter(Arc::clone(&self.releases));
        if let Some((frames, error)) = &self.fail_after {
            source = source.failing_after(*frames, error.clone());
        }
        Ok(Box::new(source))
    }
}
