use super::interface::{FacingMode, VideoSource, VideoSourceProvider};
use crate::error::{NutriscanError, Result, VideoSourceError};
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "pgm", "ppm"];

/// Decode one still image into a greyscale frame
pub fn load_frame(path: &Path, id: u64) -> Result<FrameData> {
    let image = image::open(path).map_err(|e| {
        NutriscanError::invalid_input(format!("Cannot read image {}: {}", path.display(), e))
    })?;
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();

    Ok(FrameData::new(
        id,
        SystemTime::now(),
        luma.into_raw(),
        width,
        height,
        FrameFormat::Luma8,
    ))
}

/// Replays still images from a directory as a video feed
pub struct ImageSequenceProvider {
    dir: PathBuf,
    frame_interval: Duration,
}

impl ImageSequenceProvider {
    pub fn new<P: Into<PathBuf>>(dir: P, frame_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            frame_interval,
        }
    }

    async fn list_images(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl VideoSourceProvider for ImageSequenceProvider {
    async fn open(&self, facing: FacingMode) -> std::result::Result<Box<dyn VideoSource>, VideoSourceError> {
        let device = self.dir.display().to_string();
        debug!("Opening image sequence {} (facing {} ignored)", device, facing);

        let paths = self.list_images().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VideoSourceError::NoDevice {
                device: device.clone(),
            },
            std::io::ErrorKind::PermissionDenied => VideoSourceError::PermissionDenied {
                device: device.clone(),
            },
            _ => VideoSourceError::Disconnected {
                details: e.to_string(),
            },
        })?;

        if paths.is_empty() {
            return Err(VideoSourceError::NoDevice { device });
        }

        info!("Image sequence {} has {} frames", device, paths.len());
        Ok(Box::new(ImageSequenceSource {
            paths,
            position: 0,
            frame_interval: self.frame_interval,
            released: false,
        }))
    }
}

struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    frame_interval: Duration,
    released: bool,
}

#[async_trait]
impl VideoSource for ImageSequenceSource {
    fn describe(&self) -> String {
        format!("image sequence ({} frames)", self.paths.len())
    }

    async fn next_frame(&mut self) -> std::result::Result<FrameData, VideoSourceError> {
        if self.released {
            return Err(VideoSourceError::Ended);
        }

        // Unreadable files are skipped like dropped frames
        while let Some(path) = self.paths.get(self.position).cloned() {
            let id = self.position as u64;
            self.position += 1;

            if id > 0 {
                tokio::time::sleep(self.frame_interval).await;
            }

            let loaded = tokio::task::spawn_blocking(move || {
                let frame = load_frame(&path, id);
                (path, frame)
            })
            .await
            .map_err(|e| VideoSourceError::Disconnected {
                details: e.to_string(),
            })?;

            match loaded {
                (_, Ok(frame)) => return Ok(frame),
                (path, Err(e)) => warn!("Skipping frame {}: {}", path.display(), e),
            }
        }

        Err(VideoSourceError::Ended)
    }

    fn release(&mut self) {
        self.released = true;
    }
}
