use super::interface::{FacingMode, VideoSource, VideoSourceProvider};
use crate::config::CameraConfig;
use crate::error::VideoSourceError;
use crate::frame::{FrameData, FrameFormat};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, trace, warn};

/// Opens V4L2 cameras through GStreamer, delivering greyscale frames
pub struct GstCameraProvider {
    config: CameraConfig,
    frame_timeout: Duration,
}

impl GstCameraProvider {
    pub fn new(config: CameraConfig, frame_timeout: Duration) -> Self {
        Self {
            config,
            frame_timeout,
        }
    }

    fn device_path(&self, facing: FacingMode) -> String {
        let index = match facing {
            FacingMode::Rear => self.config.rear_index,
            FacingMode::Front => self.config.front_index,
        };
        format!("/dev/video{}", index)
    }

    /// Build GStreamer pipeline string converting the camera feed to GRAY8
    fn build_pipeline_string(&self, device: &str) -> String {
        let (width, height) = self.config.resolution;
        format!(
            "v4l2src device={} ! videoconvert ! videoscale ! \
             video/x-raw,format=GRAY8,width={},height={},framerate={}/1 ! \
             appsink name=sink sync=false max-buffers=2 drop=true",
            device, width, height, self.config.fps
        )
    }

    /// Map the device node's accessibility to a typed failure before GStreamer hides it
    fn probe_device(device: &str) -> Result<(), VideoSourceError> {
        match std::fs::OpenOptions::new().read(true).open(device) {
            Ok(_) => Ok(()),
            Err(e) => match e.kind() {
                std::io::ErrorKind::NotFound => Err(VideoSourceError::NoDevice {
                    device: device.to_string(),
                }),
                std::io::ErrorKind::PermissionDenied => Err(VideoSourceError::PermissionDenied {
                    device: device.to_string(),
                }),
                _ => Err(VideoSourceError::DeviceBusy {
                    device: device.to_string(),
                }),
            },
        }
    }
}

#[async_trait]
impl VideoSourceProvider for GstCameraProvider {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoSource>, VideoSourceError> {
        let device = self.device_path(facing);
        info!("Opening {} camera {}", facing, device);

        Self::probe_device(&device)?;

        gstreamer::init().map_err(|e| VideoSourceError::Disconnected {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = self.build_pipeline_string(&device);
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| VideoSourceError::ConstraintsUnsatisfiable {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| VideoSourceError::ConstraintsUnsatisfiable {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| VideoSourceError::ConstraintsUnsatisfiable {
                details: "Pipeline has no appsink".to_string(),
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            error!("Failed to start GStreamer pipeline: {}", e);
            return Err(VideoSourceError::DeviceBusy { device });
        }

        Ok(Box::new(GstCameraSource {
            device,
            pipeline,
            appsink,
            frame_counter: AtomicU64::new(0),
            frame_timeout: self.frame_timeout,
        }))
    }
}

struct GstCameraSource {
    device: String,
    pipeline: Pipeline,
    appsink: AppSink,
    frame_counter: AtomicU64,
    frame_timeout: Duration,
}

impl GstCameraSource {
    /// Translate a pending pipeline error into a source failure
    fn pipeline_error(&self) -> Option<VideoSourceError> {
        let bus = self.pipeline.bus()?;
        let message = bus.pop_filtered(&[gstreamer::MessageType::Error])?;

        if let gstreamer::MessageView::Error(err) = message.view() {
            let details = err.error().to_string();
            warn!("GStreamer error on {}: {}", self.device, details);
            if details.contains("not-negotiated") || details.contains("not negotiated") {
                return Some(VideoSourceError::ConstraintsUnsatisfiable { details });
            }
            return Some(VideoSourceError::Disconnected { details });
        }
        None
    }

    fn sample_to_frame(&self, sample: gstreamer::Sample) -> Result<FrameData, VideoSourceError> {
        let capture_error = |details: String| VideoSourceError::Disconnected { details };

        let buffer = sample
            .buffer()
            .ok_or_else(|| capture_error("No buffer in sample".to_string()))?;
        let caps = sample
            .caps()
            .ok_or_else(|| capture_error("No caps in sample".to_string()))?;
        let video_info = VideoInfo::from_caps(caps)
            .map_err(|e| capture_error(format!("Failed to get video info: {}", e)))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;

        let map = buffer
            .map_readable()
            .map_err(|e| capture_error(format!("Failed to map buffer: {}", e)))?;

        // GRAY8 rows are padded to 4-byte strides
        let row = width as usize;
        let mut data = Vec::with_capacity(row * height as usize);
        for line in map.as_slice().chunks(stride).take(height as usize) {
            data.extend_from_slice(&line[..row.min(line.len())]);
        }

        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        trace!("Captured frame {} ({}x{})", frame_id, width, height);

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            width,
            height,
            FrameFormat::Luma8,
        ))
    }
}

#[async_trait]
impl VideoSource for GstCameraSource {
    fn describe(&self) -> String {
        format!("camera {}", self.device)
    }

    async fn next_frame(&mut self) -> Result<FrameData, VideoSourceError> {
        let appsink = self.appsink.clone();
        let timeout = gstreamer::ClockTime::from_mseconds(self.frame_timeout.as_millis() as u64);

        let sample = tokio::task::spawn_blocking(move || appsink.try_pull_sample(timeout))
            .await
            .map_err(|e| VideoSourceError::Disconnected {
                details: e.to_string(),
            })?;

        match sample {
            Some(sample) => self.sample_to_frame(sample),
            None => {
                if let Some(error) = self.pipeline_error() {
                    return Err(error);
                }
                if self.appsink.is_eos() {
                    return Err(VideoSourceError::Ended);
                }
                Err(VideoSourceError::Disconnected {
                    details: format!("no frames received for {:?}", self.frame_timeout),
                })
            }
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!("Failed to stop pipeline for {}: {}", self.device, e);
        } else {
            info!("Camera {} released", self.device);
        }
    }
}
