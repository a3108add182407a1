mod interface;
mod mock;

#[cfg(all(feature = "camera", target_os = "linux"))]
mod camera;
#[cfg(feature = "images")]
mod images;

#[cfg(test)]
mod tests;

pub use interface::{FacingMode, SourceGuard, VideoSource, VideoSourceProvider};
pub use mock::{MockVideoProvider, MockVideoSource};

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::GstCameraProvider;
#[cfg(feature = "images")]
pub use images::{load_frame, ImageSequenceProvider};
